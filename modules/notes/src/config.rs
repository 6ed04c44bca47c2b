use std::env;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const HOST: &str = "NOTES_HOST";
    pub const PORT: &str = "NOTES_PORT";
    /// Free-form label such as "development" or "production"
    pub const ENVIRONMENT: &str = "ENVIRONMENT";
    pub const APP_NAME: &str = "NOTES_APP_NAME";
}

/// Default values
pub mod defaults {
    pub const HOST: &str = "0.0.0.0";
    pub const PORT: u16 = 3001;
    pub const ENVIRONMENT: &str = "development";
    pub const APP_NAME: &str = "Smart Notes Manager - Notes API";
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub app_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: defaults::HOST.to_string(),
            port: defaults::PORT,
            environment: defaults::ENVIRONMENT.to_string(),
            app_name: defaults::APP_NAME.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match non_empty(env_vars::PORT) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                log::warn!(
                    "{} must be a valid port number, got {:?}; using {}",
                    env_vars::PORT,
                    raw,
                    defaults::PORT
                );
                defaults::PORT
            }),
            None => defaults::PORT,
        };

        Self {
            host: non_empty(env_vars::HOST).unwrap_or_else(|| defaults::HOST.to_string()),
            port,
            environment: non_empty(env_vars::ENVIRONMENT)
                .unwrap_or_else(|| defaults::ENVIRONMENT.to_string()),
            app_name: non_empty(env_vars::APP_NAME).unwrap_or_else(|| defaults::APP_NAME.to_string()),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
