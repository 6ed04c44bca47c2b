//! NoteStore — in-memory note storage
//!
//! Holds every note in a single map behind one lock. Nothing is written to
//! disk; all notes are gone when the process exits.

use chrono::Utc;
use notes_types::{Note, NoteCreate, NoteUpdate, TITLE_MAX_CHARS};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NoteError {
    #[error("Note not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
}

pub type NoteResult<T> = Result<T, NoteError>;

/// Filters for [`NoteStore::search`]. Unset fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub q: Option<String>,
    pub tag: Option<String>,
    pub archived: Option<bool>,
}

struct Entry {
    /// Creation sequence, breaks `updated_at` ties in listings
    seq: u64,
    note: Note,
}

#[derive(Default)]
struct Inner {
    notes: HashMap<Uuid, Entry>,
    next_seq: u64,
}

#[derive(Default)]
pub struct NoteStore {
    inner: RwLock<Inner>,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create and store a new note
    pub fn create(&self, data: NoteCreate) -> NoteResult<Note> {
        validate_title(&data.title)?;

        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4(),
            title: data.title,
            content: data.content,
            tags: normalize_tags(data.tags),
            archived: data.archived,
            created_at: now,
            updated_at: now,
        };

        let mut inner = self.inner.write();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.notes.insert(note.id, Entry { seq, note: note.clone() });

        Ok(note)
    }

    pub fn get(&self, id: Uuid) -> NoteResult<Note> {
        self.inner
            .read()
            .notes
            .get(&id)
            .map(|e| e.note.clone())
            .ok_or(NoteError::NotFound)
    }

    /// All notes, newest update first, optionally only those with a matching archived flag
    pub fn list(&self, archived: Option<bool>) -> Vec<Note> {
        self.collect_sorted(|note| archived.is_none_or(|a| note.archived == a))
    }

    /// Apply a partial update. Nothing changes if validation fails.
    pub fn update(&self, id: Uuid, patch: NoteUpdate) -> NoteResult<Note> {
        if let Some(title) = &patch.title {
            validate_title(title)?;
        }

        let mut inner = self.inner.write();
        let entry = inner.notes.get_mut(&id).ok_or(NoteError::NotFound)?;
        let note = &mut entry.note;

        if let Some(title) = patch.title {
            note.title = title;
        }
        if let Some(content) = patch.content {
            note.content = content;
        }
        if let Some(tags) = patch.tags {
            note.tags = normalize_tags(tags);
        }
        if let Some(archived) = patch.archived {
            note.archived = archived;
        }
        // Wall clock may step backwards; keep updated_at >= created_at.
        note.updated_at = Utc::now().max(note.created_at);

        Ok(note.clone())
    }

    pub fn delete(&self, id: Uuid) -> NoteResult<()> {
        self.inner
            .write()
            .notes
            .remove(&id)
            .map(|_| ())
            .ok_or(NoteError::NotFound)
    }

    pub fn set_archived(&self, id: Uuid, archived: bool) -> NoteResult<Note> {
        self.update(
            id,
            NoteUpdate {
                archived: Some(archived),
                ..Default::default()
            },
        )
    }

    /// Case-insensitive text match on title/content, whole-tag match, and
    /// archived equality. Every supplied filter must match.
    pub fn search(&self, filter: &SearchFilter) -> Vec<Note> {
        let q = filter
            .q
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());
        let tag = filter
            .tag
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        self.collect_sorted(|note| {
            if let Some(archived) = filter.archived {
                if note.archived != archived {
                    return false;
                }
            }
            if let Some(tag) = tag {
                if !note.has_tag(tag) {
                    return false;
                }
            }
            match &q {
                Some(q) => {
                    note.title.to_lowercase().contains(q.as_str())
                        || note.content.to_lowercase().contains(q.as_str())
                }
                None => true,
            }
        })
    }

    fn collect_sorted(&self, keep: impl Fn(&Note) -> bool) -> Vec<Note> {
        let inner = self.inner.read();
        let mut matches: Vec<&Entry> = inner.notes.values().filter(|e| keep(&e.note)).collect();
        matches.sort_by(|a, b| {
            b.note
                .updated_at
                .cmp(&a.note.updated_at)
                .then(a.seq.cmp(&b.seq))
        });
        matches.into_iter().map(|e| e.note.clone()).collect()
    }
}

fn validate_title(title: &str) -> NoteResult<()> {
    if title.trim().is_empty() {
        return Err(NoteError::Validation("title must not be empty".to_string()));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(NoteError::Validation(format!(
            "title must be at most {} characters",
            TITLE_MAX_CHARS
        )));
    }
    Ok(())
}

/// Trim, drop empties, and dedupe keeping first occurrence
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
