use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{KinshipError, Result};
use crate::note::NoteRecord;

use super::{NoteFilter, NoteSource};

/// Immutable in-memory snapshot of a note store.
///
/// Loads either a JSON array of notes or newline-delimited JSON (one note
/// per line). Note ids must be unique within a snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    notes: Vec<NoteRecord>,
    source: Option<PathBuf>,
}

impl SnapshotStore {
    /// Build a snapshot from records, rejecting duplicate ids
    pub fn from_notes(notes: Vec<NoteRecord>) -> Result<Self> {
        validate_unique_ids(&notes)?;
        Ok(SnapshotStore {
            notes,
            source: None,
        })
    }

    /// Load a snapshot file (JSON array, or NDJSON when the file does not start with '[')
    #[tracing::instrument(skip(path), fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let notes = parse_notes(&content)?;
        validate_unique_ids(&notes)?;
        tracing::debug!(notes = notes.len(), "loaded snapshot");
        Ok(SnapshotStore {
            notes,
            source: Some(path.to_path_buf()),
        })
    }

    /// Path the snapshot was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn notes(&self) -> &[NoteRecord] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

impl NoteSource for SnapshotStore {
    fn list_notes(&self, filter: &NoteFilter) -> Result<Vec<NoteRecord>> {
        Ok(self
            .notes
            .iter()
            .filter(|n| filter.matches(n))
            .cloned()
            .collect())
    }

    fn get_note(&self, id: &str) -> Result<NoteRecord> {
        self.notes
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or_else(|| KinshipError::not_found(id))
    }
}

fn parse_notes(content: &str) -> Result<Vec<NoteRecord>> {
    let trimmed = content.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|e| KinshipError::InvalidSnapshot {
            reason: e.to_string(),
        });
    }

    let mut notes = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let note: NoteRecord = serde_json::from_str(line).map_err(|e| {
            KinshipError::InvalidSnapshot {
                reason: format!("line {}: {}", line_no + 1, e),
            }
        })?;
        notes.push(note);
    }
    Ok(notes)
}

/// Reject snapshots where two records share an id
pub fn validate_unique_ids(notes: &[NoteRecord]) -> Result<()> {
    let mut seen = HashSet::with_capacity(notes.len());
    for note in notes {
        if note.id.is_empty() {
            return Err(KinshipError::InvalidSnapshot {
                reason: "note with empty id".to_string(),
            });
        }
        if !seen.insert(note.id.as_str()) {
            return Err(KinshipError::InvalidSnapshot {
                reason: format!("duplicate note id {}", note.id),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const NOTE_A: &str =
        r#"{"id":"a","textContent":"hello world","tags":["greeting"],"createdAt":"2024-01-01T00:00:00Z"}"#;
    const NOTE_B: &str =
        r#"{"id":"b","textContent":"goodbye","createdAt":"2024-01-02T00:00:00Z"}"#;

    #[test]
    fn test_load_json_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.json");
        fs::write(&path, format!("[{},{}]", NOTE_A, NOTE_B)).unwrap();

        let store = SnapshotStore::load(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.source(), Some(path.as_path()));
        assert_eq!(store.get_note("a").unwrap().tags, vec!["greeting"]);
    }

    #[test]
    fn test_load_ndjson_skips_blank_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.ndjson");
        fs::write(&path, format!("{}\n\n{}\n", NOTE_A, NOTE_B)).unwrap();

        let store = SnapshotStore::load(&path).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_ndjson_error_reports_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.ndjson");
        fs::write(&path, format!("{}\nnot json\n", NOTE_A)).unwrap();

        let err = SnapshotStore::load(&path).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{}", err);
    }

    #[test]
    fn test_empty_file_is_empty_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.json");
        fs::write(&path, "  \n").unwrap();
        assert!(SnapshotStore::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let note = NoteRecord::new("dup", "x");
        let err = SnapshotStore::from_notes(vec![note.clone(), note]).unwrap_err();
        assert!(matches!(err, KinshipError::InvalidSnapshot { .. }));
    }

    #[test]
    fn test_get_note_not_found() {
        let store = SnapshotStore::from_notes(vec![NoteRecord::new("a", "x")]).unwrap();
        let err = store.get_note("zzz").unwrap_err();
        assert!(matches!(err, KinshipError::NotFound { ref id } if id == "zzz"));
    }

    #[test]
    fn test_list_notes_applies_filter() {
        let store = SnapshotStore::from_notes(vec![
            NoteRecord::new("a", "x").with_tags(["keep"]),
            NoteRecord::new("b", "y"),
        ])
        .unwrap();
        let listed = store
            .list_notes(&NoteFilter::default().with_tag("keep"))
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "a");
    }
}
