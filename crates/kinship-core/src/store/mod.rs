//! Boundary with the note store and image storage
//!
//! The engine reads notes through [`NoteSource`] and image bytes through
//! [`ImageResolver`]; it never writes to either.

mod images;
mod snapshot;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::note::{normalize_tag, NoteRecord};

pub use images::{FsImageResolver, MemoryImageResolver, NoImages};
pub use snapshot::{validate_unique_ids, SnapshotStore};

/// Read access to notes
pub trait NoteSource {
    /// List notes matching `filter`, in store order
    fn list_notes(&self, filter: &NoteFilter) -> Result<Vec<NoteRecord>>;

    /// Fetch one note, or [`crate::error::KinshipError::NotFound`]
    fn get_note(&self, id: &str) -> Result<NoteRecord>;
}

/// Turns an image reference into raw bytes.
///
/// Failures are reported per reference and never abort a batch.
pub trait ImageResolver: Send + Sync {
    fn resolve(&self, image_ref: &str) -> Result<Vec<u8>>;
}

/// Optional restrictions for [`NoteSource::list_notes`]
#[derive(Debug, Clone, Default)]
pub struct NoteFilter {
    /// Only notes carrying this tag
    pub tag: Option<String>,
    /// Only notes created at or after this instant
    pub created_after: Option<DateTime<Utc>>,
}

impl NoteFilter {
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = Some(normalize_tag(tag));
        self
    }

    pub fn with_created_after(mut self, created_after: DateTime<Utc>) -> Self {
        self.created_after = Some(created_after);
        self
    }

    pub fn matches(&self, note: &NoteRecord) -> bool {
        if let Some(tag) = &self.tag {
            if !note.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        self.created_after.is_none_or(|after| note.created_at >= after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_filter_by_tag_and_date() {
        let jan = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mar = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let note = NoteRecord::new("n1", "text")
            .with_tags(["Rust"])
            .with_created_at(jan);

        assert!(NoteFilter::default().matches(&note));
        assert!(NoteFilter::default().with_tag("#rust").matches(&note));
        assert!(!NoteFilter::default().with_tag("python").matches(&note));
        assert!(NoteFilter::default().with_created_after(jan).matches(&note));
        assert!(!NoteFilter::default().with_created_after(mar).matches(&note));
    }
}
