//! Note snapshots consumed by the engine
//!
//! A [`NoteRecord`] is a read-only view of one note at the time the snapshot
//! was taken. The engine never mutates or persists records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One note as supplied by the note store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRecord {
    /// Opaque, stable identifier
    pub id: String,

    /// Best available text (refined, else raw extracted, else empty)
    #[serde(default)]
    pub text_content: String,

    /// Normalised tags, in the order the note lists them
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,

    /// Reference to an attached image, resolved by an [`crate::store::ImageResolver`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl NoteRecord {
    pub fn new(id: impl Into<String>, text_content: impl Into<String>) -> Self {
        NoteRecord {
            id: id.into(),
            text_content: text_content.into(),
            tags: Vec::new(),
            image_ref: None,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Whether this note carries a non-blank image reference
    pub fn has_image(&self) -> bool {
        self.image_ref.as_deref().is_some_and(|r| !r.trim().is_empty())
    }
}

/// Normalize a tag: trim, lowercase, strip a leading '#'
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('#').trim().to_lowercase()
}

/// Normalize a tag list, dropping empties and repeats while keeping first-seen order
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let normalized = normalize_tag(tag.as_ref());
        if !normalized.is_empty() && !out.contains(&normalized) {
            out.push(normalized);
        }
    }
    out
}

fn deserialize_tags<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Vec<String> = Vec::deserialize(deserializer)?;
    Ok(normalize_tags(raw))
}
