//! Note type definitions

use serde::{Deserialize, Serialize};

/// A readable note in the notes folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEntry {
    /// File name relative to the notes folder
    pub filename: String,

    /// Size in bytes
    pub size: u64,

    /// Last modification time (Unix seconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<i64>,

    /// Extension with a leading dot, lower-case
    pub extension: String,
}

/// How a note's bytes are turned into text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    Text,
    Pdf,
}

impl NoteKind {
    pub fn from_extension(extension: &str) -> Self {
        if extension == ".pdf" {
            NoteKind::Pdf
        } else {
            NoteKind::Text
        }
    }
}
