//! Free-text outputs of transforms.

use serde::{Deserialize, Serialize};

/// A titled text document produced alongside a matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub text: String,
}

impl Document {
    /// Create a document from a title and its text.
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }
}
