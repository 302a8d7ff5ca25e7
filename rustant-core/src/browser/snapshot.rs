//! Page snapshot types for capturing browser page state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The mode used for capturing a page snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotMode {
    /// Raw HTML source.
    Html,
    /// Accessibility / ARIA tree representation.
    AriaTree,
    /// Extracted text content.
    Text,
    /// Base64-encoded screenshot PNG.
    Screenshot,
}

impl std::fmt::Display for SnapshotMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotMode::Html => write!(f, "html"),
            SnapshotMode::AriaTree => write!(f, "aria_tree"),
            SnapshotMode::Text => write!(f, "text"),
            SnapshotMode::Screenshot => write!(f, "screenshot"),
        }
    }
}

/// A captured snapshot of a browser page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// Current URL of the page.
    pub url: String,
    /// Page title.
    pub title: String,
    /// The snapshot mode used.
    pub mode: SnapshotMode,
    /// The captured content (HTML, text, ARIA tree, or base64 screenshot).
    pub content: String,
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
}

impl PageSnapshot {
    /// Create a new page snapshot.
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        mode: SnapshotMode,
        content: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            mode,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}
