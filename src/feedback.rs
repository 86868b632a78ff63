//! Launcher feedback rendering
//!
//! Items are serialized in Alfred's Script Filter JSON format:
//! `{"items": [{"title": ..., "valid": true, "arg": ...}]}`.

use serde::Serialize;
use std::io::{self, Write};

/// Icon shown next to the update entry
pub const ICON_UPDATE: &str = "icons/update.png";
/// Icon shown next to the back entry
pub const ICON_BACK: &str = "icons/back.png";
/// Icon shown next to an error entry
pub const ICON_ERROR: &str = "icons/error.png";

/// Icon reference, serialized as `{"path": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Icon {
    pub path: String,
}

/// A single selectable row in the launcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackItem {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Opaque value handed back to the workflow when the row is actioned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,
    /// Text placed in the launcher's query box on tab
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autocomplete: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    /// Whether the row can be actioned
    pub valid: bool,
}

impl FeedbackItem {
    /// A non-actionable row with just a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            arg: None,
            autocomplete: None,
            icon: None,
            valid: false,
        }
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arg = Some(arg.into());
        self
    }

    pub fn autocomplete(mut self, autocomplete: impl Into<String>) -> Self {
        self.autocomplete = Some(autocomplete.into());
        self
    }

    pub fn icon(mut self, path: impl Into<String>) -> Self {
        self.icon = Some(Icon { path: path.into() });
        self
    }

    pub fn valid(mut self, valid: bool) -> Self {
        self.valid = valid;
        self
    }
}

/// The full list returned to the launcher
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub items: Vec<FeedbackItem>,
}

impl Feedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: FeedbackItem) {
        self.items.push(item);
    }

    /// Serialize the list as Script Filter JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Write the list to `writer`, followed by a newline
    pub fn send<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let json = self.to_json().map_err(io::Error::from)?;
        writeln!(writer, "{}", json)?;
        writer.flush()
    }
}

impl Extend<FeedbackItem> for Feedback {
    fn extend<I: IntoIterator<Item = FeedbackItem>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl FromIterator<FeedbackItem> for Feedback {
    fn from_iter<I: IntoIterator<Item = FeedbackItem>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
