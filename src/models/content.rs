//! Articles and newsletters
//!
//! Both kinds share one shape and one lifecycle: written unapproved by a
//! journalist, optionally under a publisher, then approved once by an editor.
//! `ContentKind` selects the table and the wording of notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Article,
    Newsletter,
}

impl ContentKind {
    pub const ALL: [ContentKind; 2] = [ContentKind::Article, ContentKind::Newsletter];

    /// Lowercase singular, also the permission model name ("article")
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Article => "article",
            ContentKind::Newsletter => "newsletter",
        }
    }

    /// Capitalised singular ("Article")
    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Article => "Article",
            ContentKind::Newsletter => "Newsletter",
        }
    }

    /// Table name and URL segment ("articles")
    pub fn plural(&self) -> &'static str {
        match self {
            ContentKind::Article => "articles",
            ContentKind::Newsletter => "newsletters",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An article or a newsletter
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub id: i64,
    #[serde(skip)]
    pub kind: ContentKind,
    pub title: String,
    /// Markdown body
    pub content: String,
    /// Owning publisher; `None` for independent pieces
    pub publisher: Option<i64>,
    /// Authoring journalist
    pub journalist: Option<i64>,
    pub approved: bool,
    /// Creation timestamp
    pub date: DateTime<Utc>,
}

impl Content {
    /// Written without a publisher
    pub fn is_independent(&self) -> bool {
        self.publisher.is_none()
    }
}

pub const MAX_TITLE_LEN: usize = 255;

/// Fields a journalist supplies when writing or revising an item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub publisher: Option<i64>,
}

impl ContentInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>, publisher: Option<i64>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            publisher,
        }
    }

    /// Field-level validation errors, keyed by field name
    pub fn validate(&self) -> Vec<(&'static str, String)> {
        let mut errors = Vec::new();
        let title = self.title.trim();
        if title.is_empty() {
            errors.push(("title", "This field is required.".to_string()));
        } else if title.chars().count() > MAX_TITLE_LEN {
            errors.push((
                "title",
                format!("Ensure this field has no more than {} characters.", MAX_TITLE_LEN),
            ));
        }
        if self.content.trim().is_empty() {
            errors.push(("content", "This field is required.".to_string()));
        }
        errors
    }
}
