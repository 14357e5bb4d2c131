//! Publisher model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An organisation that owns editors and journalists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Publisher {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Publisher together with its member user ids
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherWithMembers {
    #[serde(flatten)]
    pub publisher: Publisher,
    pub editors: Vec<i64>,
    pub journalists: Vec<i64>,
}
