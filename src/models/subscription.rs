//! Reader subscriptions

use serde::{Deserialize, Serialize};

/// The two subscription edge sets held by a reader
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriptions {
    pub publishers: Vec<i64>,
    pub journalists: Vec<i64>,
}

impl Subscriptions {
    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty() && self.journalists.is_empty()
    }

    pub fn follows_publisher(&self, publisher_id: i64) -> bool {
        self.publishers.contains(&publisher_id)
    }

    pub fn follows_journalist(&self, journalist_id: i64) -> bool {
        self.journalists.contains(&journalist_id)
    }
}
