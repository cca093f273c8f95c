use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A media record stored in redb
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: String,
    pub post_id: String,
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
}

/// Caller-supplied fields of a media record; the store assigns the rest.
#[derive(Debug, Clone, Default)]
pub struct NewMedia {
    pub post_id: String,
    pub url: Option<String>,
    pub media_type: Option<String>,
}
