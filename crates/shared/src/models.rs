//! Payload types carried by realtime notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle status of a discussion topic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopicStatus {
    Seeding,
    Active,
    Archived,
}

impl TopicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicStatus::Seeding => "SEEDING",
            TopicStatus::Active => "ACTIVE",
            TopicStatus::Archived => "ARCHIVED",
        }
    }
}

impl std::fmt::Display for TopicStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Notification payloads ---

/// A response was posted to a topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewResponsePayload {
    pub topic_id: String,
    pub response_id: String,
    pub author_id: String,
    #[serde(default)]
    pub author_name: String,
    /// Set when the response is a reply to another response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A new common-ground analysis is available for a topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommonGroundUpdatePayload {
    pub topic_id: String,
    pub analysis_id: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A topic moved between lifecycle states.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopicStatusChangePayload {
    pub topic_id: String,
    pub old_status: TopicStatus,
    pub new_status: TopicStatus,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Accept RFC 3339 strings or epoch milliseconds.
///
/// Notifications are change signals, so a timestamp in any other shape
/// becomes `None` instead of rejecting the whole payload.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::String(text) => DateTime::parse_from_rfc3339(&text)
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        serde_json::Value::Number(millis) => {
            millis.as_i64().and_then(DateTime::from_timestamp_millis)
        }
        _ => None,
    })
}
