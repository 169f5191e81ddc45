//! Wire contract between the daemon and its clients: one JSON object per
//! line over a unix socket, one request and one response per connection.
//! Other processes (CLI, a future tray) depend on these shapes, so they must
//! not change without a version bump.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::entities::{AttributeModifier, UserStatus};

pub mod client;
pub mod server;

pub const METHOD_PING: &str = "ping";
pub const METHOD_GET_STATUS: &str = "get_status";
pub const METHOD_GET_ACTIVITY_LOGS: &str = "get_activity_logs";
pub const METHOD_GET_CONFIG: &str = "get_config";
pub const METHOD_GET_GAMIFICATION_STATUS: &str = "get_gamification_status";
pub const METHOD_GET_GAMIFICATION_DETAILS: &str = "get_gamification_details";

pub const INVALID_REQUEST_ERROR: &str = "invalid request format";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Map<String, Value>,
}

impl Request {
    pub fn new(method: &str) -> Self {
        Self {
            method: method.to_string(),
            params: serde_json::Map::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok(data: impl Serialize) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self {
                success: true,
                data: Some(value),
                error: None,
            },
            Err(e) => Self::failure(format!("failed to encode response: {e}")),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Process-wide daemon snapshot returned by `get_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    pub running: bool,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
    pub version: String,
}

/// Effective (modifier-overlaid) status plus the absolute experience gate
/// for the next level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamificationStatus {
    pub user_id: String,
    pub level: i64,
    pub experience: i64,
    pub total_exp: i64,
    pub next_level_exp: i64,
    pub focus: i64,
    pub productivity: i64,
    pub creativity: i64,
    pub stamina: i64,
    pub knowledge: i64,
    pub collaboration: i64,
    pub updated_at: DateTime<Utc>,
}

impl GamificationStatus {
    pub fn from_effective(status: UserStatus, next_level_exp: i64) -> Self {
        Self {
            user_id: status.user_id,
            level: status.level,
            experience: status.experience,
            total_exp: status.total_exp,
            next_level_exp,
            focus: status.focus,
            productivity: status.productivity,
            creativity: status.creativity,
            stamina: status.stamina,
            knowledge: status.knowledge,
            collaboration: status.collaboration,
            updated_at: status.updated_at,
        }
    }
}

/// `get_gamification_details` payload: status, active modifiers and today's
/// per-category usage minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamificationDetails {
    pub status: GamificationStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<AttributeModifier>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub recent_apps: BTreeMap<String, i64>,
}
