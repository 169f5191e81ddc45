use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One five-minute presence sample. Append-only; at most one exists per
/// calendar minute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySample {
    pub id: i64,
    pub recorded_at: DateTime<Utc>,
    pub app_category: Option<String>,
}

/// The six tracked work attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    Focus,
    Productivity,
    Creativity,
    Stamina,
    Knowledge,
    Collaboration,
}

impl Attribute {
    pub const ALL: [Attribute; 6] = [
        Attribute::Focus,
        Attribute::Productivity,
        Attribute::Creativity,
        Attribute::Stamina,
        Attribute::Knowledge,
        Attribute::Collaboration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::Focus => "focus",
            Attribute::Productivity => "productivity",
            Attribute::Creativity => "creativity",
            Attribute::Stamina => "stamina",
            Attribute::Knowledge => "knowledge",
            Attribute::Collaboration => "collaboration",
        }
    }

    pub fn from_name(name: &str) -> Option<Attribute> {
        Attribute::ALL.into_iter().find(|v| v.as_str() == name)
    }
}

/// Per-user gamification record. `level` and `experience` are derived from
/// `total_exp` through the leveling curve and recomputed on every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatus {
    pub user_id: String,
    pub level: i64,
    pub experience: i64,
    pub total_exp: i64,
    pub focus: i64,
    pub productivity: i64,
    pub creativity: i64,
    pub stamina: i64,
    pub knowledge: i64,
    pub collaboration: i64,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl UserStatus {
    /// Fresh record with the fixed seed values.
    pub fn seeded(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            level: 1,
            experience: 0,
            total_exp: 0,
            focus: 50,
            productivity: 50,
            creativity: 50,
            stamina: 100,
            knowledge: 10,
            collaboration: 30,
            updated_at: now,
            created_at: now,
        }
    }

    pub fn attribute(&self, attribute: Attribute) -> i64 {
        match attribute {
            Attribute::Focus => self.focus,
            Attribute::Productivity => self.productivity,
            Attribute::Creativity => self.creativity,
            Attribute::Stamina => self.stamina,
            Attribute::Knowledge => self.knowledge,
            Attribute::Collaboration => self.collaboration,
        }
    }

    pub fn attribute_mut(&mut self, attribute: Attribute) -> &mut i64 {
        match attribute {
            Attribute::Focus => &mut self.focus,
            Attribute::Productivity => &mut self.productivity,
            Attribute::Creativity => &mut self.creativity,
            Attribute::Stamina => &mut self.stamina,
            Attribute::Knowledge => &mut self.knowledge,
            Attribute::Collaboration => &mut self.collaboration,
        }
    }
}

/// Signed, optionally time-bounded adjustment to one attribute. Immutable
/// once created; expiry only ever excludes it from reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeModifier {
    pub id: i64,
    pub user_id: String,
    pub attribute: Attribute,
    pub value: i64,
    pub reason: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AttributeModifier {
    pub fn is_active(&self, as_of: DateTime<Utc>) -> bool {
        match self.expires_at {
            None => true,
            Some(expires_at) => expires_at > as_of,
        }
    }
}

/// Modifier fields supplied by the caller; id and `created_at` are assigned
/// by the store.
#[derive(Debug, Clone)]
pub struct NewModifier {
    pub user_id: String,
    pub attribute: Attribute,
    pub value: i64,
    pub reason: String,
    pub expires_at: Option<DateTime<Utc>>,
}
