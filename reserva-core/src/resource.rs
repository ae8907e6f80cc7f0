use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Room,
    Lab,
    Equipment,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Room => "room",
            ResourceKind::Lab => "lab",
            ResourceKind::Equipment => "equipment",
        }
    }

    pub fn parse(value: &str) -> CoreResult<Self> {
        match value {
            "room" => Ok(ResourceKind::Room),
            "lab" => Ok(ResourceKind::Lab),
            "equipment" => Ok(ResourceKind::Equipment),
            other => Err(CoreError::Validation(format!(
                "invalid resource type: {other}"
            ))),
        }
    }
}

/// A bookable shared resource. The `is_blocked` flag is the gate that
/// short-circuits all new bookings regardless of schedule or conflicts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    pub name: String,
    pub kind: ResourceKind,
    pub location: String,
    pub capacity: Option<i32>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    pub fn new(name: String, kind: ResourceKind, location: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            kind,
            location,
            capacity: None,
            description: None,
            image_url: None,
            is_blocked: false,
            created_at: now,
            updated_at: now,
        }
    }
}
