use crate::models::role::Role;
use crate::models::tagging::{TagTarget, TaggingRequest, TaggingStatus};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Ask for a credit on an event, section or video
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaggingRequest {
    #[validate(length(min = 1))]
    pub event_id: String,
    pub target: TagTarget,
    pub role: Role,
    /// Defaults to the requesting user (self-tagging)
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaggingDecision {
    pub approve: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaggingRequestDto {
    pub id: String,
    pub event_id: String,
    pub target: TagTarget,
    pub role: Role,
    pub user_id: String,
    pub requested_by: String,
    pub status: TaggingStatus,
    pub created_at: DateTime<FixedOffset>,
    pub decided_at: Option<DateTime<FixedOffset>>,
    pub decided_by: Option<String>,
}

impl From<&TaggingRequest> for TaggingRequestDto {
    fn from(request: &TaggingRequest) -> Self {
        Self {
            id: request.id.clone(),
            event_id: request.event_id.clone(),
            target: request.target.clone(),
            role: request.role,
            user_id: request.user_id.clone(),
            requested_by: request.requested_by.clone(),
            status: request.status,
            created_at: request.created_at,
            decided_at: request.decided_at,
            decided_by: request.decided_by.clone(),
        }
    }
}
