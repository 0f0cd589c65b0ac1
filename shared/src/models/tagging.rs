use crate::models::event::Event;
use crate::models::role::{Role, RoleAssignment, ScopeKind};
use crate::error::{Result, SharedError};
use crate::roles::RoleScope;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Collection holding tagging requests
pub const TAGGING_COLLECTION: &str = "tagging_request";

/// What a tag points at inside an event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TagTarget {
    Event,
    Section {
        #[serde(rename = "sectionId")]
        section_id: String,
    },
    Video {
        #[serde(rename = "sectionId")]
        section_id: String,
        #[serde(rename = "videoId")]
        video_id: String,
    },
}

impl TagTarget {
    pub fn scope_kind(&self) -> ScopeKind {
        match self {
            TagTarget::Event => ScopeKind::Event,
            TagTarget::Section { .. } => ScopeKind::Section,
            TagTarget::Video { .. } => ScopeKind::Video,
        }
    }

    pub fn to_scope(&self) -> RoleScope {
        match self {
            TagTarget::Event => RoleScope::Event,
            TagTarget::Section { section_id } => RoleScope::Section {
                section_id: section_id.clone(),
            },
            TagTarget::Video {
                section_id,
                video_id,
            } => RoleScope::Video {
                section_id: section_id.clone(),
                video_id: video_id.clone(),
            },
        }
    }

    /// The role list the target owns inside the event
    fn roles_mut<'a>(&self, event: &'a mut Event) -> Result<&'a mut Vec<RoleAssignment>> {
        match self {
            TagTarget::Event => Ok(&mut event.roles),
            TagTarget::Section { section_id } => event
                .find_section_mut(section_id)
                .map(|s| &mut s.roles)
                .ok_or_else(|| SharedError::NotFound(format!("Section {} not found", section_id))),
            TagTarget::Video {
                section_id,
                video_id,
            } => {
                let section = event.find_section_mut(section_id).ok_or_else(|| {
                    SharedError::NotFound(format!("Section {} not found", section_id))
                })?;
                section
                    .find_video_mut(video_id)
                    .map(|v| &mut v.roles)
                    .ok_or_else(|| SharedError::NotFound(format!("Video {} not found", video_id)))
            }
        }
    }

    /// Fails when the target does not exist in the event or the role is not allowed there
    pub fn check(&self, event: &Event, role: Role) -> Result<()> {
        if !role.allowed_in(self.scope_kind()) {
            return Err(SharedError::Validation(format!(
                "{} cannot be credited on a {:?}",
                role,
                self.scope_kind()
            )));
        }
        let mut scratch = event.clone();
        self.roles_mut(&mut scratch).map(|_| ())
    }

    pub fn has_role(&self, event: &Event, role: Role, user_id: &str) -> Result<bool> {
        let mut scratch = event.clone();
        let roles = self.roles_mut(&mut scratch)?;
        Ok(roles.iter().any(|r| r.role == role && r.user_id == user_id))
    }

    /// Credit `user_id` with `role` on this target. Returns false if already credited.
    pub fn apply(&self, event: &mut Event, role: Role, user_id: &str) -> Result<bool> {
        if !role.allowed_in(self.scope_kind()) {
            return Err(SharedError::Validation(format!(
                "{} cannot be credited on a {:?}",
                role,
                self.scope_kind()
            )));
        }
        let roles = self.roles_mut(event)?;
        if roles.iter().any(|r| r.role == role && r.user_id == user_id) {
            return Ok(false);
        }
        roles.push(RoleAssignment::new(role, user_id));
        Ok(true)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaggingStatus {
    Pending,
    Approved,
    Denied,
}

/// A pending association between a user and part of an event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaggingRequest {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(rename = "_key", default, skip_serializing_if = "String::is_empty")]
    pub key: String,

    #[serde(rename = "_rev", default, skip_serializing_if = "String::is_empty")]
    pub rev: String,

    pub event_id: String,
    pub target: TagTarget,
    pub role: Role,
    /// User being credited
    pub user_id: String,
    /// User who asked for the credit
    pub requested_by: String,
    pub status: TaggingStatus,
    pub created_at: DateTime<FixedOffset>,
    #[serde(default)]
    pub decided_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub decided_by: Option<String>,
}

impl TaggingRequest {
    pub fn is_pending(&self) -> bool {
        self.status == TaggingStatus::Pending
    }

    /// Same event, target, role and user
    pub fn same_claim(&self, other: &TaggingRequest) -> bool {
        self.event_id == other.event_id
            && self.target == other.target
            && self.role == other.role
            && self.user_id == other.user_id
    }
}
