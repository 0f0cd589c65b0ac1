use crate::error::{Result, SharedError};
use crate::models::role::{Role, RoleAssignment, ScopeKind};
use crate::video::youtube_id;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

/// Collection holding event documents
pub const EVENT_COLLECTION: &str = "event";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Competition,
    Session,
    Workshop,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Competition => "competition",
            EventKind::Session => "session",
            EventKind::Workshop => "workshop",
        };
        f.write_str(s)
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "competition" => Ok(EventKind::Competition),
            "session" => Ok(EventKind::Session),
            "workshop" => Ok(EventKind::Workshop),
            other => Err(format!("Unknown event kind: {}", other)),
        }
    }
}

fn validate_time_window(date: &EventDate) -> std::result::Result<(), ValidationError> {
    match (date.start_time, date.end_time) {
        (Some(start), Some(end)) if end <= start => {
            let mut err = ValidationError::new("time_window");
            err.message = Some("End time must be after start time".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

/// One day of an event, optionally with a time window
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_time_window", skip_on_field_errors = false))]
pub struct EventDate {
    pub date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventDetails {
    #[validate(length(min = 1, max = 120, message = "Title is required and must be at most 120 characters"))]
    pub title: String,

    #[serde(default)]
    pub city_id: Option<String>,

    #[validate]
    pub dates: Vec<EventDate>,

    #[serde(default)]
    #[validate(length(max = 300))]
    pub address: Option<String>,

    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: Option<String>,

    #[serde(default)]
    #[validate(length(max = 500))]
    pub prices: Option<String>,

    #[serde(default)]
    #[validate(length(max = 5000))]
    pub schedule: Option<String>,

    #[serde(default)]
    pub styles: Vec<String>,
}

impl EventDetails {
    /// Earliest date of the event, used for ordering
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.iter().map(|d| d.date).min()
    }
}

/// An uploaded image held in object storage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Image {
    pub id: String,
    pub key: String,
    pub url: String,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct Video {
    pub id: String,
    #[validate(length(min = 1, max = 200, message = "Video title is required"))]
    pub title: String,
    #[validate(custom = "validate_video_src")]
    pub src: String,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub roles: Vec<RoleAssignment>,
}

fn validate_video_src(src: &str) -> std::result::Result<(), ValidationError> {
    if youtube_id(src).is_some() {
        Ok(())
    } else {
        let mut err = ValidationError::new("video_src");
        err.message = Some("Video source must be a YouTube link".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct Bracket {
    pub id: String,
    #[validate(length(min = 1, max = 120, message = "Bracket title is required"))]
    pub title: String,
    #[serde(default)]
    #[validate]
    pub videos: Vec<Video>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Battle,
    Showcase,
    Cypher,
    Class,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    #[validate(length(min = 1, max = 120, message = "Section title is required"))]
    pub title: String,
    pub kind: SectionKind,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[serde(default)]
    pub has_brackets: bool,
    #[serde(default)]
    #[validate]
    pub brackets: Vec<Bracket>,
    #[serde(default)]
    #[validate]
    pub videos: Vec<Video>,
    #[serde(default)]
    pub roles: Vec<RoleAssignment>,
}

impl Section {
    /// All videos in display order: direct videos, then bracket videos in bracket order
    pub fn all_videos(&self) -> impl Iterator<Item = &Video> {
        self.videos
            .iter()
            .chain(self.brackets.iter().flat_map(|b| b.videos.iter()))
    }

    pub fn video_count(&self) -> usize {
        self.all_videos().count()
    }

    pub fn find_video(&self, video_id: &str) -> Option<&Video> {
        self.all_videos().find(|v| v.id == video_id)
    }

    pub fn find_video_mut(&mut self, video_id: &str) -> Option<&mut Video> {
        if let Some(pos) = self.videos.iter().position(|v| v.id == video_id) {
            return self.videos.get_mut(pos);
        }
        self.brackets
            .iter_mut()
            .flat_map(|b| b.videos.iter_mut())
            .find(|v| v.id == video_id)
    }
}

/// An event: a competition, practice session or workshop
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// ArangoDB document ID (format: "event/{key}")
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// ArangoDB document key
    #[serde(rename = "_key", default, skip_serializing_if = "String::is_empty")]
    pub key: String,

    /// ArangoDB document revision
    #[serde(rename = "_rev", default, skip_serializing_if = "String::is_empty")]
    pub rev: String,

    pub kind: EventKind,

    /// User who created the event (format: "user/{key}")
    pub owner_id: String,

    /// Users allowed to edit the event besides the owner
    #[serde(default)]
    pub team_members: Vec<String>,

    #[validate]
    pub details: EventDetails,

    #[serde(default)]
    pub poster: Option<Image>,

    #[serde(default)]
    pub gallery: Vec<Image>,

    #[serde(default)]
    pub roles: Vec<RoleAssignment>,

    #[serde(default)]
    #[validate]
    pub sections: Vec<Section>,

    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl Event {
    /// Owner, a team member, or an admin may edit
    pub fn can_edit(&self, user_id: &str, is_admin: bool) -> bool {
        is_admin || self.owner_id == user_id || self.team_members.iter().any(|m| m == user_id)
    }

    pub fn find_section(&self, section_id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == section_id)
    }

    pub fn find_section_mut(&mut self, section_id: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.id == section_id)
    }

    /// Locate a video anywhere in the event, returning its section too
    pub fn find_video(&self, video_id: &str) -> Option<(&Section, &Video)> {
        self.sections
            .iter()
            .find_map(|s| s.find_video(video_id).map(|v| (s, v)))
    }

    /// Every video of every section, in section order
    pub fn all_videos(&self) -> impl Iterator<Item = &Video> {
        self.sections.iter().flat_map(|s| s.all_videos())
    }

    /// Poster followed by gallery images
    pub fn images(&self) -> impl Iterator<Item = &Image> {
        self.poster.iter().chain(self.gallery.iter())
    }

    /// Field-level validation plus the structural rules of the event tree
    pub fn validate_all(&self) -> Result<()> {
        self.validate()?;
        self.check_structure()
    }

    fn check_structure(&self) -> Result<()> {
        if self.details.dates.is_empty() {
            return Err(SharedError::Validation("At least one date is required".to_string()));
        }

        let mut seen = HashSet::new();
        let mut unique = |id: &str, what: &str| -> Result<()> {
            if id.is_empty() {
                return Err(SharedError::Validation(format!("{} is missing an id", what)));
            }
            if !seen.insert(id.to_string()) {
                return Err(SharedError::Validation(format!("Duplicate id {} ({})", id, what)));
            }
            Ok(())
        };

        for image in self.images() {
            unique(&image.id, "image")?;
        }

        check_roles(&self.roles, ScopeKind::Event)?;

        for section in &self.sections {
            unique(&section.id, "section")?;
            check_roles(&section.roles, ScopeKind::Section)?;

            if section.has_brackets && !section.videos.is_empty() {
                return Err(SharedError::Validation(format!(
                    "Section '{}' uses brackets and cannot hold videos directly",
                    section.title
                )));
            }
            if !section.has_brackets && !section.brackets.is_empty() {
                return Err(SharedError::Validation(format!(
                    "Section '{}' has brackets but brackets are disabled",
                    section.title
                )));
            }
            if self.kind == EventKind::Session && section.has_brackets {
                return Err(SharedError::Validation(
                    "Session sections cannot use brackets".to_string(),
                ));
            }

            for bracket in &section.brackets {
                unique(&bracket.id, "bracket")?;
            }
            for video in section.all_videos() {
                unique(&video.id, "video")?;
                check_roles(&video.roles, ScopeKind::Video)?;
            }
        }

        if self.kind == EventKind::Workshop && !self.roles.iter().any(|r| r.role == Role::Teacher) {
            return Err(SharedError::Validation(
                "A workshop needs at least one Teacher".to_string(),
            ));
        }

        Ok(())
    }
}

/// `user/{key}` with a non-empty key
pub fn is_user_id(id: &str) -> bool {
    id.strip_prefix("user/").map_or(false, |key| !key.is_empty() && !key.contains('/'))
}

fn check_roles(roles: &[RoleAssignment], scope: ScopeKind) -> Result<()> {
    for assignment in roles {
        if assignment.user_id.is_empty() {
            return Err(SharedError::Validation(format!(
                "{} role is missing a user",
                assignment.role
            )));
        }
        if !is_user_id(&assignment.user_id) {
            return Err(SharedError::Validation(format!(
                "{} is not a user id",
                assignment.user_id
            )));
        }
        if !assignment.role.allowed_in(scope) {
            return Err(SharedError::Validation(format!(
                "{} cannot be credited on a {:?}",
                assignment.role, scope
            )));
        }
    }
    Ok(())
}
