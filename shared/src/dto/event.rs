use crate::models::event::{
    Bracket, Event, EventDetails, EventKind, Image, Section, SectionKind, Video,
};
use crate::models::role::RoleAssignment;
use crate::organizer::VideoSlot;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Fresh id for a section, bracket, video or image
pub fn new_item_id() -> String {
    Uuid::new_v4().to_string()
}

fn keep_or_new(id: &Option<String>) -> String {
    match id {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => new_item_id(),
    }
}

/// A file sent inline as base64
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileUpload {
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
    #[validate(length(min = 1))]
    pub content_type: String,
    /// Standard base64 (padding optional)
    #[validate(length(min = 1))]
    pub data: String,
}

/// Either an image the event already has, or a new upload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImagePayload {
    Keep { id: String },
    Upload(FileUpload),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GalleryItemPayload {
    pub image: ImagePayload,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoForm {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub src: String,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub roles: Vec<RoleAssignment>,
}

impl VideoForm {
    fn build(&self) -> Video {
        Video {
            id: keep_or_new(&self.id),
            title: self.title.trim().to_string(),
            src: self.src.trim().to_string(),
            styles: self.styles.clone(),
            roles: self.roles.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BracketForm {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub videos: Vec<VideoForm>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SectionForm {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub kind: SectionKind,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub has_brackets: bool,
    #[serde(default)]
    pub brackets: Vec<BracketForm>,
    #[serde(default)]
    pub videos: Vec<VideoForm>,
    #[serde(default)]
    pub roles: Vec<RoleAssignment>,
}

impl SectionForm {
    fn build(&self) -> Section {
        Section {
            id: keep_or_new(&self.id),
            title: self.title.trim().to_string(),
            kind: self.kind,
            description: self.description.clone(),
            has_brackets: self.has_brackets,
            brackets: self
                .brackets
                .iter()
                .map(|b| Bracket {
                    id: keep_or_new(&b.id),
                    title: b.title.trim().to_string(),
                    videos: b.videos.iter().map(VideoForm::build).collect(),
                })
                .collect(),
            videos: self.videos.iter().map(VideoForm::build).collect(),
            roles: self.roles.clone(),
        }
    }
}

/// Body of the create and edit event forms (competition, session and workshop)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventFormDto {
    pub kind: EventKind,
    #[validate]
    pub details: EventDetails,
    #[serde(default)]
    #[validate(length(max = 20, message = "At most 20 team members"))]
    pub team_members: Vec<String>,
    #[serde(default)]
    pub roles: Vec<RoleAssignment>,
    #[serde(default)]
    pub sections: Vec<SectionForm>,
    #[serde(default)]
    pub poster: Option<ImagePayload>,
    #[serde(default)]
    pub gallery: Vec<GalleryItemPayload>,
}

impl EventFormDto {
    /// Sections with ids filled in. Items that carried an id keep it.
    pub fn build_sections(&self) -> Vec<Section> {
        self.sections.iter().map(SectionForm::build).collect()
    }

    /// Every upload in the form, poster first
    pub fn uploads(&self) -> Vec<&FileUpload> {
        self.poster
            .iter()
            .chain(self.gallery.iter().map(|g| &g.image))
            .filter_map(|p| match p {
                ImagePayload::Upload(upload) => Some(upload),
                ImagePayload::Keep { .. } => None,
            })
            .collect()
    }
}

/// Full event as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    pub id: String,
    pub key: String,
    pub kind: EventKind,
    pub owner_id: String,
    pub team_members: Vec<String>,
    pub details: EventDetails,
    pub poster: Option<Image>,
    pub gallery: Vec<Image>,
    pub roles: Vec<RoleAssignment>,
    pub sections: Vec<Section>,
    pub video_count: usize,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<&Event> for EventDto {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            key: event.key.clone(),
            kind: event.kind,
            owner_id: event.owner_id.clone(),
            team_members: event.team_members.clone(),
            details: event.details.clone(),
            poster: event.poster.clone(),
            gallery: event.gallery.clone(),
            roles: event.roles.clone(),
            sections: event.sections.clone(),
            video_count: event.sections.iter().map(Section::video_count).sum(),
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

/// Event card for listings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventSummaryDto {
    pub id: String,
    pub key: String,
    pub kind: EventKind,
    pub title: String,
    pub city_id: Option<String>,
    pub first_date: Option<NaiveDate>,
    pub poster_url: Option<String>,
    pub section_count: usize,
    pub video_count: usize,
}

impl From<&Event> for EventSummaryDto {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            key: event.key.clone(),
            kind: event.kind,
            title: event.details.title.clone(),
            city_id: event.details.city_id.clone(),
            first_date: event.details.first_date(),
            poster_url: event.poster.as_ref().map(|p| p.url.clone()),
            section_count: event.sections.len(),
            video_count: event.sections.iter().map(Section::video_count).sum(),
        }
    }
}

/// Filters for the event listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListQuery {
    #[serde(default)]
    pub kind: Option<EventKind>,
    #[serde(default)]
    pub city_id: Option<String>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Drag-and-drop move of a single video inside a section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoveVideoRequest {
    pub from: VideoSlot,
    pub to: VideoSlot,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReorderBracketsRequest {
    pub from: usize,
    pub to: usize,
}
