pub mod models {
    pub mod city;
    pub mod event;
    pub mod reaction;
    pub mod role;
    pub mod tagging;
    pub mod user;
}

pub mod dto {
    pub mod city;
    pub mod common;
    pub mod event;
    pub mod reaction;
    pub mod tagging;
    pub mod tv;
    pub mod user;
}

pub mod error;
pub mod organizer;
pub mod roles;
pub mod video;

// Re-export commonly used items
pub use error::{SharedError, Result};

// Re-export models
pub use models::{
    city::City,
    event::{Bracket, Event, EventDate, EventDetails, EventKind, Image, Section, SectionKind, Video},
    reaction::{ReactionKind, ReactionSet, VideoReaction},
    role::{Role, RoleAssignment, ScopeKind},
    tagging::{TagTarget, TaggingRequest, TaggingStatus},
    user::{User, UserSummary},
};

// Re-export DTOs
pub use dto::{
    city::CityDto,
    common::{ErrorResponse, PageQuery, SearchQuery},
    event::{
        EventDto, EventFormDto, EventListQuery, EventSummaryDto, FileUpload, GalleryItemPayload,
        ImagePayload, MoveVideoRequest, ReorderBracketsRequest,
    },
    reaction::{ReactRequest, UserReactionDto, VideoReactionsDto},
    tagging::{CreateTaggingRequest, TaggingDecision, TaggingRequestDto},
    tv::{TvPage, TvSectionDto, TvVideoDto},
    user::{LoginRequest, LoginResponse, RegisterRequest, UserDto},
};

pub use organizer::VideoSlot;
pub use roles::{RoleChanges, RoleScope, TaggedRole};
