use crate::error::ApiError;
use crate::event::repository::{event_id, EventRepository};
use crate::tagging::repository::TaggingRepository;
use crate::user::repository::UserRepository;
use crate::user::session::SessionUser;
use chrono::Utc;
use log::info;
use shared::{CreateTaggingRequest, Event, TaggedRole, TaggingRequest, TaggingStatus};
use validator::Validate;

#[async_trait::async_trait]
pub trait TaggingUseCase: Send + Sync {
    async fn request_tag(
        &self,
        request: CreateTaggingRequest,
        user: &SessionUser,
    ) -> Result<TaggingRequest, ApiError>;
    async fn list_pending(&self, event_id: &str, user: &SessionUser) -> Result<Vec<TaggingRequest>, ApiError>;
    async fn list_mine(&self, user: &SessionUser) -> Result<Vec<TaggingRequest>, ApiError>;
    async fn decide(
        &self,
        request_id: &str,
        approve: bool,
        user: &SessionUser,
    ) -> Result<TaggingRequest, ApiError>;
}

pub struct TaggingUseCaseImpl<T: TaggingRepository, E: EventRepository, U: UserRepository> {
    pub tags: T,
    pub events: E,
    pub users: U,
}

impl<T, E, U> TaggingUseCaseImpl<T, E, U>
where
    T: TaggingRepository,
    E: EventRepository,
    U: UserRepository,
{
    async fn load_event(&self, id: &str) -> Result<Event, ApiError> {
        self.events
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found(&format!("Event {} not found", event_id(id))))
    }

    /// Credit the request's user on the event and record the edge.
    /// Returns false when the credit already existed.
    async fn credit(&self, mut event: Event, request: &TaggingRequest) -> Result<bool, ApiError> {
        if !request.target.apply(&mut event, request.role, &request.user_id)? {
            return Ok(false);
        }
        event.updated_at = Utc::now().fixed_offset();
        let event = self.events.replace(event).await?;
        let edge = TaggedRole {
            user_id: request.user_id.clone(),
            role: request.role,
            scope: request.target.to_scope(),
        };
        self.events.add_edges(&event.id, &[edge]).await?;
        Ok(true)
    }
}

#[async_trait::async_trait]
impl<T, E, U> TaggingUseCase for TaggingUseCaseImpl<T, E, U>
where
    T: TaggingRepository,
    E: EventRepository,
    U: UserRepository,
{
    async fn request_tag(
        &self,
        request: CreateTaggingRequest,
        user: &SessionUser,
    ) -> Result<TaggingRequest, ApiError> {
        request.validate()?;
        let event = self.load_event(&request.event_id).await?;
        let tagged_user = request
            .user_id
            .clone()
            .unwrap_or_else(|| user.user_id.clone());

        if self.users.find_by_id(&tagged_user).await?.is_none() {
            return Err(ApiError::not_found(&format!("User {} not found", tagged_user)));
        }
        request.target.check(&event, request.role)?;
        if request.target.has_role(&event, request.role, &tagged_user)? {
            return Err(ApiError::conflict("That role is already credited"));
        }
        if self
            .tags
            .find_pending_claim(&event.id, &request.target, request.role, &tagged_user)
            .await?
            .is_some()
        {
            return Err(ApiError::conflict("An identical request is already pending"));
        }

        let now = Utc::now().fixed_offset();
        let mut tagging = TaggingRequest {
            id: String::new(),
            key: String::new(),
            rev: String::new(),
            event_id: event.id.clone(),
            target: request.target.clone(),
            role: request.role,
            user_id: tagged_user,
            requested_by: user.user_id.clone(),
            status: TaggingStatus::Pending,
            created_at: now,
            decided_at: None,
            decided_by: None,
        };

        if event.can_edit(&user.user_id, user.is_admin) {
            self.credit(event, &tagging).await?;
            tagging.status = TaggingStatus::Approved;
            tagging.decided_at = Some(now);
            tagging.decided_by = Some(user.user_id.clone());
            info!(
                "{} credited {} as {} on {}",
                user.user_id, tagging.user_id, tagging.role, tagging.event_id
            );
        } else {
            info!(
                "{} asked to credit {} as {} on {}",
                user.user_id, tagging.user_id, tagging.role, tagging.event_id
            );
        }
        Ok(self.tags.insert(tagging).await?)
    }

    async fn list_pending(&self, event_id: &str, user: &SessionUser) -> Result<Vec<TaggingRequest>, ApiError> {
        let event = self.load_event(event_id).await?;
        if !event.can_edit(&user.user_id, user.is_admin) {
            return Err(ApiError::forbidden("Only editors can review requests"));
        }
        Ok(self.tags.list_pending(&event.id).await?)
    }

    async fn list_mine(&self, user: &SessionUser) -> Result<Vec<TaggingRequest>, ApiError> {
        Ok(self.tags.list_for_user(&user.user_id).await?)
    }

    async fn decide(
        &self,
        request_id: &str,
        approve: bool,
        user: &SessionUser,
    ) -> Result<TaggingRequest, ApiError> {
        let mut request = self
            .tags
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| ApiError::not_found(&format!("Tagging request {} not found", request_id)))?;
        let event = self.load_event(&request.event_id).await?;
        if !event.can_edit(&user.user_id, user.is_admin) {
            return Err(ApiError::forbidden("Only editors can decide requests"));
        }
        if !request.is_pending() {
            return Err(ApiError::conflict("The request was already decided"));
        }

        if approve {
            // The target may have disappeared since the request was made
            request.target.check(&event, request.role)?;
            if !self.credit(event, &request).await? {
                info!("{} already credited for {}", request.user_id, request.id);
            }
        }
        request.status = if approve {
            TaggingStatus::Approved
        } else {
            TaggingStatus::Denied
        };
        request.decided_at = Some(Utc::now().fixed_offset());
        request.decided_by = Some(user.user_id.clone());
        info!("{} {:?} tagging request {}", user.user_id, request.status, request.id);
        Ok(self.tags.update(request).await?)
    }
}
