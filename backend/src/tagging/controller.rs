use crate::error::ApiError;
use crate::event::repository::{EventRepository, EventRepositoryImpl};
use crate::tagging::repository::{TaggingRepository, TaggingRepositoryImpl};
use crate::tagging::usecase::{TaggingUseCase, TaggingUseCaseImpl};
use crate::user::repository::{UserRepository, UserRepositoryImpl};
use crate::user::session::SessionUser;
use actix_web::{get, post, web, HttpResponse};
use shared::{CreateTaggingRequest, TaggingDecision, TaggingRequest, TaggingRequestDto};

fn usecase<T, E, U>(
    tags: &web::Data<T>,
    events: &web::Data<E>,
    users: &web::Data<U>,
) -> TaggingUseCaseImpl<T, E, U>
where
    T: TaggingRepository + Clone,
    E: EventRepository + Clone,
    U: UserRepository + Clone,
{
    TaggingUseCaseImpl {
        tags: tags.get_ref().clone(),
        events: events.get_ref().clone(),
        users: users.get_ref().clone(),
    }
}

fn dtos(requests: &[TaggingRequest]) -> Vec<TaggingRequestDto> {
    requests.iter().map(TaggingRequestDto::from).collect()
}

pub async fn request_tag_handler_impl<T, E, U>(
    user: SessionUser,
    body: web::Json<CreateTaggingRequest>,
    tags: web::Data<T>,
    events: web::Data<E>,
    users: web::Data<U>,
) -> Result<HttpResponse, ApiError>
where
    T: TaggingRepository + Clone + 'static,
    E: EventRepository + Clone + 'static,
    U: UserRepository + Clone + 'static,
{
    let request = usecase(&tags, &events, &users)
        .request_tag(body.into_inner(), &user)
        .await?;
    Ok(HttpResponse::Created().json(TaggingRequestDto::from(&request)))
}

#[utoipa::path(
    post,
    path = "/api/tagging",
    tag = "tagging",
    responses(
        (status = 201, description = "Request stored, applied at once for editors"),
        (status = 400, description = "Role not allowed on the target", body = ApiError),
        (status = 404, description = "Unknown event, section, video or user", body = ApiError),
        (status = 409, description = "Already credited or already pending", body = ApiError)
    )
)]
#[post("")]
pub async fn request_tag_handler(
    user: SessionUser,
    body: web::Json<CreateTaggingRequest>,
    tags: web::Data<TaggingRepositoryImpl>,
    events: web::Data<EventRepositoryImpl>,
    users: web::Data<UserRepositoryImpl>,
) -> Result<HttpResponse, ApiError> {
    request_tag_handler_impl(user, body, tags, events, users).await
}

pub async fn my_requests_handler_impl<T, E, U>(
    user: SessionUser,
    tags: web::Data<T>,
    events: web::Data<E>,
    users: web::Data<U>,
) -> Result<HttpResponse, ApiError>
where
    T: TaggingRepository + Clone + 'static,
    E: EventRepository + Clone + 'static,
    U: UserRepository + Clone + 'static,
{
    let requests = usecase(&tags, &events, &users).list_mine(&user).await?;
    Ok(HttpResponse::Ok().json(dtos(&requests)))
}

#[get("/mine")]
pub async fn my_requests_handler(
    user: SessionUser,
    tags: web::Data<TaggingRepositoryImpl>,
    events: web::Data<EventRepositoryImpl>,
    users: web::Data<UserRepositoryImpl>,
) -> Result<HttpResponse, ApiError> {
    my_requests_handler_impl(user, tags, events, users).await
}

pub async fn pending_requests_handler_impl<T, E, U>(
    user: SessionUser,
    path: web::Path<String>,
    tags: web::Data<T>,
    events: web::Data<E>,
    users: web::Data<U>,
) -> Result<HttpResponse, ApiError>
where
    T: TaggingRepository + Clone + 'static,
    E: EventRepository + Clone + 'static,
    U: UserRepository + Clone + 'static,
{
    let requests = usecase(&tags, &events, &users)
        .list_pending(&path.into_inner(), &user)
        .await?;
    Ok(HttpResponse::Ok().json(dtos(&requests)))
}

#[get("/events/{key}/pending")]
pub async fn pending_requests_handler(
    user: SessionUser,
    path: web::Path<String>,
    tags: web::Data<TaggingRepositoryImpl>,
    events: web::Data<EventRepositoryImpl>,
    users: web::Data<UserRepositoryImpl>,
) -> Result<HttpResponse, ApiError> {
    pending_requests_handler_impl(user, path, tags, events, users).await
}

pub async fn decide_handler_impl<T, E, U>(
    user: SessionUser,
    path: web::Path<String>,
    decision: web::Json<TaggingDecision>,
    tags: web::Data<T>,
    events: web::Data<E>,
    users: web::Data<U>,
) -> Result<HttpResponse, ApiError>
where
    T: TaggingRepository + Clone + 'static,
    E: EventRepository + Clone + 'static,
    U: UserRepository + Clone + 'static,
{
    let request = usecase(&tags, &events, &users)
        .decide(&path.into_inner(), decision.approve, &user)
        .await?;
    Ok(HttpResponse::Ok().json(TaggingRequestDto::from(&request)))
}

#[utoipa::path(
    post,
    path = "/api/tagging/{key}/decision",
    tag = "tagging",
    params(("key" = String, Path, description = "Tagging request key")),
    responses(
        (status = 200, description = "Request approved or denied"),
        (status = 403, description = "Not an editor of the event", body = ApiError),
        (status = 409, description = "Already decided", body = ApiError)
    )
)]
#[post("/{key}/decision")]
pub async fn decide_handler(
    user: SessionUser,
    path: web::Path<String>,
    decision: web::Json<TaggingDecision>,
    tags: web::Data<TaggingRepositoryImpl>,
    events: web::Data<EventRepositoryImpl>,
    users: web::Data<UserRepositoryImpl>,
) -> Result<HttpResponse, ApiError> {
    decide_handler_impl(user, path, decision, tags, events, users).await
}
