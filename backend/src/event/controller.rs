use crate::error::ApiError;
use crate::event::repository::{EventRepository, EventRepositoryImpl};
use crate::event::usecase::{EventUseCase, EventUseCaseImpl};
use crate::reactions::ReactionCache;
use crate::storage::object_store::ObjectStore;
use crate::user::session::SessionUser;
use actix_web::{delete, get, post, put, web, HttpResponse};
use shared::{
    EventDto, EventFormDto, EventListQuery, EventSummaryDto, MoveVideoRequest,
    ReorderBracketsRequest,
};

fn usecase<R: EventRepository + Clone>(
    repo: &web::Data<R>,
    store: web::Data<dyn ObjectStore>,
) -> EventUseCaseImpl<R> {
    EventUseCaseImpl {
        repo: repo.get_ref().clone(),
        store: store.into_inner(),
    }
}

fn summaries(events: &[shared::Event]) -> Vec<EventSummaryDto> {
    events.iter().map(EventSummaryDto::from).collect()
}

pub async fn create_event_handler_impl<R: EventRepository + Clone + 'static>(
    user: SessionUser,
    form: web::Json<EventFormDto>,
    repo: web::Data<R>,
    store: web::Data<dyn ObjectStore>,
) -> Result<HttpResponse, ApiError> {
    let event = usecase(&repo, store).create(form.into_inner(), &user).await?;
    Ok(HttpResponse::Created().json(EventDto::from(&event)))
}

#[utoipa::path(
    post,
    path = "/api/events",
    tag = "events",
    responses(
        (status = 201, description = "Event created"),
        (status = 400, description = "Invalid form", body = ApiError),
        (status = 401, description = "Not signed in", body = ApiError)
    )
)]
#[post("")]
pub async fn create_event_handler(
    user: SessionUser,
    form: web::Json<EventFormDto>,
    repo: web::Data<EventRepositoryImpl>,
    store: web::Data<dyn ObjectStore>,
) -> Result<HttpResponse, ApiError> {
    create_event_handler_impl(user, form, repo, store).await
}

pub async fn list_events_handler_impl<R: EventRepository + Clone + 'static>(
    query: web::Query<EventListQuery>,
    repo: web::Data<R>,
    store: web::Data<dyn ObjectStore>,
) -> Result<HttpResponse, ApiError> {
    let events = usecase(&repo, store).list(&query).await?;
    Ok(HttpResponse::Ok().json(summaries(&events)))
}

#[get("")]
pub async fn list_events_handler(
    query: web::Query<EventListQuery>,
    repo: web::Data<EventRepositoryImpl>,
    store: web::Data<dyn ObjectStore>,
) -> Result<HttpResponse, ApiError> {
    list_events_handler_impl(query, repo, store).await
}

pub async fn my_events_handler_impl<R: EventRepository + Clone + 'static>(
    user: SessionUser,
    repo: web::Data<R>,
    store: web::Data<dyn ObjectStore>,
) -> Result<HttpResponse, ApiError> {
    let events = usecase(&repo, store).list_user_events(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(summaries(&events)))
}

#[get("/mine")]
pub async fn my_events_handler(
    user: SessionUser,
    repo: web::Data<EventRepositoryImpl>,
    store: web::Data<dyn ObjectStore>,
) -> Result<HttpResponse, ApiError> {
    my_events_handler_impl(user, repo, store).await
}

pub async fn user_events_handler_impl<R: EventRepository + Clone + 'static>(
    path: web::Path<String>,
    repo: web::Data<R>,
    store: web::Data<dyn ObjectStore>,
) -> Result<HttpResponse, ApiError> {
    let param = path.into_inner();
    let user_id = if param.contains('/') {
        param
    } else {
        format!("user/{}", param)
    };
    let events = usecase(&repo, store).list_user_events(&user_id).await?;
    Ok(HttpResponse::Ok().json(summaries(&events)))
}

#[get("/by-user/{user_key}")]
pub async fn user_events_handler(
    path: web::Path<String>,
    repo: web::Data<EventRepositoryImpl>,
    store: web::Data<dyn ObjectStore>,
) -> Result<HttpResponse, ApiError> {
    user_events_handler_impl(path, repo, store).await
}

pub async fn get_event_handler_impl<R: EventRepository + Clone + 'static>(
    path: web::Path<String>,
    repo: web::Data<R>,
    store: web::Data<dyn ObjectStore>,
) -> Result<HttpResponse, ApiError> {
    let event = usecase(&repo, store).get(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(EventDto::from(&event)))
}

#[get("/{key}")]
pub async fn get_event_handler(
    path: web::Path<String>,
    repo: web::Data<EventRepositoryImpl>,
    store: web::Data<dyn ObjectStore>,
) -> Result<HttpResponse, ApiError> {
    get_event_handler_impl(path, repo, store).await
}

pub async fn update_event_handler_impl<R: EventRepository + Clone + 'static>(
    user: SessionUser,
    path: web::Path<String>,
    form: web::Json<EventFormDto>,
    repo: web::Data<R>,
    store: web::Data<dyn ObjectStore>,
) -> Result<HttpResponse, ApiError> {
    let event = usecase(&repo, store)
        .update(&path.into_inner(), form.into_inner(), &user)
        .await?;
    Ok(HttpResponse::Ok().json(EventDto::from(&event)))
}

#[utoipa::path(
    put,
    path = "/api/events/{key}",
    tag = "events",
    params(("key" = String, Path, description = "Event key")),
    responses(
        (status = 200, description = "Event updated"),
        (status = 403, description = "Not an editor", body = ApiError),
        (status = 404, description = "No such event", body = ApiError),
        (status = 409, description = "Edited concurrently", body = ApiError)
    )
)]
#[put("/{key}")]
pub async fn update_event_handler(
    user: SessionUser,
    path: web::Path<String>,
    form: web::Json<EventFormDto>,
    repo: web::Data<EventRepositoryImpl>,
    store: web::Data<dyn ObjectStore>,
) -> Result<HttpResponse, ApiError> {
    update_event_handler_impl(user, path, form, repo, store).await
}

pub async fn delete_event_handler_impl<R: EventRepository + Clone + 'static>(
    user: SessionUser,
    path: web::Path<String>,
    repo: web::Data<R>,
    store: web::Data<dyn ObjectStore>,
    reactions: web::Data<ReactionCache>,
) -> Result<HttpResponse, ApiError> {
    let event = usecase(&repo, store).delete(&path.into_inner(), &user).await?;
    let video_ids: Vec<String> = event.all_videos().map(|v| v.id.clone()).collect();
    reactions.invalidate(&video_ids).await;
    Ok(HttpResponse::NoContent().finish())
}

#[delete("/{key}")]
pub async fn delete_event_handler(
    user: SessionUser,
    path: web::Path<String>,
    repo: web::Data<EventRepositoryImpl>,
    store: web::Data<dyn ObjectStore>,
    reactions: web::Data<ReactionCache>,
) -> Result<HttpResponse, ApiError> {
    delete_event_handler_impl(user, path, repo, store, reactions).await
}

pub async fn move_video_handler_impl<R: EventRepository + Clone + 'static>(
    user: SessionUser,
    path: web::Path<(String, String)>,
    request: web::Json<MoveVideoRequest>,
    repo: web::Data<R>,
    store: web::Data<dyn ObjectStore>,
) -> Result<HttpResponse, ApiError> {
    let (key, section_id) = path.into_inner();
    let event = usecase(&repo, store)
        .move_video(&key, &section_id, &request, &user)
        .await?;
    Ok(HttpResponse::Ok().json(EventDto::from(&event)))
}

#[post("/{key}/sections/{section_id}/move-video")]
pub async fn move_video_handler(
    user: SessionUser,
    path: web::Path<(String, String)>,
    request: web::Json<MoveVideoRequest>,
    repo: web::Data<EventRepositoryImpl>,
    store: web::Data<dyn ObjectStore>,
) -> Result<HttpResponse, ApiError> {
    move_video_handler_impl(user, path, request, repo, store).await
}

pub async fn reorder_brackets_handler_impl<R: EventRepository + Clone + 'static>(
    user: SessionUser,
    path: web::Path<(String, String)>,
    request: web::Json<ReorderBracketsRequest>,
    repo: web::Data<R>,
    store: web::Data<dyn ObjectStore>,
) -> Result<HttpResponse, ApiError> {
    let (key, section_id) = path.into_inner();
    let event = usecase(&repo, store)
        .reorder_brackets(&key, &section_id, &request, &user)
        .await?;
    Ok(HttpResponse::Ok().json(EventDto::from(&event)))
}

#[post("/{key}/sections/{section_id}/reorder-brackets")]
pub async fn reorder_brackets_handler(
    user: SessionUser,
    path: web::Path<(String, String)>,
    request: web::Json<ReorderBracketsRequest>,
    repo: web::Data<EventRepositoryImpl>,
    store: web::Data<dyn ObjectStore>,
) -> Result<HttpResponse, ApiError> {
    reorder_brackets_handler_impl(user, path, request, repo, store).await
}
