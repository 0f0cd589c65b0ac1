use crate::error::ApiError;
use crate::event::repository::{event_id, EventRepository, EventRepositoryImpl};
use actix_web::{get, web, HttpResponse};
use shared::{PageQuery, TvPage, TvSectionDto};

pub const DEFAULT_SECTIONS: usize = 5;
pub const MAX_SECTIONS: usize = 20;
/// Events fetched per round trip while filling a page
const EVENT_BATCH: usize = 10;

/// Sections `offset..offset + limit` of the feed, newest event first
pub async fn section_page<R: EventRepository>(
    repo: &R,
    offset: usize,
    limit: usize,
) -> Result<TvPage, ApiError> {
    let end = offset
        .checked_add(limit)
        .filter(|end| *end < usize::MAX)
        .ok_or_else(|| ApiError::bad_request("Offset is too large"))?;
    // One extra section tells whether another page exists
    let wanted = end + 1;
    let mut sections: Vec<TvSectionDto> = Vec::new();
    let mut event_offset = 0;

    while sections.len() < wanted {
        let events = repo.list_with_videos(event_offset, EVENT_BATCH).await?;
        for event in &events {
            sections.extend(TvSectionDto::from_event(event));
        }
        if events.len() < EVENT_BATCH {
            break;
        }
        event_offset += EVENT_BATCH;
    }

    let has_more = sections.len() > end;
    let sections: Vec<TvSectionDto> = sections.into_iter().skip(offset).take(limit).collect();
    Ok(TvPage {
        sections,
        next_offset: has_more.then_some(end),
    })
}

pub async fn tv_sections_handler_impl<R: EventRepository + 'static>(
    query: web::Query<PageQuery>,
    repo: web::Data<R>,
) -> Result<HttpResponse, ApiError> {
    let limit = query.limit(DEFAULT_SECTIONS, MAX_SECTIONS);
    let page = section_page(repo.get_ref(), query.offset(), limit).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/tv/sections",
    tag = "tv",
    params(
        ("offset" = Option<usize>, Query, description = "Sections to skip"),
        ("limit" = Option<usize>, Query, description = "Page size, at most 20")
    ),
    responses(
        (status = 200, description = "A page of playable sections"),
        (status = 400, description = "Offset out of range", body = ApiError)
    )
)]
#[get("/sections")]
pub async fn tv_sections_handler(
    query: web::Query<PageQuery>,
    repo: web::Data<EventRepositoryImpl>,
) -> Result<HttpResponse, ApiError> {
    tv_sections_handler_impl(query, repo).await
}

pub async fn tv_event_handler_impl<R: EventRepository + 'static>(
    path: web::Path<String>,
    repo: web::Data<R>,
) -> Result<HttpResponse, ApiError> {
    let id = event_id(&path.into_inner());
    let event = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(&format!("Event {} not found", id)))?;
    Ok(HttpResponse::Ok().json(TvPage {
        sections: TvSectionDto::from_event(&event),
        next_offset: None,
    }))
}

#[get("/events/{key}")]
pub async fn tv_event_handler(
    path: web::Path<String>,
    repo: web::Data<EventRepositoryImpl>,
) -> Result<HttpResponse, ApiError> {
    tv_event_handler_impl(path, repo).await
}
