use crate::cache::{get_json, search_key, set_json, Cache};
use crate::city::repository::{CityRepository, CityRepositoryImpl};
use crate::config::SearchConfig;
use crate::error::ApiError;
use crate::user::repository::{UserRepository, UserRepositoryImpl};
use actix_web::{get, web, HttpResponse};
use shared::{CityDto, SearchQuery, UserSummary};
use std::time::Duration;
use validator::Validate;

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 25;

/// Validated term and clamped limit
fn parse(query: &SearchQuery) -> Result<(String, usize), ApiError> {
    query.validate()?;
    let term = query.term();
    if term.is_empty() {
        return Err(ApiError::bad_request("Search query cannot be empty"));
    }
    Ok((term.to_string(), query.effective_limit(DEFAULT_LIMIT, MAX_LIMIT)))
}

pub async fn search_cities_handler_impl<R: CityRepository + Clone + 'static>(
    query: web::Query<SearchQuery>,
    repo: web::Data<R>,
    cache: web::Data<dyn Cache>,
    settings: web::Data<SearchConfig>,
) -> Result<HttpResponse, ApiError> {
    let (term, limit) = parse(&query)?;
    let key = search_key("city", &term, limit);

    if let Some(hit) = get_json::<Vec<CityDto>>(cache.get_ref(), &key).await {
        return Ok(HttpResponse::Ok().json(hit));
    }

    let cities: Vec<CityDto> = repo
        .search_prefix(&term, limit)
        .await?
        .iter()
        .map(CityDto::from)
        .collect();
    set_json(
        cache.get_ref(),
        &key,
        &cities,
        Duration::from_secs(settings.cache_ttl_secs),
    )
    .await;

    Ok(HttpResponse::Ok().json(cities))
}

#[get("/search")]
pub async fn search_cities_handler(
    query: web::Query<SearchQuery>,
    repo: web::Data<CityRepositoryImpl>,
    cache: web::Data<dyn Cache>,
    settings: web::Data<SearchConfig>,
) -> Result<HttpResponse, ApiError> {
    search_cities_handler_impl(query, repo, cache, settings).await
}

pub async fn search_users_handler_impl<R: UserRepository + Clone + 'static>(
    query: web::Query<SearchQuery>,
    repo: web::Data<R>,
    cache: web::Data<dyn Cache>,
    settings: web::Data<SearchConfig>,
) -> Result<HttpResponse, ApiError> {
    let (term, limit) = parse(&query)?;
    let key = search_key("user", &term, limit);

    if let Some(hit) = get_json::<Vec<UserSummary>>(cache.get_ref(), &key).await {
        return Ok(HttpResponse::Ok().json(hit));
    }

    let users: Vec<UserSummary> = repo
        .search(&term, limit)
        .await?
        .iter()
        .map(|u| u.summary())
        .collect();
    set_json(
        cache.get_ref(),
        &key,
        &users,
        Duration::from_secs(settings.cache_ttl_secs),
    )
    .await;

    Ok(HttpResponse::Ok().json(users))
}

#[get("/search")]
pub async fn search_users_handler(
    query: web::Query<SearchQuery>,
    repo: web::Data<UserRepositoryImpl>,
    cache: web::Data<dyn Cache>,
    settings: web::Data<SearchConfig>,
) -> Result<HttpResponse, ApiError> {
    search_users_handler_impl(query, repo, cache, settings).await
}
