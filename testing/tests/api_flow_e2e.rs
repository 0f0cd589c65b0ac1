//! End-to-end flows through the full route table against real containers

use actix_web::{http::header, test, App};
use backend::app::configure;
use backend::city::repository::{CityRepository, CityRepositoryImpl};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use shared::models::city::City;
use shared::{
    CityDto, EventDto, EventSummaryDto, LoginResponse, ReactionKind, TaggingRequestDto,
    TaggingStatus, TvPage, UserSummary, VideoReactionsDto,
};
use testing::app_setup::setup_test_app;
use testing::TestEnvironment;

fn register_body(name: &str) -> Value {
    json!({
        "username": name,
        "displayName": name.to_uppercase(),
        "email": format!("{}@example.com", name),
        "password": "correct-horse-battery"
    })
}

fn event_form() -> Value {
    json!({
        "kind": "competition",
        "details": { "title": "Summer Throwdown", "dates": [{ "date": "2026-07-11" }] },
        "sections": [{
            "id": "top16",
            "title": "Top 16",
            "kind": "battle",
            "videos": [
                { "id": "r1", "title": "Round 1", "src": "https://youtu.be/dQw4w9WgXcQ" },
                { "id": "r2", "title": "Round 2", "src": "https://youtu.be/dQw4w9WgXcQ" }
            ]
        }]
    })
}

fn bearer(session_id: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", session_id))
}

#[test_log::test(actix_web::test)]
async fn register_create_tag_react_and_watch() {
    let env = TestEnvironment::new().await.expect("test environment");
    let test_app = setup_test_app(&env).await.expect("app state");
    let state = test_app.state.clone();
    let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

    // Accounts
    let mut sessions = Vec::new();
    for name in ["owner", "dancer"] {
        let req = test::TestRequest::post()
            .uri("/api/users/register")
            .set_json(register_body(name))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 201, "register {}", name);
        let login: LoginResponse = test::read_body_json(resp).await;
        sessions.push(login);
    }
    let (owner, dancer) = (&sessions[0], &sessions[1]);

    let req = test::TestRequest::get().uri("/api/events").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);

    // Event
    let req = test::TestRequest::post()
        .uri("/api/events")
        .insert_header(bearer(&owner.session_id))
        .set_json(event_form())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 201);
    let event: EventDto = test::read_body_json(resp).await;
    assert_eq!(event.owner_id, owner.user.id);
    assert_eq!(event.video_count, 2);
    let video_id = event.sections[0].videos[0].id.clone();

    // Dancer asks for a credit, owner approves
    let req = test::TestRequest::post()
        .uri("/api/tagging")
        .insert_header(bearer(&dancer.session_id))
        .set_json(json!({
            "eventId": event.id,
            "target": { "type": "video", "sectionId": event.sections[0].id, "videoId": video_id },
            "role": "Dancer"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 201);
    let request: TaggingRequestDto = test::read_body_json(resp).await;
    assert_eq!(request.status, TaggingStatus::Pending);

    let req = test::TestRequest::get()
        .uri(&format!("/api/tagging/events/{}/pending", event.key))
        .insert_header(bearer(&owner.session_id))
        .to_request();
    let pending: Vec<TaggingRequestDto> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(pending.len(), 1);

    let request_key = request.id.rsplit('/').next().unwrap_or_default().to_string();
    let req = test::TestRequest::post()
        .uri(&format!("/api/tagging/{}/decision", request_key))
        .insert_header(bearer(&dancer.session_id))
        .set_json(json!({ "approve": true }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403, "only the owner decides");

    let req = test::TestRequest::post()
        .uri(&format!("/api/tagging/{}/decision", request_key))
        .insert_header(bearer(&owner.session_id))
        .set_json(json!({ "approve": true }))
        .to_request();
    let decided: TaggingRequestDto = test::call_and_read_body_json(&app, req).await;
    assert_eq!(decided.status, TaggingStatus::Approved);
    assert_eq!(decided.decided_by.as_deref(), Some(owner.user.id.as_str()));

    let req = test::TestRequest::get()
        .uri("/api/events/mine")
        .insert_header(bearer(&dancer.session_id))
        .to_request();
    let mine: Vec<EventSummaryDto> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(mine.len(), 1);

    // Reactions stay pending until flushed
    let req = test::TestRequest::put()
        .uri(&format!("/api/videos/{}/reactions", video_id))
        .insert_header(bearer(&dancer.session_id))
        .set_json(json!({ "kind": "fire", "timestamp": 17.25 }))
        .to_request();
    let reactions: VideoReactionsDto = test::call_and_read_body_json(&app, req).await;
    assert_eq!(reactions.mine.fire, Some(17.25));

    let stats = test_app.state.batcher.flush_now().await.expect("flush");
    assert_eq!(stats.written, 1);

    let req = test::TestRequest::get()
        .uri(&format!("/api/videos/{}/reactions", video_id))
        .insert_header(bearer(&owner.session_id))
        .to_request();
    let reactions: VideoReactionsDto = test::call_and_read_body_json(&app, req).await;
    assert!(reactions.mine.is_empty());
    assert_eq!(reactions.others.len(), 1);
    assert_eq!(reactions.totals[&ReactionKind::Fire], 1);

    // TV feed
    let req = test::TestRequest::get()
        .uri("/api/tv/sections?limit=5")
        .insert_header(bearer(&dancer.session_id))
        .to_request();
    let page: TvPage = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page.sections.len(), 1);
    assert_eq!(page.sections[0].videos.len(), 2);
    assert_eq!(page.next_offset, None);

    // Owner deletes; reactions and credits go with the event
    let req = test::TestRequest::delete()
        .uri(&format!("/api/events/{}", event.key))
        .insert_header(bearer(&owner.session_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 204);

    let req = test::TestRequest::get()
        .uri(&format!("/api/videos/{}/reactions", video_id))
        .insert_header(bearer(&owner.session_id))
        .to_request();
    let reactions: VideoReactionsDto = test::call_and_read_body_json(&app, req).await;
    assert!(reactions.others.is_empty());
}

#[test_log::test(actix_web::test)]
async fn search_cities_and_users() {
    let env = TestEnvironment::new().await.expect("test environment");
    let test_app = setup_test_app(&env).await.expect("app state");
    let state = test_app.state.clone();

    let cities = CityRepositoryImpl::new(state.db.get_ref().clone());
    for (name, population) in [("Berlin", 3_600_000), ("Bern", 134_000), ("Paris", 2_100_000)] {
        cities
            .create(City {
                id: String::new(),
                rev: String::new(),
                name: name.to_string(),
                region: String::new(),
                country_code: "XX".to_string(),
                population,
                timezone: "Europe/Berlin".to_string(),
            })
            .await
            .expect("city");
    }

    let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;
    let req = test::TestRequest::post()
        .uri("/api/users/register")
        .set_json(register_body("bboy_lee"))
        .to_request();
    let login: LoginResponse = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::get()
        .uri("/api/cities/search?q=ber")
        .insert_header(bearer(&login.session_id))
        .to_request();
    let found: Vec<CityDto> = test::call_and_read_body_json(&app, req).await;
    let names: Vec<&str> = found.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Berlin", "Bern"]);

    let req = test::TestRequest::get()
        .uri("/api/users/search?q=lee")
        .insert_header(bearer(&login.session_id))
        .to_request();
    let users: Vec<UserSummary> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "bboy_lee");

    let req = test::TestRequest::get()
        .uri("/api/cities/search?q=")
        .insert_header(bearer(&login.session_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
}
