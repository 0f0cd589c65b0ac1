use super::object_store::{content_type_for, ObjectStore};
use crate::error::ApiError;
use actix_web::{get, http::header, web, HttpResponse};

/// Serve a stored object. Used when objects live on the local filesystem.
#[get("/media/{key:.*}")]
pub async fn media_handler(
    key: web::Path<String>,
    store: web::Data<dyn ObjectStore>,
) -> Result<HttpResponse, ApiError> {
    let key = key.into_inner();
    let bytes = store.get(&key).await?;
    Ok(HttpResponse::Ok()
        .content_type(content_type_for(&key))
        .insert_header((header::CACHE_CONTROL, "public, max-age=31536000, immutable"))
        .body(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MemoryStore;
    use actix_web::{test, App};
    use std::sync::Arc;

    #[actix_web::test]
    async fn serves_stored_bytes_with_content_type() {
        let store = Arc::new(MemoryStore::default());
        store.put("events/1/a.png", b"img".to_vec(), "image/png").await.unwrap();
        let data: web::Data<dyn ObjectStore> = web::Data::from(store as Arc<dyn ObjectStore>);

        let app = test::init_service(App::new().app_data(data).service(media_handler)).await;

        let req = test::TestRequest::get().uri("/media/events/1/a.png").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(resp.headers().get("content-type").unwrap(), "image/png");
        assert_eq!(test::read_body(resp).await.as_ref(), b"img");

        let req = test::TestRequest::get().uri("/media/events/1/missing.png").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 404);

        let req = test::TestRequest::get().uri("/media/events/../x.png").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_client_error());
    }
}
