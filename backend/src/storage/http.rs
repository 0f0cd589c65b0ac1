use super::object_store::{public_url, validate_key, ObjectStore, StorageError, StorageResult, StoredObject};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

/// S3/R2-compatible gateway reached over plain HTTP with a bearer token
pub struct HttpStore {
    http: reqwest::Client,
    endpoint: String,
    bucket: String,
    token: Option<String>,
    public_url: String,
}

impl HttpStore {
    pub fn new(endpoint: &str, bucket: &str, token: Option<String>, public_url: &str) -> StorageResult<Self> {
        url::Url::parse(endpoint)
            .map_err(|e| StorageError::Config(format!("invalid storage endpoint {}: {}", endpoint, e)))?;
        if bucket.trim().is_empty() {
            return Err(StorageError::Config("storage bucket is empty".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StorageError::Config(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            token,
            public_url: public_url.to_string(),
        })
    }

    /// `{endpoint}/{bucket}/{key}` with each key segment percent-encoded
    fn object_url(&self, key: &str) -> StorageResult<String> {
        validate_key(key)?;
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        Ok(format!("{}/{}/{}", self.endpoint, self.bucket, encoded.join("/")))
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> StorageResult<reqwest::Response> {
        self.authorize(req)
            .send()
            .await
            .map_err(|e| StorageError::Gateway(e.to_string()))
    }

    async fn failure(key: &str, response: reqwest::Response) -> StorageError {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return StorageError::NotFound(key.to_string());
        }
        let body = response.text().await.unwrap_or_default();
        StorageError::Gateway(format!("{} for {}: {}", status, key, body))
    }
}

#[async_trait]
impl ObjectStore for HttpStore {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<StoredObject> {
        let url = self.object_url(key)?;
        let response = self
            .send(
                self.http
                    .put(url)
                    .header(reqwest::header::CONTENT_TYPE, content_type)
                    .body(data),
            )
            .await?;
        if !response.status().is_success() {
            return Err(Self::failure(key, response).await);
        }
        Ok(StoredObject {
            key: key.to_string(),
            url: public_url(&self.public_url, key),
        })
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let url = self.object_url(key)?;
        let response = self.send(self.http.get(url)).await?;
        if !response.status().is_success() {
            return Err(Self::failure(key, response).await);
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::Gateway(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let url = self.object_url(key)?;
        let response = self.send(self.http.delete(url)).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::failure(key, response).await)
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let url = self.object_url(key)?;
        let response = self.send(self.http.head(url)).await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::failure(key, response).await),
        }
    }

    async fn health(&self) -> StorageResult<()> {
        let url = format!("{}/{}", self.endpoint, self.bucket);
        let response = self.send(self.http.head(url)).await?;
        // Any answer from the gateway other than a server error counts as reachable
        if response.status().is_server_error() {
            return Err(StorageError::Gateway(format!(
                "gateway unhealthy: {}",
                response.status()
            )));
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn object_url_encodes_segments() {
        let store = HttpStore::new("https://gw.example.com/", "media", None, "https://cdn").unwrap();
        assert_eq!(
            store.object_url("events/1/my poster.png").unwrap(),
            "https://gw.example.com/media/events/1/my%20poster.png"
        );
        assert!(store.object_url("../x").is_err());
    }

    #[test]
    fn rejects_bad_configuration() {
        assert!(matches!(
            HttpStore::new("not a url", "media", None, "https://cdn"),
            Err(StorageError::Config(_))
        ));
        assert!(matches!(
            HttpStore::new("https://gw", " ", None, "https://cdn"),
            Err(StorageError::Config(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_gateway_is_a_gateway_error() {
        let store = HttpStore::new("http://127.0.0.1:1", "media", Some("t".into()), "https://cdn").unwrap();
        assert!(matches!(
            store.put("events/1/a.png", vec![1], "image/png").await,
            Err(StorageError::Gateway(_))
        ));
        assert!(store.health().await.is_err());
    }
}
