use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use url::Url;

use super::PersistenceProvider;
use crate::auth::Token;
use crate::error::{ConfigError, PersistError, PersistFailure};
use crate::feed;
use crate::status::Project;

pub const DEFAULT_PUT_TIMEOUT: Duration = Duration::from_secs(15);

/// Canned access control applied to an uploaded object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectAcl {
    Private,
    PublicRead,
}

impl ObjectAcl {
    pub fn as_header(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::PublicRead => "public-read",
        }
    }
}

/// A complete object body addressed by bucket and key.
#[derive(Debug, Clone)]
pub struct PutObject {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: &'static str,
    pub acl: ObjectAcl,
}

/// Object storage that replaces an object's contents in a single request.
///
/// A put either stores the whole body or fails; the previous object stays
/// readable until the new one is complete.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, object: PutObject) -> Result<(), PersistFailure>;
}

/// S3-compatible object store reached over plain HTTP with path-style URLs.
pub struct HttpObjectStore {
    client: Client,
    endpoint: Url,
    token: Option<Token>,
}

impl HttpObjectStore {
    pub fn new(endpoint: &str, token: Option<Token>) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .user_agent(concat!("cctray/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::Invalid {
                name: "s3.endpoint",
                reason: format!("failed to create HTTP client: {e}"),
            })?;

        let endpoint = Url::parse(endpoint).map_err(|e| ConfigError::Invalid {
            name: "s3.endpoint",
            reason: e.to_string(),
        })?;

        if endpoint.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                name: "s3.endpoint",
                reason: format!("{endpoint} cannot be used as a base URL"),
            });
        }

        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    /// `{endpoint}/{bucket}/{key}`, each key segment percent-encoded.
    fn object_url(&self, bucket: &str, key: &str) -> Result<Url, PersistFailure> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| PersistFailure::InvalidAddress(self.endpoint.to_string()))?
            .pop_if_empty()
            .push(bucket)
            .extend(key.split('/'));
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put_object(&self, object: PutObject) -> Result<(), PersistFailure> {
        let url = self.object_url(&object.bucket, &object.key)?;
        debug!("PUT {url} ({} bytes)", object.body.len());

        let request = self
            .client
            .put(url)
            .header("x-amz-acl", object.acl.as_header())
            .header(CONTENT_TYPE, object.content_type)
            .body(object.body);
        let response = self.auth_request(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(PersistFailure::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}

/// Persists the feed as an object at a fixed bucket and key, publicly
/// readable unless configured otherwise.
pub struct ObjectStoreProvider {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    key: String,
    acl: ObjectAcl,
    timeout: Duration,
}

impl ObjectStoreProvider {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: String, key: String) -> Self {
        Self {
            store,
            bucket,
            key,
            acl: ObjectAcl::PublicRead,
            timeout: DEFAULT_PUT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_acl(mut self, acl: ObjectAcl) -> Self {
        self.acl = acl;
        self
    }
}

#[async_trait]
impl PersistenceProvider for ObjectStoreProvider {
    async fn persist_projects(&self, projects: &[Project]) -> Result<(), PersistError> {
        let body = feed::encode_to_vec(projects).map_err(|e| PersistError::new(self.target(), e))?;

        let object = PutObject {
            bucket: self.bucket.clone(),
            key: self.key.clone(),
            body,
            content_type: feed::CONTENT_TYPE,
            acl: self.acl,
        };

        match tokio::time::timeout(self.timeout, self.store.put_object(object)).await {
            Ok(Ok(())) => {
                debug!("Uploaded feed to {}", self.target());
                Ok(())
            }
            Ok(Err(failure)) => Err(PersistError::new(self.target(), failure)),
            Err(_) => Err(PersistError::new(
                self.target(),
                PersistFailure::Timeout(self.timeout),
            )),
        }
    }

    fn target(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{Activity, LastBuildStatus};
    use chrono::{TimeZone, Utc};
    use mockito::Matcher;

    fn projects() -> Vec<Project> {
        vec![Project {
            name: "demo".to_string(),
            last_build_status: LastBuildStatus::Failure,
            activity: Activity::Sleeping,
            last_build_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }]
    }

    fn provider(server: &mockito::ServerGuard, token: Option<Token>) -> ObjectStoreProvider {
        let store = HttpObjectStore::new(&server.url(), token).unwrap();
        ObjectStoreProvider::new(
            Arc::new(store),
            "status-feeds".to_string(),
            "ci/cctray.xml".to_string(),
        )
    }

    struct StalledStore;

    #[async_trait]
    impl ObjectStore for StalledStore {
        async fn put_object(&self, _object: PutObject) -> Result<(), PersistFailure> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_put_uploads_complete_feed_with_public_read() {
        let mut server = mockito::Server::new_async().await;
        let body = String::from_utf8(feed::encode_to_vec(&projects()).unwrap()).unwrap();
        let mock = server
            .mock("PUT", "/status-feeds/ci/cctray.xml")
            .match_header("x-amz-acl", "public-read")
            .match_header("content-type", "application/xml")
            .match_body(Matcher::Exact(body))
            .with_status(200)
            .create_async()
            .await;

        let result = provider(&server, None).persist_projects(&projects()).await;

        tokio_test::assert_ok!(result);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_put_sends_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/status-feeds/ci/cctray.xml")
            .match_header("authorization", "Bearer upload-token")
            .with_status(200)
            .create_async()
            .await;

        provider(&server, Some(Token::from("upload-token")))
            .persist_projects(&projects())
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_private_acl_is_forwarded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/status-feeds/ci/cctray.xml")
            .match_header("x-amz-acl", "private")
            .with_status(200)
            .create_async()
            .await;

        provider(&server, None)
            .with_acl(ObjectAcl::Private)
            .persist_projects(&projects())
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_upload_surfaces_status_and_target() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/status-feeds/ci/cctray.xml")
            .with_status(403)
            .with_body("AccessDenied")
            .create_async()
            .await;

        let err = provider(&server, None)
            .persist_projects(&projects())
            .await
            .unwrap_err();

        assert_eq!(err.target, "s3://status-feeds/ci/cctray.xml");
        match err.failure {
            PersistFailure::Rejected { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "AccessDenied");
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_upload_times_out() {
        let provider = ObjectStoreProvider::new(
            Arc::new(StalledStore),
            "status-feeds".to_string(),
            "cctray.xml".to_string(),
        );

        let err = provider.persist_projects(&projects()).await.unwrap_err();

        assert!(matches!(
            err.failure,
            PersistFailure::Timeout(timeout) if timeout == DEFAULT_PUT_TIMEOUT
        ));
        assert!(err.to_string().contains("s3://status-feeds/cctray.xml"));
    }

    #[test]
    fn test_object_url_encodes_key_segments() {
        let store = HttpObjectStore::new("https://s3.example.com/", None).unwrap();

        let url = store.object_url("feeds", "team a/cctray.xml").unwrap();

        assert_eq!(url.as_str(), "https://s3.example.com/feeds/team%20a/cctray.xml");
    }

    #[test]
    fn test_invalid_endpoint_is_config_error() {
        assert!(HttpObjectStore::new("not a url", None).is_err());
        assert!(HttpObjectStore::new("mailto:ops@example.com", None).is_err());
    }
}
