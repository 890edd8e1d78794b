//! HTTP client for the remote document API.
//!
//! Handles anonymous session tokens, re-authentication on 401, and the
//! document/blob endpoints. Uses reqwest with JSON serialization.

use crate::config::RemoteStoreConfig;
use crate::error::{CloudError, CloudResult};
use crate::remote_store::RemoteStore;
use crate::types::RemoteDocument;
use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// State shared across client clones.
struct AuthState {
    token: Option<String>,
    /// Bumped on every successful sign-in. Lets a waiter see that a
    /// concurrent sign-in already replaced the token it saw rejected.
    generation: u64,
}

/// Remote store backed by the JSON document API.
pub struct HttpRemoteStore {
    client: Client,
    config: RemoteStoreConfig,
    base_url: Url,
    auth: Arc<RwLock<AuthState>>,
    /// Serializes sign-in so concurrent 401s produce one new session.
    sign_in_lock: Arc<tokio::sync::Mutex<()>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

impl HttpRemoteStore {
    pub fn new(config: RemoteStoreConfig, timeout: Duration) -> CloudResult<Self> {
        let base_url = Url::parse(config.base_url.trim())
            .map_err(|e| CloudError::Config(format!("invalid base URL {:?}: {e}", config.base_url)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(CloudError::Config(format!(
                "base URL must be http(s), got {:?}",
                config.base_url
            )));
        }
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            config,
            base_url,
            auth: Arc::new(RwLock::new(AuthState {
                token: None,
                generation: 0,
            })),
            sign_in_lock: Arc::new(tokio::sync::Mutex::new(())),
        })
    }

    pub fn config(&self) -> &RemoteStoreConfig {
        &self.config
    }

    /// Sets the session token directly (for restoring a saved session).
    pub async fn set_token(&self, token: String) {
        self.auth.write().await.token = Some(token);
    }

    pub async fn sign_out(&self) {
        self.auth.write().await.token = None;
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> CloudResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CloudError::Config(format!("base URL {} cannot have a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn documents_url(&self, collection: &str) -> CloudResult<Url> {
        self.endpoint([
            "v1",
            "projects",
            self.config.project_id.as_str(),
            "collections",
            collection,
            "documents",
        ])
    }

    fn document_url(&self, collection: &str, id: &str) -> CloudResult<Url> {
        let mut url = self.documents_url(collection)?;
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(id);
        }
        Ok(url)
    }

    /// Blob paths keep their `/` separators; each part is encoded on its own.
    fn blob_url(&self, path: &str) -> CloudResult<Url> {
        let prefix = ["v1", "projects", self.config.project_id.as_str(), "blobs"];
        self.endpoint(prefix.into_iter().chain(path.split('/').filter(|p| !p.is_empty())))
    }

    // ── Auth ──

    async fn request_token(&self) -> CloudResult<String> {
        let url = self.endpoint(["v1", "auth", "anonymous"])?;
        let resp: TokenResponse = self
            .client
            .post(url)
            .json(&serde_json::json!({
                "apiKey": self.config.api_key,
                "projectId": self.config.project_id,
            }))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| CloudError::AuthFailed(e.to_string()))?
            .json()
            .await?;
        Ok(resp.token)
    }

    /// Replaces the session after a 401, unless another caller already did.
    async fn renew_session(&self, seen_generation: u64) -> CloudResult<String> {
        let _guard = self.sign_in_lock.lock().await;

        {
            let auth = self.auth.read().await;
            if auth.generation > seen_generation {
                return auth.token.clone().ok_or(CloudError::AuthRequired);
            }
        }

        let token = self.request_token().await?;
        let mut auth = self.auth.write().await;
        auth.token = Some(token.clone());
        auth.generation += 1;
        Ok(token)
    }

    async fn current_token(&self) -> CloudResult<(String, u64)> {
        let auth = self.auth.read().await;
        let token = auth.token.clone().ok_or(CloudError::AuthRequired)?;
        Ok((token, auth.generation))
    }

    /// Sends an authenticated request, renewing the session and retrying once on 401.
    async fn send_authed(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> CloudResult<reqwest::Response> {
        let (token, generation) = self.current_token().await?;

        let build = |token: &str| {
            let req = self.client.request(method.clone(), url.clone()).bearer_auth(token);
            match body {
                Some(b) => req.json(b),
                None => req,
            }
        };

        let resp = build(&token).send().await?;
        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            debug!("401 on {method} {url}, renewing anonymous session");
            let new_token = self.renew_session(generation).await?;
            return Ok(build(&new_token).send().await?);
        }

        Ok(resp)
    }

    fn check_status(resp: reqwest::Response, what: &str) -> CloudResult<reqwest::Response> {
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CloudError::NotFound(what.to_string()));
        }
        resp.error_for_status()
            .map_err(|e| CloudError::Api(e.to_string()))
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn sign_in_anonymously(&self) -> CloudResult<()> {
        if self.is_authenticated().await {
            return Ok(());
        }
        let generation = self.auth.read().await.generation;
        self.renew_session(generation).await?;
        Ok(())
    }

    async fn is_authenticated(&self) -> bool {
        self.auth.read().await.token.is_some()
    }

    // ── Documents ──

    async fn get_all_documents(&self, collection: &str) -> CloudResult<Vec<RemoteDocument>> {
        let url = self.documents_url(collection)?;
        let resp = self.send_authed(Method::GET, url, None).await?;

        // A collection nobody has written to yet is empty, not missing.
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let resp = Self::check_status(resp, collection)?;

        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            documents: Vec<RemoteDocument>,
        }
        let data: Resp = resp.json().await?;
        Ok(data.documents)
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        data: serde_json::Value,
    ) -> CloudResult<()> {
        let url = self.document_url(collection, id)?;
        let resp = self.send_authed(Method::PUT, url, Some(&data)).await?;
        Self::check_status(resp, &format!("{collection}/{id}"))?;
        Ok(())
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        patch: serde_json::Value,
    ) -> CloudResult<()> {
        let url = self.document_url(collection, id)?;
        let resp = self.send_authed(Method::PATCH, url, Some(&patch)).await?;
        Self::check_status(resp, &format!("{collection}/{id}"))?;
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> CloudResult<()> {
        let url = self.document_url(collection, id)?;
        let resp = self.send_authed(Method::DELETE, url, None).await?;
        Self::check_status(resp, &format!("{collection}/{id}"))?;
        Ok(())
    }

    // ── Blobs ──

    async fn upload_blob(&self, path: &str, bytes: Vec<u8>) -> CloudResult<String> {
        let url = self.blob_url(path)?;
        let (token, generation) = self.current_token().await?;

        let mut resp = self
            .client
            .put(url.clone())
            .bearer_auth(&token)
            .body(bytes.clone())
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            debug!("401 on blob upload {path}, renewing anonymous session");
            let new_token = self.renew_session(generation).await?;
            resp = self
                .client
                .put(url)
                .bearer_auth(&new_token)
                .body(bytes)
                .send()
                .await?;
        }

        #[derive(Deserialize)]
        struct Resp {
            url: String,
        }
        let data: Resp = Self::check_status(resp, path)?.json().await?;
        Ok(data.url)
    }
}
