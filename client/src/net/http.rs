//! Shared HTTP client.
//!
//! SYSTEM CONTEXT
//! ==============
//! One `HttpClient` is shared by the session and every API wrapper. It owns
//! the default `Authorization` header and the interceptor chain, so a token
//! change or a session clear is visible to every caller at once.
//!
//! DESIGN
//! ======
//! - Requests are stamped with the current login generation before sending.
//! - Failures (non-2xx or transport) are reported to every registered
//!   interceptor before the error is returned to the caller.
//! - A cancelled request returns [`ClientError::Cancelled`] and notifies no
//!   interceptor. The underlying transport request may still complete.

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use contract::ErrorBody;
use reqwest::{Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::interceptor::{LoginEpoch, RequestContext, ResponseInterceptor};
use crate::error::ClientError;
use crate::state::header::AuthHeader;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-request knobs.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    /// Send without the default `Authorization` header.
    pub strip_auth: bool,
    /// Abort before any result is applied once this token is cancelled.
    pub cancel: Option<CancellationToken>,
    /// Query string pairs, appended in order.
    pub query: Vec<(String, String)>,
}

impl RequestOptions {
    #[must_use]
    pub fn anonymous() -> Self {
        Self { strip_auth: true, ..Self::default() }
    }

    #[must_use]
    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: Option<CancellationToken>) -> Self {
        self.cancel = cancel;
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    base_url: String,
    header: AuthHeader,
    epoch: LoginEpoch,
    interceptors: Arc<RwLock<Vec<Arc<dyn ResponseInterceptor>>>>,
}

impl HttpClient {
    /// Build a client for `base_url` (scheme and host, optional path prefix).
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or the TLS backend fails to
    /// initialize.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url.trim()).map_err(|e| ClientError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidBaseUrl(base_url.to_owned()));
        }
        let inner = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            inner,
            base_url: parsed.as_str().trim_end_matches('/').to_owned(),
            header: AuthHeader::new(),
            epoch: LoginEpoch::new(),
            interceptors: Arc::new(RwLock::new(Vec::new())),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn header(&self) -> &AuthHeader {
        &self.header
    }

    #[must_use]
    pub fn epoch(&self) -> &LoginEpoch {
        &self.epoch
    }

    /// Add an interceptor to the chain. Interceptors run in registration order.
    pub fn register(&self, interceptor: Arc<dyn ResponseInterceptor>) {
        match self.interceptors.write() {
            Ok(mut chain) => chain.push(interceptor),
            Err(poisoned) => poisoned.into_inner().push(interceptor),
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    // =========================================================================
    // SENDING
    // =========================================================================

    /// Send a request with an optional JSON body and decode a JSON reply.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Status`] for non-2xx replies,
    /// [`ClientError::Transport`] when no reply arrived,
    /// [`ClientError::Decode`] for an unreadable body, and
    /// [`ClientError::Cancelled`] when `opts.cancel` fired first.
    pub async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        opts: RequestOptions,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        if opts.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        let ctx = RequestContext { method: method.clone(), path: path.to_owned(), generation: self.epoch.current() };

        let mut builder = self.inner.request(method, self.url(path));
        if !opts.strip_auth {
            builder = self.header.apply(builder);
        }
        if !opts.query.is_empty() {
            builder = builder.query(&opts.query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let exchange = async {
            let resp = builder.send().await?;
            let status = resp.status();
            let bytes = resp.bytes().await?;
            if !status.is_success() {
                let message = std::str::from_utf8(&bytes)
                    .ok()
                    .and_then(ErrorBody::parse)
                    .and_then(|b| b.text().map(str::to_owned));
                return Err(ClientError::Status { status: status.as_u16(), message });
            }
            serde_json::from_slice::<T>(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
        };

        let result = match &opts.cancel {
            Some(cancel) => tokio::select! {
                biased;
                () = cancel.cancelled() => Err(ClientError::Cancelled),
                r = exchange => r,
            },
            None => exchange.await,
        };
        if opts.is_cancelled() {
            debug!(method = %ctx.method, path = %ctx.path, "http: result dropped after cancellation");
            return Err(ClientError::Cancelled);
        }

        if let Err(err) = &result {
            self.notify(&ctx, err);
        }
        result
    }

    fn notify(&self, ctx: &RequestContext, err: &ClientError) {
        let status = match err {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Transport(_) => None,
            _ => return,
        };
        match status {
            Some(status) => warn!(method = %ctx.method, path = %ctx.path, status, "http: request failed"),
            None => warn!(method = %ctx.method, path = %ctx.path, error = %err, "http: transport failure"),
        }
        let chain = match self.interceptors.read() {
            Ok(chain) => chain.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        for interceptor in chain {
            interceptor.on_error(ctx, status);
        }
    }

    /// `GET path` with the default header.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::send`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send::<(), T>(Method::GET, path, None, RequestOptions::default()).await
    }

    /// `GET path?query` with the default header.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::send`].
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<T, ClientError> {
        self.send::<(), T>(Method::GET, path, None, RequestOptions::default().with_query(query)).await
    }

    /// `DELETE path` with the default header.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::send`].
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send::<(), T>(Method::DELETE, path, None, RequestOptions::default()).await
    }

    /// `POST path` with a JSON body and the default header.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::send`].
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::POST, path, Some(body), RequestOptions::default()).await
    }

    /// `PUT path` with a JSON body and the default header.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::send`].
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::PUT, path, Some(body), RequestOptions::default()).await
    }
}
