use std::env;
use std::fmt;
use std::pin::Pin;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use futures::stream::StreamExt;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response};
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_PING_FAILURES, CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS,
};
use crate::types::{AnswerResponse, ChatRequest, ErrorDetail, SuggestRequest, SuggestResponse};

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000/";
const BACKEND_URL_ENV: &str = "PALAVER_BACKEND_URL";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// A boxed stream of raw response body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// The body of a successful `/chat` response.
pub enum ChatBody {
    /// A chunked text body, still being received.
    Stream(ByteStream),
    /// A complete answer delivered as a single JSON payload.
    Answer(String),
}

impl fmt::Debug for ChatBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatBody::Stream(_) => f.write_str("ChatBody::Stream(..)"),
            ChatBody::Answer(answer) => f.debug_tuple("ChatBody::Answer").field(answer).finish(),
        }
    }
}

/// The chat backend as seen by a session.
///
/// The backend is stateless: every call carries whatever history it needs.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Liveness check.
    async fn ping(&self) -> Result<()>;

    /// Open a chat exchange.  Resolves once response headers arrive; the body
    /// is consumed through the returned [`ChatBody`].
    async fn chat(&self, request: ChatRequest) -> Result<ChatBody>;

    /// Ask for follow-up prompts for a finished conversation.
    async fn suggest_followups(&self, request: SuggestRequest) -> Result<Vec<String>>;
}

/// HTTP client for the chat backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: ReqwestClient,
    base_url: Url,
    connect_timeout: Duration,
}

impl HttpBackend {
    /// Create a new backend client.
    ///
    /// The base URL can be provided directly or read from the
    /// PALAVER_BACKEND_URL environment variable; it defaults to a backend on
    /// localhost.
    pub fn new(base_url: Option<String>) -> Result<Self> {
        Self::with_options(base_url, None)
    }

    /// Create a new client with custom settings.
    ///
    /// Only connecting is bounded by a timeout.  A chat answer may stream for
    /// as long as the backend keeps the connection open.
    pub fn with_options(base_url: Option<String>, connect_timeout: Option<Duration>) -> Result<Self> {
        let base_url = match base_url {
            Some(url) => url,
            None => env::var(BACKEND_URL_ENV).unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string()),
        };
        let base_url = parse_base_url(&base_url)?;

        let connect_timeout = connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let client = ReqwestClient::builder()
            .connect_timeout(connect_timeout)
            .default_headers(Self::default_headers())
            .build()
            .map_err(|e| {
                Error::http_client(format!("building client: {e}"), Some(Box::new(e)))
            })?;

        Ok(Self {
            client,
            base_url,
            connect_timeout,
        })
    }

    /// The normalized base URL every endpoint is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Content-Type is left to `.json()` so that bodiless requests carry none.
    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Map a transport failure to our Error type.
    fn request_error(e: reqwest::Error, limit: Duration) -> Error {
        CLIENT_REQUEST_ERRORS.click();
        if e.is_timeout() {
            Error::timeout(e.to_string(), limit)
        } else if e.is_connect() {
            Error::connection(e.to_string(), Some(Box::new(e)))
        } else {
            Error::http_client(e.to_string(), Some(Box::new(e)))
        }
    }

    /// Process a non-success response into an Error carrying its status.
    async fn process_error_response(response: Response) -> Error {
        CLIENT_REQUEST_ERRORS.click();
        let status = response.status();
        let status_code = status.as_u16();
        let fallback = status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();

        let body = match response.text().await {
            Ok(body) => body,
            Err(_) => return Error::api(status_code, fallback),
        };

        let message = match serde_json::from_str::<ErrorDetail>(&body) {
            Ok(ErrorDetail {
                detail: serde_json::Value::String(detail),
            }) => detail,
            Ok(ErrorDetail { detail }) => detail.to_string(),
            Err(_) if !body.trim().is_empty() => body.trim().to_string(),
            Err(_) => fallback,
        };
        Error::api(status_code, message)
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn ping(&self) -> Result<()> {
        let url = self.endpoint("ping")?;
        tracing::debug!(%url, "liveness check");
        let response = self
            .client
            .get(url)
            .timeout(PING_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                CLIENT_PING_FAILURES.click();
                Self::request_error(e, PING_TIMEOUT)
            })?;
        if !response.status().is_success() {
            CLIENT_PING_FAILURES.click();
            return Err(Self::process_error_response(response).await);
        }
        Ok(())
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatBody> {
        let url = self.endpoint("chat")?;
        tracing::debug!(%url, "opening chat exchange");
        CLIENT_REQUESTS.click();
        let start = Instant::now();

        let response = self
            .client
            .post(url)
            .header(
                header::ACCEPT,
                HeaderValue::from_static("text/plain, application/json"),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::request_error(e, self.connect_timeout))?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(is_json_content_type);
        if is_json {
            let answer = response.json::<AnswerResponse>().await.map_err(|e| {
                Error::serialization(format!("chat answer: {e}"), Some(Box::new(e)))
            })?;
            return Ok(ChatBody::Answer(answer.answer));
        }

        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                Error::streaming(e.to_string(), Some(Box::new(e)))
            })
        });
        Ok(ChatBody::Stream(Box::pin(stream)))
    }

    async fn suggest_followups(&self, request: SuggestRequest) -> Result<Vec<String>> {
        let url = self.endpoint("suggest-followups")?;
        tracing::debug!(%url, turns = request.history.len(), "requesting follow-ups");
        CLIENT_REQUESTS.click();
        let start = Instant::now();

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::request_error(e, self.connect_timeout))?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        let body = response.json::<SuggestResponse>().await.map_err(|e| {
            Error::serialization(format!("follow-up suggestions: {e}"), Some(Box::new(e)))
        })?;
        Ok(body.suggestions)
    }
}

/// True for `application/json` with any parameters, in any letter case.
fn is_json_content_type(value: &str) -> bool {
    let essence = value.split(';').next().unwrap_or_default();
    essence.trim().eq_ignore_ascii_case("application/json")
}

/// Parse and normalize a backend base URL so that endpoint paths resolve
/// beneath it.
fn parse_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::validation(
            "backend URL must not be empty",
            Some("backend_url".to_string()),
        ));
    }
    let mut url = Url::parse(raw)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::validation(
            format!("unsupported scheme '{}'", url.scheme()),
            Some("backend_url".to_string()),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
