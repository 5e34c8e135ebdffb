use std::fmt;
use std::io::Read;
use std::time::{Duration, Instant};

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::models::AnalysisResult;
use crate::upload::{Analyzer, ProgressHook, SelectedFile};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8081/api";

/// One shared timeout for every operation; uploads are the slowest case.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const BODY_PREVIEW_LIMIT: usize = 200;

/// The single normalized error shape everything above the HTTP boundary
/// handles. No caller ever sees a raw `reqwest::Error`.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// The server answered with a non-2xx status. The message is its
    /// structured `message` field when present, else the raw body.
    Server { status: u16, message: String },
    /// The request never got an answer: refused connection, DNS failure,
    /// CORS, timeout.
    Network(String),
    /// Anything else, passed through with its native message.
    Unexpected(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server { message, .. } => write!(f, "{message}"),
            Self::Network(msg) | Self::Unexpected(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network(
                "Network Error: request timed out (server busy or unreachable)".to_string(),
            )
        } else if err.is_connect() || err.is_request() {
            Self::Network(format!(
                "Network Error: {err} (possible CORS, backend down, or connection refused)"
            ))
        } else if err.is_decode() {
            Self::Unexpected(format!("Failed to decode response: {err}"))
        } else {
            Self::Unexpected(err.to_string())
        }
    }
}

/// Blocking client for the remote analysis service. The base URL is
/// configurable; the paths are fixed by the server.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Uploads the resume and waits for the full analysis.
    pub fn analyze(
        &self,
        file: &SelectedFile,
        on_progress: ProgressHook,
    ) -> Result<AnalysisResult, ApiError> {
        let url = self.url("/analyze/resume");
        let form = self.resume_form(file, on_progress)?;
        let response = self.execute("POST", &url, self.client.post(&url).multipart(form))?;
        self.read_json(response)
    }

    /// Upload-only endpoint; the response shape is up to the server.
    pub fn upload(
        &self,
        file: &SelectedFile,
        on_progress: ProgressHook,
    ) -> Result<serde_json::Value, ApiError> {
        let url = self.url("/resume/upload");
        let form = self.resume_form(file, on_progress)?;
        let response = self.execute("POST", &url, self.client.post(&url).multipart(form))?;
        self.read_loose(response)
    }

    pub fn fetch_result(&self, id: &str) -> Result<AnalysisResult, ApiError> {
        let url = self.url(&format!("/resume/analyze/{id}"));
        let response = self.execute("GET", &url, self.client.get(&url))?;
        self.read_json(response)
    }

    pub fn list_analyses(&self) -> Result<Vec<AnalysisResult>, ApiError> {
        let url = self.url("/resume/analyses");
        let response = self.execute("GET", &url, self.client.get(&url))?;
        self.read_json(response)
    }

    pub fn delete_analysis(&self, id: &str) -> Result<serde_json::Value, ApiError> {
        let url = self.url(&format!("/resume/delete/{id}"));
        let response = self.execute("DELETE", &url, self.client.delete(&url))?;
        self.read_loose(response)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn resume_form(&self, file: &SelectedFile, on_progress: ProgressHook) -> Result<Form, ApiError> {
        let handle = std::fs::File::open(&file.path).map_err(|err| {
            ApiError::Unexpected(format!("Failed to open {}: {err}", file.path.display()))
        })?;
        let reader = ProgressReader {
            inner: handle,
            sent: 0,
            total: file.size,
            hook: on_progress,
        };
        let part = Part::reader_with_length(reader, file.size)
            .file_name(file.name.clone())
            .mime_str(&file.media_type)?;
        Ok(Form::new().part("file", part))
    }

    /// Sends the request and emits the diagnostic side channel. The logging
    /// is best-effort only and never alters the outcome.
    fn execute(
        &self,
        method: &str,
        url: &str,
        request: RequestBuilder,
    ) -> Result<Response, ApiError> {
        debug!(%method, %url, "request");
        let started = Instant::now();
        let outcome = request.send();
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(response) => {
                debug!(%method, %url, status = response.status().as_u16(), elapsed_ms, "response")
            }
            Err(err) => warn!(%method, %url, elapsed_ms, error = %err, "request failed"),
        }
        Ok(outcome?)
    }

    fn read_json<T: DeserializeOwned>(&self, response: Response) -> Result<T, ApiError> {
        let text = self.read_ok_body(response)?;
        serde_json::from_str(&text)
            .map_err(|err| ApiError::Unexpected(format!("Failed to decode response: {err}")))
    }

    /// For endpoints whose success payload is implementation-defined.
    fn read_loose(&self, response: Response) -> Result<serde_json::Value, ApiError> {
        let text = self.read_ok_body(response)?;
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    }

    /// Status check and error normalization; returns the raw success body.
    fn read_ok_body(&self, response: Response) -> Result<String, ApiError> {
        let status = response.status();
        let text = response.text()?;
        debug!(status = status.as_u16(), body = preview(&text), "body");
        if status.is_success() {
            return Ok(text);
        }
        let message = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| {
                if text.trim().is_empty() {
                    format!("HTTP {}", status.as_u16())
                } else {
                    text.clone()
                }
            });
        Err(ApiError::Server {
            status: status.as_u16(),
            message,
        })
    }
}

impl Analyzer for ApiClient {
    fn analyze(
        &self,
        file: &SelectedFile,
        on_progress: ProgressHook,
    ) -> Result<AnalysisResult, ApiError> {
        ApiClient::analyze(self, file, on_progress)
    }
}

/// Counts bytes as the multipart body streams out and reports the fraction
/// transmitted to the progress hook.
struct ProgressReader<R> {
    inner: R,
    sent: u64,
    total: u64,
    hook: ProgressHook,
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 && self.total > 0 {
            self.sent += n as u64;
            (self.hook)(self.sent as f64 / self.total as f64);
        }
        Ok(n)
    }
}

/// Bounded preview for the diagnostic log; safe on multi-byte characters.
fn preview(text: &str) -> &str {
    match text.char_indices().nth(BODY_PREVIEW_LIMIT) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
