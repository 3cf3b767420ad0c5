//! Transcription upload client.
//!
//! Speaks the self-hosted server's wire contract: a multipart POST to
//! `/transcribe` with exactly one part (field `audio`, filename
//! `recording.webm`, the payload's MIME type), answered by a JSON object
//! with optional `text` and `file_url` fields. Also fetches the persisted
//! transcript artifact behind `file_url`. The client never touches the
//! UI; presentation stays with the controller.

use crate::error::{DictationError, Result};
use crate::recorder::session::AudioPayload;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Multipart field name the server expects
pub const UPLOAD_FIELD: &str = "audio";

/// Filename attached to the uploaded part
pub const UPLOAD_FILENAME: &str = "recording.webm";

/// Endpoint path on the transcription server
pub const TRANSCRIBE_PATH: &str = "/transcribe";

/// Name under which a fetched artifact is saved
pub const ARTIFACT_FILENAME: &str = "transcription.txt";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Parsed transcription response.
///
/// `text` carries the transcript; its absence marks a failed attempt no
/// matter what the transport said. `file_url` links to the transcript
/// artifact the server persisted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscriptionOutcome {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
}

impl TranscriptionOutcome {
    /// Split into transcript and artifact link, or `NoSpeechDetected`.
    /// An empty string counts as missing text.
    pub fn require_text(self) -> Result<(String, Option<String>)> {
        match self.text {
            Some(text) if !text.is_empty() => Ok((text, self.file_url)),
            _ => Err(DictationError::NoSpeechDetected),
        }
    }
}

/// Upload seam between the controller and the network. Test doubles
/// stand in for the HTTP client in controller tests.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn upload(&self, payload: AudioPayload) -> Result<TranscriptionOutcome>;
}

/// The reqwest-backed transcriber talking to a configured server.
pub struct HttpTranscriber {
    base_url: String,
    transcribe_url: String,
    http: reqwest::Client,
}

impl HttpTranscriber {
    /// Validate the server URL and build the client. Fails fast on a
    /// URL without scheme or host rather than at upload time.
    pub fn new(server_url: &str) -> anyhow::Result<Self> {
        let base_url = validate_base_url(server_url)?;
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            transcribe_url: format!("{base_url}{TRANSCRIBE_PATH}"),
            base_url,
            http,
        })
    }

    /// Download the transcript artifact behind `file_url` and save it as
    /// `transcription.txt` under `dest_dir`.
    pub async fn fetch_artifact(&self, file_url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let url = self.resolve(file_url);
        tracing::debug!(%url, "fetching transcript artifact");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| DictationError::UploadFailed(format!("artifact fetch: {e}")))?;

        if !response.status().is_success() {
            return Err(DictationError::UploadFailed(format!(
                "artifact fetch failed ({})",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DictationError::UploadFailed(format!("artifact read: {e}")))?;

        let path = dest_dir.join(ARTIFACT_FILENAME);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| DictationError::UploadFailed(format!("artifact save: {e}")))?;

        Ok(path)
    }

    /// Resolve a possibly relative artifact link against the server base.
    fn resolve(&self, file_url: &str) -> String {
        if file_url.starts_with("http://") || file_url.starts_with("https://") {
            file_url.to_string()
        } else if file_url.starts_with('/') {
            format!("{}{}", self.base_url, file_url)
        } else {
            format!("{}/{}", self.base_url, file_url)
        }
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn upload(&self, payload: AudioPayload) -> Result<TranscriptionOutcome> {
        let mime = payload.mime();
        let part = reqwest::multipart::Part::bytes(payload.into_bytes())
            .file_name(UPLOAD_FILENAME)
            .mime_str(mime)
            .map_err(|e| DictationError::UploadFailed(format!("invalid part: {e}")))?;
        let form = reqwest::multipart::Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .http
            .post(&self.transcribe_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| DictationError::UploadFailed(format!("request: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DictationError::UploadFailed(format!(
                "server error ({status}): {error_text}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DictationError::UploadFailed(format!("response read: {e}")))?;
        parse_outcome(&body)
    }
}

/// Parse a response body. Anything that is not a JSON object with the
/// recognized fields is an upload failure, not a panic.
pub fn parse_outcome(body: &str) -> Result<TranscriptionOutcome> {
    serde_json::from_str(body)
        .map_err(|e| DictationError::UploadFailed(format!("malformed response: {e}")))
}

/// Check scheme and host, trim trailing slashes.
pub fn validate_base_url(server_url: &str) -> anyhow::Result<String> {
    let trimmed = server_url.trim();
    if trimmed.is_empty() {
        anyhow::bail!(
            "Transcription server URL not configured.\n\
             Set with: murmur config --server-url http://127.0.0.1:5000"
        );
    }

    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        anyhow::bail!(
            "Invalid server URL: must start with http:// or https://\n\
             Got: {trimmed}"
        );
    }

    let after_scheme = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .unwrap_or("");
    if after_scheme.is_empty() || after_scheme.starts_with('/') {
        anyhow::bail!("Invalid server URL: missing host\nGot: {trimmed}");
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_outcome() {
        let outcome = parse_outcome(r#"{"text": "hello", "file_url": "/f/1"}"#).unwrap();
        assert_eq!(outcome.text.as_deref(), Some("hello"));
        assert_eq!(outcome.file_url.as_deref(), Some("/f/1"));
    }

    #[test]
    fn test_parse_empty_object() {
        let outcome = parse_outcome("{}").unwrap();
        assert!(outcome.text.is_none());
        assert!(outcome.file_url.is_none());
    }

    #[test]
    fn test_parse_ignores_unknown_fields() {
        let outcome = parse_outcome(r#"{"text": "hi", "language": "en"}"#).unwrap();
        assert_eq!(outcome.text.as_deref(), Some("hi"));
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let err = parse_outcome("<html>busy</html>").unwrap_err();
        assert!(matches!(err, DictationError::UploadFailed(_)));
    }

    #[test]
    fn test_require_text() {
        let ok = TranscriptionOutcome {
            text: Some("hello".into()),
            file_url: Some("/f/1".into()),
        };
        let (text, url) = ok.require_text().unwrap();
        assert_eq!(text, "hello");
        assert_eq!(url.as_deref(), Some("/f/1"));

        let missing = TranscriptionOutcome::default();
        assert!(matches!(
            missing.require_text(),
            Err(DictationError::NoSpeechDetected)
        ));

        let empty = TranscriptionOutcome {
            text: Some(String::new()),
            file_url: None,
        };
        assert!(matches!(
            empty.require_text(),
            Err(DictationError::NoSpeechDetected)
        ));
    }

    #[test]
    fn test_validate_base_url() {
        assert!(validate_base_url("").is_err());
        assert!(validate_base_url("localhost:5000").is_err());
        assert!(validate_base_url("http:///transcribe").is_err());
        assert_eq!(
            validate_base_url("http://127.0.0.1:5000/").unwrap(),
            "http://127.0.0.1:5000"
        );
        assert_eq!(
            validate_base_url("https://stt.example.com").unwrap(),
            "https://stt.example.com"
        );
    }

    #[test]
    fn test_resolve_artifact_links() {
        let client = HttpTranscriber::new("http://127.0.0.1:5000/").unwrap();
        assert_eq!(
            client.resolve("/download?path=x"),
            "http://127.0.0.1:5000/download?path=x"
        );
        assert_eq!(client.resolve("f/1"), "http://127.0.0.1:5000/f/1");
        assert_eq!(client.resolve("https://cdn.example.com/f/1"), "https://cdn.example.com/f/1");
    }

    mod wire {
        use super::*;
        use axum::extract::{Multipart, State};
        use axum::routing::post;
        use axum::{Json, Router};
        use std::sync::{Arc, Mutex};

        #[derive(Default, Clone)]
        struct Observed {
            field: Option<String>,
            filename: Option<String>,
            content_type: Option<String>,
            body: Vec<u8>,
        }

        type Shared = Arc<Mutex<Observed>>;

        async fn transcribe(
            State(observed): State<Shared>,
            mut multipart: Multipart,
        ) -> Json<serde_json::Value> {
            while let Some(field) = multipart.next_field().await.unwrap() {
                let mut seen = Observed {
                    field: field.name().map(String::from),
                    filename: field.file_name().map(String::from),
                    content_type: field.content_type().map(String::from),
                    body: Vec::new(),
                };
                seen.body = field.bytes().await.unwrap().to_vec();
                *observed.lock().unwrap() = seen;
            }
            Json(serde_json::json!({"text": "hello", "file_url": "/f/1"}))
        }

        async fn serve(app: Router) -> std::net::SocketAddr {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            addr
        }

        #[tokio::test]
        async fn test_upload_wire_contract() {
            let observed: Shared = Arc::default();
            let app = Router::new()
                .route(TRANSCRIBE_PATH, post(transcribe))
                .with_state(observed.clone());
            let addr = serve(app).await;

            let client = HttpTranscriber::new(&format!("http://{addr}")).unwrap();
            let payload = AudioPayload::from_bytes(b"opus-bytes".to_vec());
            let outcome = client.upload(payload).await.unwrap();

            assert_eq!(outcome.text.as_deref(), Some("hello"));
            assert_eq!(outcome.file_url.as_deref(), Some("/f/1"));

            let seen = observed.lock().unwrap().clone();
            assert_eq!(seen.field.as_deref(), Some(UPLOAD_FIELD));
            assert_eq!(seen.filename.as_deref(), Some(UPLOAD_FILENAME));
            assert_eq!(seen.content_type.as_deref(), Some("audio/webm"));
            assert_eq!(seen.body, b"opus-bytes".to_vec());
        }

        #[tokio::test]
        async fn test_server_error_maps_to_upload_failed() {
            let app = Router::new().route(
                TRANSCRIBE_PATH,
                post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            );
            let addr = serve(app).await;

            let client = HttpTranscriber::new(&format!("http://{addr}")).unwrap();
            let err = client
                .upload(AudioPayload::from_bytes(b"x".to_vec()))
                .await
                .unwrap_err();
            match err {
                DictationError::UploadFailed(msg) => {
                    assert!(msg.contains("500"));
                    assert!(msg.contains("boom"));
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_connection_refused_maps_to_upload_failed() {
            // grab a free port and release it so connecting fails
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);

            let client = HttpTranscriber::new(&format!("http://{addr}")).unwrap();
            let err = client
                .upload(AudioPayload::from_bytes(b"x".to_vec()))
                .await
                .unwrap_err();
            assert!(matches!(err, DictationError::UploadFailed(_)));
        }

        #[tokio::test]
        async fn test_fetch_artifact_saves_file() {
            let app = Router::new().route(
                "/download",
                axum::routing::get(|| async { "the transcript" }),
            );
            let addr = serve(app).await;

            let client = HttpTranscriber::new(&format!("http://{addr}")).unwrap();
            let dir = tempfile::tempdir().unwrap();
            let path = client
                .fetch_artifact("/download", dir.path())
                .await
                .unwrap();

            assert_eq!(path.file_name().unwrap(), ARTIFACT_FILENAME);
            assert_eq!(std::fs::read_to_string(path).unwrap(), "the transcript");
        }
    }
}
