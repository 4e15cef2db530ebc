//! Client for the remote mind map generation service.
//!
//! The input is classified as a video link, a web address or a free-form
//! prompt; each category has its own flow on the service. The service
//! answers with a chat envelope whose message text is the tree as JSON.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;

use crate::tree::{self, Node};

/// Default address of the generation service.
pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:7860";

const MESSAGE_TEXT_POINTER: &str = "/outputs/0/outputs/0/results/message/text";

static VIDEO_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://)?(www\.)?(youtube\.com|youtu\.be)/.+$").expect("valid video link regex")
});

static WEB_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(https?://)?(www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_+.~#?&/=]*)$",
    )
    .expect("valid web address regex")
});

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("API request failed: {status}")]
    RequestFailed { status: u16 },
    #[error("No mind map data received from API")]
    EmptyResult,
    #[error("Invalid mind map JSON: {0}")]
    ParseFailed(#[source] serde_json::Error),
    #[error("could not reach mind map service: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response from mind map service: {0}")]
    MalformedResponse(String),
}

/// What the user typed, as far as the service is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Video,
    Url,
    Prompt,
}

impl InputKind {
    /// Video links win over generic web addresses; anything else is a
    /// prompt.
    pub fn classify(input: &str) -> Self {
        if VIDEO_LINK.is_match(input) {
            Self::Video
        } else if WEB_ADDRESS.is_match(input) {
            Self::Url
        } else {
            Self::Prompt
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Url => "url",
            Self::Prompt => "prompt",
        }
    }
}

/// Service address and the flow used for each input kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub base_url: String,
    pub url_flow: String,
    pub video_flow: String,
    pub prompt_flow: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVICE_URL.to_string(),
            url_flow: "1e9960df-6b9d-48eb-81c2-26af9e877f50".to_string(),
            video_flow: "13b817f9-1478-4f5a-8775-c6f4de8019e7".to_string(),
            prompt_flow: "f6081c11-6dc9-4941-8598-f21f97d94e4c".to_string(),
        }
    }
}

impl ServiceConfig {
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn flow(&self, kind: InputKind) -> &str {
        match kind {
            InputKind::Video => &self.video_flow,
            InputKind::Url => &self.url_flow,
            InputKind::Prompt => &self.prompt_flow,
        }
    }

    /// `<base>/api/v1/run/<flow>?stream=false`
    pub fn endpoint(&self, kind: InputKind) -> String {
        format!(
            "{}/api/v1/run/{}?stream=false",
            self.base_url.trim_end_matches('/'),
            self.flow(kind)
        )
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RunRequest<'a> {
    pub input_value: &'a str,
    pub output_type: &'static str,
    pub input_type: &'static str,
    pub tweaks: serde_json::Map<String, Value>,
}

impl<'a> RunRequest<'a> {
    pub fn chat(input: &'a str) -> Self {
        Self {
            input_value: input,
            output_type: "chat",
            input_type: "chat",
            tweaks: serde_json::Map::new(),
        }
    }
}

/// Unwrap the tree from a service response body.
///
/// # Errors
///
/// [`FetchError::MalformedResponse`] if the body is not JSON,
/// [`FetchError::EmptyResult`] if the message text is missing or empty and
/// [`FetchError::ParseFailed`] if the text is not a tree.
pub fn tree_from_response(body: &str) -> Result<Node, FetchError> {
    let envelope: Value =
        serde_json::from_str(body).map_err(|err| FetchError::MalformedResponse(err.to_string()))?;
    let text = envelope
        .pointer(MESSAGE_TEXT_POINTER)
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .ok_or(FetchError::EmptyResult)?;
    tree::parse_tree(text).map_err(FetchError::ParseFailed)
}

/// Anything that can turn user input into a tree.
pub trait MindMapSource: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if no tree could be produced for `input`.
    fn generate(&self, input: &str) -> Result<Node, FetchError>;
}

/// Blocking HTTP client for the generation service.
#[derive(Debug, Clone)]
pub struct MindMapClient {
    http: Client,
    config: ServiceConfig,
}

impl MindMapClient {
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: ServiceConfig) -> Result<Self, FetchError> {
        Ok(Self::with_http_client(Client::builder().build()?, config))
    }

    pub const fn with_http_client(http: Client, config: ServiceConfig) -> Self {
        Self { http, config }
    }

    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

impl MindMapSource for MindMapClient {
    fn generate(&self, input: &str) -> Result<Node, FetchError> {
        let _scope = crate::perf::scope("fetch.generate");
        let kind = InputKind::classify(input);
        let endpoint = self.config.endpoint(kind);
        tracing::debug!(kind = kind.label(), %endpoint, "requesting mind map");

        let response = self
            .http
            .post(&endpoint)
            .json(&RunRequest::chat(input))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "mind map service rejected request");
            return Err(FetchError::RequestFailed {
                status: status.as_u16(),
            });
        }

        let body = response.text()?;
        crate::perf::log_event(
            "fetch.response",
            format!("kind={} bytes={}", kind.label(), body.len()),
        );
        let tree = tree_from_response(&body)?;
        tracing::debug!(nodes = tree.node_count(), "mind map received");
        Ok(tree)
    }
}

impl<F> MindMapSource for F
where
    F: Fn(&str) -> Result<Node, FetchError> + Send + Sync,
{
    fn generate(&self, input: &str) -> Result<Node, FetchError> {
        self(input)
    }
}

#[doc(hidden)]
pub mod stub {
    //! One-shot HTTP server on the loopback interface, for tests.

    use std::io::{self, BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::JoinHandle;

    /// Serve a single request with `status` and `body`. The handle yields
    /// the raw request (request line, headers and body).
    ///
    /// # Errors
    ///
    /// Returns an error if no loopback port can be bound.
    pub fn serve_once(status: u16, body: &str) -> io::Result<(String, JoinHandle<io::Result<String>>)> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let base_url = format!("http://{}", listener.local_addr()?);
        let body = body.to_string();
        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept()?;
            answer(stream, status, &body)
        });
        Ok((base_url, handle))
    }

    fn answer(stream: TcpStream, status: u16, body: &str) -> io::Result<String> {
        let mut reader = BufReader::new(stream);
        let mut request = String::new();
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line)?;
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value
                        .trim()
                        .parse()
                        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
                }
            }
            let end = line == "\r\n" || line.is_empty();
            request.push_str(&line);
            if end {
                break;
            }
        }
        let mut payload = vec![0; content_length];
        reader.read_exact(&mut payload)?;
        request.push_str(&String::from_utf8_lossy(&payload));

        let response = format!(
            "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let mut stream = reader.into_inner();
        stream.write_all(response.as_bytes())?;
        stream.flush()?;
        Ok(request)
    }

    /// Service envelope wrapping `text` the way the generation flows do.
    pub fn envelope(text: &str) -> String {
        serde_json::json!({
            "session_id": "stub",
            "outputs": [{
                "inputs": { "input_value": "ignored" },
                "outputs": [{
                    "results": { "message": { "text": text, "sender": "Machine" } }
                }]
            }]
        })
        .to_string()
    }
}
