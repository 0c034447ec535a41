//! Client for the OpenAI Realtime API.

use std::sync::Arc;

use http::header::{AUTHORIZATION, HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tracing::debug;

use crate::error::{Error, Result};
use crate::session::Session;
use crate::transport::Transport;
use crate::types::{MODEL_GPT4O_REALTIME_PREVIEW, SessionConfiguration};
use crate::websocket::WebSocketTransport;

/// Default WebSocket endpoint.
pub const DEFAULT_WEBSOCKET_URL: &str = "wss://api.openai.com/v1/realtime";

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
/// Environment variable overriding the WebSocket endpoint.
pub const ENV_BASE_URL: &str = "OPENAI_REALTIME_URL";

/// OpenAI Realtime API client.
#[derive(Debug, Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
}

/// Client configuration.
#[derive(Debug, Clone)]
pub(crate) struct ClientConfig {
    pub api_key: String,
    pub organization: Option<String>,
    pub project: Option<String>,
    pub ws_url: String,
    pub model: String,
}

impl Client {
    /// Creates a client with default settings.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        ClientBuilder::new(api_key).build()
    }

    /// Creates a builder.
    pub fn builder(api_key: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(api_key)
    }

    /// Creates a client from `OPENAI_API_KEY` and, if set, `OPENAI_REALTIME_URL`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(ENV_API_KEY)
            .map_err(|_| Error::InvalidConfig(format!("{} is not set", ENV_API_KEY)))?;
        let mut builder = ClientBuilder::new(api_key);
        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            builder = builder.websocket_url(url);
        }
        builder.build()
    }

    /// Returns the model sessions connect to.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Connects a WebSocket and creates a session on it.
    ///
    /// Connection failures are returned here; anything after that surfaces
    /// as the end of the session's event stream.
    pub async fn connect_websocket(&self, configuration: SessionConfiguration) -> Result<Session> {
        let transport = Arc::new(WebSocketTransport::new(self.build_request()?));
        transport.resume().await?;
        Ok(Session::create(transport, configuration))
    }

    pub(crate) fn build_request(&self) -> Result<http::Request<()>> {
        let url = format!("{}?model={}", self.config.ws_url, self.config.model);
        debug!("Building request for: {}", url);

        let mut request = url
            .into_client_request()
            .map_err(|e| Error::InvalidConfig(format!("invalid URL: {}", e)))?;
        let headers = request.headers_mut();
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("Bearer {}", self.config.api_key))?,
        );
        headers.insert(
            HeaderName::from_static("openai-beta"),
            HeaderValue::from_static("realtime=v1"),
        );
        if let Some(ref org) = self.config.organization {
            headers.insert(HeaderName::from_static("openai-organization"), header_value(org)?);
        }
        if let Some(ref project) = self.config.project {
            headers.insert(HeaderName::from_static("openai-project"), header_value(project)?);
        }

        Ok(request)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::InvalidConfig(format!("invalid header value: {}", e)))
}

/// Builder for creating a Client with options.
pub struct ClientBuilder {
    api_key: String,
    organization: Option<String>,
    project: Option<String>,
    ws_url: Option<String>,
    model: Option<String>,
}

impl ClientBuilder {
    /// Creates a new client builder.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            organization: None,
            project: None,
            ws_url: None,
            model: None,
        }
    }

    /// Sets the organization ID.
    pub fn organization(mut self, org_id: impl Into<String>) -> Self {
        self.organization = Some(org_id.into());
        self
    }

    /// Sets the project ID.
    pub fn project(mut self, project_id: impl Into<String>) -> Self {
        self.project = Some(project_id.into());
        self
    }

    /// Sets the WebSocket URL.
    pub fn websocket_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = Some(url.into());
        self
    }

    /// Sets the model. Default: gpt-4o-realtime-preview
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Builds the client.
    pub fn build(self) -> Result<Client> {
        if self.api_key.is_empty() {
            return Err(Error::InvalidConfig("API key is required".to_string()));
        }

        Ok(Client {
            config: Arc::new(ClientConfig {
                api_key: self.api_key,
                organization: self.organization.filter(|s| !s.is_empty()),
                project: self.project.filter(|s| !s.is_empty()),
                ws_url: self
                    .ws_url
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| DEFAULT_WEBSOCKET_URL.to_string()),
                model: self
                    .model
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| MODEL_GPT4O_REALTIME_PREVIEW.to_string()),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_api_key_rejected() {
        assert!(matches!(Client::new(""), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_request_headers() {
        let client = Client::builder("sk-test")
            .organization("org-1")
            .project("")
            .model("gpt-4o-mini-realtime-preview")
            .build()
            .unwrap();
        let request = client.build_request().unwrap();

        assert_eq!(
            request.uri().to_string(),
            "wss://api.openai.com/v1/realtime?model=gpt-4o-mini-realtime-preview"
        );
        let headers = request.headers();
        assert_eq!(headers[AUTHORIZATION], "Bearer sk-test");
        assert_eq!(headers["openai-beta"], "realtime=v1");
        assert_eq!(headers["openai-organization"], "org-1");
        assert!(headers.get("openai-project").is_none());
        assert!(headers.get("sec-websocket-key").is_some());
    }

    #[test]
    fn test_custom_url() {
        let client = Client::builder("sk-test")
            .websocket_url("ws://localhost:9000/realtime")
            .build()
            .unwrap();
        assert_eq!(client.model(), MODEL_GPT4O_REALTIME_PREVIEW);
        let request = client.build_request().unwrap();
        assert_eq!(
            request.uri().to_string(),
            "ws://localhost:9000/realtime?model=gpt-4o-realtime-preview"
        );
    }

    #[test]
    fn test_invalid_header_rejected() {
        let client = Client::builder("sk-\nbad").build().unwrap();
        assert!(matches!(client.build_request(), Err(Error::InvalidConfig(_))));
    }
}
