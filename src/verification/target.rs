//! Tail subscription target derived from the reader base URL.

use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use url::Url;

use crate::config::ORG_ID_HEADER;
use crate::generators::logs::SENDER_MARKER;
use crate::verification::types::{TailError, TailResult};

/// Fixed tail endpoint path.
pub const TAIL_PATH: &str = "/loki/api/v1/tail";

/// Header carrying the API key taken from URL credentials.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Header carrying the API secret taken from URL credentials.
pub const API_SECRET_HEADER: &str = "X-API-Secret";

/// Label filter matching everything the log generator emits.
pub fn tail_query() -> String {
    format!(r#"{{sender="{SENDER_MARKER}", level=~"info|debug|error"}}"#)
}

/// Where and how a reader subscribes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailTarget {
    pub url: Url,
    pub headers: Vec<(String, String)>,
}

impl TailTarget {
    /// Rewrite `reader_url` into a streaming tail URL.
    ///
    /// `http` becomes `ws` and `https` becomes `wss`; the path and query are
    /// replaced. Credentials in the URL are moved into API key headers.
    pub fn from_reader_url(reader_url: &str, org_id: &str) -> TailResult<Self> {
        let mut url = Url::parse(reader_url).map_err(|source| TailError::InvalidUrl {
            url: reader_url.to_string(),
            source,
        })?;

        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(TailError::UnsupportedScheme(other.to_string())),
        };
        url.set_scheme(scheme)
            .map_err(|_| TailError::UnsupportedScheme(url.scheme().to_string()))?;
        url.set_path(TAIL_PATH);
        url.query_pairs_mut().clear().append_pair("query", &tail_query());

        let mut headers = Vec::new();
        if !org_id.is_empty() {
            headers.push((ORG_ID_HEADER.to_string(), org_id.to_string()));
        }
        headers.push(("X-Experimental".to_string(), "1".to_string()));

        if !url.username().is_empty() {
            headers.push((API_KEY_HEADER.to_string(), url.username().to_string()));
            headers.push((
                API_SECRET_HEADER.to_string(),
                url.password().unwrap_or_default().to_string(),
            ));
            // Infallible for URLs with a host, which every ws/wss URL has.
            let _ = url.set_username("");
            let _ = url.set_password(None);
        }

        Ok(Self { url, headers })
    }

    /// Handshake request with the target headers applied.
    pub fn request(&self) -> TailResult<Request> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|source| TailError::Subscribe {
                url: self.url.to_string(),
                source,
            })?;

        for (name, value) in &self.headers {
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| TailError::InvalidHeader(name.clone()))?;
            let value =
                HeaderValue::from_str(value).map_err(|_| TailError::InvalidHeader(name.clone()))?;
            request.headers_mut().insert(header, value);
        }
        Ok(request)
    }
}
