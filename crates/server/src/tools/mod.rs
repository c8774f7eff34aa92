//! MCP tool implementations.
//!
//! This module contains all tools exposed by the harbor server.

pub mod cache;
pub mod proxy_fetch;
pub mod worker_status;

pub use proxy_fetch::{ProxyFetchParams, proxy_fetch_impl};
pub use worker_status::worker_status_impl;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use harbor_core::{Error, ResponseSnapshot};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// How a body was rendered into the tool output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BodyEncoding {
    Utf8,
    Base64,
}

/// A response snapshot rendered for JSON transport.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResponseView {
    /// URL the response was produced for. Empty for synthesized responses.
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    /// Body as text, or base64 when it is not valid UTF-8.
    pub body: String,
    pub body_encoding: BodyEncoding,
    /// ISO8601 time the snapshot was captured.
    pub stored_at: String,
}

impl From<&ResponseSnapshot> for ResponseView {
    fn from(response: &ResponseSnapshot) -> Self {
        let (body, body_encoding) = match std::str::from_utf8(&response.body) {
            Ok(text) => (text.to_string(), BodyEncoding::Utf8),
            Err(_) => (STANDARD.encode(&response.body), BodyEncoding::Base64),
        };
        Self {
            url: response.url.clone(),
            status: response.status,
            status_text: response.status_text.clone(),
            headers: response.headers.clone(),
            body,
            body_encoding,
            stored_at: response.stored_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_body_is_utf8() {
        let view = ResponseView::from(&ResponseSnapshot::new(200, "hello"));
        assert_eq!(view.body, "hello");
        assert_eq!(view.body_encoding, BodyEncoding::Utf8);
    }

    #[test]
    fn test_binary_body_is_base64() {
        let view = ResponseView::from(&ResponseSnapshot::new(200, vec![0xff_u8, 0x00, 0xfe]));
        assert_eq!(view.body_encoding, BodyEncoding::Base64);
        assert_eq!(STANDARD.decode(view.body).unwrap(), vec![0xff_u8, 0x00, 0xfe]);
    }
}
