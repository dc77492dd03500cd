//! CDP error types.

use thiserror::Error;

/// Errors from the CDP driver layer.
#[derive(Debug, Error)]
pub enum CdpError {
    /// Failed to connect to the browser.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Browser not reachable on the debug endpoint.
    #[error("browser not available at {0}; start Chrome with --remote-debugging-port")]
    BrowserNotAvailable(String),

    /// WebSocket transport error.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// Error reported by the protocol itself.
    #[error("protocol error: {message} (code {code})")]
    Protocol { code: i64, message: String },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error during endpoint discovery.
    #[error("http error: {0}")]
    Http(String),

    /// Navigation failed.
    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    /// Element not found by selector.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// JavaScript evaluation threw.
    #[error("javascript error: {0}")]
    JavaScript(String),

    /// A bounded wait elapsed.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The page session went away.
    #[error("session closed")]
    SessionClosed,

    /// The browser answered with something unexpected.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl CdpError {
    /// Whether this error means the DOM node we held was replaced.
    ///
    /// Chrome reports operations on vanished nodes as protocol error
    /// -32000 ("Could not find node ...").
    pub fn is_stale_node(&self) -> bool {
        matches!(self, CdpError::Protocol { code: -32000, .. })
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::Http(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_node_is_protocol_minus_32000() {
        let stale = CdpError::Protocol {
            code: -32000,
            message: "Could not find node with given id".to_string(),
        };
        assert!(stale.is_stale_node());

        let other = CdpError::Protocol {
            code: -32601,
            message: "method not found".to_string(),
        };
        assert!(!other.is_stale_node());
        assert!(!CdpError::SessionClosed.is_stale_node());
    }
}
