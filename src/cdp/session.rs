//! CDP page session: the driver primitives the migration core consumes.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures::SinkExt;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace};

use super::client::{PendingRequest, WsSink};
use super::error::CdpError;
use super::protocol::{BoxModel, CdpRequest};

const CALL_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A session attached to a single page target.
pub struct PageSession {
    target_id: String,
    session_id: String,
    /// Shared with the owning client.
    ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
    pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
    request_id: Arc<AtomicU64>,
}

impl PageSession {
    pub(crate) fn new(
        target_id: String,
        session_id: String,
        ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
        pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
        request_id: Arc<AtomicU64>,
    ) -> Self {
        Self {
            target_id,
            session_id,
            ws_tx,
            pending,
            request_id,
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Send a command on this page's session and await its response.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: Some(self.session_id.clone()),
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP session send: {}", json);

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.pending.lock().insert(id, PendingRequest { tx });

        {
            let mut ws = self.ws_tx.lock().await;
            ws.send(Message::Text(json.into())).await?;
        }

        match tokio::time::timeout(CALL_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("request {} timed out", method)))
            }
        }
    }

    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("DOM.enable", None).await?;
        self.call("Runtime.enable", None).await?;
        debug!("enabled CDP domains for session {}", self.session_id);
        Ok(())
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Navigate and block until the document is ready.
    pub async fn navigate(&self, url: &str) -> Result<(), CdpError> {
        let result = self.call("Page.navigate", Some(json!({"url": url}))).await?;

        if let Some(error) = result.get("errorText") {
            return Err(CdpError::NavigationFailed(
                error.as_str().unwrap_or("unknown error").to_string(),
            ));
        }

        self.wait_for_load(Duration::from_secs(20)).await?;
        debug!("navigated to {}", url);
        Ok(())
    }

    /// Poll `document.readyState` until the page settles.
    pub async fn wait_for_load(&self, timeout: Duration) -> Result<(), CdpError> {
        let start = Instant::now();
        loop {
            // A mid-navigation evaluate can fail transiently; keep polling.
            if let Ok(state) = self.evaluate("document.readyState").await {
                if matches!(state.as_str(), Some("complete") | Some("interactive")) {
                    return Ok(());
                }
            }
            if start.elapsed() > timeout {
                return Err(CdpError::Timeout("page load timed out".to_string()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Current location of the page.
    pub async fn current_url(&self) -> Result<String, CdpError> {
        let result = self.evaluate("window.location.href").await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    // ========================================================================
    // JavaScript
    // ========================================================================

    /// Evaluate an expression and return its value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["text"].as_str().unwrap_or("unknown error");
            return Err(CdpError::JavaScript(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }

    // ========================================================================
    // Locating
    // ========================================================================

    /// Find the first node matching a selector, if any.
    pub async fn query_selector(&self, selector: &str) -> Result<Option<i64>, CdpError> {
        let doc = self.call("DOM.getDocument", Some(json!({"depth": 0}))).await?;
        let root_id = doc["root"]["nodeId"]
            .as_i64()
            .ok_or_else(|| CdpError::InvalidResponse("missing document root".to_string()))?;

        let result = self
            .call(
                "DOM.querySelector",
                Some(json!({"nodeId": root_id, "selector": selector})),
            )
            .await?;

        match result["nodeId"].as_i64() {
            Some(0) | None => Ok(None),
            Some(id) => Ok(Some(id)),
        }
    }

    /// Poll for a selector until it appears or the timeout elapses.
    pub async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<i64, CdpError> {
        let start = Instant::now();
        loop {
            if let Some(node_id) = self.query_selector(selector).await? {
                return Ok(node_id);
            }
            if start.elapsed() > timeout {
                return Err(CdpError::Timeout(format!(
                    "waiting for selector '{}' timed out",
                    selector
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Box model of a node; `None` when the node has no layout (hidden).
    ///
    /// A stale node surfaces as a protocol error, which callers detect
    /// via [`CdpError::is_stale_node`].
    pub async fn get_box_model(&self, node_id: i64) -> Result<Option<BoxModel>, CdpError> {
        let result = self
            .call("DOM.getBoxModel", Some(json!({"nodeId": node_id})))
            .await;

        match result {
            Ok(r) => {
                let model: BoxModel = serde_json::from_value(r["model"].clone())?;
                Ok(Some(model))
            }
            // "Could not compute box model" means no layout; a vanished
            // node reports "Could not find node" instead and propagates.
            Err(CdpError::Protocol { code: -32000, message })
                if message.contains("box model") =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Dispatch a press/release pair at viewport coordinates.
    pub async fn click_at(&self, x: f64, y: f64) -> Result<(), CdpError> {
        for event_type in ["mousePressed", "mouseReleased"] {
            self.call(
                "Input.dispatchMouseEvent",
                Some(json!({
                    "type": event_type,
                    "x": x,
                    "y": y,
                    "button": "left",
                    "clickCount": 1,
                })),
            )
            .await?;
        }
        trace!("clicked at ({x}, {y})");
        Ok(())
    }

    /// Move the pointer to viewport coordinates.
    pub async fn mouse_move(&self, x: f64, y: f64) -> Result<(), CdpError> {
        self.call(
            "Input.dispatchMouseEvent",
            Some(json!({"type": "mouseMoved", "x": x, "y": y})),
        )
        .await?;
        Ok(())
    }

    /// Insert text into the focused element.
    pub async fn type_text(&self, text: &str) -> Result<(), CdpError> {
        self.call("Input.insertText", Some(json!({"text": text})))
            .await?;
        Ok(())
    }

    /// Focus a node.
    pub async fn focus(&self, node_id: i64) -> Result<(), CdpError> {
        self.call("DOM.focus", Some(json!({"nodeId": node_id})))
            .await?;
        Ok(())
    }

    /// Replace the value of an input: clear in-page, focus, type.
    ///
    /// `Input.insertText` types at the caret and a plain key event does
    /// not run Chrome's select-all editing command, so the field is
    /// emptied with a script first; otherwise successive fills of the
    /// same input (the modal search box) would concatenate.
    pub async fn fill(&self, selector: &str, value: &str) -> Result<(), CdpError> {
        let node_id = self
            .query_selector(selector)
            .await?
            .ok_or_else(|| CdpError::ElementNotFound(selector.to_string()))?;

        self.evaluate(&clear_value_js(selector)).await?;
        self.focus(node_id).await?;
        self.type_text(value).await?;
        Ok(())
    }
}

/// Script emptying an input's value. Fires an `input` event so
/// framework listeners observe the cleared state.
fn clear_value_js(selector: &str) -> String {
    let sel = serde_json::to_string(selector).expect("string serialization is infallible");
    format!(
        "(() => {{ const el = document.querySelector({sel}); \
         if (!el) return; el.value = ''; \
         el.dispatchEvent(new Event('input', {{bubbles: true}})); }})()"
    )
}
