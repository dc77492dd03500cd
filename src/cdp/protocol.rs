//! CDP wire message and discovery endpoint types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outgoing CDP command.
#[derive(Debug, Serialize)]
pub struct CdpRequest {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Incoming CDP message: either a command response or an event.
///
/// Events carry a `method` instead of an `id`; the receive loop only
/// correlates responses, so the event-only fields are not modelled.
#[derive(Debug, Deserialize)]
pub struct CdpResponse {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<CdpErrorResponse>,
}

/// Error payload inside a CDP response.
#[derive(Debug, Deserialize)]
pub struct CdpErrorResponse {
    pub code: i64,
    pub message: String,
}

/// Page entry from the /json/list discovery endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub page_type: String,
    pub title: String,
    pub url: String,
}

/// Browser version info from /json/version.
///
/// This endpoint returns PascalCase field names.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser")]
    pub browser: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

/// Box model quads for a laid-out DOM node.
#[derive(Debug, Clone, Deserialize)]
pub struct BoxModel {
    pub content: Vec<f64>,
}

impl BoxModel {
    /// Center point of the content quad, in viewport coordinates.
    pub fn content_center(&self) -> (f64, f64) {
        quad_center(&self.content)
    }
}

/// Center of a quad given as `[x1,y1,x2,y2,x3,y3,x4,y4]`.
pub(crate) fn quad_center(quad: &[f64]) -> (f64, f64) {
    if quad.len() >= 8 {
        let x = (quad[0] + quad[2] + quad[4] + quad[6]) / 4.0;
        let y = (quad[1] + quad[3] + quad[5] + quad[7]) / 4.0;
        (x, y)
    } else {
        (0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_center_of_square() {
        let quad = [0.0, 0.0, 100.0, 0.0, 100.0, 100.0, 0.0, 100.0];
        assert_eq!(quad_center(&quad), (50.0, 50.0));
    }

    #[test]
    fn quad_center_of_short_quad_is_origin() {
        assert_eq!(quad_center(&[1.0, 2.0]), (0.0, 0.0));
    }

    #[test]
    fn request_omits_empty_session() {
        let req = CdpRequest {
            id: 7,
            method: "Page.navigate".to_string(),
            params: None,
            session_id: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("sessionId"));
        assert!(!json.contains("params"));
    }
}
