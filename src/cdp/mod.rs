//! Chrome DevTools Protocol driver.
//!
//! The thinnest slice of CDP this tool needs: a WebSocket client with a
//! response-correlating receive loop, and a per-page session exposing
//! navigate / evaluate / locate / input primitives with bounded waits.
//! Higher layers treat these as fallible services and retry around them.

mod client;
mod error;
mod protocol;
mod session;

pub use client::CdpClient;
pub use error::CdpError;
pub use protocol::{BoxModel, BrowserVersion, PageInfo};
pub use session::PageSession;
