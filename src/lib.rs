//! Assisted migration of custom search results between admin stores.
//!
//! The target admin UI exposes no API, so the tool drives a real browser
//! over the Chrome DevTools Protocol and turns unreliable, timing-sensitive
//! UI interaction into a deterministic batch job:
//!
//! - a resilience layer that makes a single click survive overlays,
//!   occlusion, and DOM staleness ([`interact`]);
//! - an operator-paced, idempotent page-capture protocol for listings the
//!   tool cannot paginate itself ([`collect`], [`console`]);
//! - fault-tolerant per-field extraction of detail views ([`extract`]);
//! - an idempotent, partial-failure-tolerant creation pipeline with
//!   bounded retry and a uniform reset-to-list recovery ([`migrate`],
//!   [`dest`]).

pub mod app;
pub mod backup;
pub mod browser;
pub mod cdp;
pub mod collect;
pub mod console;
pub mod dest;
pub mod extract;
pub mod interact;
pub mod migrate;
pub mod model;
pub mod selectors;
pub mod source;
