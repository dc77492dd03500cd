//! Interaction resilience layer.
//!
//! Makes a single click succeed against a live admin UI despite sticky
//! headers, overlays, and DOM churn. Each attempt relocates the element,
//! scrolls it clear of the fixed top bar, and walks an ordered strategy
//! cascade from the most realistic click to the most robust one.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::cdp::{CdpError, PageSession};
use crate::selectors;

/// Errors surfaced by the resilience layer.
#[derive(Debug, Error)]
pub enum InteractError {
    /// Every attempt and fallback failed.
    #[error("could not click {description} after {attempts} attempts: {last}")]
    Exhausted {
        description: String,
        attempts: u32,
        last: String,
    },

    #[error(transparent)]
    Cdp(#[from] CdpError),
}

/// Click strategies, ordered cheapest/most realistic first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickStrategy {
    /// Coordinate click, gated by an occlusion hit-test.
    Native,
    /// Pointer move, pause, then coordinate click.
    PointerSequence,
    /// Direct `element.click()`; immune to occlusion.
    ScriptInvoke,
}

/// The fallback cascade. Order is a specificity-vs-robustness trade-off.
pub const CLICK_CASCADE: [ClickStrategy; 3] = [
    ClickStrategy::Native,
    ClickStrategy::PointerSequence,
    ClickStrategy::ScriptInvoke,
];

/// Tuning for a resilient click.
#[derive(Debug, Clone)]
pub struct ClickOptions {
    /// Whole-cycle attempts before giving up.
    pub max_tries: u32,
    /// Bounded wait for the element to exist, per attempt.
    pub locate_timeout: Duration,
    /// Delay between attempts, letting transient DOM churn settle.
    pub settle_delay: Duration,
    /// Extra upward scroll beyond the measured header height.
    pub header_margin_px: i64,
}

impl Default for ClickOptions {
    fn default() -> Self {
        Self {
            max_tries: 5,
            locate_timeout: Duration::from_secs(15),
            settle_delay: Duration::from_millis(400),
            header_margin_px: 120,
        }
    }
}

impl ClickOptions {
    pub fn with_tries(max_tries: u32) -> Self {
        Self {
            max_tries,
            ..Default::default()
        }
    }
}

/// Embed a string into injected JavaScript as a literal.
pub(crate) fn js_string(s: &str) -> String {
    serde_json::to_string(s).expect("string serialization is infallible")
}

/// Click the element matched by `selector`, retrying through the cascade.
///
/// Returns after exactly one successful click, or fails with
/// [`InteractError::Exhausted`] once `max_tries` cycles are spent.
pub async fn resilient_click(
    session: &PageSession,
    selector: &str,
    description: &str,
    opts: &ClickOptions,
) -> Result<(), InteractError> {
    let mut last = String::from("element never located");

    for attempt in 1..=opts.max_tries {
        match click_once(session, selector, opts).await {
            Ok(()) => {
                trace!("clicked {} on attempt {}", description, attempt);
                return Ok(());
            }
            Err(e) => {
                if e.is_stale_node() {
                    // The node was replaced mid-attempt; the next cycle
                    // relocates it from scratch.
                    debug!("{} went stale (attempt {}/{})", description, attempt, opts.max_tries);
                } else {
                    debug!(
                        "click on {} failed (attempt {}/{}): {}",
                        description, attempt, opts.max_tries, e
                    );
                }
                last = e.to_string();
            }
        }
        tokio::time::sleep(opts.settle_delay).await;
    }

    warn!("giving up on {} after {} attempts", description, opts.max_tries);
    Err(InteractError::Exhausted {
        description: description.to_string(),
        attempts: opts.max_tries,
        last,
    })
}

/// One full cycle: locate, scroll clear of the header, run the cascade.
async fn click_once(
    session: &PageSession,
    selector: &str,
    opts: &ClickOptions,
) -> Result<(), CdpError> {
    let node_id = session
        .wait_for_selector(selector, opts.locate_timeout)
        .await?;

    scroll_clear_of_header(session, selector, opts.header_margin_px).await?;

    let model = session
        .get_box_model(node_id)
        .await?
        .ok_or_else(|| CdpError::ElementNotFound(format!("{} (no layout)", selector)))?;
    let (x, y) = model.content_center();

    for strategy in CLICK_CASCADE {
        match try_strategy(session, strategy, selector, x, y).await? {
            Outcome::Clicked => return Ok(()),
            Outcome::Occluded => continue,
        }
    }

    // ScriptInvoke cannot report occlusion, so this is unreachable in
    // practice; keep a clear error for safety.
    Err(CdpError::ElementNotFound(format!("{} (cascade fell through)", selector)))
}

enum Outcome {
    Clicked,
    Occluded,
}

async fn try_strategy(
    session: &PageSession,
    strategy: ClickStrategy,
    selector: &str,
    x: f64,
    y: f64,
) -> Result<Outcome, CdpError> {
    match strategy {
        ClickStrategy::Native => {
            if !hit_test(session, selector, x, y).await? {
                return Ok(Outcome::Occluded);
            }
            session.click_at(x, y).await?;
            Ok(Outcome::Clicked)
        }
        ClickStrategy::PointerSequence => {
            // Hovering can dismiss tooltips and collapse overlays; give
            // the page a beat, then re-check before committing the click.
            session.mouse_move(x, y).await?;
            tokio::time::sleep(Duration::from_millis(50)).await;
            if !hit_test(session, selector, x, y).await? {
                return Ok(Outcome::Occluded);
            }
            session.click_at(x, y).await?;
            Ok(Outcome::Clicked)
        }
        ClickStrategy::ScriptInvoke => {
            let script = format!(
                "(() => {{ const el = document.querySelector({sel}); \
                 if (!el) throw new Error('element vanished'); el.click(); return true; }})()",
                sel = js_string(selector)
            );
            session.evaluate(&script).await?;
            Ok(Outcome::Clicked)
        }
    }
}

/// Scroll the element to the viewport center, then nudge upward past the
/// sticky top bar. A bare center-scroll can leave the target underneath it.
async fn scroll_clear_of_header(
    session: &PageSession,
    selector: &str,
    margin_px: i64,
) -> Result<(), CdpError> {
    let script = format!(
        "(() => {{ const el = document.querySelector({sel}); \
         if (el) el.scrollIntoView({{block: 'center'}}); }})()",
        sel = js_string(selector)
    );
    session.evaluate(&script).await?;

    let offset = header_height(session).await + margin_px;
    session
        .evaluate(&format!("window.scrollBy(0, -{offset})"))
        .await?;
    Ok(())
}

/// Measured height of the fixed overlay header, defaulting when absent.
async fn header_height(session: &PageSession) -> i64 {
    let script = format!(
        "(() => {{ const el = document.querySelector({sel}); \
         return el ? Math.ceil(el.getBoundingClientRect().height) : 80; }})()",
        sel = js_string(selectors::TOP_BAR)
    );
    match session.evaluate(&script).await {
        Ok(Value::Number(n)) => n.as_i64().unwrap_or(80),
        _ => 80,
    }
}

/// Whether the element (or a descendant) actually receives a click at
/// the given point. A miss means something occludes the target.
async fn hit_test(
    session: &PageSession,
    selector: &str,
    x: f64,
    y: f64,
) -> Result<bool, CdpError> {
    let script = format!(
        "(() => {{ const el = document.querySelector({sel}); \
         if (!el) return false; \
         const hit = document.elementFromPoint({x}, {y}); \
         return hit !== null && (hit === el || el.contains(hit)); }})()",
        sel = js_string(selector)
    );
    Ok(session.evaluate(&script).await?.as_bool().unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cascade_runs_cheapest_first() {
        assert_eq!(
            CLICK_CASCADE,
            [
                ClickStrategy::Native,
                ClickStrategy::PointerSequence,
                ClickStrategy::ScriptInvoke,
            ]
        );
    }

    #[test]
    fn js_string_escapes_quotes() {
        assert_eq!(js_string("a\"b"), r#""a\"b""#);
        assert_eq!(js_string("td[data-field='name'] a"), r#""td[data-field='name'] a""#);
    }

    #[test]
    fn default_options_are_bounded() {
        let opts = ClickOptions::default();
        assert_eq!(opts.max_tries, 5);
        assert!(opts.locate_timeout > Duration::ZERO);
        assert_eq!(ClickOptions::with_tries(6).max_tries, 6);
    }
}
