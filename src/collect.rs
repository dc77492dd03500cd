//! Assisted pagination: the cooperative page-capture loop.
//!
//! The admin UI's login and pagination are operator-driven, so collection
//! is a rendezvous: block until the operator says the visible page is
//! ready, capture every row of it, merge by a dedup key, repeat until the
//! operator sends a stop token. Re-capturing a page contributes nothing.

use std::collections::HashSet;
use std::hash::Hash;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cdp::CdpError;
use crate::console::{OperatorConsole, Signal};

/// Errors from the collection protocol. Capture failures are absorbed
/// inside the loop; only the operator channel can abort collection.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("operator console error: {0}")]
    Console(#[from] std::io::Error),
}

/// Reads every row of the currently visible listing page.
///
/// Implementations skip malformed rows themselves; a single bad row never
/// aborts a capture.
#[async_trait]
pub trait PageReader: Send {
    type Row: Send;

    async fn capture_rows(&mut self) -> Result<Vec<Self::Row>, CdpError>;
}

/// Order-preserving accumulator deduplicated by key.
pub struct Accumulator<T, K> {
    items: Vec<T>,
    seen: HashSet<K>,
}

impl<T, K: Eq + Hash> Accumulator<T, K> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Merge a captured page, keeping first-seen order. Returns how many
    /// rows were new.
    pub fn merge(&mut self, rows: Vec<T>, key_of: impl Fn(&T) -> K) -> usize {
        let mut added = 0;
        for row in rows {
            if self.seen.insert(key_of(&row)) {
                self.items.push(row);
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T, K: Eq + Hash> Default for Accumulator<T, K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the assisted capture loop until the operator stops it.
///
/// `label` names the phase in prompts (e.g. "SOURCE", "DESTINATION").
pub async fn collect_pages<R, K>(
    console: &mut dyn OperatorConsole,
    reader: &mut R,
    label: &str,
    key_of: impl Fn(&R::Row) -> K,
) -> Result<Vec<R::Row>, CollectError>
where
    R: PageReader,
    K: Eq + Hash,
{
    let mut acc = Accumulator::new();
    let mut page_idx = 1u32;

    loop {
        let prompt = format!(
            "[{label}] Page {page_idx}: ENTER to capture this page, or type 'fin' to finish:"
        );
        if console.await_signal(&prompt).await? == Signal::Stop {
            break;
        }

        match reader.capture_rows().await {
            Ok(rows) => {
                let captured = rows.len();
                let added = acc.merge(rows, &key_of);
                debug!("page {}: {} rows, {} new", page_idx, captured, added);
                console.notify(&format!(
                    "  captured {added} new (total {}). Move to the next page and press \
                     ENTER, or type 'fin' when done.",
                    acc.len()
                ));
            }
            Err(e) => {
                // The operator may still be logging in or on the wrong
                // view; let them fix it and capture again.
                warn!("page capture failed: {}", e);
                console.notify(&format!(
                    "  capture failed ({e}); make sure the list is visible, then press ENTER again."
                ));
            }
        }
        page_idx += 1;
    }

    Ok(acc.into_items())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_is_idempotent() {
        let mut acc: Accumulator<(String, String), String> = Accumulator::new();
        let page = vec![
            ("A".to_string(), "https://x/1".to_string()),
            ("B".to_string(), "https://x/2".to_string()),
        ];
        assert_eq!(acc.merge(page.clone(), |r| r.1.clone()), 2);
        assert_eq!(acc.merge(page, |r| r.1.clone()), 0);
        assert_eq!(acc.len(), 2);
    }

    #[test]
    fn merge_preserves_discovery_order() {
        let mut acc: Accumulator<&str, String> = Accumulator::new();
        acc.merge(vec!["b", "a"], |r| r.to_string());
        acc.merge(vec!["c", "a"], |r| r.to_string());
        assert_eq!(acc.into_items(), vec!["b", "a", "c"]);
    }

    #[test]
    fn case_folded_key_dedupes_names() {
        let mut acc: Accumulator<String, String> = Accumulator::new();
        acc.merge(vec!["Summer Sale".to_string()], |r| r.to_lowercase());
        let added = acc.merge(vec!["SUMMER SALE".to_string()], |r| r.to_lowercase());
        assert_eq!(added, 0);
        assert_eq!(acc.len(), 1);
    }
}
