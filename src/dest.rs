//! Destination-side creation: the admin UI form-fill sequence.
//!
//! [`DestinationSite`] is the seam the orchestrator retries against;
//! [`AdminDestination`] implements it over a live page session. Every
//! UI action goes through the interaction resilience layer.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cdp::{CdpError, PageSession};
use crate::collect::PageReader;
use crate::interact::{ClickOptions, InteractError, js_string, resilient_click};
use crate::model::{CustomResult, MatchType, fold_name};
use crate::selectors;
use crate::source::DestList;

const ELEMENT_WAIT: Duration = Duration::from_secs(15);
const MATCH_RESULT_WAIT: Duration = Duration::from_secs(10);
const CONFIRM_WAIT: Duration = Duration::from_secs(15);
const STEP_SETTLE: Duration = Duration::from_millis(200);

/// Errors during destination creation.
#[derive(Debug, Error)]
pub enum DestError {
    #[error(transparent)]
    Interact(#[from] InteractError),

    #[error(transparent)]
    Cdp(#[from] CdpError),

    /// The admin UI no longer matches the structural contract.
    #[error("admin UI structure mismatch: {0}")]
    DomContract(String),

    /// Post-submit confirmation timed out and the record is not visible.
    #[error("record '{0}' not confirmed after submit")]
    SubmitUnconfirmed(String),
}

/// The destination store as the orchestrator sees it.
///
/// `reset` is the single recovery primitive: force the session back to
/// the known list view. `create` runs one end-to-end creation sequence
/// and may fail transiently; the orchestrator owns the retry budget.
#[async_trait]
pub trait DestinationSite: Send {
    async fn reset(&mut self) -> Result<(), DestError>;

    async fn create(&mut self, record: &CustomResult) -> Result<(), DestError>;
}

/// Choose a dropdown option for a match type.
///
/// Cascade: exact label match, then substring match on the label's first
/// word, then the Broad option. `None` means not even Broad is present.
pub fn pick_option(labels: &[String], wanted: MatchType) -> Option<usize> {
    let wanted_label = wanted.option_label();

    if let Some(i) = labels.iter().position(|l| l.trim() == wanted_label) {
        return Some(i);
    }

    let first_word = wanted_label.split_whitespace().next().unwrap_or(wanted_label);
    if let Some(i) = labels.iter().position(|l| l.contains(first_word)) {
        return Some(i);
    }

    labels
        .iter()
        .position(|l| l.trim() == MatchType::Broad.option_label())
}

/// Live destination store driven over CDP.
pub struct AdminDestination<'a> {
    session: &'a PageSession,
    list_url: String,
}

impl<'a> AdminDestination<'a> {
    pub fn new(session: &'a PageSession, list_url: impl Into<String>) -> Self {
        Self {
            session,
            list_url: list_url.into(),
        }
    }

    /// Labels of the currently open dropdown menu, in document order.
    async fn open_menu_labels(&self) -> Result<Vec<String>, DestError> {
        let script = format!(
            r#"(() => {{
                const menu = document.querySelector({menu});
                if (!menu) return null;
                return Array.from(menu.querySelectorAll(".dropdown-item, a, button"))
                    .map(el => (el.textContent || "").trim());
            }})()"#,
            menu = js_string(selectors::OPEN_DROPDOWN_MENU)
        );
        let value = self.session.evaluate(&script).await?;
        if value.is_null() {
            return Err(DestError::DomContract("dropdown menu did not open".into()));
        }
        Ok(serde_json::from_value(value).map_err(CdpError::from)?)
    }

    /// Click the nth entry of the open dropdown menu.
    async fn click_menu_item(&self, index: usize) -> Result<(), DestError> {
        let script = format!(
            r#"(() => {{
                const menu = document.querySelector({menu});
                if (!menu) return false;
                const items = menu.querySelectorAll(".dropdown-item, a, button");
                if ({index} >= items.length) return false;
                items[{index}].click();
                return true;
            }})()"#,
            menu = js_string(selectors::OPEN_DROPDOWN_MENU),
            index = index,
        );
        let clicked = self.session.evaluate(&script).await?.as_bool().unwrap_or(false);
        if !clicked {
            return Err(DestError::DomContract(format!(
                "dropdown item {index} vanished before the click"
            )));
        }
        Ok(())
    }

    /// Open the match-type dropdown and select the option for `wanted`.
    async fn set_term_match_type(&self, wanted: MatchType) -> Result<(), DestError> {
        resilient_click(
            self.session,
            selectors::MATCH_DROPDOWN_BUTTON,
            "match-type dropdown",
            &ClickOptions::with_tries(4),
        )
        .await?;
        self.session
            .wait_for_selector(selectors::OPEN_DROPDOWN_MENU, ELEMENT_WAIT)
            .await?;
        tokio::time::sleep(STEP_SETTLE).await;

        let labels = self.open_menu_labels().await?;
        let index = pick_option(&labels, wanted).ok_or_else(|| {
            DestError::DomContract(format!(
                "no match-type option for {wanted} (menu offered {labels:?})"
            ))
        })?;
        self.click_menu_item(index).await?;
        tokio::time::sleep(STEP_SETTLE).await;
        Ok(())
    }

    /// Add every term of the record through the term entry controls.
    async fn add_terms(&self, record: &CustomResult) -> Result<(), DestError> {
        for term in &record.terms {
            self.set_term_match_type(term.match_type).await?;

            self.session
                .wait_for_selector(selectors::TERM_INPUT, ELEMENT_WAIT)
                .await?;
            self.session.fill(selectors::TERM_INPUT, &term.label).await?;

            resilient_click(
                self.session,
                selectors::ADD_TERM_BUTTON,
                "add term",
                &ClickOptions::with_tries(4),
            )
            .await?;
            tokio::time::sleep(STEP_SETTLE).await;
        }
        Ok(())
    }

    /// Open the include-items modal from the results dropdown.
    async fn open_include_modal(&self) -> Result<(), DestError> {
        resilient_click(
            self.session,
            selectors::INCLUDE_DROPDOWN_BUTTON,
            "include-items dropdown",
            &ClickOptions::with_tries(4),
        )
        .await?;
        self.session
            .wait_for_selector(selectors::OPEN_DROPDOWN_MENU, ELEMENT_WAIT)
            .await?;

        let script = format!(
            r#"(() => {{
                const menu = document.querySelector({menu});
                if (!menu) return false;
                const item = Array.from(menu.querySelectorAll("a"))
                    .find(a => (a.textContent || "").includes("Individual items"));
                if (!item) return false;
                item.click();
                return true;
            }})()"#,
            menu = js_string(selectors::OPEN_DROPDOWN_MENU)
        );
        let opened = self.session.evaluate(&script).await?.as_bool().unwrap_or(false);
        if !opened {
            return Err(DestError::DomContract(
                "'Individual items' entry missing from results dropdown".into(),
            ));
        }

        self.session
            .wait_for_selector(selectors::INCLUDE_MODAL_OPEN, ELEMENT_WAIT)
            .await?;
        tokio::time::sleep(STEP_SETTLE).await;
        Ok(())
    }

    /// Search for each product in the modal and select its first match.
    ///
    /// A product with zero matches is logged and skipped, never fatal.
    async fn add_products(&self, record: &CustomResult) -> Result<(), DestError> {
        if record.products.is_empty() {
            return Ok(());
        }

        self.open_include_modal().await?;

        for product in &record.products {
            self.session
                .fill(selectors::MODAL_SEARCH_INPUT, product)
                .await?;

            match self
                .session
                .wait_for_selector(selectors::MODAL_RESULT_LABEL, MATCH_RESULT_WAIT)
                .await
            {
                Ok(_) => {
                    let script = format!(
                        r#"(() => {{
                            const label = document.querySelector({label});
                            if (!label) return false;
                            label.click();
                            return true;
                        }})()"#,
                        label = js_string(selectors::MODAL_RESULT_LABEL)
                    );
                    let selected =
                        self.session.evaluate(&script).await?.as_bool().unwrap_or(false);
                    if !selected {
                        warn!("match for product {:?} vanished before selection", product);
                    }
                }
                Err(CdpError::Timeout(_)) => {
                    warn!("no matches found for product {:?}", product);
                }
                Err(e) => return Err(e.into()),
            }
            tokio::time::sleep(Duration::from_millis(300)).await;
        }

        self.session
            .wait_for_selector(selectors::MODAL_CONFIRM_BUTTON, ELEMENT_WAIT)
            .await?;
        resilient_click(
            self.session,
            selectors::MODAL_CONFIRM_BUTTON,
            "modal confirmation",
            &ClickOptions::with_tries(4),
        )
        .await?;
        tokio::time::sleep(Duration::from_millis(600)).await;
        Ok(())
    }

    /// Post-submit confirmation, resolving the timeout ambiguity by
    /// rechecking the list instead of assuming either outcome.
    async fn confirm_submission(&mut self, record: &CustomResult) -> Result<(), DestError> {
        match self
            .session
            .wait_for_selector(selectors::LIST_TABLE_BODY, CONFIRM_WAIT)
            .await
        {
            Ok(_) => Ok(()),
            Err(CdpError::Timeout(_)) => {
                warn!(
                    "no confirmation for {:?}; navigating back to recheck",
                    record.name
                );
                self.reset().await?;

                let names = DestList::new(self.session).capture_rows().await?;
                let key = record.dedup_key();
                if names.iter().any(|n| fold_name(n) == key) {
                    info!("{:?} is present after recheck, treating as created", record.name);
                    Ok(())
                } else {
                    // Only the visible page was checked; a retry that
                    // duplicates the record is caught by the admin UI.
                    Err(DestError::SubmitUnconfirmed(record.name.clone()))
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl DestinationSite for AdminDestination<'_> {
    async fn reset(&mut self) -> Result<(), DestError> {
        self.session.navigate(&self.list_url).await?;
        self.session
            .wait_for_selector(selectors::LIST_TABLE_BODY, ELEMENT_WAIT)
            .await?;
        Ok(())
    }

    async fn create(&mut self, record: &CustomResult) -> Result<(), DestError> {
        debug!("creating {:?}", record.name);

        resilient_click(
            self.session,
            selectors::ADD_RESULT_BUTTON,
            "add custom result",
            &ClickOptions::with_tries(6),
        )
        .await?;

        self.session
            .wait_for_selector(selectors::NAME_INPUT, ELEMENT_WAIT)
            .await?;
        self.session.fill(selectors::NAME_INPUT, &record.name).await?;

        self.add_terms(record).await?;
        self.add_products(record).await?;

        resilient_click(
            self.session,
            selectors::SUBMIT_BUTTON,
            "save custom result",
            &ClickOptions::with_tries(6),
        )
        .await?;

        self.confirm_submission(record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn picks_exact_label_first() {
        let menu = labels(&["Broad Match", "Exact Match", "Phrase Match"]);
        assert_eq!(pick_option(&menu, MatchType::Exact), Some(1));
        assert_eq!(pick_option(&menu, MatchType::Phrase), Some(2));
    }

    #[test]
    fn falls_back_to_first_word_substring() {
        let menu = labels(&["Broad matching", "Exact matching"]);
        assert_eq!(pick_option(&menu, MatchType::Exact), Some(1));
    }

    #[test]
    fn falls_back_to_broad_when_option_missing() {
        let menu = labels(&["Broad Match", "Phrase Match"]);
        assert_eq!(pick_option(&menu, MatchType::Exact), Some(0));
    }

    #[test]
    fn none_when_even_broad_is_missing() {
        let menu = labels(&["Something", "Else"]);
        assert_eq!(pick_option(&menu, MatchType::Exact), None);
    }
}
