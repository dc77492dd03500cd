//! Listing-page readers and the source-side extraction walk.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cdp::{CdpError, PageSession};
use crate::collect::PageReader;
use crate::extract;
use crate::interact::js_string;
use crate::model::{CustomResult, ResultIdentity};
use crate::selectors;

const TABLE_WAIT: Duration = Duration::from_secs(30);
const DETAIL_WAIT: Duration = Duration::from_secs(30);

/// Admin links are occasionally emitted over plain http.
pub fn force_https(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

/// Script reading every row of the visible listing table. Rows without a
/// usable name link are filtered out here, so one malformed row never
/// aborts a capture.
fn listing_rows_js() -> String {
    format!(
        r#"
(() => {{
  const body = document.querySelector({table_body});
  if (!body) return [];
  return Array.from(body.querySelectorAll("tr"))
    .map(row => {{
      const link = row.querySelector({name_link});
      if (!link) return null;
      const name = (link.textContent || "").trim();
      const href = link.href || "";
      return name && href ? {{ name, href }} : null;
    }})
    .filter(entry => entry !== null);
}})()
"#,
        table_body = js_string(selectors::LIST_TABLE_BODY),
        name_link = js_string(selectors::ROW_NAME_LINK),
    )
}

/// Reads `(name, href)` identities from a source listing page.
pub struct SourceList<'a> {
    session: &'a PageSession,
}

impl<'a> SourceList<'a> {
    pub fn new(session: &'a PageSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl PageReader for SourceList<'_> {
    type Row = ResultIdentity;

    async fn capture_rows(&mut self) -> Result<Vec<ResultIdentity>, CdpError> {
        self.session
            .wait_for_selector(selectors::LIST_TABLE_BODY, TABLE_WAIT)
            .await?;
        let value = self.session.evaluate(&listing_rows_js()).await?;
        let mut rows: Vec<ResultIdentity> = serde_json::from_value(value)?;
        for row in &mut rows {
            row.href = force_https(&row.href);
        }
        Ok(rows)
    }
}

/// Reads bare display names from a destination listing page.
pub struct DestList<'a> {
    session: &'a PageSession,
}

impl<'a> DestList<'a> {
    pub fn new(session: &'a PageSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl PageReader for DestList<'_> {
    type Row = String;

    async fn capture_rows(&mut self) -> Result<Vec<String>, CdpError> {
        self.session
            .wait_for_selector(selectors::LIST_TABLE_BODY, TABLE_WAIT)
            .await?;
        let value = self.session.evaluate(&listing_rows_js()).await?;
        let rows: Vec<ResultIdentity> = serde_json::from_value(value)?;
        Ok(rows.into_iter().map(|r| r.name).collect())
    }
}

/// Walk every collected identity and extract its record.
///
/// The extracted name falls back to the identity's display name: the
/// identity was captured from a rendered row and is reliable even when
/// the detail view's own name field has not populated yet.
pub async fn extract_all(
    session: &PageSession,
    identities: &[ResultIdentity],
) -> Result<Vec<CustomResult>, CdpError> {
    let total = identities.len();
    let mut records = Vec::with_capacity(total);

    for (i, identity) in identities.iter().enumerate() {
        info!("reading ({}/{}) {}", i + 1, total, identity.name);
        session.navigate(&identity.href).await?;
        session
            .wait_for_selector(selectors::DETAIL_READY, DETAIL_WAIT)
            .await?;

        let mut record = extract::extract_custom_result(session).await?;
        if !record.has_name() {
            debug!("detail name empty, using listing name {:?}", identity.name);
            record.name = identity.name.clone();
        }
        records.push(record);
    }

    Ok(records)
}

/// Best-effort dismissal of common consent banners. Never fails the run.
pub async fn dismiss_cookie_banner(session: &PageSession) {
    const SCRIPT: &str = r#"
(() => {
  const wanted = ["accept all", "akzeptieren", "zustimmen"];
  const candidates = document.querySelectorAll("button, [role='button']");
  for (const el of candidates) {
    const text = (el.textContent || "").trim().toLowerCase();
    if (wanted.some(w => text === w || text.includes(w))) {
      el.click();
      return true;
    }
  }
  return false;
})()
"#;
    match session.evaluate(SCRIPT).await {
        Ok(Value::Bool(true)) => debug!("dismissed a consent banner"),
        Ok(_) => {}
        Err(e) => warn!("consent banner check failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_https_rewrites_plain_http() {
        assert_eq!(
            force_https("http://admin.example.com/x"),
            "https://admin.example.com/x"
        );
        assert_eq!(
            force_https("https://admin.example.com/x"),
            "https://admin.example.com/x"
        );
        assert_eq!(force_https("/relative"), "/relative");
    }

    #[test]
    fn listing_script_embeds_the_contract() {
        let js = listing_rows_js();
        assert!(js.contains(selectors::LIST_TABLE_BODY));
        assert!(js.contains("td[data-field='name'] a"));
    }
}
