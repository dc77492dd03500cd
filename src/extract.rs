//! Record extraction from a loaded detail view.
//!
//! One injected script snapshots the three fields in a single driver
//! round-trip; a pure builder maps the snapshot to a [`CustomResult`].
//! Every field degrades independently: a missing container yields an
//! empty sequence, never an extraction failure.

use serde::Deserialize;
use serde_json::Value;

use crate::cdp::{CdpError, PageSession};
use crate::interact::js_string;
use crate::model::{CustomResult, MatchType, Term};
use crate::selectors;

/// Snapshot script over the detail-view selectors. Containers that are
/// absent come back as empty arrays, and each term carries its full text
/// as a label fallback.
fn detail_snapshot_js() -> String {
    format!(
        r#"
(() => {{
  const out = {{ name: "", placeholder: "", terms: [], products: [] }};

  const nameInput = document.querySelector({name_input});
  if (nameInput) {{
    out.name = nameInput.value || "";
    out.placeholder = nameInput.placeholder || "";
  }}

  const termsBox = document.querySelector({terms_container});
  if (termsBox) {{
    out.terms = Array.from(termsBox.querySelectorAll({term_item})).map(t => {{
      const labelEl = t.querySelector({term_label});
      return {{
        label: (labelEl ? labelEl.textContent : t.textContent) || "",
        marker: t.className || "",
      }};
    }});
  }}

  const productsBox = document.querySelector({products_container});
  if (productsBox) {{
    out.products = Array.from(
      productsBox.querySelectorAll({product_label})
    ).map(n => n.textContent || "");
  }}

  return out;
}})()
"#,
        name_input = js_string(selectors::NAME_INPUT),
        terms_container = js_string(selectors::TERMS_CONTAINER),
        term_item = js_string(selectors::TERM_ITEM),
        term_label = js_string(selectors::TERM_LABEL),
        products_container = js_string(selectors::PRODUCTS_CONTAINER),
        product_label = js_string(selectors::PRODUCT_LABEL),
    )
}

#[derive(Debug, Default, Deserialize)]
struct RawDetail {
    #[serde(default)]
    name: String,
    #[serde(default)]
    placeholder: String,
    #[serde(default)]
    terms: Vec<RawTerm>,
    #[serde(default)]
    products: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawTerm {
    #[serde(default)]
    label: String,
    #[serde(default)]
    marker: String,
}

/// Read the detail view currently loaded in the session.
pub async fn extract_custom_result(session: &PageSession) -> Result<CustomResult, CdpError> {
    let snapshot = session.evaluate(&detail_snapshot_js()).await?;
    Ok(build_record(snapshot))
}

/// Map a snapshot to the canonical record shape.
///
/// Tolerant by construction: malformed or missing fields collapse to
/// their empty forms rather than erroring.
pub fn build_record(snapshot: Value) -> CustomResult {
    let raw: RawDetail = serde_json::from_value(snapshot).unwrap_or_default();

    let name = {
        let value = raw.name.trim();
        if value.is_empty() {
            raw.placeholder.trim().to_string()
        } else {
            value.to_string()
        }
    };

    let terms = raw
        .terms
        .into_iter()
        .filter_map(|t| {
            let label = t.label.trim().to_string();
            if label.is_empty() {
                None
            } else {
                Some(Term {
                    label,
                    match_type: MatchType::from_marker(&t.marker),
                })
            }
        })
        .collect();

    let products = raw
        .products
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    CustomResult {
        name,
        terms,
        products,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_full_record() {
        let record = build_record(json!({
            "name": "Red Shoes",
            "placeholder": "",
            "terms": [
                {"label": " shoes ", "marker": "search-term term--exact"},
                {"label": "sneakers", "marker": "search-term term--phrase"},
            ],
            "products": [" SKU1 ", "SKU2"],
        }));

        assert_eq!(record.name, "Red Shoes");
        assert_eq!(
            record.terms,
            vec![
                Term::new("shoes", MatchType::Exact),
                Term::new("sneakers", MatchType::Phrase),
            ]
        );
        assert_eq!(record.products, vec!["SKU1", "SKU2"]);
    }

    #[test]
    fn missing_products_container_yields_empty_sequence() {
        // The snapshot script returns an empty array for an absent
        // container; name and terms still extract normally.
        let record = build_record(json!({
            "name": "No Products",
            "placeholder": "",
            "terms": [{"label": "bags", "marker": "term--broad"}],
            "products": [],
        }));

        assert_eq!(record.name, "No Products");
        assert_eq!(record.terms.len(), 1);
        assert!(record.products.is_empty());
    }

    #[test]
    fn name_falls_back_to_placeholder() {
        let record = build_record(json!({
            "name": "  ",
            "placeholder": "Autumn Promo",
            "terms": [],
            "products": [],
        }));
        assert_eq!(record.name, "Autumn Promo");
    }

    #[test]
    fn empty_term_labels_are_dropped() {
        let record = build_record(json!({
            "name": "X",
            "terms": [
                {"label": "   ", "marker": "term--exact"},
                {"label": "kept", "marker": ""},
            ],
            "products": [],
        }));
        assert_eq!(record.terms, vec![Term::new("kept", MatchType::Broad)]);
    }

    #[test]
    fn garbage_snapshot_degrades_to_empty_record() {
        let record = build_record(json!("not an object"));
        assert!(record.name.is_empty());
        assert!(record.terms.is_empty());
        assert!(record.products.is_empty());
    }
}
