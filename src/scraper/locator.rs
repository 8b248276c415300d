//! Absorbing DOM lookups.
//!
//! Everything the session reads off the page goes through these helpers.
//! They never return an error: a failed query (bad selector, stale scope,
//! closed page) is an empty result, and a failed per-element read skips
//! that element. Callers branch on emptiness.

use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;

type CdpResult<T> = Result<T, chromiumoxide::error::CdpError>;

/// A queryable DOM scope: the whole document or the subtree under one
/// element.
#[async_trait]
pub(crate) trait DomScope: Sync {
    async fn query(&self, selector: &str) -> CdpResult<Vec<Element>>;
}

#[async_trait]
impl DomScope for Page {
    async fn query(&self, selector: &str) -> CdpResult<Vec<Element>> {
        self.find_elements(selector).await
    }
}

#[async_trait]
impl DomScope for Element {
    async fn query(&self, selector: &str) -> CdpResult<Vec<Element>> {
        self.find_elements(selector).await
    }
}

/// All matches for `selector` in document order, or nothing.
pub(crate) async fn find_all<S: DomScope>(scope: &S, selector: &str) -> Vec<Element> {
    scope.query(selector).await.unwrap_or_default()
}

/// Trimmed text of the first match with non-empty text, or `""`.
pub(crate) async fn first_non_empty_text<S: DomScope>(scope: &S, selector: &str) -> String {
    for element in find_all(scope, selector).await {
        if let Ok(Some(text)) = element.inner_text().await {
            if let Some(text) = usable(&text) {
                return text;
            }
        }
    }
    String::new()
}

/// Trimmed value of `attr` on the first match carrying it non-empty, or `""`.
pub(crate) async fn first_non_empty_attr<S: DomScope>(
    scope: &S,
    selector: &str,
    attr: &str,
) -> String {
    for element in find_all(scope, selector).await {
        if let Ok(Some(value)) = element.attribute(attr).await {
            if let Some(value) = usable(&value) {
                return value;
            }
        }
    }
    String::new()
}

/// Trimmed copy of a raw DOM read, or nothing when only whitespace came back.
fn usable(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
