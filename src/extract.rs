use std::collections::HashMap;

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::cache::DedupCache;
use crate::error::{AppError, Result};
use crate::sites::SiteDescriptor;

/// Attribute the product link is read from when a site does not override it.
const DEFAULT_LINK_ATTRIBUTE: &str = "href";

/// One element matched by a site's selector, detached from the document:
/// its attributes plus the first text inside it. This is the seam between
/// the selector engine and product extraction, so tests can construct
/// elements directly.
#[derive(Debug, Clone, Default)]
pub struct ExtractedElement {
    pub attrs: HashMap<String, String>,
    pub text: Option<String>,
}

/// Parses `body` as an HTML document and evaluates the CSS selector against
/// it. Zero matches is `Ok(vec![])`; only a malformed selector is an error.
pub fn select_elements(body: &[u8], selector: &str) -> Result<Vec<ExtractedElement>> {
    let html = String::from_utf8_lossy(body);
    let document = Html::parse_document(&html);

    let css_selector = Selector::parse(selector).map_err(|_| AppError::InvalidSelector {
        selector: selector.to_string(),
    })?;

    let elements = document
        .select(&css_selector)
        .map(|element| {
            let attrs = element
                .value()
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect();
            let text = element
                .text()
                .map(str::trim)
                .find(|t| !t.is_empty())
                .map(str::to_string);

            ExtractedElement { attrs, text }
        })
        .collect();

    Ok(elements)
}

/// Derives displayable product lines from matched elements, consulting and
/// updating the dedup cache. Output preserves element order. Elements whose
/// link is already cached, or that carry no link at all, produce nothing.
pub fn extract_products(
    site: &SiteDescriptor,
    elements: &[ExtractedElement],
    cache: &DedupCache,
) -> Vec<String> {
    let attribute = site.attribute.unwrap_or(DEFAULT_LINK_ATTRIBUTE);

    let mut products = Vec::new();
    for element in elements {
        let raw_link = match element.attrs.get(attribute) {
            Some(raw) if !raw.is_empty() => raw,
            _ => continue,
        };
        let link = normalize_link(site, raw_link);

        let title = element
            .attrs
            .get("title")
            .filter(|t| !t.is_empty())
            .cloned()
            .or_else(|| element.text.clone())
            .unwrap_or_default();

        if cache.get(&link) {
            debug!(link = %link, "found stock but notification is skipped as it was already notified");
            continue;
        }
        cache.set(link.clone());

        if title.is_empty() {
            products.push(link);
        } else {
            products.push(format!("{title}:\t{link}"));
        }
    }

    products
}

/// Best-effort absolute-link normalization: an already-absolute value is
/// kept as parsed; anything else is glued onto the site's scheme and host
/// as a path. Not full RFC reference resolution.
fn normalize_link(site: &SiteDescriptor, raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => url.into(),
        // &url[..BeforePath] is "scheme://host[:port]" without the path.
        Err(_) => format!("{}{}", &site.url[..url::Position::BeforePath], raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_site() -> SiteDescriptor {
        SiteDescriptor::new(
            "example",
            Url::parse("https://example.com/cat").unwrap(),
            "a.product",
        )
    }

    fn element(attrs: &[(&str, &str)], text: Option<&str>) -> ExtractedElement {
        ExtractedElement {
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            text: text.map(str::to_string),
        }
    }

    fn fresh_cache() -> DedupCache {
        DedupCache::new(Duration::from_secs(600))
    }

    #[test]
    fn test_select_elements_matches_in_document_order() {
        let html = r#"
            <html><body>
                <div><a class="product" href="/p/1" title="GPU One">GPU One</a></div>
                <div><a class="product" href="/p/2">GPU Two</a></div>
                <div><a class="other" href="/p/3">Unrelated</a></div>
            </body></html>
        "#;

        let elements = select_elements(html.as_bytes(), "a.product").unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].attrs.get("href").unwrap(), "/p/1");
        assert_eq!(elements[0].attrs.get("title").unwrap(), "GPU One");
        assert_eq!(elements[1].attrs.get("href").unwrap(), "/p/2");
        assert_eq!(elements[1].text.as_deref(), Some("GPU Two"));
    }

    #[test]
    fn test_select_elements_zero_matches() {
        let html = "<html><body><p>sold out</p></body></html>";
        let elements = select_elements(html.as_bytes(), "a.product").unwrap();
        assert!(elements.is_empty());
    }

    #[test]
    fn test_select_elements_invalid_selector() {
        let result = select_elements(b"<html></html>", ">>>");
        assert!(matches!(
            result,
            Err(AppError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_relative_link_is_made_absolute() {
        let site = test_site();
        let cache = fresh_cache();
        let elements = [element(&[("href", "/p/123")], Some("Widget"))];

        let products = extract_products(&site, &elements, &cache);
        assert_eq!(products, vec!["Widget:\thttps://example.com/p/123"]);
    }

    #[test]
    fn test_absolute_link_kept() {
        let site = test_site();
        let cache = fresh_cache();
        let elements = [element(&[("href", "https://cdn.example.org/p/9")], None)];

        let products = extract_products(&site, &elements, &cache);
        assert_eq!(products, vec!["https://cdn.example.org/p/9"]);
    }

    #[test]
    fn test_title_fallback_chain() {
        let site = test_site();
        let cache = fresh_cache();
        let elements = [
            element(&[("href", "/p/1"), ("title", "Explicit")], Some("Text")),
            element(&[("href", "/p/2")], Some("Widget")),
            element(&[("href", "/p/3")], None),
        ];

        let products = extract_products(&site, &elements, &cache);
        assert_eq!(
            products,
            vec![
                "Explicit:\thttps://example.com/p/1",
                "Widget:\thttps://example.com/p/2",
                "https://example.com/p/3",
            ]
        );
    }

    #[test]
    fn test_attribute_override() {
        let site = test_site().attribute("vs-cart-action");
        let cache = fresh_cache();
        let elements = [element(
            &[("vs-cart-action", "/cart/add/42"), ("href", "/ignored")],
            Some("RTX 3080"),
        )];

        let products = extract_products(&site, &elements, &cache);
        assert_eq!(products, vec!["RTX 3080:\thttps://example.com/cart/add/42"]);
    }

    #[test]
    fn test_element_without_link_is_skipped() {
        let site = test_site();
        let cache = fresh_cache();
        let elements = [
            element(&[("title", "No link")], None),
            element(&[("href", "")], Some("Empty link")),
            element(&[("href", "/p/1")], Some("Real")),
        ];

        let products = extract_products(&site, &elements, &cache);
        assert_eq!(products, vec!["Real:\thttps://example.com/p/1"]);
    }

    #[test]
    fn test_dedup_idempotence() {
        let site = test_site();
        let cache = fresh_cache();
        let elements = [
            element(&[("href", "/p/1")], Some("One")),
            element(&[("href", "/p/2")], Some("Two")),
        ];

        let first = extract_products(&site, &elements, &cache);
        assert_eq!(first.len(), 2);

        let second = extract_products(&site, &elements, &cache);
        assert!(second.is_empty());
    }

    #[test]
    fn test_dedup_expiry_readmits_link() {
        let site = test_site();
        let cache = DedupCache::new(Duration::from_millis(30));
        let elements = [element(&[("href", "/p/1")], Some("One"))];

        assert_eq!(extract_products(&site, &elements, &cache).len(), 1);
        assert!(extract_products(&site, &elements, &cache).is_empty());

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(extract_products(&site, &elements, &cache).len(), 1);
    }

    #[test]
    fn test_end_to_end_select_then_extract() {
        let html = r#"
            <div class="pdt-desc"><h3>
                <a class="product" href="/p/1" title="RTX 3070">RTX 3070</a>
            </h3></div>
            <div class="pdt-desc"><h3>
                <a class="product" href="/p/2">RTX 3080</a>
            </h3></div>
        "#;
        let site = test_site();
        let cache = fresh_cache();

        let elements = select_elements(html.as_bytes(), "a.product").unwrap();
        let products = extract_products(&site, &elements, &cache);
        assert_eq!(
            products,
            vec![
                "RTX 3070:\thttps://example.com/p/1",
                "RTX 3080:\thttps://example.com/p/2",
            ]
        );
        assert!(cache.get("https://example.com/p/1"));
        assert!(cache.get("https://example.com/p/2"));

        let repeat = extract_products(&site, &elements, &cache);
        assert!(repeat.is_empty());
    }
}
