use bytes::Bytes;
use tracing::warn;
use url::Url;

use crate::error::Result;

/// Transforms a raw response body into the bytes that should be parsed as a
/// document, for sites whose real content arrives inside a wrapper format.
pub type ResponseReader = fn(Bytes) -> Bytes;

/// One watched retail page: pure data plus at most one injected transform.
#[derive(Clone)]
pub struct SiteDescriptor {
    /// Display name for the website
    pub name: &'static str,
    /// Page to poll
    pub url: Url,
    /// CSS selector locating the link element of any listed product
    pub selector: &'static str,
    /// Attribute to read the link from; `None` means `href`
    pub attribute: Option<&'static str>,
    /// Optional body transform applied before parsing
    pub response_reader: Option<ResponseReader>,
}

impl SiteDescriptor {
    pub fn new(name: &'static str, url: Url, selector: &'static str) -> Self {
        SiteDescriptor {
            name,
            url,
            selector,
            attribute: None,
            response_reader: None,
        }
    }

    pub fn attribute(mut self, attribute: &'static str) -> Self {
        self.attribute = Some(attribute);
        self
    }

    pub fn response_reader(mut self, reader: ResponseReader) -> Self {
        self.response_reader = Some(reader);
        self
    }
}

impl std::fmt::Debug for SiteDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteDescriptor")
            .field("name", &self.name)
            .field("url", &self.url.as_str())
            .field("selector", &self.selector)
            .field("attribute", &self.attribute)
            .field("response_reader", &self.response_reader.is_some())
            .finish()
    }
}

/// The built-in watch list.
pub fn default_sites() -> Result<Vec<SiteDescriptor>> {
    let sites = vec![
        SiteDescriptor::new(
            "ldlc.com",
            parse("https://www.ldlc.com/es-es/informatica/piezas-de-informatica/tarjeta-grafica/c4684/+fdi-1+fp-l49h958+fv1026-5801+fv121-19184,19365.html")?,
            "div.pdt-desc h3 a",
        ),
        SiteDescriptor::new(
            "Coolmod.com",
            parse("https://www.coolmod.com/tarjetas-gr%C3%A1ficas?f=9999::20077||571::RTX%203070||571::RTX%203080||571::RTX%203060%20Ti||prices::39-933||9995::relevance")?,
            "div.product-info a.product-name",
        ),
        SiteDescriptor::new(
            "VsGamers.es",
            parse("https://www.vsgamers.es/category/componentes/tarjetas-graficas?filter-modelo=rtxr-3060-ti-1268+rtxr-3070-1224+rtxr-3080-1225&to_price=921")?,
            "button.vs-product-card-buy",
        )
        .attribute("vs-cart-action"),
        SiteDescriptor::new(
            "Neobyte.es",
            parse("https://www.neobyte.es/modules/blocklayered_mod/blocklayered_mod-ajax.php?layered_id_feature_327=327_1084071049&layered_id_feature_289=289_1084071049&layered_id_feature_290=290_1084071049&id_category_layered=111&layered_price_slider=30_904&orderby=quantity&orderway=desc&n=32")?,
            "div.right-block h5.product-name-container a",
        )
        .response_reader(json_product_list),
    ];

    Ok(sites)
}

fn parse(raw: &str) -> Result<Url> {
    Ok(Url::parse(raw)?)
}

/// Unwraps the HTML that Neobyte's product-filter ajax endpoint returns
/// inside a JSON envelope (`{"productList": "<html...>"}`).
///
/// Malformed input never fails the poll: anything that does not match the
/// expected shape is logged and passed through unchanged, since the raw body
/// might still be parseable as a document.
pub fn json_product_list(body: Bytes) -> Bytes {
    match body.first() {
        Some(b'{') => {}
        first => {
            warn!(
                response_first_char = ?first.map(|b| *b as char),
                "JSON response expected but it was not"
            );
            return body;
        }
    }

    let parsed: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(err) => {
            warn!(error = %err, "failed to parse JSON response envelope");
            return body;
        }
    };

    match parsed.get("productList").and_then(|v| v.as_str()) {
        Some(html) => Bytes::from(html.to_owned()),
        None => {
            warn!("expected productList JSON field in response but was not present");
            body
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sites_parse() {
        let sites = default_sites().unwrap();
        assert_eq!(sites.len(), 4);

        // Every target is an absolute http(s) URL.
        for site in &sites {
            assert!(site.url.has_host(), "{} must have a host", site.name);
        }

        let vsgamers = &sites[2];
        assert_eq!(vsgamers.attribute, Some("vs-cart-action"));

        let neobyte = &sites[3];
        assert!(neobyte.response_reader.is_some());
    }

    #[test]
    fn test_json_product_list_unwraps_html() {
        let body = Bytes::from(r#"{"productList": "<div><a href=\"/p/1\">GPU</a></div>"}"#);
        let out = json_product_list(body);
        assert_eq!(out, Bytes::from(r#"<div><a href="/p/1">GPU</a></div>"#));
    }

    #[test]
    fn test_json_product_list_not_json_passthrough() {
        let body = Bytes::from("<html><body>plain page</body></html>");
        let out = json_product_list(body.clone());
        assert_eq!(out, body);
    }

    #[test]
    fn test_json_product_list_empty_passthrough() {
        let body = Bytes::new();
        let out = json_product_list(body.clone());
        assert_eq!(out, body);
    }

    #[test]
    fn test_json_product_list_invalid_json_passthrough() {
        let body = Bytes::from("{not valid json");
        let out = json_product_list(body.clone());
        assert_eq!(out, body);
    }

    #[test]
    fn test_json_product_list_missing_field_passthrough() {
        let body = Bytes::from(r#"{"somethingElse": "value"}"#);
        let out = json_product_list(body.clone());
        assert_eq!(out, body);
    }
}
