use reqwest::header;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::DedupCache;
use crate::error::Result;
use crate::extract::{extract_products, select_elements};
use crate::notify::Notifier;
use crate::sites::SiteDescriptor;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_4) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/83.0.4099.0 Safari/537.36";
const ACCEPT_LANGUAGE: &str = "es,es-ES;q=0.9,es;q=0.8,fr;q=0.7";

/// Polls one site and sends at most one notification for whatever new stock
/// it finds.
///
/// Every fetch/parse/select problem is contained here: the site is logged
/// and skipped until the next cycle, and the function returns `Ok(())`. The
/// only error that escapes is a notification-delivery failure, which the
/// caller treats as fatal.
pub async fn poll_site(
    site: &SiteDescriptor,
    client: &Client,
    cancel: &CancellationToken,
    cache: &DedupCache,
    notifier: &dyn Notifier,
) -> Result<()> {
    debug!(site = site.name, "polling");

    let request = client
        .get(site.url.clone())
        .header(header::CONNECTION, "keep-alive")
        .header(header::USER_AGENT, USER_AGENT)
        .header(header::REFERER, site.url.as_str())
        .header(header::ACCEPT_LANGUAGE, ACCEPT_LANGUAGE);

    let response = tokio::select! {
        _ = cancel.cancelled() => {
            debug!(site = site.name, "poll cancelled before the request finished");
            return Ok(());
        }
        result = request.send() => match result {
            Ok(response) => response,
            Err(err) => {
                error!(
                    site = site.name,
                    url = %site.url,
                    selector = site.selector,
                    error = %err,
                    "error making http request"
                );
                return Ok(());
            }
        }
    };

    let body = tokio::select! {
        _ = cancel.cancelled() => {
            debug!(site = site.name, "poll cancelled while reading the response body");
            return Ok(());
        }
        result = response.bytes() => match result {
            Ok(body) => body,
            Err(err) => {
                error!(
                    site = site.name,
                    url = %site.url,
                    selector = site.selector,
                    error = %err,
                    "error reading response body"
                );
                return Ok(());
            }
        }
    };

    let body = match site.response_reader {
        Some(reader) => reader(body),
        None => body,
    };

    let elements = match select_elements(&body, site.selector) {
        Ok(elements) => elements,
        Err(err) => {
            warn!(
                site = site.name,
                url = %site.url,
                selector = site.selector,
                error = %err,
                "invalid content"
            );
            return Ok(());
        }
    };

    if elements.is_empty() {
        info!(
            site = site.name,
            url = %site.url,
            selector = site.selector,
            reason = "selector_not_found",
            "no stock available"
        );
        return Ok(());
    }

    let products = extract_products(site, &elements, cache);
    if products.is_empty() {
        info!(
            site = site.name,
            url = %site.url,
            selector = site.selector,
            reason = "products_not_found",
            "no NEW stock available"
        );
        return Ok(());
    }

    let message = format!("Found new stock for:\n- {}", products.join("\n- "));
    info!(site = site.name, "{message}");
    notifier.send(&message).await?;

    debug!(site = site.name, "finished polling");
    Ok(())
}
