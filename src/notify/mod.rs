use async_trait::async_trait;

use crate::error::Result;

pub mod telegram;

pub use telegram::TelegramNotifier;

/// Outbound notification channel: deliver one text message to the
/// configured destination. Delivery failure is treated as fatal by the
/// callers; a watcher that silently stops notifying is worse than one that
/// stops loudly.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}
