//! Notification sink for records, snapshots and the final report.

use async_trait::async_trait;

/// Delivery channel for run output.
///
/// Every method is fire-and-forget: implementations log their own delivery
/// failures and never report them back to the caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, message: &str);

    async fn send_document(&self, bytes: Vec<u8>, filename: &str, caption: &str);

    async fn send_image(&self, bytes: Vec<u8>, caption: &str);
}

/// A notifier that drops everything, used when no chat is configured.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn send_text(&self, message: &str) {
        tracing::debug!("notifier disabled, dropping message: {message}");
    }

    async fn send_document(&self, bytes: Vec<u8>, filename: &str, _caption: &str) {
        tracing::debug!("notifier disabled, dropping document {filename} ({} bytes)", bytes.len());
    }

    async fn send_image(&self, bytes: Vec<u8>, _caption: &str) {
        tracing::debug!("notifier disabled, dropping image ({} bytes)", bytes.len());
    }
}
