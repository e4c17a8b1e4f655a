//! Host service seams
//!
//! The SDK does not open browser views or receive deep links itself; the
//! hosting application provides both behind these traits. In-memory mock
//! implementations are exported so hosts can test their integration code
//! without a device.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use aw_types::AppResult;

/// Channel capacity for deep-link subscriptions
const DEEP_LINK_BUFFER: usize = 16;

/// System browser view controlled by the host
#[async_trait]
pub trait SystemBrowser: Send + Sync {
    /// Open the given URL in the browser view
    async fn open(&self, url: &str) -> AppResult<()>;

    /// Close the browser view if one is open
    async fn close(&self) -> AppResult<()>;
}

/// Source of inbound application-open (deep link) URLs
#[async_trait]
pub trait DeepLinkSource: Send + Sync {
    /// Register a listener for inbound URLs
    ///
    /// Dropping the receiver unregisters the listener.
    async fn subscribe(&self) -> AppResult<mpsc::Receiver<String>>;
}

/// Mock browser recording interactions
#[derive(Clone, Default)]
pub struct MockBrowser {
    opened: Arc<Mutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
}

impl MockBrowser {
    /// Create a new mock browser
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs passed to `open`, in order
    pub fn opened_urls(&self) -> Vec<String> {
        self.opened.lock().clone()
    }

    /// Number of `close` calls
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SystemBrowser for MockBrowser {
    async fn open(&self, url: &str) -> AppResult<()> {
        self.opened.lock().push(url.to_string());
        Ok(())
    }

    async fn close(&self) -> AppResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Mock deep-link source driven by tests
#[derive(Clone, Default)]
pub struct MockDeepLinks {
    senders: Arc<Mutex<Vec<mpsc::Sender<String>>>>,
}

impl MockDeepLinks {
    /// Create a new mock source
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a URL to every registered listener
    pub async fn emit(&self, url: &str) {
        let senders: Vec<_> = self.senders.lock().clone();
        for sender in senders {
            let _ = sender.send(url.to_string()).await;
        }
    }

    /// Number of listeners whose receiver is still alive
    pub fn listener_count(&self) -> usize {
        let mut senders = self.senders.lock();
        senders.retain(|sender| !sender.is_closed());
        senders.len()
    }
}

#[async_trait]
impl DeepLinkSource for MockDeepLinks {
    async fn subscribe(&self) -> AppResult<mpsc::Receiver<String>> {
        let (tx, rx) = mpsc::channel(DEEP_LINK_BUFFER);
        self.senders.lock().push(tx);
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_browser_records_interactions() {
        let browser = MockBrowser::new();

        browser.open("https://example.com/a").await.unwrap();
        browser.open("https://example.com/b").await.unwrap();
        browser.close().await.unwrap();

        assert_eq!(
            browser.opened_urls(),
            vec!["https://example.com/a", "https://example.com/b"]
        );
        assert_eq!(browser.close_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_deep_links_fan_out() {
        let links = MockDeepLinks::new();
        let mut rx1 = links.subscribe().await.unwrap();
        let mut rx2 = links.subscribe().await.unwrap();

        links.emit("app://cb?x=1").await;

        assert_eq!(rx1.recv().await.unwrap(), "app://cb?x=1");
        assert_eq!(rx2.recv().await.unwrap(), "app://cb?x=1");
    }

    #[tokio::test]
    async fn test_mock_deep_links_listener_count() {
        let links = MockDeepLinks::new();
        assert_eq!(links.listener_count(), 0);

        let rx = links.subscribe().await.unwrap();
        assert_eq!(links.listener_count(), 1);

        drop(rx);
        assert_eq!(links.listener_count(), 0);
    }
}
