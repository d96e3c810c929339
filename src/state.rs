//! Application state - the process-wide plot cache and flash slot
//!
//! One slot holds the most recently rendered PNG, one holds the pending
//! flash message. Both are shared across all requests with no isolation:
//! concurrent plots race to store and the last writer wins.

use crate::config::Config;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    last_plot: Arc<RwLock<Option<Vec<u8>>>>,
    flash: Arc<RwLock<Option<String>>>,
}

impl AppState {
    /// Create new app state from config
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            last_plot: Arc::new(RwLock::new(None)),
            flash: Arc::new(RwLock::new(None)),
        }
    }

    /// Store a freshly rendered PNG, replacing any previous one.
    pub async fn store_plot(&self, png: Vec<u8>) {
        tracing::debug!("Caching rendered plot ({} bytes)", png.len());
        let mut slot = self.last_plot.write().await;
        *slot = Some(png);
    }

    /// The most recently stored PNG, if any plot has succeeded yet.
    pub async fn last_plot(&self) -> Option<Vec<u8>> {
        self.last_plot.read().await.clone()
    }

    /// Queue a message for the next page render.
    pub async fn set_flash(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("Flash message set: {}", message);
        let mut slot = self.flash.write().await;
        *slot = Some(message);
    }

    /// Take the pending message, clearing the slot.
    pub async fn take_flash(&self) -> Option<String> {
        self.flash.write().await.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plot_slot_starts_empty() {
        let state = AppState::new(Config::default());
        assert_eq!(state.last_plot().await, None);
    }

    #[tokio::test]
    async fn test_store_and_read_back() {
        let state = AppState::new(Config::default());
        state.store_plot(vec![1, 2, 3]).await;
        assert_eq!(state.last_plot().await, Some(vec![1, 2, 3]));
        // Reading does not consume the slot
        assert_eq!(state.last_plot().await, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let state = AppState::new(Config::default());
        state.store_plot(vec![1]).await;
        state.store_plot(vec![2]).await;
        assert_eq!(state.last_plot().await, Some(vec![2]));
    }

    #[tokio::test]
    async fn test_clones_share_the_slot() {
        let state = AppState::new(Config::default());
        let other = state.clone();
        state.store_plot(vec![9]).await;
        assert_eq!(other.last_plot().await, Some(vec![9]));
    }

    #[tokio::test]
    async fn test_flash_is_taken_once() {
        let state = AppState::new(Config::default());
        state.set_flash("something went wrong").await;
        assert_eq!(
            state.take_flash().await,
            Some("something went wrong".to_string())
        );
        assert_eq!(state.take_flash().await, None);
    }
}
