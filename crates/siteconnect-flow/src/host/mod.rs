//! Browser window abstraction.
//!
//! The flow never touches a browser directly. A shell (WASM bindings, a
//! desktop webview, the test harness) implements [`WindowHost`] and feeds
//! `message` events into the [`MessageBus`].

mod message_bus;

use std::sync::Arc;

pub use message_bus::{MessageBus, MessageListener};

/// A secondary window opened for authorization
pub trait PopupHandle: Send + Sync {
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// The app's own top-level window
pub trait WindowHost: Send + Sync {
    /// `window.open(url, name, features)`; `None` when the popup was blocked
    fn open_popup(&self, url: &str, name: &str, features: &str) -> Option<Arc<dyn PopupHandle>>;

    /// Full-page navigation (`window.location.href = url`)
    fn navigate(&self, url: &str);

    /// Current page URL (`window.location.href`)
    fn current_url(&self) -> String;

    /// Rewrite the displayed URL without navigating (`history.replaceState`)
    fn replace_url(&self, url: &str);
}
