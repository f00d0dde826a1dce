//! The toast collaborator: short transient messages shown to the operator.

use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// How a toast should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToastVariant {
    #[default]
    Default,
    /// A failure the operator needs to notice.
    Destructive,
}

/// A short transient message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
}

impl Toast {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Default,
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            variant: ToastVariant::Destructive,
            ..Self::new(title, description)
        }
    }
}

/// Displays toasts somewhere. Implementations must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Writes toasts to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, toast: Toast) {
        match toast.variant {
            ToastVariant::Default => info!("[TOAST] {}: {}", toast.title, toast.description),
            ToastVariant::Destructive => warn!("[TOAST] {}: {}", toast.title, toast.description),
        }
    }
}

/// Broadcasts toasts to any number of subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<Toast>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.sender.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, toast: Toast) {
        self.sender.send(toast).ok();
    }
}

/// Keeps every toast it receives, in order.
#[derive(Debug, Clone, Default)]
pub struct CollectingNotifier {
    toasts: Arc<Mutex<Vec<Toast>>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.toasts().into_iter().map(|t| t.title).collect()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, toast: Toast) {
        self.toasts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(toast);
    }
}
