//! In-process collaborators that record what they were asked to do.

use std::sync::{Arc, Mutex};

use crate::handoff::{Navigator, UserNotice};

/// Navigator that records target URLs instead of leaving the page.
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    urls: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs navigated to so far.
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().map(|u| u.clone()).unwrap_or_default()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        if let Ok(mut urls) = self.urls.lock() {
            urls.push(url.to_string());
        }
    }
}

/// Notice sink that records user-facing errors.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotice {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages shown so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl UserNotice for RecordingNotice {
    fn error(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}

/// Notice sink that forwards to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotice;

impl UserNotice for LogNotice {
    fn error(&self, message: &str) {
        tracing::error!(notice = message, "user notice");
    }
}
