//! Observable status of a background operation.

use crate::error::Error;
use std::fmt;
use std::sync::Arc;

/// Progress record of one background operation.
///
/// Messages are append-only, completion only ever goes from `false` to
/// `true`, and only the first captured failure is kept.
#[derive(Debug, Clone)]
pub struct AsyncOperationStatus {
    id: u64,
    description: String,
    messages: Vec<String>,
    complete: bool,
    failure: Option<Arc<Error>>,
}

impl AsyncOperationStatus {
    pub fn new(id: u64, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            messages: Vec::new(),
            complete: false,
            failure: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Every status message recorded so far, oldest first.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// The most recent status message.
    pub fn latest(&self) -> Option<&str> {
        self.messages.last().map(String::as_str)
    }

    pub fn record(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn mark_complete(&mut self) {
        self.complete = true;
    }

    /// The failure raised by the operation's work, if any.
    pub fn failure(&self) -> Option<&Arc<Error>> {
        self.failure.as_ref()
    }

    pub fn has_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Store `error` unless a failure was already captured.
    ///
    /// Returns whether the error was stored.
    pub fn capture_failure(&mut self, error: Error) -> bool {
        if self.failure.is_some() {
            return false;
        }
        self.failure = Some(Arc::new(error));
        true
    }
}

impl fmt::Display for AsyncOperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AsyncOperationStatus(id={}, description='{}', status='{}', complete={}",
            self.id,
            self.description,
            self.latest().unwrap_or(""),
            self.complete
        )?;
        if let Some(failure) = &self.failure {
            write!(f, ", failure='{}'", failure)?;
        }
        write!(f, ")")
    }
}
