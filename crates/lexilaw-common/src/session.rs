use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::LexiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoadingState {
    Idle,
    Loading,
    Success,
    Error,
}

/// Request/response state of one operation for the lifetime of a session.
///
/// At most one request is outstanding: [`begin`](Panel::begin) refuses while
/// the panel is already loading. Starting a request discards the previous
/// result and error.
#[derive(Debug, Clone)]
pub struct Panel<T> {
    operation: &'static str,
    status: LoadingState,
    result: Option<T>,
    error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PanelSnapshot<T> {
    pub status: LoadingState,
    pub result: Option<T>,
    pub error: Option<String>,
}

impl<T: Clone> Panel<T> {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            status: LoadingState::Idle,
            result: None,
            error: None,
        }
    }

    pub fn status(&self) -> LoadingState {
        self.status
    }

    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    pub fn begin(&mut self) -> Result<(), LexiError> {
        if self.status == LoadingState::Loading {
            return Err(LexiError::Busy(self.operation));
        }
        self.status = LoadingState::Loading;
        self.result = None;
        self.error = None;
        Ok(())
    }

    pub fn succeed(&mut self, result: T) {
        self.status = LoadingState::Success;
        self.result = Some(result);
        self.error = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = LoadingState::Error;
        self.result = None;
        self.error = Some(message.into());
    }

    pub fn snapshot(&self) -> PanelSnapshot<T> {
        PanelSnapshot {
            status: self.status,
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }
}
