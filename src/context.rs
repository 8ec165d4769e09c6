use std::fmt::Display;
use std::sync::Arc;

use crate::error::{AppError, AppResult, ErrorCategory};
use crate::models::{Review, UserId};

/// The signed-in user on whose behalf views act
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: Option<UserId>,
    pub username: String,
}

impl Viewer {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            user_id: None,
            username: username.into(),
        }
    }

    pub fn with_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Whether `review` was written by this viewer
    ///
    /// Account ids are compared when both sides carry one, usernames otherwise.
    pub fn authored(&self, review: &Review) -> bool {
        match (self.user_id, review.user_id) {
            (Some(mine), Some(theirs)) => mine == theirs,
            _ => self.username == review.username,
        }
    }
}

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Success => write!(f, "success"),
            Severity::Info => write!(f, "info"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Front-end capabilities the views report to
///
/// Implemented by whatever renders the screens (toast area, router).
pub trait Notifier: Send + Sync {
    /// Show a dismissible notification
    fn notify(&self, message: &str, severity: Severity);

    /// The session is gone; send the viewer to the login screen
    fn login_required(&self) {}
}

/// Notifier that writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Error => tracing::warn!(severity = %severity, "{}", message),
            _ => tracing::info!(severity = %severity, "{}", message),
        }
    }

    fn login_required(&self) {
        tracing::warn!("Session expired, login required");
    }
}

/// Shared session state handed to every view
#[derive(Clone)]
pub struct AppContext {
    viewer: Option<Viewer>,
    notifier: Arc<dyn Notifier>,
}

impl AppContext {
    pub fn new(viewer: Option<Viewer>, notifier: Arc<dyn Notifier>) -> Self {
        Self { viewer, notifier }
    }

    /// Context for an anonymous visitor
    pub fn anonymous(notifier: Arc<dyn Notifier>) -> Self {
        Self::new(None, notifier)
    }

    pub fn viewer(&self) -> Option<&Viewer> {
        self.viewer.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.viewer.is_some()
    }

    /// The signed-in viewer, or an unauthorized error that triggers the login redirect
    pub fn require_viewer(&self) -> AppResult<&Viewer> {
        match self.viewer.as_ref() {
            Some(viewer) => Ok(viewer),
            None => {
                self.notifier.login_required();
                Err(AppError::Unauthorized(Some(
                    "Please log in to continue".to_string(),
                )))
            }
        }
    }

    pub fn notify(&self, message: &str, severity: Severity) {
        self.notifier.notify(message, severity);
    }

    /// Turns a failure into a notification, redirecting to login when unauthorized
    pub fn report(&self, error: &AppError, fallback: &str) {
        if error.category() == ErrorCategory::Unauthorized {
            self.notifier.login_required();
        }
        self.notifier
            .notify(&error.user_message(fallback), Severity::Error);
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("viewer", &self.viewer)
            .finish_non_exhaustive()
    }
}
