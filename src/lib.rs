//! Client-side state for the MediaHub catalog
//!
//! Screens keep their own snapshot of server entities, apply watchlist
//! changes optimistically, and reconcile the viewer's single review per
//! movie against the REST API.

pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod views;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use context::{AppContext, Notifier, Severity, TracingNotifier, Viewer};
pub use error::{AppError, AppResult, ErrorCategory};
pub use services::{HttpRemoteClient, RemoteApi};
