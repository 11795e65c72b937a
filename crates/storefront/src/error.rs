//! Unified error handling with Sentry integration.
//!
//! Slice operations return narrow errors ([`ValidationError`],
//! [`NotFoundError`], [`MutationError`]). Callers that surface errors to a
//! person convert them into [`AppError`], which knows what is safe to show
//! and what should be reported.

use online_shop_core::ValidationError;
use thiserror::Error;

use crate::catalog::RemoteFetchError;
use crate::config::ConfigError;
use crate::slices::IdsExhausted;
use crate::storage::StorageError;

/// An update targeted an id that is not in the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    /// Entity family, e.g. `"product"`.
    pub entity: &'static str,
    pub id: i64,
}

/// Why an `add` or `update` was rejected. State is unchanged either way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    IdsExhausted(#[from] IdsExhausted),
}

/// Application-level error type for the shop.
#[derive(Debug, Error)]
pub enum AppError {
    /// Remote catalog request failed.
    #[error("Catalog error: {0}")]
    RemoteFetch(#[from] RemoteFetchError),

    /// User input was rejected.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Target of an update does not exist.
    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The durable store could not be opened.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<MutationError> for AppError {
    fn from(err: MutationError) -> Self {
        match err {
            MutationError::Validation(e) => Self::Validation(e),
            MutationError::NotFound(e) => Self::NotFound(e),
            MutationError::IdsExhausted(e) => Self::Internal(e.to_string()),
        }
    }
}

impl AppError {
    /// Message safe to show to a person.
    ///
    /// Transport and storage details stay in the logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::RemoteFetch(RemoteFetchError::Status { status, reason, .. }) => {
                format!("The catalog is unavailable right now ({status} {reason}).")
            }
            Self::RemoteFetch(_) => "The catalog could not be reached.".to_string(),
            Self::Validation(e) => e.to_string(),
            Self::NotFound(e) => e.to_string(),
            Self::Config(e) => e.to_string(),
            Self::Storage(_) | Self::Internal(_) => "Internal error".to_string(),
        }
    }

    /// Report to Sentry when worth reporting, and log it.
    ///
    /// Returns the Sentry event id when one was captured.
    pub fn capture(&self) -> Option<uuid::Uuid> {
        match self {
            Self::RemoteFetch(e) if e.is_cancelled() => None,
            Self::RemoteFetch(_) | Self::Storage(_) | Self::Internal(_) => {
                let event_id = sentry::capture_error(self);
                tracing::error!(
                    error = %self,
                    sentry_event_id = %event_id,
                    "Shop error"
                );
                Some(event_id)
            }
            Self::Validation(_) | Self::NotFound(_) | Self::Config(_) => {
                tracing::debug!(error = %self, "Rejected operation");
                None
            }
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "5")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
