pub mod bootstrap;
pub mod crypto;
pub mod login;
pub mod oauth;
pub mod password;
pub mod refresh;
pub mod register;
pub mod session;
pub mod sessions;
pub mod token;

use std::future::Future;

use crate::error::AuthServiceError;

/// Await a notification send and swallow its failure.
pub(crate) async fn notify_best_effort<F>(notification: &'static str, send: F)
where
    F: Future<Output = Result<(), AuthServiceError>>,
{
    if let Err(e) = send.await {
        tracing::warn!(error = ?e, notification, "notification dispatch failed");
    }
}
