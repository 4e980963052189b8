use std::sync::Arc;

use keygate_credentials::{AttestationIssuer, KeyStore};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{Authenticator, HostContext};

/// How a [`Session`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The request ran to completion.
    Completed,
    /// The host cancelled first; nothing was delivered.
    Cancelled,
}

/// Errors joining a [`Session`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// The request task panicked or was aborted by the runtime.
    #[error("request task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A request running on the tokio runtime that the host may cancel.
///
/// Cancelling abandons any in-flight key store or certificate work. The
/// completion is then dropped without being invoked and any late result is
/// discarded.
#[derive(Debug)]
pub struct Session {
    token: CancellationToken,
    task: JoinHandle<SessionOutcome>,
}

impl Session {
    /// Start serving `context` with `authenticator`.
    pub fn spawn<S, I>(authenticator: Arc<Authenticator<S, I>>, context: HostContext) -> Self
    where
        S: KeyStore + Clone + 'static,
        I: AttestationIssuer + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let task = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => {
                    tracing::info!("request cancelled by host");
                    SessionOutcome::Cancelled
                }
                _ = authenticator.begin_request(context) => SessionOutcome::Completed,
            }
        });

        Self { token, task }
    }

    /// Tear the request down. Has no effect once it has completed.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// A token that cancels this session when cancelled, e.g. to tie it to
    /// the host's own teardown.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wait for the session to end.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Join`] if the request task did not finish
    /// normally.
    pub async fn join(self) -> Result<SessionOutcome, SessionError> {
        Ok(self.task.await?)
    }
}
