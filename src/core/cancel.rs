//! Combined cancellation signals.
//!
//! Each API request is bounded by a timeout and may additionally be
//! cancelled by any number of caller-supplied tokens. [`CombinedSignal`]
//! composes all of those sources into a single signal that fires with
//! the *first* reason to occur, so the resulting error message reflects
//! what actually happened (timed out vs. cancelled by the caller).

use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Why a combined signal fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The per-request timeout elapsed before any other source fired.
    TimedOut {
        /// The timeout that elapsed.
        after: Duration,
    },
    /// A caller-supplied cancellation token fired first.
    External {
        /// Index of the token in the order it was passed in.
        source: usize,
    },
}

impl AbortReason {
    /// Renders the reason as a request-failure message.
    pub fn describe(&self) -> String {
        match self {
            Self::TimedOut { after } => format!("request timed out after {}ms", after.as_millis()),
            Self::External { .. } => "request cancelled by caller".to_string(),
        }
    }
}

/// A cancellation signal combining a timeout with N external tokens.
///
/// The signal fires as soon as *any* source fires, and records which one
/// fired first. The internal watcher task is aborted when the signal is
/// dropped, so a pending timeout timer never outlives the request it was
/// created for and never keeps the runtime alive on its own.
#[derive(Debug)]
pub struct CombinedSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<AbortReason>>,
    watcher: Option<tokio::task::JoinHandle<()>>,
}

impl CombinedSignal {
    /// Creates a combined signal from an optional timeout and a set of
    /// external cancellation tokens.
    ///
    /// With no timeout and no tokens the signal simply never fires.
    pub fn new(timeout: Option<Duration>, externals: &[CancellationToken]) -> Self {
        let token = CancellationToken::new();
        let reason: Arc<OnceLock<AbortReason>> = Arc::new(OnceLock::new());

        let watcher = if timeout.is_some() || !externals.is_empty() {
            let fired = token.clone();
            let record = Arc::clone(&reason);
            let externals = externals.to_vec();

            Some(tokio::spawn(async move {
                let timed_out = async {
                    match timeout {
                        Some(after) => {
                            tokio::time::sleep(after).await;
                            after
                        }
                        None => std::future::pending().await,
                    }
                };

                let external_fired = async {
                    if externals.is_empty() {
                        std::future::pending::<usize>().await
                    } else {
                        let waits: Vec<_> = externals
                            .iter()
                            .map(|t| Box::pin(t.cancelled()))
                            .collect();
                        let (_, index, _) = futures::future::select_all(waits).await;
                        index
                    }
                };

                tokio::select! {
                    after = timed_out => {
                        let _ = record.set(AbortReason::TimedOut { after });
                    }
                    source = external_fired => {
                        let _ = record.set(AbortReason::External { source });
                    }
                }
                fired.cancel();
            }))
        } else {
            None
        };

        Self {
            token,
            reason,
            watcher,
        }
    }

    /// Completes when any source fires.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Returns the reason the signal fired, if it has fired.
    pub fn reason(&self) -> Option<AbortReason> {
        self.reason.get().copied()
    }
}

impl Drop for CombinedSignal {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}
