// ── Background connection tests ──
//
// The interactive side must never wait on the network. `start` validates
// and resolves the request synchronously, then runs the check on a tokio
// task and posts the result back over an mpsc channel. The owner applies
// it to its form with `ConnectionEvent::deliver` on its own task.
//
// Closing the tester (or dropping it) cancels delivery. A check already
// in flight is abandoned and its result is dropped.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::connectivity::{AuthRequest, ConnectionFeedback, ConnectionOutcome, ConnectivityChecker};
use crate::form::FormState;
use crate::reconciler;
use crate::settings::CredentialSettings;
use crate::validation::ValidationErrors;

/// A finished check, waiting to be applied to the form that asked for it.
#[derive(Debug, Clone)]
pub struct ConnectionEvent {
    request: AuthRequest,
    outcome: ConnectionOutcome,
    password_edits: u64,
}

impl ConnectionEvent {
    pub fn outcome(&self) -> &ConnectionOutcome {
        &self.outcome
    }

    /// Apply the result to `form` and produce the feedback to show.
    ///
    /// A password retyped while the check ran is kept; the result then
    /// only produces feedback.
    pub fn deliver(self, form: &mut FormState) -> ConnectionFeedback {
        if form.password_edits() != self.password_edits {
            debug!("password edited during connection test; keeping the newer value");
            return ConnectionFeedback::from_outcome(self.outcome);
        }
        reconciler::deliver_connection_outcome(form, &self.request, self.outcome)
    }
}

/// Runs connection checks off the interactive task.
pub struct ConnectionTester<C> {
    checker: Arc<C>,
    events: UnboundedSender<ConnectionEvent>,
    closed: CancellationToken,
}

impl<C: ConnectivityChecker> ConnectionTester<C> {
    pub fn new(checker: Arc<C>, events: UnboundedSender<ConnectionEvent>) -> Self {
        Self {
            checker,
            events,
            closed: CancellationToken::new(),
        }
    }

    /// Validate `form` and launch a check in the background.
    ///
    /// Validation failures are returned immediately and no task is
    /// spawned. Must be called from within a tokio runtime.
    pub fn start(
        &self,
        form: &FormState,
        creds: &CredentialSettings,
    ) -> Result<JoinHandle<()>, ValidationErrors> {
        let request = reconciler::prepare_connection_test(form, creds)?;
        let password_edits = form.password_edits();
        let checker = Arc::clone(&self.checker);
        let events = self.events.clone();
        let closed = self.closed.clone();

        debug!(url = %request.url, "starting background connection test");
        Ok(tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                () = closed.cancelled() => {
                    debug!("connection test abandoned: tester closed");
                    return;
                }
                result = checker.authenticate(&request) => result,
            };

            if closed.is_cancelled() {
                debug!("connection test result discarded: tester closed");
                return;
            }
            let event = ConnectionEvent {
                request,
                outcome: ConnectionOutcome::from(result),
                password_edits,
            };
            if events.send(event).is_err() {
                debug!("connection test result discarded: receiver gone");
            }
        }))
    }

    /// Stop delivering results. Idempotent.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

impl<C> Drop for ConnectionTester<C> {
    fn drop(&mut self) {
        self.closed.cancel();
    }
}
