//! Failure classifier
//!
//! Maps the outcome of a page-level operation onto the decision the retry
//! controller acts on. Rules, in priority order:
//!
//! | Outcome | Class |
//! |---------|-------|
//! | block notice on the page | Blocked |
//! | challenge frame on the page | ChallengeDetected |
//! | network, timeout, server error, lost selection, unexpected page | Transient |
//! | declared unrecoverable | Fatal |
//! | normally rendered page | Success |
//!
//! Running out of attempts is not decided here; the retry controller turns
//! the last classified failure into a fatal outcome when its budget is spent.

use crate::session::{Session, Target};
use crate::OpFailure;

/// Decision class of an operation outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    Success,
    Transient,
    Blocked,
    ChallengeDetected,
    Fatal,
}

impl FailureClass {
    /// Returns true if the operation may be attempted again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transient | Self::Blocked | Self::ChallengeDetected
        )
    }

    /// Returns true if only a new network identity can clear the failure
    pub fn requires_rotation(&self) -> bool {
        matches!(self, Self::Blocked | Self::ChallengeDetected)
    }
}

/// Signals probed on a rendered page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageSignals {
    pub blocked: bool,
    pub challenge: bool,
    pub server_error: bool,
}

impl PageSignals {
    /// The failure this page represents, if any, by priority
    pub fn failure(&self) -> Option<OpFailure> {
        if self.blocked {
            Some(OpFailure::Blocked)
        } else if self.challenge {
            Some(OpFailure::Challenge)
        } else if self.server_error {
            Some(OpFailure::ServerError)
        } else {
            None
        }
    }
}

/// The outcome of one page-level operation
#[derive(Debug, Clone, Copy)]
pub enum Outcome<'a> {
    /// The page rendered; these are its signals
    Rendered(PageSignals),

    /// The operation failed before a page could be judged
    Failed(&'a OpFailure),
}

/// Classifies an operation outcome
///
/// Pure function of the outcome.
pub fn classify(outcome: &Outcome<'_>) -> FailureClass {
    match outcome {
        Outcome::Rendered(signals) => match signals.failure() {
            Some(failure) => classify_failure(&failure),
            None => FailureClass::Success,
        },
        Outcome::Failed(failure) => classify_failure(failure),
    }
}

fn classify_failure(failure: &OpFailure) -> FailureClass {
    match failure {
        OpFailure::Blocked => FailureClass::Blocked,
        OpFailure::Challenge => FailureClass::ChallengeDetected,
        OpFailure::ServerError
        | OpFailure::Network(_)
        | OpFailure::Timeout(_)
        | OpFailure::SelectionLost
        | OpFailure::Unexpected(_) => FailureClass::Transient,
        OpFailure::Unrecoverable(_) => FailureClass::Fatal,
    }
}

/// Probes the current page for block, challenge and server error signals
pub async fn probe_signals<S: Session + ?Sized>(session: &mut S) -> Result<PageSignals, OpFailure> {
    Ok(PageSignals {
        blocked: session.locate(&Target::BlockedNotice).await?,
        challenge: session.locate(&Target::ChallengeFrame).await?,
        server_error: session.locate(&Target::ServerErrorBanner).await?,
    })
}

/// Fails with the page's own failure if it carries any signal
pub async fn guard_page<S: Session + ?Sized>(session: &mut S) -> Result<(), OpFailure> {
    let signals = probe_signals(session).await?;
    match signals.failure() {
        Some(failure) => {
            tracing::debug!("Page signals {:?}", signals);
            Err(failure)
        }
        None => Ok(()),
    }
}
