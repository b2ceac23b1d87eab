//! Asking the user whether a document may be written remotely.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use worksync_model::DocumentKind;
use worksync_store::ConsentStatus;

/// Answer to a consent prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentDecision {
    /// Remote writes are allowed.
    Granted,
    /// Remote writes are refused.
    Declined,
    /// The prompt was dismissed; the question stays open.
    Dismissed,
}

impl ConsentDecision {
    /// The status to record, `None` when nothing was decided.
    #[must_use]
    pub fn status(self) -> Option<ConsentStatus> {
        match self {
            Self::Granted => Some(ConsentStatus::Enabled),
            Self::Declined => Some(ConsentStatus::Declined),
            Self::Dismissed => None,
        }
    }
}

/// Presents the consent question to the user.
///
/// Called at most once per hydrate, and only when the local cache holds
/// user data that would otherwise be written remotely for the first time.
#[async_trait]
pub trait ConsentPrompt: Send + Sync {
    /// Asks whether `kind` may be stored remotely for `owner`.
    async fn request(&self, kind: DocumentKind, owner: Option<&str>) -> ConsentDecision;
}

/// A prompt that always gives the same answer.
#[derive(Debug)]
pub struct StaticConsent {
    decision: ConsentDecision,
    prompts: AtomicUsize,
}

impl StaticConsent {
    /// Creates a prompt answering `decision`.
    pub fn new(decision: ConsentDecision) -> Self {
        Self {
            decision,
            prompts: AtomicUsize::new(0),
        }
    }

    /// A prompt that always grants.
    pub fn granting() -> Self {
        Self::new(ConsentDecision::Granted)
    }

    /// A prompt that always declines.
    pub fn declining() -> Self {
        Self::new(ConsentDecision::Declined)
    }

    /// How many times the prompt was shown.
    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConsentPrompt for StaticConsent {
    async fn request(&self, kind: DocumentKind, owner: Option<&str>) -> ConsentDecision {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(document = %kind, owner = owner.unwrap_or("-"), decision = ?self.decision, "Consent prompt answered");
        self.decision
    }
}
