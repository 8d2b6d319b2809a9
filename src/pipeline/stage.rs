//! Per-invocation state reporting.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use uuid::Uuid;

use crate::ErrorKind;

/// Where a single `speak` invocation currently is.
///
/// Stages are visited in declaration order; `Ready` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Idle,
    CredentialLoading,
    AssertionBuilding,
    TokenExchanging,
    Synthesizing,
    Materializing,
    Ready,
    Failed(ErrorKind),
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CredentialLoading => "credential_loading",
            Self::AssertionBuilding => "assertion_building",
            Self::TokenExchanging => "token_exchanging",
            Self::Synthesizing => "synthesizing",
            Self::Materializing => "materializing",
            Self::Ready => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(kind) => write!(f, "failed({})", kind),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Receives every stage transition. Called inline; keep it cheap.
pub trait StageObserver: Send + Sync {
    fn on_transition(&self, invocation: Uuid, stage: PipelineStage);
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {
    fn on_transition(&self, _invocation: Uuid, _stage: PipelineStage) {}
}

/// In-memory observer for testing.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<(Uuid, PipelineStage)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Uuid, PipelineStage)> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Stages of one invocation, in the order they were entered.
    pub fn stages_for(&self, invocation: Uuid) -> Vec<PipelineStage> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(id, _)| *id == invocation)
            .map(|(_, stage)| *stage)
            .collect()
    }

    /// Distinct invocation ids, in first-seen order.
    pub fn invocations(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = Vec::new();
        for (id, _) in self.events.lock().unwrap_or_else(PoisonError::into_inner).iter() {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl StageObserver for RecordingObserver {
    fn on_transition(&self, invocation: Uuid, stage: PipelineStage) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((invocation, stage));
    }
}
