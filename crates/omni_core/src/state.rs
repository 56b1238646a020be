use crate::progress::{BatchProgress, ProgressState};
use crate::view_model::{AppViewModel, ArtifactView, FileRowView};
use crate::{
    ConversionRequest, CreditBalance, CreditPolicy, FileEntry, Identity, OutputArtifact,
};

pub type BatchId = u64;

/// Workflow phase. Exactly one is active; it decides which messages are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    SelectionPending,
    Processing,
    Complete,
    Error,
}

/// User-visible signal raised by the last transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    InsufficientCredits { required: u64, available: CreditBalance },
    BatchFailed {
        file_index: usize,
        file_name: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunningBatch {
    pub(crate) id: BatchId,
    pub(crate) files: Vec<FileEntry>,
    pub(crate) request: ConversionRequest,
    pub(crate) cost: u64,
    pub(crate) progress: BatchProgress,
    pub(crate) staged: Vec<OutputArtifact>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FinishedBatch {
    pub(crate) files: Vec<FileEntry>,
    pub(crate) request: ConversionRequest,
    pub(crate) progress: ProgressState,
    pub(crate) artifacts: Vec<OutputArtifact>,
}

/// Phase plus the data that only exists in that phase.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) enum Phase {
    #[default]
    Idle,
    SelectionPending {
        files: Vec<FileEntry>,
    },
    Processing(RunningBatch),
    Complete(FinishedBatch),
    Error(FinishedBatch),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub(crate) phase: Phase,
    pub(crate) policy: CreditPolicy,
    pub(crate) balance: CreditBalance,
    pub(crate) identity: Option<Identity>,
    pub(crate) session_started: bool,
    /// Identity change received mid-batch, applied once the batch ends.
    pub(crate) parked_identity: Option<Option<Identity>>,
    pub(crate) next_batch_id: BatchId,
    pub(crate) notice: Option<Notice>,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_policy(CreditPolicy::default())
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: CreditPolicy) -> Self {
        Self {
            phase: Phase::Idle,
            policy,
            balance: policy.initial_balance(),
            identity: None,
            session_started: false,
            parked_identity: None,
            next_batch_id: 1,
            notice: None,
            dirty: false,
        }
    }

    pub fn workflow(&self) -> WorkflowState {
        match self.phase {
            Phase::Idle => WorkflowState::Idle,
            Phase::SelectionPending { .. } => WorkflowState::SelectionPending,
            Phase::Processing(_) => WorkflowState::Processing,
            Phase::Complete(_) => WorkflowState::Complete,
            Phase::Error(_) => WorkflowState::Error,
        }
    }

    pub fn policy(&self) -> &CreditPolicy {
        &self.policy
    }

    pub fn balance(&self) -> CreditBalance {
        self.balance
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Files of the current batch; empty in `Idle`.
    pub fn batch(&self) -> &[FileEntry] {
        match &self.phase {
            Phase::Idle => &[],
            Phase::SelectionPending { files } => files,
            Phase::Processing(running) => &running.files,
            Phase::Complete(done) | Phase::Error(done) => &done.files,
        }
    }

    pub fn request(&self) -> Option<&ConversionRequest> {
        match &self.phase {
            Phase::Processing(running) => Some(&running.request),
            Phase::Complete(done) | Phase::Error(done) => Some(&done.request),
            Phase::Idle | Phase::SelectionPending { .. } => None,
        }
    }

    pub fn progress(&self) -> ProgressState {
        match &self.phase {
            Phase::Processing(running) => running.progress.current().clone(),
            Phase::Complete(done) | Phase::Error(done) => done.progress.clone(),
            Phase::Idle | Phase::SelectionPending { .. } => ProgressState::default(),
        }
    }

    /// Output artifacts; only ever non-empty in `Complete`.
    pub fn artifacts(&self) -> &[OutputArtifact] {
        match &self.phase {
            Phase::Complete(done) => &done.artifacts,
            _ => &[],
        }
    }

    pub fn active_batch_id(&self) -> Option<BatchId> {
        match &self.phase {
            Phase::Processing(running) => Some(running.id),
            _ => None,
        }
    }

    /// Cost of running `request` over the batch currently awaiting selection.
    pub fn quote(&self, request: &ConversionRequest) -> Option<u64> {
        match &self.phase {
            Phase::SelectionPending { files } => Some(self.policy.batch_cost(request, files.len())),
            _ => None,
        }
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            workflow: self.workflow(),
            balance: self.balance,
            identity: self.identity.clone(),
            files: self
                .batch()
                .iter()
                .map(|file| FileRowView {
                    name: file.name().to_string(),
                    size: file.size(),
                    media_type: file.media_type().to_string(),
                    last_modified: file.last_modified(),
                })
                .collect(),
            target: self.request().map(ConversionRequest::target),
            progress: self.progress(),
            artifacts: self
                .artifacts()
                .iter()
                .map(|artifact| ArtifactView {
                    filename: artifact.filename.clone(),
                    reference: artifact.reference.clone(),
                })
                .collect(),
            notice: self.notice.clone(),
            dirty: self.dirty,
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns whether anything changed since the last call, clearing the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}
