use crate::{BatchId, ConversionRequest, CreditBalance, FileEntry, Identity, OutputArtifact, ProgressState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Driver started; carries the identity known at startup.
    SessionStarted { identity: Option<Identity> },
    /// Ledger read finished for `identity`.
    BalanceLoaded {
        identity: Option<Identity>,
        balance: CreditBalance,
    },
    /// Identity provider reported a sign-in, sign-out or account switch.
    IdentityChanged(Option<Identity>),
    /// User dropped or picked files.
    FilesCaptured(Vec<FileEntry>),
    /// User backed out of format selection.
    SelectionCancelled,
    /// User confirmed the conversion settings for the pending batch.
    ConversionConfirmed(ConversionRequest),
    /// Converter progress for one file of a batch.
    FileProgress {
        batch_id: BatchId,
        index: usize,
        progress: ProgressState,
    },
    /// Converter finished one file.
    FileConverted {
        batch_id: BatchId,
        index: usize,
        artifact: OutputArtifact,
    },
    /// Converter rejected one file; the batch is abandoned.
    FileFailed {
        batch_id: BatchId,
        index: usize,
        reason: String,
    },
    /// User dismissed the completion or error screen.
    ResetClicked,
    /// Fallback for placeholder wiring.
    NoOp,
}
