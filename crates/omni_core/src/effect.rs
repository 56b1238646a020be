use crate::{BatchId, ConversionRequest, CreditBalance, FileEntry, Identity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Read the balance for `identity` (`None` = guest storage).
    LoadBalance { identity: Option<Identity> },
    /// Convert `files` in order, one at a time.
    RunBatch {
        batch_id: BatchId,
        files: Vec<FileEntry>,
        request: ConversionRequest,
    },
    /// Persist the post-batch balance. Emitted once per successful batch.
    CommitBalance {
        identity: Option<Identity>,
        balance: CreditBalance,
    },
}
