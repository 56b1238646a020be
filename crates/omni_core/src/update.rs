use crate::progress::BatchProgress;
use crate::state::{FinishedBatch, Phase, RunningBatch};
use crate::{AppState, BatchId, ConversionRequest, Effect, FileEntry, Identity, Msg, Notice};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages that are not legal in the current workflow phase are ignored and
/// leave the state untouched.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::SessionStarted { identity } => {
            if state.session_started {
                return (state, Vec::new());
            }
            state.session_started = true;
            state.identity = identity.clone();
            state.mark_dirty();
            vec![Effect::LoadBalance { identity }]
        }
        Msg::BalanceLoaded { identity, balance } => {
            // A read for an identity that is no longer active is stale.
            if identity == state.identity && balance != state.balance {
                state.balance = balance;
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::IdentityChanged(next) => {
            if matches!(state.phase, Phase::Processing(_)) {
                state.parked_identity = Some(next);
                Vec::new()
            } else {
                apply_identity(&mut state, next)
            }
        }
        Msg::FilesCaptured(files) => {
            if files.is_empty() || !matches!(state.phase, Phase::Idle) {
                return (state, Vec::new());
            }
            state.phase = Phase::SelectionPending { files };
            state.notice = None;
            state.mark_dirty();
            Vec::new()
        }
        Msg::SelectionCancelled => {
            if matches!(state.phase, Phase::SelectionPending { .. }) {
                state.phase = Phase::Idle;
                state.notice = None;
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::ConversionConfirmed(request) => confirm(&mut state, request),
        Msg::FileProgress {
            batch_id,
            index,
            progress,
        } => {
            if let Some(running) = running_batch_mut(&mut state, batch_id) {
                if index < running.files.len() && running.progress.apply(index, &progress) {
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::FileConverted {
            batch_id,
            index,
            artifact,
        } => {
            let Some(running) = running_batch_mut(&mut state, batch_id) else {
                return (state, Vec::new());
            };
            // Files finish strictly in input order.
            if index != running.staged.len() {
                return (state, Vec::new());
            }
            running.staged.push(artifact);
            if running.staged.len() < running.files.len() {
                return (state, Vec::new());
            }
            complete_batch(&mut state)
        }
        Msg::FileFailed {
            batch_id,
            index,
            reason,
        } => {
            if running_batch_mut(&mut state, batch_id).is_none() {
                return (state, Vec::new());
            }
            fail_batch(&mut state, index, reason)
        }
        Msg::ResetClicked => {
            if matches!(state.phase, Phase::Complete(_) | Phase::Error(_)) {
                state.phase = Phase::Idle;
                state.notice = None;
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn confirm(state: &mut AppState, request: ConversionRequest) -> Vec<Effect> {
    let Phase::SelectionPending { files } = &state.phase else {
        return Vec::new();
    };

    let cost = state.policy.batch_cost(&request, files.len());
    if !state.balance.can_afford(cost) {
        state.notice = Some(Notice::InsufficientCredits {
            required: cost,
            available: state.balance,
        });
        state.mark_dirty();
        return Vec::new();
    }

    let files: Vec<FileEntry> = match std::mem::take(&mut state.phase) {
        Phase::SelectionPending { files } => files,
        other => {
            state.phase = other;
            return Vec::new();
        }
    };
    let batch_id = state.next_batch_id;
    state.next_batch_id += 1;
    state.phase = Phase::Processing(RunningBatch {
        id: batch_id,
        progress: BatchProgress::new(files.len()),
        staged: Vec::with_capacity(files.len()),
        files: files.clone(),
        request,
        cost,
    });
    state.notice = None;
    state.mark_dirty();

    vec![Effect::RunBatch {
        batch_id,
        files,
        request,
    }]
}

fn complete_batch(state: &mut AppState) -> Vec<Effect> {
    let Phase::Processing(running) = std::mem::take(&mut state.phase) else {
        return Vec::new();
    };
    let RunningBatch {
        files,
        request,
        cost,
        mut progress,
        staged,
        ..
    } = running;

    progress.complete();
    // Affordability was checked at confirmation; a balance reloaded mid-batch
    // can only have grown or been replaced, so the debit floors at zero.
    let balance = state.balance.debit(cost).unwrap_or_default();
    state.balance = balance;
    state.phase = Phase::Complete(FinishedBatch {
        files,
        request,
        progress: progress.into_state(),
        artifacts: staged,
    });
    state.mark_dirty();

    let mut effects = vec![Effect::CommitBalance {
        identity: state.identity.clone(),
        balance,
    }];
    effects.extend(apply_parked_identity(state));
    effects
}

fn fail_batch(state: &mut AppState, index: usize, reason: String) -> Vec<Effect> {
    let Phase::Processing(running) = std::mem::take(&mut state.phase) else {
        return Vec::new();
    };
    let file_name = running
        .files
        .get(index)
        .map(|file| file.name().to_string())
        .unwrap_or_default();
    state.notice = Some(Notice::BatchFailed {
        file_index: index,
        file_name,
        reason,
    });
    // Artifacts staged before the failure are dropped with the batch.
    state.phase = Phase::Error(FinishedBatch {
        files: running.files,
        request: running.request,
        progress: running.progress.into_state(),
        artifacts: Vec::new(),
    });
    state.mark_dirty();

    apply_parked_identity(state)
}

fn apply_parked_identity(state: &mut AppState) -> Vec<Effect> {
    match state.parked_identity.take() {
        Some(next) => apply_identity(state, next),
        None => Vec::new(),
    }
}

fn apply_identity(state: &mut AppState, next: Option<Identity>) -> Vec<Effect> {
    state.session_started = true;
    if next == state.identity {
        return Vec::new();
    }
    state.identity = next.clone();
    state.mark_dirty();
    match next {
        Some(identity) => vec![Effect::LoadBalance {
            identity: Some(identity),
        }],
        None => {
            // Signing out never restores the pre-sign-in guest balance.
            state.balance = state.policy.initial_balance();
            Vec::new()
        }
    }
}

fn running_batch_mut(state: &mut AppState, batch_id: BatchId) -> Option<&mut RunningBatch> {
    match &mut state.phase {
        Phase::Processing(running) if running.id == batch_id => Some(running),
        _ => None,
    }
}
