//! Batch progress aggregation.
//!
//! The unit converter reports progress per file; the workflow shows a single
//! percentage for the whole batch. With `n` files, file `i` (0-based) at
//! per-file progress `p` maps to `round(i * 100 / n + p / n)`.

/// Percentage plus a human-readable step label.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressState {
    pub percentage: u8,
    pub step: String,
}

impl ProgressState {
    pub fn new(percentage: u8, step: impl Into<String>) -> Self {
        Self {
            percentage: percentage.min(100),
            step: step.into(),
        }
    }
}

/// Overall percentage for file `index` of `batch_len` at per-file `file_percentage`.
///
/// Rounds half up using integer arithmetic so the last file at 100 yields
/// exactly 100.
pub fn overall_percentage(index: usize, batch_len: usize, file_percentage: u8) -> u8 {
    if batch_len == 0 {
        return 0;
    }
    let n = batch_len as u64;
    let i = (index as u64).min(n - 1);
    let p = u64::from(file_percentage.min(100));
    let scaled = 100 * i + p;
    let rounded = (2 * scaled + n) / (2 * n);
    rounded.min(100) as u8
}

/// Label shown while converting file `index`: `"{i+1}/{n}: {label}"`.
pub fn step_label(index: usize, batch_len: usize, label: &str) -> String {
    format!("{}/{}: {}", index + 1, batch_len, label)
}

/// Combines per-file updates into one batch-level [`ProgressState`].
pub fn aggregate(index: usize, batch_len: usize, file: &ProgressState) -> ProgressState {
    ProgressState {
        percentage: overall_percentage(index, batch_len, file.percentage),
        step: step_label(index, batch_len, &file.step),
    }
}

/// Progress of one running batch.
///
/// The reported percentage never decreases, even if a converter emits a
/// lower per-file value or updates for an earlier file arrive late.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    batch_len: usize,
    current: ProgressState,
}

impl BatchProgress {
    pub fn new(batch_len: usize) -> Self {
        Self {
            batch_len,
            current: ProgressState::default(),
        }
    }

    pub fn batch_len(&self) -> usize {
        self.batch_len
    }

    pub fn current(&self) -> &ProgressState {
        &self.current
    }

    /// Applies a per-file update; returns `true` when the visible state changed.
    pub fn apply(&mut self, index: usize, file: &ProgressState) -> bool {
        let next = aggregate(index, self.batch_len, file);
        let percentage = next.percentage.max(self.current.percentage);
        if percentage == self.current.percentage && next.step == self.current.step {
            return false;
        }
        self.current = ProgressState {
            percentage,
            step: next.step,
        };
        true
    }

    /// Pins the batch to 100 once every file has succeeded.
    pub fn complete(&mut self) {
        self.current.percentage = 100;
    }

    pub fn into_state(self) -> ProgressState {
        self.current
    }
}
