//! OmniConvert core: pure workflow state machine, credit pricing and batch
//! progress aggregation. No IO happens here; side effects are returned as
//! [`Effect`]s for the engine to execute.
mod credits;
mod effect;
mod file;
mod msg;
pub mod progress;
mod request;
mod state;
mod update;
mod view_model;

pub use credits::{CreditBalance, CreditPolicy, Identity};
pub use effect::Effect;
pub use file::{FileEntry, OutputArtifact};
pub use msg::Msg;
pub use progress::{BatchProgress, ProgressState};
pub use request::{
    AudioFormat, Bitrate, Category, ConversionRequest, ImageFormat, ImageQuality, QualityTier,
    Resolution, TargetFormat, TranscriptFormat, UnknownFormat, VideoFormat,
};
pub use state::{AppState, BatchId, Notice, WorkflowState};
pub use update::update;
pub use view_model::{format_size, AppViewModel, ArtifactView, FileRowView};
