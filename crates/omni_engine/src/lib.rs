//! OmniConvert engine: executes workflow effects against storage, the
//! remote profile service and the unit converter.
mod batch;
mod converter;
mod filename;
mod identity;
mod ledger;
mod orchestrator;
mod persist;
mod profile;
mod simulate;
mod store;

pub use batch::{convert_with_progress, ChannelProgressSink};
pub use converter::{ConvertError, FailureKind, ProgressSink, UnitConverter};
pub use filename::{key_filename, numbered_filename, output_filename};
pub use identity::{IdentityProvider, WatchIdentityProvider};
pub use ledger::{CommitHandle, CommitOutcome, CreditLedger, BALANCE_KEY};
pub use orchestrator::Orchestrator;
pub use persist::{ensure_dir, AtomicFileWriter, PersistError};
pub use profile::{HttpProfileStore, MemoryProfileStore, ProfileError, ProfileSettings, ProfileStore};
pub use simulate::{SimulatedConverter, SimulationSettings};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
