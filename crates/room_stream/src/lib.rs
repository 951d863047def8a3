//! Streams a fixed-size window of rooms along a one-dimensional sequence axis
//! and keeps a ledger of the fixable bug units discovered inside them.

mod collaborators;
mod completion;
mod config;
mod detector;
mod ledger;
mod recycler;
mod slot;
mod streamer;
mod variant;
mod window;

#[cfg(test)]
mod test_support;

pub use collaborators::{
    ActorLocator, BugUnit, BugUnitId, BugUnitRef, RoomPlacement, VisualFactory, VisualInstance,
};
pub use completion::{CompletionEvent, CompletionMonitor, FixOutcome, ObserverId};
pub use config::{
    ConfigError, ConfigLoadError, RoomVariant, StreamConfig, StreamConfigFile,
    DEFAULT_BOUNDARY_THRESHOLD, DEFAULT_CENTER_OFFSET, DEFAULT_DETECTION_INTERVAL,
    DEFAULT_SPACING, DEFAULT_WINDOW_SIZE,
};
pub use detector::{nearest_slot_sequence, DetectorOutcome, TransitionDetector};
pub use ledger::{BugLedger, LedgerEntry};
pub use recycler::{plan_recycle, RecycleOutcome, RecyclePlan};
pub use slot::{RoomSlot, SlotFixResult};
pub use streamer::{InitError, RoomStreamer, TickReport};
pub use variant::{variant_index, VariantMapper};
pub use window::{initial_sequence, RoomWindow, SlotSnapshot};

pub const CONFIG_ENV_VAR: &str = "ROOM_STREAM_CONFIG";
