//! Typed messages shared between the loopcast engine and its control surfaces.
//!
//! This crate defines the playlist records, stream phases, status payloads
//! and engine events exchanged between the supervisor, the playlist store and
//! the HTTP layer.

mod events;
mod state;
mod types;

pub use events::StreamEvent;
pub use state::StreamPhase;
pub use types::{
    ExitCause, ItemSummary, MediaItem, PlaylistStatus, Rejection, StreamStatus, STREAM_MANIFEST,
};

use crossbeam_channel::{Receiver, Sender};

/// Channel capacity for events (Engine → observers).
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Creates a bounded event channel.
pub fn event_channel() -> (Sender<StreamEvent>, Receiver<StreamEvent>) {
    crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY)
}
