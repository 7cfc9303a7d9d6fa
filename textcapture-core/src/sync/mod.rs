//! Cross-thread primitives shared by the engine callback path and the host.
//!
//! - [`EventWithResult`]: blocking request/response handoff, one request at a time.
//! - [`GatingFlag`]: whether callbacks are forwarded at all.
//! - [`FrameCache`]: the frame of the callback currently in flight.

pub mod event_with_result;
pub mod frame_cache;
pub mod gate;

pub use event_with_result::{EventWithResult, PendingRequest};
pub use frame_cache::{FrameCache, FrameScope};
pub use gate::GatingFlag;
