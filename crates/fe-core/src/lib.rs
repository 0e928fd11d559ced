//! fe-core: shared foundation for femflow.
//!
//! Contains:
//! - ids (identifiers assigned by the external engine)
//! - poll (bounded polling and retry against an injectable clock)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod poll;

pub use error::{FeError, FeResult};
pub use ids::*;
pub use poll::{
    Clock, ManualClock, PollLimit, PollPolicy, RetryExhausted, SystemClock, poll_until, retry,
};
