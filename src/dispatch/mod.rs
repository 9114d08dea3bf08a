//! The bounded-concurrency dispatch loop and its state
//!
//! - RunCounters: request counters mutated only on the consumer turn
//! - Slot: tagged idle/in-flight states, one per logical connection
//! - DispatchLoop: the core coordination loop

pub mod counters;
pub mod pool;
pub mod slot;

pub use counters::RunCounters;
pub use pool::DispatchLoop;
pub use slot::Slot;
