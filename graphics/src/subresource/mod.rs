//! Subresource-granularity state tracking: tagged interval/rect treaps
//! used by the dependency builder and barrier synthesizer to know which
//! part of a resource was last touched with which access pattern, by which
//! consumer.

mod prng;

pub mod interval;
pub mod rect;

pub use interval::IntervalTreap;
pub use rect::RectTreap;
