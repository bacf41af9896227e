/// Work units and the two partitioners.
pub mod partition;
/// Coordinator-owned work queue.
pub mod queue;
pub(crate) mod sample;
pub(crate) mod scanline;
