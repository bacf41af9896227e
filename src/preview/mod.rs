//! Progressive preview: finished regions streamed to a consumer independently of final assembly.
//!
//! Delivery order is unspecified. By the time a render returns successfully, every region of
//! that request has been delivered at least once.

/// Consumer-side canvas.
pub mod canvas;
/// Channel, events and the coordinator-side publisher.
pub mod channel;
