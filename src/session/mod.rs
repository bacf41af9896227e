/// JSON run configuration.
pub mod config;
/// Owned render context and the busy policy.
pub mod context;
/// Request state machine.
pub mod phase;
/// Render requests.
pub mod request;
