/// Renderer and renderer-factory contracts.
pub mod renderer;
/// Shared read-only resources and their providers.
pub mod resources;
/// Built-in procedural renderer.
pub mod sky;
