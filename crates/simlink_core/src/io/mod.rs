//! Configuration and mesh file loading.
//!
//! Three file kinds feed the runtime: the JSON link configuration wiring
//! components together, per-component YAML task files passed through
//! opaquely, and CSV mesh directories consumed by the grid.

pub mod link_loader;
pub mod mesh_loader;
pub mod task;

pub use link_loader::{LinkConfig, LinkLoader};
pub use mesh_loader::MeshLoader;
pub use task::load_task;
