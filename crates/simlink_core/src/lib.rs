//! simlink_core - Component-coupling runtime for time-stepped spatial models
//!
//! Independent simulation components publish typed output items and consume
//! typed input items; the link graph connects them through adapters that
//! reconcile differing time and space discretizations, then pulls data
//! through the graph on demand.
//!
//! # Subsystems
//!
//! - **Pull engine**: component state machine, provider/consumer graph and
//!   the recursive `getValues` protocol that advances producers only as far
//!   as the latest consumer request ([`component`], [`exchange`])
//! - **Temporal buffering**: interpolating/extrapolating value buffers that
//!   let producers and consumers advance at different rates ([`buffer`])
//! - **Spatial mapping**: sparse source-to-target matrices over points,
//!   polylines and polygons with a quadtree for candidate pruning
//!   ([`mapper`], [`geometry`], [`search_tree`])
//! - **FVM kernel**: mesh/grid topology derivation and the operator and
//!   boundary factory ([`mesh`], [`fvm`])
//!
//! # Example
//!
//! ```ignore
//! use simlink_core::component::{BehaviorRegistry, LinkGraph};
//! use simlink_core::io::LinkLoader;
//!
//! let loader = LinkLoader::load("links.json")?;
//! let (mut graph, _controllers) = loader.assemble(&registry)?;
//! for cid in graph.component_ids() {
//!     graph.prepare(cid)?;
//! }
//! graph.run()?;
//! ```

pub mod error;

// Value and time primitives
pub mod quantity;
pub mod time;
pub mod values;

// Spatial primitives
pub mod element;
pub mod geometry;
pub mod search_tree;

// Numeric primitives
pub mod numeric;

// Spatial mapping
pub mod mapper;

// Temporal buffering
pub mod buffer;

// Exchange items and the component graph
pub mod component;
pub mod exchange;

// Mesh and FVM kernel
pub mod fvm;
pub mod mesh;

// Configuration and mesh loading
pub mod io;

// Re-export commonly used items
pub use buffer::TimeBuffer;
pub use component::{
  Behavior, BehaviorRegistry, ComponentSpec, IterationConfig, IterationController, ItemSpec,
  LinkGraph, Status, StepOutcome,
};
pub use element::{Element, ElementSet, ElementType};
pub use error::{Result, SimlinkError};
pub use exchange::{AdaptorId, ComponentId, InputId, OutputId, ProviderRef};
pub use mapper::{ElementMapper, MapMethod};
pub use mesh::Grid;
pub use quantity::{Dimension, DimensionBase, Quantity, Unit};
pub use search_tree::ElementSearchTree;
pub use time::{Time, TimeSet, EPSILON_DAYS};
pub use values::{Scalar, ScalarKind, ValueSet2D};
