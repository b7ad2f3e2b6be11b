//! Save/Load system for scene trees
//!
//! This module persists a tree of live entities and their attached
//! components to a flat, order-independent snapshot:
//! - JSON snapshots (human-readable, debuggable)
//! - Stable ids that survive a save/load round-trip
//! - A string-keyed type registry so stored names never depend on Rust type names
//! - Two-phase hooks around serialize and deserialize
//! - Order-tolerant re-attachment of loaded nodes
//!
//! # Architecture
//!
//! - `serializable`: the capability trait every persistable type implements
//! - `registry`: maps serialized type names to constructors
//! - `tree`: the scene operations the engine consumes
//! - `types`: node records, the snapshot wire form and error types
//! - `walker`: save path (live tree → snapshot)
//! - `reconstructor`: load path (snapshot → live objects)
//! - `resolver`: attaches loaded nodes once their parents are live
//! - `system`: SaveSystem, the entry point with the in-flight guard
//! - `storage`: key-value storage backends
//! - `config`: SaveConfig
//!
//! # Example Usage
//!
//! ```ignore
//! let mut registry = TypeRegistry::new();
//! registry.register::<Building>()?;
//! registry.register::<Score>()?;
//!
//! let mut system = SaveSystem::new(registry, SaveConfig::default());
//! let mut storage = FileStorage::new(FileStorage::default_directory())?;
//!
//! // Save
//! system.save_to_storage(&mut scene, &mut storage)?;
//!
//! // Load into a fresh scene
//! let mut fresh = Scene::new();
//! system.load_from_storage(&mut fresh, &storage)?;
//! ```

pub mod config;
pub mod reconstructor;
pub mod registry;
pub mod resolver;
pub mod serializable;
pub mod storage;
pub mod system;
pub mod tree;
pub mod types;
pub mod walker;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::SaveConfig;
pub use reconstructor::LoadReport;
pub use registry::{Constructor, Mapping, TypeRegistry};
pub use serializable::{AsAny, ChildPlacement, Instance, ObjectKind, Serializable, SerializeType};
pub use storage::{FileStorage, MemoryStorage, SaveStorage};
pub use system::SaveSystem;
pub use tree::{ObjectHandle, SceneTree, SceneView};
pub use types::*;
