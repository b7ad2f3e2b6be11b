//! scene-save: persists a live scene tree to a flat snapshot and back
//!
//! - `save`: the persistence engine (registry, walker, reconstructor,
//!   attachment resolver, storage)
//! - `scene`: a small in-memory scene tree the engine can drive

pub mod save;
pub mod scene;

pub use save::{
    ChildPlacement, FileStorage, Instance, LoadReport, MemoryStorage, NodeRecord, ObjectHandle,
    ObjectKind, SaveConfig, SaveError, SaveStorage, SaveSystem, SceneTree, SceneView,
    Serializable, SerializeType, Snapshot, TypeRegistry,
};
pub use scene::Scene;
