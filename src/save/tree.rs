//! Scene operations consumed by the save system
//!
//! The save system never owns live objects. It walks and rebuilds a scene
//! only through these two traits, addressing objects by `ObjectHandle`.

use super::serializable::{Instance, ObjectKind, Serializable};
use super::types::SaveError;

/// Opaque handle to an object owned by a scene tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(usize);

impl ObjectHandle {
    pub fn new(index: usize) -> Self {
        ObjectHandle(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// Read-only view of a scene tree
pub trait SceneView {
    /// Top-level entities with no parent that are still alive, in order
    fn root_objects(&self) -> Vec<ObjectHandle>;

    /// Attached components followed by nested child entities
    fn native_children(&self, handle: ObjectHandle) -> Vec<ObjectHandle>;

    fn kind(&self, handle: ObjectHandle) -> Option<ObjectKind>;

    /// The persistable side of an object, None if it has none
    fn object(&self, handle: ObjectHandle) -> Option<&dyn Serializable>;

    /// Id carried by the object across saves, if any
    fn serialize_id(&self, handle: ObjectHandle) -> Option<&str>;

    /// Killed or otherwise removed by the tree
    fn is_removed(&self, handle: ObjectHandle) -> bool;

    /// True once the tree has observed the object's insertion
    fn is_in_scene(&self, handle: ObjectHandle) -> bool;
}

/// Mutating scene operations used during load
pub trait SceneTree: SceneView {
    fn object_mut(&mut self, handle: ObjectHandle) -> Option<&mut dyn Serializable>;

    fn set_serialize_id(&mut self, handle: ObjectHandle, id: String);

    /// Takes ownership of a freshly constructed object, detached
    fn spawn(&mut self, instance: Instance) -> ObjectHandle;

    /// Adds an entity at the top level of the scene
    fn add_entity(&mut self, entity: ObjectHandle) -> Result<(), SaveError>;

    fn add_child(&mut self, parent: ObjectHandle, child: ObjectHandle) -> Result<(), SaveError>;

    fn add_component(
        &mut self,
        entity: ObjectHandle,
        component: ObjectHandle,
    ) -> Result<(), SaveError>;
}
