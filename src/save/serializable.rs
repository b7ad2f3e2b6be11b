//! Serializable trait for objects that can be saved/loaded
//!
//! This trait provides the interface between live scene objects and the
//! save system. Any entity or component that needs to be persisted should
//! implement it, and be registered in the `TypeRegistry` through
//! `SerializeType`.

use super::tree::{ObjectHandle, SceneView};
use super::types::{NodeRecord, SaveError};
use serde_json::Value;
use std::any::Any;

/// Whether a scene object is an entity or a behavior attached to one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Entity,
    Component,
}

/// What a parent did with a child handed to `add_child_object`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChildPlacement {
    /// Let the save system attach the child with the native tree operation
    #[default]
    Attach,
    /// The parent keeps the child itself; no native attach
    Keep,
}

/// A freshly constructed object, tagged with the way it enters the tree
pub enum Instance {
    Entity(Box<dyn Serializable>),
    Component(Box<dyn Serializable>),
}

impl Instance {
    pub fn new<T: SerializeType>(value: T) -> Self {
        match T::KIND {
            ObjectKind::Entity => Instance::Entity(Box::new(value)),
            ObjectKind::Component => Instance::Component(Box::new(value)),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Instance::Entity(_) => ObjectKind::Entity,
            Instance::Component(_) => ObjectKind::Component,
        }
    }

    pub fn into_parts(self) -> (ObjectKind, Box<dyn Serializable>) {
        match self {
            Instance::Entity(object) => (ObjectKind::Entity, object),
            Instance::Component(object) => (ObjectKind::Component, object),
        }
    }
}

/// Typed access to trait objects
///
/// Call through `&dyn Serializable`, not through the `Box`.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Trait for objects that can be saved and loaded
///
/// # Design Pattern: Default Hooks
///
/// Only `serialize_name`, `serialize` and `deserialize` are required. The
/// hooks default to no-ops, and the two child hooks default to the tree's
/// native containment, so dispatch is uniform for every type.
///
/// # Example
///
/// ```ignore
/// impl Serializable for Building {
///     fn serialize_name(&self) -> &'static str {
///         Self::SERIALIZE_NAME
///     }
///
///     fn serialize(&self) -> Result<Value, SaveError> {
///         Ok(serde_json::to_value(&self.state)?)
///     }
///
///     fn deserialize(&mut self, data: &Value) -> Result<(), SaveError> {
///         self.state = serde_json::from_value(data.clone())?;
///         Ok(())
///     }
/// }
/// ```
pub trait Serializable: AsAny {
    /// The registered name of this object's type
    ///
    /// Implementations return `Self::SERIALIZE_NAME`, never a field.
    fn serialize_name(&self) -> &'static str;

    /// Produce the payload for this object. `Value::Null` means no payload.
    fn serialize(&self) -> Result<Value, SaveError>;

    /// Restore state from a payload. A missing payload arrives as `Value::Null`.
    fn deserialize(&mut self, data: &Value) -> Result<(), SaveError>;

    /// Persistable children, given the tree's native enumeration
    ///
    /// Return None to use `native` unchanged.
    fn child_objects(
        &self,
        _scene: &dyn SceneView,
        _native: &[ObjectHandle],
    ) -> Option<Vec<ObjectHandle>> {
        None
    }

    /// Called on a live parent when a loaded child is attached to it
    ///
    /// `data` is the child's raw payload, for parents that place children
    /// by stored position.
    fn add_child_object(
        &mut self,
        _child: ObjectHandle,
        _kind: ObjectKind,
        _data: &Value,
    ) -> ChildPlacement {
        ChildPlacement::Attach
    }

    /// Runs on every node before any node is serialized
    fn pre_serialize(&mut self) {}

    /// Runs on every node after every payload is filled
    fn post_serialize(&mut self, _record: &NodeRecord) {}

    /// Runs on every loaded node before any payload is applied
    fn pre_deserialize(&mut self) {}

    /// Runs on a loaded entity once the tree has inserted it
    fn post_deserialize(&mut self, _record: &NodeRecord) {}
}

/// A registrable persistable type
///
/// `SERIALIZE_NAME` is a stable tag chosen by the type's author. It is what
/// ends up in saves, so it must not change between builds.
pub trait SerializeType: Serializable + Default + Sized {
    const SERIALIZE_NAME: &'static str;
    const KIND: ObjectKind;
}
