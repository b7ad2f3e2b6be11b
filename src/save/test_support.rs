//! Persistable fixture types shared by the save system tests

use std::cell::RefCell;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::registry::TypeRegistry;
use super::serializable::{ChildPlacement, ObjectKind, Serializable, SerializeType};
use super::tree::{ObjectHandle, SceneView};
use super::types::{NodeRecord, SaveError};

thread_local! {
    static EVENTS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn record_event(event: String) {
    EVENTS.with(|events| events.borrow_mut().push(event));
}

/// Hook calls recorded on this thread since the last call
pub fn take_events() -> Vec<String> {
    EVENTS.with(|events| std::mem::take(&mut *events.borrow_mut()))
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register::<Marker>().unwrap();
    registry.register::<Tag>().unwrap();
    registry.register::<Grid>().unwrap();
    registry.register::<GridCell>().unwrap();
    registry.register::<Failing>().unwrap();
    registry
}

fn from_payload<T: for<'de> Deserialize<'de>>(data: &Value) -> Result<Option<T>, SaveError> {
    if data.is_null() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(data.clone())?))
}

/// Plain entity that logs every hook
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Marker {
    pub label: String,
    pub value: i64,
    #[serde(skip)]
    pub post_deserialized: usize,
}

impl Marker {
    pub fn new(label: &str, value: i64) -> Self {
        Marker {
            label: label.to_string(),
            value,
            post_deserialized: 0,
        }
    }
}

impl Serializable for Marker {
    fn serialize_name(&self) -> &'static str {
        Self::SERIALIZE_NAME
    }

    fn serialize(&self) -> Result<Value, SaveError> {
        record_event(format!("serialize:{}", self.label));
        Ok(serde_json::to_value(self)?)
    }

    fn deserialize(&mut self, data: &Value) -> Result<(), SaveError> {
        if let Some(saved) = from_payload::<Marker>(data)? {
            self.label = saved.label;
            self.value = saved.value;
        }
        record_event(format!("deserialize:{}", self.label));
        Ok(())
    }

    fn pre_serialize(&mut self) {
        record_event(format!("pre_serialize:{}", self.label));
    }

    fn post_serialize(&mut self, record: &NodeRecord) {
        record_event(format!("post_serialize:{}:{}", self.label, record.id));
    }

    fn pre_deserialize(&mut self) {
        record_event(format!("pre_deserialize:{}", self.label));
    }

    fn post_deserialize(&mut self, _record: &NodeRecord) {
        self.post_deserialized += 1;
    }
}

impl SerializeType for Marker {
    const SERIALIZE_NAME: &'static str = "Marker";
    const KIND: ObjectKind = ObjectKind::Entity;
}

/// Component
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

impl Tag {
    pub fn new(name: &str) -> Self {
        Tag {
            name: name.to_string(),
        }
    }
}

impl Serializable for Tag {
    fn serialize_name(&self) -> &'static str {
        Self::SERIALIZE_NAME
    }

    fn serialize(&self) -> Result<Value, SaveError> {
        Ok(serde_json::to_value(self)?)
    }

    fn deserialize(&mut self, data: &Value) -> Result<(), SaveError> {
        if let Some(saved) = from_payload::<Tag>(data)? {
            *self = saved;
        }
        Ok(())
    }
}

impl SerializeType for Tag {
    const SERIALIZE_NAME: &'static str = "Tag";
    const KIND: ObjectKind = ObjectKind::Component;
}

/// Entity that places child entities into slots by their stored `slot`
///
/// Children without a slot in range are kept off the tree. Empty cells are
/// not saved.
#[derive(Debug, Default, Clone)]
pub struct Grid {
    pub size: usize,
    pub slots: Vec<Option<ObjectHandle>>,
}

impl Grid {
    pub fn with_slots(size: usize) -> Self {
        Grid {
            size,
            slots: vec![None; size],
        }
    }
}

impl Serializable for Grid {
    fn serialize_name(&self) -> &'static str {
        Self::SERIALIZE_NAME
    }

    fn serialize(&self) -> Result<Value, SaveError> {
        Ok(serde_json::json!({ "size": self.size }))
    }

    fn deserialize(&mut self, data: &Value) -> Result<(), SaveError> {
        if let Some(size) = data.get("size").and_then(Value::as_u64) {
            self.size = size as usize;
            self.slots.resize(self.size, None);
        }
        Ok(())
    }

    fn child_objects(
        &self,
        scene: &dyn SceneView,
        native: &[ObjectHandle],
    ) -> Option<Vec<ObjectHandle>> {
        let children = native
            .iter()
            .copied()
            .filter(|&child| {
                let is_cell = scene
                    .object(child)
                    .map(|o| o.serialize_name() == GridCell::SERIALIZE_NAME)
                    .unwrap_or(false);
                !is_cell || !scene.native_children(child).is_empty()
            })
            .collect();
        Some(children)
    }

    fn add_child_object(
        &mut self,
        child: ObjectHandle,
        kind: ObjectKind,
        data: &Value,
    ) -> ChildPlacement {
        if kind != ObjectKind::Entity {
            return ChildPlacement::Attach;
        }
        match data.get("slot").and_then(Value::as_u64) {
            Some(slot) if (slot as usize) < self.slots.len() => {
                self.slots[slot as usize] = Some(child);
                ChildPlacement::Attach
            }
            _ => ChildPlacement::Keep,
        }
    }
}

impl SerializeType for Grid {
    const SERIALIZE_NAME: &'static str = "Grid";
    const KIND: ObjectKind = ObjectKind::Entity;
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct GridCell {
    pub slot: usize,
}

impl GridCell {
    pub fn at(slot: usize) -> Self {
        GridCell { slot }
    }
}

impl Serializable for GridCell {
    fn serialize_name(&self) -> &'static str {
        Self::SERIALIZE_NAME
    }

    fn serialize(&self) -> Result<Value, SaveError> {
        Ok(serde_json::to_value(self)?)
    }

    fn deserialize(&mut self, data: &Value) -> Result<(), SaveError> {
        if let Some(saved) = from_payload::<GridCell>(data)? {
            *self = saved;
        }
        Ok(())
    }
}

impl SerializeType for GridCell {
    const SERIALIZE_NAME: &'static str = "GridCell";
    const KIND: ObjectKind = ObjectKind::Entity;
}

/// Entity whose payload never works
#[derive(Debug, Default)]
pub struct Failing;

impl Serializable for Failing {
    fn serialize_name(&self) -> &'static str {
        Self::SERIALIZE_NAME
    }

    fn serialize(&self) -> Result<Value, SaveError> {
        Err(SaveError::payload(Self::SERIALIZE_NAME, "cannot serialize"))
    }

    fn deserialize(&mut self, _data: &Value) -> Result<(), SaveError> {
        Err(SaveError::payload(Self::SERIALIZE_NAME, "cannot deserialize"))
    }
}

impl SerializeType for Failing {
    const SERIALIZE_NAME: &'static str = "Failing";
    const KIND: ObjectKind = ObjectKind::Entity;
}
