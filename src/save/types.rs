//! Save data types for scene snapshots
//!
//! This module defines the flat node records a scene is saved into, the
//! snapshot that holds them, and the error type shared by the whole save
//! system. It uses Serde for serialization/deserialization to JSON format.

use super::tree::ObjectHandle;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One persisted object
///
/// `children` is informational: loading attaches through `parent_id` alone.
/// `live_ref` and `is_attached` only exist while a save or load is running
/// and are never written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub class_name: String,
    pub id: String,
    /// Empty for a root
    #[serde(default)]
    pub parent_id: String,
    /// Payload produced by the object's `serialize`, opaque to the engine
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    #[serde(skip)]
    pub live_ref: Option<ObjectHandle>,
    #[serde(skip)]
    pub is_attached: bool,
}

impl NodeRecord {
    pub fn new(
        class_name: impl Into<String>,
        id: impl Into<String>,
        parent_id: impl Into<String>,
    ) -> Self {
        NodeRecord {
            class_name: class_name.into(),
            id: id.into(),
            parent_id: parent_id.into(),
            ..Default::default()
        }
    }

    /// Returns true if this node has no parent
    pub fn is_root(&self) -> bool {
        self.parent_id.is_empty()
    }
}

/// The flat result of one save
///
/// Wire form: `{rootItems: [index], items: [...], itemIndexes: {id: index}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub root_items: Vec<usize>,
    #[serde(default)]
    pub items: Vec<NodeRecord>,
    #[serde(default)]
    pub item_indexes: BTreeMap<String, usize>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record, indexing it by id
    ///
    /// Returns error if a record with this id already exists.
    pub fn push(&mut self, record: NodeRecord) -> Result<usize, SaveError> {
        if self.item_indexes.contains_key(&record.id) {
            return Err(SaveError::DuplicateId(record.id));
        }

        let index = self.items.len();
        if record.is_root() {
            self.root_items.push(index);
        }
        self.item_indexes.insert(record.id.clone(), index);
        self.items.push(record);
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.item_indexes.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&NodeRecord> {
        self.index_of(id).and_then(|index| self.items.get(index))
    }

    /// Ids of the top-level records, in save order
    pub fn root_ids(&self) -> Vec<&str> {
        self.root_items
            .iter()
            .filter_map(|&index| self.items.get(index))
            .map(|record| record.id.as_str())
            .collect()
    }

    /// Rebuilds `item_indexes` and `root_items` from `items`
    ///
    /// Stored indexes are never trusted on load; duplicate ids make the
    /// snapshot invalid.
    pub fn reindex(&mut self) -> Result<(), SaveError> {
        self.item_indexes.clear();
        self.root_items.clear();

        for (index, record) in self.items.iter().enumerate() {
            if record.id.is_empty() {
                return Err(SaveError::InvalidSaveData(format!(
                    "item {} has an empty id",
                    index
                )));
            }
            if self.item_indexes.insert(record.id.clone(), index).is_some() {
                return Err(SaveError::InvalidSaveData(format!(
                    "duplicate id '{}'",
                    record.id
                )));
            }
            if record.is_root() {
                self.root_items.push(index);
            }
        }

        Ok(())
    }

    /// Serializes to the JSON text handed to storage
    pub fn to_json(&self, pretty: bool) -> Result<String, SaveError> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    /// Parses snapshot text produced by `to_json`
    pub fn from_json(text: &str) -> Result<Self, SaveError> {
        let mut snapshot: Snapshot = serde_json::from_str(text).map_err(|e| {
            SaveError::InvalidSaveData(format!("could not parse json: {}", e))
        })?;
        snapshot.reindex()?;
        Ok(snapshot)
    }
}

/// Error types for save/load operations
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A type was registered under a name that is already taken
    #[error("Mapping for '{0}' already exists")]
    DuplicateMapping(String),

    #[error("Mapping does not have a serialize name")]
    MissingSerializeName,

    #[error("Could not find class mapping for '{0}'")]
    UnknownClassName(String),

    /// Snapshot text could not be parsed or is structurally broken
    #[error("Invalid save data: {0}")]
    InvalidSaveData(String),

    /// Two live objects carry the same id
    #[error("Duplicate id '{0}' in snapshot")]
    DuplicateId(String),

    #[error("Node '{id}' references missing parent '{parent_id}'")]
    DanglingParentReference { id: String, parent_id: String },

    #[error("Node '{0}' is its own parent")]
    SelfParentReference(String),

    /// A component record with no parent
    #[error("Component '{0}' cannot be added to the scene root")]
    OrphanComponent(String),

    /// A full pass of the attachment queue made no progress
    #[error("Could not attach {} node(s), parent chain unresolvable: {}", .0.len(), .0.join(", "))]
    UnresolvableAttachment(Vec<String>),

    /// The scene tree rejected an attach operation
    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),

    /// A serialize/deserialize implementation failed
    #[error("Payload error in '{class_name}': {message}")]
    Payload { class_name: String, message: String },

    /// A save or load is already in flight
    #[error("Save system is busy")]
    Busy,
}

impl SaveError {
    pub fn payload(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        SaveError::Payload {
            class_name: class_name.into(),
            message: message.into(),
        }
    }
}
