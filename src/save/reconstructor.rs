//! Load path: snapshot → live objects
//!
//! 1. Every record's class is resolved and a fresh object spawned with the
//!    record's id. Unknown classes are logged and dropped.
//! 2. `pre_deserialize` runs on every spawned object.
//! 3. `deserialize` runs on every spawned object.
//! 4. The attachment resolver inserts everything into the tree.
//! 5. Natively attached entities get `post_deserialize` once the tree has
//!    really inserted them; the caller runs those hooks (see `PendingHook`).

use super::registry::TypeRegistry;
use super::resolver::AttachmentResolver;
use super::serializable::{ChildPlacement, ObjectKind};
use super::tree::{ObjectHandle, SceneTree};
use super::types::{NodeRecord, SaveError, Snapshot};

/// Summary of a finished load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Ids in the order they were attached
    pub attached: Vec<String>,
    /// Ids of records whose class was not registered
    pub dropped: Vec<String>,
    /// Full passes the attachment resolver needed
    pub passes: usize,
    /// `post_deserialize` hooks waiting for the tree to insert their entity
    pub pending_hooks: usize,
}

/// A `post_deserialize` call waiting on the tree's insertion
#[derive(Debug, Clone)]
pub struct PendingHook {
    pub handle: ObjectHandle,
    pub record: NodeRecord,
}

/// Output of `GraphReconstructor::load`
#[derive(Debug)]
pub struct Reconstruction {
    pub report: LoadReport,
    pub pending: Vec<PendingHook>,
}

pub struct GraphReconstructor<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> GraphReconstructor<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        GraphReconstructor { registry }
    }

    /// Parses snapshot text and loads it
    ///
    /// A parse failure leaves the tree untouched.
    pub fn load_text<T: SceneTree>(
        &self,
        tree: &mut T,
        text: &str,
    ) -> Result<Reconstruction, SaveError> {
        let snapshot = Snapshot::from_json(text)?;
        self.load(tree, snapshot)
    }

    /// Loads a snapshot; its `item_indexes` and `root_items` are rebuilt
    /// from `items` first
    pub fn load<T: SceneTree>(
        &self,
        tree: &mut T,
        mut snapshot: Snapshot,
    ) -> Result<Reconstruction, SaveError> {
        snapshot.reindex()?;
        let mut report = LoadReport::default();

        for record in snapshot.items.iter_mut() {
            record.is_attached = false;
            match self.registry.resolve(&record.class_name) {
                Ok(mapping) => {
                    let handle = tree.spawn(mapping.construct());
                    tree.set_serialize_id(handle, record.id.clone());
                    record.live_ref = Some(handle);
                }
                Err(e) => {
                    log::error!("{} (node '{}' dropped)", e, record.id);
                    record.live_ref = None;
                    report.dropped.push(record.id.clone());
                }
            }
        }

        // Every object exists before any payload is applied
        for record in &snapshot.items {
            let Some(handle) = record.live_ref else {
                continue;
            };
            if let Some(object) = tree.object_mut(handle) {
                object.pre_deserialize();
            }
        }

        for record in &snapshot.items {
            let Some(handle) = record.live_ref else {
                continue;
            };
            if let Some(object) = tree.object_mut(handle) {
                object.deserialize(&record.data)?;
            }
        }

        let resolution = AttachmentResolver::new(&mut snapshot).resolve(tree)?;
        report.passes = resolution.passes;

        let mut pending = Vec::new();
        for attachment in &resolution.attached {
            let record = &snapshot.items[attachment.index];
            report.attached.push(record.id.clone());

            let Some(handle) = record.live_ref else {
                continue;
            };
            if attachment.placement == ChildPlacement::Keep
                || tree.kind(handle) != Some(ObjectKind::Entity)
            {
                continue;
            }

            let mut record = record.clone();
            record.live_ref = None;
            pending.push(PendingHook { handle, record });
        }
        report.pending_hooks = pending.len();

        Ok(Reconstruction { report, pending })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::test_support::{self, Marker, Tag};
    use crate::save::tree::SceneView;
    use crate::scene::Scene;
    use serde_json::json;

    const CONCRETE: &str = r#"{
        "rootItems": [0],
        "items": [
            {"className": "Marker", "id": "auto-0", "parentId": "", "data": {"label": "R", "value": 1}, "children": ["auto-1"]},
            {"className": "Marker", "id": "auto-1", "parentId": "auto-0", "data": {"label": "C", "value": 2}, "children": ["auto-2"]},
            {"className": "Tag", "id": "auto-2", "parentId": "auto-1", "data": {"name": "B"}}
        ],
        "itemIndexes": {"auto-0": 0, "auto-1": 1, "auto-2": 2}
    }"#;

    #[test]
    fn test_load_concrete_scenario() {
        let registry = test_support::registry();
        let mut scene = Scene::new();

        let out = GraphReconstructor::new(&registry)
            .load_text(&mut scene, CONCRETE)
            .unwrap();

        assert_eq!(out.report.attached, vec!["auto-0", "auto-1", "auto-2"]);
        assert!(out.report.dropped.is_empty());
        assert_eq!(out.report.pending_hooks, 2);

        let root = scene.find_by_serialize_id("auto-0").unwrap();
        let child = scene.find_by_serialize_id("auto-1").unwrap();
        let tag = scene.find_by_serialize_id("auto-2").unwrap();
        assert_eq!(scene.root_objects(), vec![root]);
        assert_eq!(scene.children(root), &[child]);
        assert_eq!(scene.components(child), &[tag]);
        assert_eq!(scene.get::<Marker>(child).unwrap().value, 2);
        assert_eq!(scene.get::<Tag>(tag).unwrap().name, "B");
    }

    #[test]
    fn test_hooks_run_in_passes() {
        let registry = test_support::registry();
        let text = r#"{"items": [
            {"className": "Marker", "id": "b", "parentId": "a", "data": {"label": "b", "value": 0}},
            {"className": "Marker", "id": "a", "data": {"label": "a", "value": 0}}
        ]}"#;
        let mut scene = Scene::new();

        test_support::take_events();
        GraphReconstructor::new(&registry)
            .load_text(&mut scene, text)
            .unwrap();

        // Labels are only known after deserialize
        assert_eq!(
            test_support::take_events(),
            vec!["pre_deserialize:", "pre_deserialize:", "deserialize:b", "deserialize:a"]
        );
    }

    #[test]
    fn test_unknown_class_dropped() {
        let registry = test_support::registry();
        let text = r#"{"items": [
            {"className": "Marker", "id": "a"},
            {"className": "Retired", "id": "old"}
        ]}"#;
        let mut scene = Scene::new();

        let out = GraphReconstructor::new(&registry)
            .load_text(&mut scene, text)
            .unwrap();

        assert_eq!(out.report.dropped, vec!["old"]);
        assert_eq!(out.report.attached, vec!["a"]);
        assert!(scene.find_by_serialize_id("old").is_none());
    }

    #[test]
    fn test_child_of_unknown_class_fails() {
        let registry = test_support::registry();
        let text = r#"{"items": [
            {"className": "Retired", "id": "old"},
            {"className": "Marker", "id": "kid", "parentId": "old"}
        ]}"#;
        let mut scene = Scene::new();

        let result = GraphReconstructor::new(&registry).load_text(&mut scene, text);
        assert!(matches!(result, Err(SaveError::DanglingParentReference { id, .. }) if id == "kid"));
    }

    #[test]
    fn test_invalid_text_leaves_scene_untouched() {
        let registry = test_support::registry();
        let mut scene = Scene::new();

        let result = GraphReconstructor::new(&registry).load_text(&mut scene, "][");
        assert!(matches!(result, Err(SaveError::InvalidSaveData(_))));
        assert_eq!(scene.len(), 0);
    }

    #[test]
    fn test_duplicate_ids_rejected_before_spawning() {
        let registry = test_support::registry();
        let mut snapshot = Snapshot::new();
        snapshot.items.push(NodeRecord::new("Marker", "a", ""));
        snapshot.items.push(NodeRecord::new("Marker", "a", ""));
        let mut scene = Scene::new();

        let result = GraphReconstructor::new(&registry).load(&mut scene, snapshot);
        assert!(matches!(result, Err(SaveError::InvalidSaveData(_))));
        assert_eq!(scene.len(), 0);
    }

    #[test]
    fn test_deserialize_error_aborts() {
        let registry = test_support::registry();
        let mut snapshot = Snapshot::new();
        let mut bad = NodeRecord::new("Failing", "bad", "");
        bad.data = json!("anything");
        snapshot.push(bad).unwrap();
        let mut scene = Scene::new();

        let result = GraphReconstructor::new(&registry).load(&mut scene, snapshot);
        assert!(matches!(result, Err(SaveError::Payload { .. })));
        assert!(scene.root_objects().is_empty());
    }
}
