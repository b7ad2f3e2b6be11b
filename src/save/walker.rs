//! Save path: live tree → snapshot
//!
//! Walks the scene depth-first in pre-order, builds one record per live,
//! registered object, then runs the three hook passes:
//! `pre_serialize` on every node, `serialize` on every node, and
//! `post_serialize` on every node. Any payload error aborts the walk; the
//! caller writes to storage only after this returns.

use std::collections::HashSet;

use super::registry::TypeRegistry;
use super::tree::{ObjectHandle, SceneTree, SceneView};
use super::types::{NodeRecord, SaveError, Snapshot};

/// Prefix for ids minted during a save
pub const AUTO_ID_PREFIX: &str = "auto-";

/// An object found during traversal, before ids are settled
struct Visited {
    handle: ObjectHandle,
    class_name: &'static str,
    carried_id: Option<String>,
    parent: Option<usize>,
}

pub struct GraphWalker<'a> {
    registry: &'a TypeRegistry,
    visited: Vec<Visited>,
    seen: HashSet<ObjectHandle>,
}

impl<'a> GraphWalker<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        GraphWalker {
            registry,
            visited: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Saves everything reachable from the tree's top-level objects
    pub fn save<T: SceneTree>(self, tree: &mut T) -> Result<Snapshot, SaveError> {
        let roots = tree.root_objects();
        self.save_roots(tree, &roots)
    }

    /// Saves everything reachable from `roots`
    pub fn save_roots<T: SceneTree>(
        mut self,
        tree: &mut T,
        roots: &[ObjectHandle],
    ) -> Result<Snapshot, SaveError> {
        for &root in roots {
            self.visit(&*tree, root);
        }

        let (mut snapshot, handles) = self.build_records()?;

        // Pass 1: every hook sees the complete structure before any payload exists
        for &handle in &handles {
            if let Some(object) = tree.object_mut(handle) {
                object.pre_serialize();
            }
        }

        // Pass 2
        for (record, &handle) in snapshot.items.iter_mut().zip(&handles) {
            if let Some(object) = tree.object(handle) {
                record.data = object.serialize()?;
            }
        }

        // Pass 3
        for (record, &handle) in snapshot.items.iter().zip(&handles) {
            if let Some(object) = tree.object_mut(handle) {
                object.post_serialize(record);
            }
        }

        log::debug!(
            "Walked {} nodes ({} roots)",
            snapshot.len(),
            snapshot.root_items.len()
        );

        Ok(snapshot)
    }

    /// Pre-order walk from one root, on an explicit stack
    fn visit<V: SceneView>(&mut self, scene: &V, root: ObjectHandle) {
        let mut stack: Vec<(ObjectHandle, Option<usize>)> = vec![(root, None)];

        while let Some((handle, parent)) = stack.pop() {
            if scene.is_removed(handle) {
                continue;
            }
            let Some(object) = scene.object(handle) else {
                continue;
            };

            let class_name = object.serialize_name();
            if !self.registry.is_registered(class_name) {
                log::debug!("Skipping unregistered type '{}'", class_name);
                continue;
            }
            if !self.seen.insert(handle) {
                log::warn!("Object {:?} reached twice, keeping first", handle);
                continue;
            }

            let index = self.visited.len();
            self.visited.push(Visited {
                handle,
                class_name,
                carried_id: scene.serialize_id(handle).map(str::to_string),
                parent,
            });

            let native = scene.native_children(handle);
            let children = object
                .child_objects(scene, &native)
                .unwrap_or(native);
            // Reversed so the first child is popped first
            stack.extend(children.into_iter().rev().map(|child| (child, Some(index))));
        }
    }

    /// Settles ids and adjacency, in traversal order
    ///
    /// Minted ids skip any id carried by an object in this same save.
    fn build_records(self) -> Result<(Snapshot, Vec<ObjectHandle>), SaveError> {
        let reserved: HashSet<&str> = self
            .visited
            .iter()
            .filter_map(|v| v.carried_id.as_deref())
            .collect();

        let mut next_id = 0usize;
        let mut ids = Vec::with_capacity(self.visited.len());
        for visited in &self.visited {
            let id = match &visited.carried_id {
                Some(id) => id.clone(),
                None => loop {
                    let candidate = format!("{}{}", AUTO_ID_PREFIX, next_id);
                    next_id += 1;
                    if !reserved.contains(candidate.as_str()) {
                        break candidate;
                    }
                },
            };
            ids.push(id);
        }

        let mut snapshot = Snapshot::new();
        let mut handles = Vec::with_capacity(self.visited.len());
        for (visited, id) in self.visited.iter().zip(&ids) {
            let parent_id = visited
                .parent
                .map(|p| ids[p].clone())
                .unwrap_or_default();
            snapshot.push(NodeRecord::new(visited.class_name, id.clone(), parent_id))?;
            handles.push(visited.handle);

            if let Some(parent) = visited.parent {
                snapshot.items[parent].children.push(id.clone());
            }
        }

        Ok((snapshot, handles))
    }
}
