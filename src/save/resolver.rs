//! Attachment resolver
//!
//! Re-inserts loaded nodes into the live tree in parent-before-child order,
//! whatever order the snapshot lists them in. Nodes whose parent is not yet
//! attached go to the back of a FIFO queue. Every full pass over the queue
//! must attach at least one node; a pass that attaches none means the
//! remaining parent chains are cyclic or unresolvable, and the load fails
//! instead of spinning.

use std::collections::VecDeque;

use super::serializable::{ChildPlacement, ObjectKind};
use super::tree::{ObjectHandle, SceneTree};
use super::types::{NodeRecord, SaveError, Snapshot};

/// One attached node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    pub index: usize,
    pub placement: ChildPlacement,
}

/// Outcome of a successful resolve
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// In attach order
    pub attached: Vec<Attachment>,
    /// Full passes over the queue
    pub passes: usize,
}

enum Step {
    Attached(ChildPlacement),
    Deferred,
}

pub struct AttachmentResolver<'a> {
    snapshot: &'a mut Snapshot,
}

impl<'a> AttachmentResolver<'a> {
    pub fn new(snapshot: &'a mut Snapshot) -> Self {
        AttachmentResolver { snapshot }
    }

    /// Attaches every node that has a live object
    ///
    /// Fails hard on dangling, self-referencing or unresolvable parents.
    /// Attachments made before the failure are not rolled back.
    pub fn resolve<T: SceneTree>(self, tree: &mut T) -> Result<Resolution, SaveError> {
        let mut queue: VecDeque<usize> = self
            .snapshot
            .items
            .iter()
            .enumerate()
            .filter(|(_, record)| record.live_ref.is_some() && !record.is_attached)
            .map(|(index, _)| index)
            .collect();

        let mut resolution = Resolution::default();

        while !queue.is_empty() {
            resolution.passes += 1;
            let pass_len = queue.len();
            let mut progress = 0;

            for _ in 0..pass_len {
                let Some(index) = queue.pop_front() else {
                    break;
                };

                match self.try_attach(tree, index)? {
                    Step::Attached(placement) => {
                        self.snapshot.items[index].is_attached = true;
                        resolution.attached.push(Attachment { index, placement });
                        progress += 1;
                    }
                    Step::Deferred => queue.push_back(index),
                }
            }

            if progress == 0 {
                let ids = queue
                    .iter()
                    .map(|&index| self.snapshot.items[index].id.clone())
                    .collect();
                return Err(SaveError::UnresolvableAttachment(ids));
            }
        }

        Ok(resolution)
    }

    fn try_attach<T: SceneTree>(&self, tree: &mut T, index: usize) -> Result<Step, SaveError> {
        let record = &self.snapshot.items[index];
        let Some(child) = record.live_ref else {
            return Ok(Step::Deferred);
        };

        if record.is_root() {
            if tree.kind(child) == Some(ObjectKind::Component) {
                return Err(SaveError::OrphanComponent(record.id.clone()));
            }
            tree.add_entity(child)?;
            return Ok(Step::Attached(ChildPlacement::Attach));
        }

        let parent = self.parent_of(record)?;
        let Some(parent_ref) = parent.live_ref else {
            return Err(dangling(record));
        };
        if record.parent_id == record.id {
            return Err(SaveError::SelfParentReference(record.id.clone()));
        }
        if !parent.is_attached {
            return Ok(Step::Deferred);
        }

        let placement = attach_child(tree, parent_ref, child, record)?;
        Ok(Step::Attached(placement))
    }

    fn parent_of(&self, record: &NodeRecord) -> Result<&NodeRecord, SaveError> {
        self.snapshot
            .index_of(&record.parent_id)
            .and_then(|index| self.snapshot.items.get(index))
            .ok_or_else(|| dangling(record))
    }
}

fn dangling(record: &NodeRecord) -> SaveError {
    SaveError::DanglingParentReference {
        id: record.id.clone(),
        parent_id: record.parent_id.clone(),
    }
}

/// Offers the child to the parent's hook, then attaches natively unless kept
fn attach_child<T: SceneTree>(
    tree: &mut T,
    parent: ObjectHandle,
    child: ObjectHandle,
    record: &NodeRecord,
) -> Result<ChildPlacement, SaveError> {
    let kind = tree.kind(child).ok_or_else(|| {
        SaveError::InvalidAttachment(format!("node '{}' has no live object", record.id))
    })?;

    let placement = match tree.object_mut(parent) {
        Some(object) => object.add_child_object(child, kind, &record.data),
        None => ChildPlacement::Attach,
    };

    if placement == ChildPlacement::Attach {
        match kind {
            ObjectKind::Entity => tree.add_child(parent, child)?,
            ObjectKind::Component => tree.add_component(parent, child)?,
        }
    }

    Ok(placement)
}
