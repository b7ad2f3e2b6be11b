use crate::save::{
    Instance, ObjectHandle, ObjectKind, SaveError, SceneTree, SceneView, Serializable,
    SerializeType,
};

struct SceneNode {
    kind: ObjectKind,
    object: Option<Box<dyn Serializable>>,
    serialize_id: Option<String>,
    /// Owning entity for a component, containing entity for a child
    parent: Option<ObjectHandle>,
    components: Vec<ObjectHandle>,
    children: Vec<ObjectHandle>,
    top_level: bool,
    killed: bool,
    in_scene: bool,
}

impl SceneNode {
    fn new(kind: ObjectKind, object: Option<Box<dyn Serializable>>) -> Self {
        SceneNode {
            kind,
            object,
            serialize_id: None,
            parent: None,
            components: Vec::new(),
            children: Vec::new(),
            top_level: false,
            killed: false,
            in_scene: false,
        }
    }

    fn is_detached(&self) -> bool {
        self.parent.is_none() && !self.top_level
    }
}

/// Arena-backed scene of entities and components
///
/// Objects live in the arena from `spawn`/`create` on; attaching only links
/// them. Insertion is deferred: attached entities become `in_scene` at the
/// next `update`, the way a game scene applies additions on its own tick.
#[derive(Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    top_level: Vec<ObjectHandle>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects in the arena, attached or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, handle: ObjectHandle) -> Option<&SceneNode> {
        self.nodes.get(handle.index())
    }

    fn node_mut(&mut self, handle: ObjectHandle) -> Option<&mut SceneNode> {
        self.nodes.get_mut(handle.index())
    }

    fn entity(&self, handle: ObjectHandle, role: &str) -> Result<&SceneNode, SaveError> {
        match self.node(handle) {
            Some(node) if node.kind == ObjectKind::Entity => Ok(node),
            Some(_) => Err(SaveError::InvalidAttachment(format!(
                "{} {:?} is not an entity",
                role, handle
            ))),
            None => Err(unknown(handle)),
        }
    }

    /// Creates a detached object from a persistable value
    pub fn create<T: SerializeType>(&mut self, value: T) -> ObjectHandle {
        self.spawn(Instance::new(value))
    }

    /// Creates a detached entity with nothing to persist
    pub fn create_plain(&mut self) -> ObjectHandle {
        self.push(SceneNode::new(ObjectKind::Entity, None))
    }

    fn push(&mut self, node: SceneNode) -> ObjectHandle {
        let handle = ObjectHandle::new(self.nodes.len());
        self.nodes.push(node);
        handle
    }

    pub fn get<T: 'static>(&self, handle: ObjectHandle) -> Option<&T> {
        self.node(handle)?
            .object
            .as_deref()?
            .as_any()
            .downcast_ref::<T>()
    }

    pub fn get_mut<T: 'static>(&mut self, handle: ObjectHandle) -> Option<&mut T> {
        self.node_mut(handle)?
            .object
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    pub fn parent(&self, handle: ObjectHandle) -> Option<ObjectHandle> {
        self.node(handle)?.parent
    }

    pub fn children(&self, handle: ObjectHandle) -> &[ObjectHandle] {
        self.node(handle).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn components(&self, handle: ObjectHandle) -> &[ObjectHandle] {
        self.node(handle)
            .map(|n| n.components.as_slice())
            .unwrap_or(&[])
    }

    pub fn find_by_serialize_id(&self, id: &str) -> Option<ObjectHandle> {
        self.nodes
            .iter()
            .position(|n| n.serialize_id.as_deref() == Some(id))
            .map(ObjectHandle::new)
    }

    /// Marks an object removed; it stays in the arena
    pub fn kill(&mut self, handle: ObjectHandle) {
        if let Some(node) = self.node_mut(handle) {
            node.killed = true;
            node.in_scene = false;
        }
    }

    /// Commits pending insertions
    ///
    /// Everything reachable from a live top-level entity is in the scene
    /// afterwards; everything else is not.
    pub fn update(&mut self) {
        for node in &mut self.nodes {
            node.in_scene = false;
        }

        let mut stack: Vec<ObjectHandle> = self.top_level.clone();
        while let Some(handle) = stack.pop() {
            let Some(node) = self.nodes.get_mut(handle.index()) else {
                continue;
            };
            if node.killed {
                continue;
            }
            node.in_scene = true;
            stack.extend(node.components.iter().copied());
            stack.extend(node.children.iter().copied());
        }
    }

    /// True if `ancestor` contains `handle`, directly or not
    fn is_ancestor(&self, ancestor: ObjectHandle, handle: ObjectHandle) -> bool {
        let mut current = self.parent(handle);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }
}

fn unknown(handle: ObjectHandle) -> SaveError {
    SaveError::InvalidAttachment(format!("no object {:?} in scene", handle))
}

fn already_attached(handle: ObjectHandle) -> SaveError {
    SaveError::InvalidAttachment(format!("{:?} is already attached", handle))
}

impl SceneView for Scene {
    fn root_objects(&self) -> Vec<ObjectHandle> {
        self.top_level
            .iter()
            .copied()
            .filter(|&h| self.node(h).map(|n| !n.killed).unwrap_or(false))
            .collect()
    }

    fn native_children(&self, handle: ObjectHandle) -> Vec<ObjectHandle> {
        match self.node(handle) {
            Some(node) if !node.killed => node
                .components
                .iter()
                .chain(node.children.iter())
                .copied()
                .collect(),
            _ => Vec::new(),
        }
    }

    fn kind(&self, handle: ObjectHandle) -> Option<ObjectKind> {
        self.node(handle).map(|n| n.kind)
    }

    fn object(&self, handle: ObjectHandle) -> Option<&dyn Serializable> {
        self.node(handle)?.object.as_deref()
    }

    fn serialize_id(&self, handle: ObjectHandle) -> Option<&str> {
        self.node(handle)?.serialize_id.as_deref()
    }

    fn is_removed(&self, handle: ObjectHandle) -> bool {
        self.node(handle).map(|n| n.killed).unwrap_or(true)
    }

    fn is_in_scene(&self, handle: ObjectHandle) -> bool {
        self.node(handle).map(|n| n.in_scene).unwrap_or(false)
    }
}

impl SceneTree for Scene {
    fn object_mut(&mut self, handle: ObjectHandle) -> Option<&mut dyn Serializable> {
        self.node_mut(handle)?
            .object
            .as_mut()
            .map(|object| &mut **object as &mut dyn Serializable)
    }

    fn set_serialize_id(&mut self, handle: ObjectHandle, id: String) {
        if let Some(node) = self.node_mut(handle) {
            node.serialize_id = Some(id);
        }
    }

    fn spawn(&mut self, instance: Instance) -> ObjectHandle {
        let (kind, object) = instance.into_parts();
        self.push(SceneNode::new(kind, Some(object)))
    }

    fn add_entity(&mut self, entity: ObjectHandle) -> Result<(), SaveError> {
        if !self.entity(entity, "top-level object")?.is_detached() {
            return Err(already_attached(entity));
        }

        if let Some(node) = self.node_mut(entity) {
            node.top_level = true;
        }
        self.top_level.push(entity);
        Ok(())
    }

    fn add_child(&mut self, parent: ObjectHandle, child: ObjectHandle) -> Result<(), SaveError> {
        if parent == child {
            return Err(SaveError::InvalidAttachment(format!(
                "{:?} cannot contain itself",
                child
            )));
        }
        self.entity(parent, "parent")?;
        if !self.entity(child, "child")?.is_detached() {
            return Err(already_attached(child));
        }
        if self.is_ancestor(child, parent) {
            return Err(SaveError::InvalidAttachment(format!(
                "{:?} contains {:?}",
                child, parent
            )));
        }

        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
        Ok(())
    }

    fn add_component(
        &mut self,
        entity: ObjectHandle,
        component: ObjectHandle,
    ) -> Result<(), SaveError> {
        self.entity(entity, "component owner")?;
        match self.node(component) {
            Some(node) if node.kind != ObjectKind::Component => {
                return Err(SaveError::InvalidAttachment(format!(
                    "{:?} is not a component",
                    component
                )));
            }
            Some(node) if node.parent.is_some() => return Err(already_attached(component)),
            Some(_) => {}
            None => return Err(unknown(component)),
        }

        if let Some(node) = self.node_mut(component) {
            node.parent = Some(entity);
        }
        if let Some(node) = self.node_mut(entity) {
            node.components.push(component);
        }
        Ok(())
    }
}
