use std::collections::HashMap;

use super::serializable::{Instance, ObjectKind, Serializable, SerializeType};
use super::types::SaveError;

/// Zero-argument constructor for a registered type
pub type Constructor = fn() -> Instance;

/// A registered type
#[derive(Debug, Clone, Copy)]
pub struct Mapping {
    pub name: &'static str,
    pub kind: ObjectKind,
    constructor: Constructor,
}

impl Mapping {
    /// Builds a fresh, default-state instance
    pub fn construct(&self) -> Instance {
        (self.constructor)()
    }
}

fn construct_default<T: SerializeType>() -> Instance {
    Instance::new(T::default())
}

/// Central registry of all persistable types
///
/// This is the single source of truth for which serialized names can be
/// loaded. Build it once at startup, before any save or load, then hand it
/// to the `SaveSystem`; it is read-only afterwards.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    mappings: HashMap<&'static str, Mapping>,
}

impl TypeRegistry {
    /// Creates a new empty registry
    pub fn new() -> Self {
        TypeRegistry {
            mappings: HashMap::new(),
        }
    }

    /// Registers a type under its `SERIALIZE_NAME`
    ///
    /// Returns error if a type with this name already exists.
    pub fn register<T: SerializeType>(&mut self) -> Result<(), SaveError> {
        self.register_constructor(T::SERIALIZE_NAME, T::KIND, construct_default::<T>)
    }

    /// Registers a raw constructor under `name`
    pub fn register_constructor(
        &mut self,
        name: &'static str,
        kind: ObjectKind,
        constructor: Constructor,
    ) -> Result<(), SaveError> {
        if name.is_empty() {
            return Err(SaveError::MissingSerializeName);
        }
        if self.mappings.contains_key(name) {
            return Err(SaveError::DuplicateMapping(name.to_string()));
        }

        self.mappings.insert(
            name,
            Mapping {
                name,
                kind,
                constructor,
            },
        );
        Ok(())
    }

    /// Gets the mapping for a serialized name
    pub fn resolve(&self, name: &str) -> Result<&Mapping, SaveError> {
        self.mappings
            .get(name)
            .ok_or_else(|| SaveError::UnknownClassName(name.to_string()))
    }

    /// Returns true if a type with this name exists
    pub fn is_registered(&self, name: &str) -> bool {
        self.mappings.contains_key(name)
    }

    /// The serialized name of a live object
    pub fn name_of(object: &dyn Serializable) -> &'static str {
        object.serialize_name()
    }

    pub fn name_of_type<T: SerializeType>() -> &'static str {
        T::SERIALIZE_NAME
    }

    /// Returns all registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.mappings.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::test_support::{Grid, Marker, Tag};

    #[test]
    fn test_register_and_resolve() {
        let mut registry = TypeRegistry::new();
        registry.register::<Marker>().unwrap();
        registry.register::<Tag>().unwrap();

        let mapping = registry.resolve("Tag").unwrap();
        assert_eq!(mapping.name, "Tag");
        assert_eq!(mapping.kind, ObjectKind::Component);
        assert_eq!(mapping.construct().kind(), ObjectKind::Component);
        assert_eq!(registry.names(), vec!["Marker", "Tag"]);
    }

    #[test]
    fn test_duplicate_mapping() {
        let mut registry = TypeRegistry::new();
        registry.register::<Marker>().unwrap();

        let result = registry.register::<Marker>();
        assert!(matches!(result, Err(SaveError::DuplicateMapping(name)) if name == "Marker"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_name_from_another_type() {
        // A second registration pass (e.g. module reload) is not exempt
        fn other() -> Instance {
            Instance::new(Grid::default())
        }

        let mut registry = TypeRegistry::new();
        registry.register::<Marker>().unwrap();
        let result = registry.register_constructor("Marker", ObjectKind::Entity, other);

        assert!(matches!(result, Err(SaveError::DuplicateMapping(_))));
    }

    #[test]
    fn test_empty_name_rejected() {
        fn make() -> Instance {
            Instance::new(Marker::default())
        }

        let mut registry = TypeRegistry::new();
        let result = registry.register_constructor("", ObjectKind::Entity, make);
        assert!(matches!(result, Err(SaveError::MissingSerializeName)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_resolve_unknown() {
        let registry = TypeRegistry::new();
        let result = registry.resolve("Nope");
        assert!(matches!(result, Err(SaveError::UnknownClassName(name)) if name == "Nope"));
    }

    #[test]
    fn test_name_of_uses_type_tag() {
        let marker = Marker::new("anything", 1);
        assert_eq!(TypeRegistry::name_of(&marker), "Marker");
        assert_eq!(TypeRegistry::name_of_type::<Grid>(), "Grid");
    }
}
