use std::collections::BTreeMap;

use crate::error::PersistError;

/// Resolves content-definition names referenced by binary records.
pub trait DefinitionLookup {
    fn index_of(&self, name: &str) -> Option<u16>;
    fn name_of(&self, index: u16) -> Option<&str>;
}

/// Definition table with indices assigned in registration order.
#[derive(Debug, Clone, Default)]
pub struct DefinitionRegistry {
    names: Vec<String>,
    indices: BTreeMap<String, u16>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of names, in order.
    pub fn with_definitions<I, S>(names: I) -> Result<Self, PersistError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for name in names {
            registry.register(name)?;
        }
        Ok(registry)
    }

    /// Register `name`, returning its index. Registering twice returns the
    /// existing index.
    pub fn register(&mut self, name: impl Into<String>) -> Result<u16, PersistError> {
        let name = name.into();
        if let Some(&index) = self.indices.get(&name) {
            return Ok(index);
        }
        let index = u16::try_from(self.names.len()).map_err(|_| PersistError::DefinitionTableFull)?;
        self.indices.insert(name.clone(), index);
        self.names.push(name);
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl DefinitionLookup for DefinitionRegistry {
    fn index_of(&self, name: &str) -> Option<u16> {
        self.indices.get(name).copied()
    }

    fn name_of(&self, index: u16) -> Option<&str> {
        self.names.get(index as usize).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_registration_order() {
        let registry = DefinitionRegistry::with_definitions(["stone", "player", "bird"]).unwrap();
        assert_eq!(registry.index_of("stone"), Some(0));
        assert_eq!(registry.index_of("bird"), Some(2));
        assert_eq!(registry.name_of(1), Some("player"));
        assert_eq!(registry.name_of(3), None);
        assert_eq!(registry.index_of("water"), None);
    }

    #[test]
    fn register_is_idempotent() {
        let mut registry = DefinitionRegistry::new();
        let a = registry.register("stone").unwrap();
        let b = registry.register("stone").unwrap();
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
    }
}
