use std::collections::BTreeMap;
use std::sync::Arc;

use log::warn;

use super::EffectId;
use crate::action::Action;
use crate::error::{EngineError, Result};

#[derive(Debug, Clone)]
struct CatalogEntry {
    name: String,
    action: Arc<Action>,
}

/// Mapping from effect identifier to its action tree.
///
/// Built once before the engine starts and read-only afterwards. Lookups
/// hand out shared references to the stored trees.
#[derive(Debug, Clone, Default)]
pub struct EffectCatalog {
    entries: BTreeMap<u8, CatalogEntry>,
}

impl EffectCatalog {
    /// Catalog without any effect
    pub fn empty() -> Self {
        Self::default()
    }

    /// Catalog holding every [`EffectId`]
    pub fn reference() -> Self {
        EffectId::ALL.into_iter().fold(Self::empty(), |catalog, id| {
            catalog.with_effect(id.raw(), id.as_str(), id.to_action())
        })
    }

    /// Register an effect, replacing any previous one with the same id.
    ///
    /// Identifiers are positive; id 0 is ignored.
    #[must_use]
    pub fn with_effect(mut self, id: u8, name: &str, action: Action) -> Self {
        if id == 0 {
            warn!("ignoring effect '{}' registered with id 0", name);
            return self;
        }
        self.entries.insert(
            id,
            CatalogEntry {
                name: name.to_owned(),
                action: Arc::new(action),
            },
        );
        self
    }

    /// Action tree of an effect
    pub fn build(&self, id: u8) -> Result<Arc<Action>> {
        self.entries
            .get(&id)
            .map(|entry| Arc::clone(&entry.action))
            .ok_or(EngineError::UnknownEffect(id))
    }

    /// Identifier registered under `name`
    pub fn resolve(&self, name: &str) -> Result<u8> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.name == name)
            .map(|(&id, _)| id)
            .ok_or_else(|| EngineError::UnknownEffectName(name.to_owned()))
    }

    pub fn name(&self, id: u8) -> Option<&str> {
        self.entries.get(&id).map(|entry| entry.name.as_str())
    }

    pub fn contains(&self, id: u8) -> bool {
        self.entries.contains_key(&id)
    }

    /// Registered identifiers in ascending order
    pub fn ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
