//! Relation loading
//!
//! After the rows of a query are hydrated, the repository hands the whole
//! collection to a [`RelationLoader`] together with the relation names the
//! query asked for (`Query::with`).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::repository::{RepositoryError, RepositoryResult};

/// Attaches related data to a collection of entities
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RelationLoader<E: Send + Sync + 'static>: Send + Sync {
    async fn load(&self, entities: Vec<E>, relations: &[String]) -> RepositoryResult<Vec<E>>;
}

/// Loader for entities without relations; returns the collection unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRelations;

#[async_trait]
impl<E: Send + Sync + 'static> RelationLoader<E> for NoRelations {
    async fn load(&self, entities: Vec<E>, relations: &[String]) -> RepositoryResult<Vec<E>> {
        if !relations.is_empty() {
            tracing::warn!(?relations, "No relation loader configured, relations ignored");
        }
        Ok(entities)
    }
}

/// Dispatches each requested relation to the loader registered for it
///
/// Relations are loaded in the order they were requested. Asking for a
/// relation nobody registered is an [`RepositoryError::InvalidQuery`].
pub struct RelationRegistry<E> {
    loaders: HashMap<String, Arc<dyn RelationLoader<E>>>,
}

impl<E: Send + Sync + 'static> RelationRegistry<E> {
    pub fn new() -> Self {
        Self {
            loaders: HashMap::new(),
        }
    }

    /// Register the loader for `name`, replacing any previous one
    pub fn register(mut self, name: impl Into<String>, loader: impl RelationLoader<E> + 'static) -> Self {
        self.loaders.insert(name.into(), Arc::new(loader));
        self
    }

    pub fn knows(&self, name: &str) -> bool {
        self.loaders.contains_key(name)
    }
}

impl<E: Send + Sync + 'static> Default for RelationRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Send + Sync + 'static> RelationLoader<E> for RelationRegistry<E> {
    async fn load(&self, mut entities: Vec<E>, relations: &[String]) -> RepositoryResult<Vec<E>> {
        for relation in relations {
            let loader = self.loaders.get(relation).ok_or_else(|| {
                RepositoryError::InvalidQuery(format!("unknown relation '{}'", relation))
            })?;
            entities = loader.load(entities, std::slice::from_ref(relation)).await?;
        }
        Ok(entities)
    }
}
