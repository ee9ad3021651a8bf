//! Registry Implementation

use crate::model::{Entity, FeatureView, FileSource};
use crate::RegistryError;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct RegistryState {
    data_sources: BTreeMap<String, FileSource>,
    entities: BTreeMap<String, Entity>,
    feature_views: BTreeMap<String, FeatureView>,
}

/// Registry for a single project (in-memory, not persisted)
pub struct Registry {
    project: String,
    state: Mutex<RegistryState>,
}

impl Registry {
    /// Create an empty registry for `project`
    pub fn new(project: impl Into<String>) -> Self {
        let project = project.into();
        info!("Creating in-memory registry for project '{}'", project);
        Self {
            project,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Project name
    pub fn project(&self) -> &str {
        &self.project
    }

    fn lock(&self) -> Result<MutexGuard<'_, RegistryState>, RegistryError> {
        self.state
            .lock()
            .map_err(|e| RegistryError::Lock(e.to_string()))
    }

    /// Register or replace a data source
    pub fn apply_data_source(&self, source: FileSource) -> Result<(), RegistryError> {
        if source.name.is_empty() {
            return Err(RegistryError::InvalidDefinition {
                kind: "data source",
                reason: "name is empty".to_string(),
            });
        }

        let mut state = self.lock()?;
        debug!("Applying data source {} ({})", source.name, source.path.display());
        state.data_sources.insert(source.name.clone(), source);
        Ok(())
    }

    /// Register or replace an entity
    pub fn apply_entity(&self, entity: Entity) -> Result<(), RegistryError> {
        if entity.join_keys.is_empty() {
            return Err(RegistryError::InvalidDefinition {
                kind: "entity",
                reason: format!("{} has no join keys", entity.name),
            });
        }

        let mut state = self.lock()?;
        debug!("Applying entity {} (join keys: {:?})", entity.name, entity.join_keys);
        state.entities.insert(entity.name.clone(), entity);
        Ok(())
    }

    /// Register or replace a feature view
    ///
    /// The view's source and entities must already be registered.
    pub fn apply_feature_view(&self, view: FeatureView) -> Result<(), RegistryError> {
        let mut state = self.lock()?;

        if !state.data_sources.contains_key(&view.source) {
            return Err(RegistryError::UnknownDataSource(view.source.clone()));
        }
        if let Some(missing) = view
            .entities
            .iter()
            .find(|e| !state.entities.contains_key(*e))
        {
            return Err(RegistryError::UnknownEntity(missing.clone()));
        }

        debug!(
            "Applying feature view {} ({} fields, ttl={:?})",
            view.name,
            view.schema.len(),
            view.ttl
        );
        state.feature_views.insert(view.name.clone(), view);
        Ok(())
    }

    pub fn get_data_source(&self, name: &str) -> Result<FileSource, RegistryError> {
        self.lock()?
            .data_sources
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownDataSource(name.to_string()))
    }

    pub fn get_entity(&self, name: &str) -> Result<Entity, RegistryError> {
        self.lock()?
            .entities
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownEntity(name.to_string()))
    }

    pub fn get_feature_view(&self, name: &str) -> Result<FeatureView, RegistryError> {
        self.lock()?
            .feature_views
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownFeatureView(name.to_string()))
    }

    /// All data sources, ordered by name
    pub fn list_data_sources(&self) -> Result<Vec<FileSource>, RegistryError> {
        Ok(self.lock()?.data_sources.values().cloned().collect())
    }

    /// All entities, ordered by name
    pub fn list_entities(&self) -> Result<Vec<Entity>, RegistryError> {
        Ok(self.lock()?.entities.values().cloned().collect())
    }

    /// All feature views, ordered by name
    pub fn list_feature_views(&self) -> Result<Vec<FeatureView>, RegistryError> {
        Ok(self.lock()?.feature_views.values().cloned().collect())
    }
}
