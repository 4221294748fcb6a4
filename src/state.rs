//! Shared handler state.

use std::sync::Arc;

use crate::config::QueryConfig;
use crate::errors::ApiError;
use crate::geo::GeoResolver;
use crate::operations::ResourceOperations;
use crate::resources::ResourceDef;
use crate::results::{AdvancedResults, BoundPopulation};
use crate::store::DocumentStore;

/// Everything the handlers of every resource share.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn DocumentStore>,
    results: AdvancedResults,
    operations: ResourceOperations,
    geo: GeoResolver,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, query: QueryConfig, geo: GeoResolver) -> Self {
        Self {
            results: AdvancedResults::new(store.clone(), query),
            operations: ResourceOperations::new(store.clone(), geo.clone()),
            store,
            geo,
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn results(&self) -> &AdvancedResults {
        &self.results
    }

    #[must_use]
    pub fn operations(&self) -> &ResourceOperations {
        &self.operations
    }

    #[must_use]
    pub fn geo(&self) -> &GeoResolver {
        &self.geo
    }
}

/// State of one resource's router: the shared state plus the resource and
/// its populations, bound once when the router is built.
#[derive(Clone)]
pub struct ResourceState {
    pub app: AppState,
    pub resource: &'static ResourceDef,
    pub list_population: Option<BoundPopulation>,
    pub item_population: Option<BoundPopulation>,
}

impl ResourceState {
    /// # Errors
    ///
    /// Returns a configuration error when a declared population names a
    /// relation the resource does not have.
    pub fn bind(app: &AppState, resource: &'static ResourceDef) -> Result<Self, ApiError> {
        let bind = |population: Option<crate::resources::PopulationDef>| {
            population
                .map(|def| BoundPopulation::bind(resource, &def.spec()))
                .transpose()
        };
        Ok(Self {
            app: app.clone(),
            resource,
            list_population: bind(resource.list_population)?,
            item_population: bind(resource.item_population)?,
        })
    }
}
