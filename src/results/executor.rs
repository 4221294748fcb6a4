use std::sync::Arc;

use super::envelope::ResultEnvelope;
use super::populate::BoundPopulation;
use crate::config::QueryConfig;
use crate::errors::ApiError;
use crate::filtering::{CompiledQuery, PaginationWindow, QueryRequest, compile, parse_query};
use crate::resources::ResourceDef;
use crate::store::{DocumentStore, FindQuery};

/// Runs list queries: parse, compile, count, window, fetch, populate.
#[derive(Clone)]
pub struct AdvancedResults {
    store: Arc<dyn DocumentStore>,
    config: QueryConfig,
}

impl AdvancedResults {
    pub fn new(store: Arc<dyn DocumentStore>, config: QueryConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub fn config(&self) -> QueryConfig {
        self.config
    }

    /// Answer a list request against `resource`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed query parameters and a store
    /// error when either round-trip fails.
    pub async fn list(
        &self,
        resource: &ResourceDef,
        request: &QueryRequest,
        population: Option<&BoundPopulation>,
    ) -> Result<ResultEnvelope, ApiError> {
        let parsed = parse_query(request, resource.fields)?;
        let compiled = compile(&parsed)?;
        self.execute(
            resource.collection,
            &compiled,
            parsed.page.as_deref(),
            parsed.limit.as_deref(),
            population,
        )
        .await
    }

    /// Count, fetch the window, then populate it.
    ///
    /// The count and the fetch are separate reads, so under concurrent writes
    /// the reported links can disagree slightly with the returned page.
    ///
    /// # Errors
    ///
    /// Returns a store error when a round-trip fails.
    pub async fn execute(
        &self,
        collection: &str,
        query: &CompiledQuery,
        page: Option<&str>,
        limit: Option<&str>,
        population: Option<&BoundPopulation>,
    ) -> Result<ResultEnvelope, ApiError> {
        let total = self.store.count(collection, &query.filters).await?;
        let window = PaginationWindow::compute(
            page,
            limit,
            total,
            self.config.default_limit,
            self.config.max_limit,
        );

        tracing::debug!(
            collection,
            filters = query.filters.len(),
            total,
            page = window.page,
            limit = window.limit,
            skip = window.skip,
            "Executing list query"
        );

        let find = FindQuery {
            filters: query.filters.clone(),
            sort: query.sort.clone(),
            skip: window.skip,
            limit: Some(window.limit),
            projection: query.projection.clone(),
        };
        let mut docs = self.store.find(collection, &find).await?;

        if let Some(population) = population
            && query.projection.includes(population.field())
        {
            population.apply(self.store.as_ref(), &mut docs).await?;
        }

        tracing::debug!(collection, returned = docs.len(), "List query complete");
        Ok(ResultEnvelope::paged(docs, &window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtering::PageRef;
    use crate::resources::PROGRAMS;
    use crate::store::MemoryStore;
    use serde_json::{Value, json};

    async fn store_with(count: usize) -> Arc<dyn DocumentStore> {
        let store = MemoryStore::new();
        for i in 0..count {
            let Value::Object(doc) = json!({
                "id": format!("p{i:02}"),
                "createdAt": format!("2024-01-01T00:00:{i:02}.000000Z"),
                "name": format!("Program {i:02}"),
                "averageCost": i * 1000,
            }) else {
                unreachable!()
            };
            store.insert("programs", doc).await.unwrap();
        }
        Arc::new(store)
    }

    fn ids(envelope: &ResultEnvelope) -> Vec<String> {
        envelope
            .data
            .iter()
            .map(|doc| doc["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_last_page_of_47() {
        let results = AdvancedResults::new(store_with(47).await, QueryConfig::default());
        let envelope = results
            .list(&PROGRAMS, &QueryRequest::parse("page=5&limit=10"), None)
            .await
            .unwrap();
        assert_eq!(envelope.count, 7);
        let links = envelope.pagination.unwrap();
        assert_eq!(links.next, None);
        assert_eq!(links.prev, Some(PageRef { page: 4, limit: 10 }));
    }

    #[tokio::test]
    async fn test_default_order_is_newest_first() {
        let results = AdvancedResults::new(store_with(3).await, QueryConfig::default());
        let envelope = results.list(&PROGRAMS, &QueryRequest::default(), None).await.unwrap();
        assert_eq!(ids(&envelope), vec!["p02", "p01", "p00"]);
    }

    #[tokio::test]
    async fn test_count_reflects_filters() {
        let results = AdvancedResults::new(store_with(20).await, QueryConfig::default());
        let envelope = results
            .list(&PROGRAMS, &QueryRequest::parse("averageCost[lt]=5000&limit=2"), None)
            .await
            .unwrap();
        assert_eq!(envelope.count, 2);
        assert_eq!(
            envelope.pagination.unwrap().next,
            Some(PageRef { page: 2, limit: 2 })
        );
    }

    #[tokio::test]
    async fn test_configured_limits() {
        let config = QueryConfig {
            default_limit: 5,
            max_limit: 8,
        };
        let results = AdvancedResults::new(store_with(20).await, config);
        let envelope = results.list(&PROGRAMS, &QueryRequest::default(), None).await.unwrap();
        assert_eq!(envelope.count, 5);
        let envelope = results
            .list(&PROGRAMS, &QueryRequest::parse("limit=50"), None)
            .await
            .unwrap();
        assert_eq!(envelope.count, 8);
    }

    #[tokio::test]
    async fn test_population_skipped_when_not_selected() {
        let store = store_with(2).await;
        let Value::Object(course) = json!({"id": "c1", "title": "Web", "program": "p00"}) else {
            unreachable!()
        };
        store.insert("courses", course).await.unwrap();
        let population = BoundPopulation::bind(&PROGRAMS, &PROGRAMS.list_population.unwrap().spec()).unwrap();
        let results = AdvancedResults::new(store, QueryConfig::default());

        let envelope = results
            .list(&PROGRAMS, &QueryRequest::parse("select=name"), Some(&population))
            .await
            .unwrap();
        assert!(envelope.data.iter().all(|doc| doc.get("courses").is_none()));

        let envelope = results
            .list(&PROGRAMS, &QueryRequest::parse("sort=name"), Some(&population))
            .await
            .unwrap();
        assert_eq!(envelope.data[0]["courses"][0]["title"], "Web");
        assert_eq!(envelope.data[1]["courses"], json!([]));
    }

    #[tokio::test]
    async fn test_malformed_query_is_rejected_before_store() {
        let results = AdvancedResults::new(store_with(1).await, QueryConfig::default());
        let err = results
            .list(&PROGRAMS, &QueryRequest::parse("averageCost[neq]=5"), None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }
}
