//! Dependency-aware collection loading
//!
//! A kind's dependencies are fetched concurrently and awaited jointly before
//! the kind itself is requested. Nothing is returned unless every request
//! succeeded, so callers can apply the result all-or-nothing.

use std::collections::HashMap;
use std::future::Future;

use futures_util::future::try_join_all;

use crate::error::ConsoleError;
use crate::models::{ListQuery, Record, ResourceKind};
use crate::network::client::ApiClient;

/// Anything that can list a collection
pub trait CollectionSource {
    fn list_collection(
        &self,
        kind: ResourceKind,
        query: &ListQuery,
    ) -> impl Future<Output = Result<Vec<Record>, ConsoleError>> + Send;
}

impl CollectionSource for ApiClient {
    fn list_collection(
        &self,
        kind: ResourceKind,
        query: &ListQuery,
    ) -> impl Future<Output = Result<Vec<Record>, ConsoleError>> + Send {
        self.list(kind, query)
    }
}

/// Fetch `kind` and everything it depends on. `query` applies to `kind`
/// only; dependencies are always fetched in full.
pub async fn load<S: CollectionSource + Sync>(
    source: &S,
    kind: ResourceKind,
    query: Option<&ListQuery>,
) -> Result<HashMap<ResourceKind, Vec<Record>>, ConsoleError> {
    let full = ListQuery::new();
    let full = &full;

    let dependencies = try_join_all(kind.dependencies().iter().map(|&dep| async move {
        source.list_collection(dep, full).await.map(|records| (dep, records))
    }))
    .await?;

    let records = source.list_collection(kind, query.unwrap_or(full)).await?;

    let mut collections: HashMap<ResourceKind, Vec<Record>> = dependencies.into_iter().collect();
    collections.insert(kind, records);
    Ok(collections)
}
