//! Read access to the DSpace repository database.
//!
//! The schema is owned by DSpace. Everything here only reads it, inside a
//! context that is always rolled back.

mod postgres;

use std::future::Future;

use crate::error::AppResult;
use crate::models::{AggregateQuery, AggregateRow};

pub use postgres::{PgReadContext, PgStatisticsStore};

/// Source of per-request read contexts.
pub trait StatisticsStore: Send + Sync + Clone + 'static {
    type Context: ReadContext + 'static;

    /// Opens a read context. Every context must be passed to [`ReadContext::abort`].
    fn begin(&self) -> impl Future<Output = AppResult<Self::Context>> + Send;

    /// Round-trips to the database without opening a context.
    fn ping(&self) -> impl Future<Output = AppResult<()>> + Send;
}

/// One request's view of the repository.
pub trait ReadContext: Send + Sized {
    fn count_communities(&mut self) -> impl Future<Output = AppResult<i64>> + Send;

    fn count_collections(&mut self) -> impl Future<Output = AppResult<i64>> + Send;

    fn count_items(&mut self) -> impl Future<Output = AppResult<i64>> + Send;

    fn count_withdrawn_items(&mut self) -> impl Future<Output = AppResult<i64>> + Send;

    /// Registry id of `schema.element` with no qualifier, if registered.
    fn find_metadata_field(
        &mut self,
        schema: &'static str,
        element: &'static str,
    ) -> impl Future<Output = AppResult<Option<i32>>> + Send;

    /// Count and total size of the bitstreams selected by `query`, or `None`
    /// when nothing matched.
    fn run_aggregate(
        &mut self,
        query: &AggregateQuery,
    ) -> impl Future<Output = AppResult<Option<AggregateRow>>> + Send;

    /// Releases the context without committing anything.
    fn abort(self) -> impl Future<Output = AppResult<()>> + Send;
}
