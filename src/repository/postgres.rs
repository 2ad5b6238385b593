use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use super::{ReadContext, StatisticsStore};
use crate::error::AppResult;
use crate::models::{AggregateQuery, AggregateRow};

const COUNT_COMMUNITIES: &str = "SELECT count(*) FROM community";

const COUNT_COLLECTIONS: &str = "SELECT count(*) FROM collection";

const COUNT_ITEMS: &str = "SELECT count(*) FROM item";

const COUNT_WITHDRAWN_ITEMS: &str = "SELECT count(*) FROM item WHERE withdrawn IS TRUE";

const FIND_METADATA_FIELD: &str = r#"
    SELECT mfr.metadata_field_id
    FROM metadatafieldregistry mfr
    JOIN metadataschemaregistry msr ON msr.metadata_schema_id = mfr.metadata_schema_id
    WHERE msr.short_id = $1
      AND mfr.element = $2
      AND mfr.qualifier IS NULL
    "#;

// $3 is NULL when the aggregate is not restricted by MIME type.
const AGGREGATE_BITSTREAMS: &str = r#"
    SELECT count(*) AS count, sum(bs.size_bytes)::bigint AS total_size
    FROM bundle bnd
    JOIN item2bundle i2b ON i2b.bundle_id = bnd.uuid
    JOIN item i ON i.uuid = i2b.item_id
    JOIN bundle2bitstream b2b ON b2b.bundle_id = bnd.uuid
    JOIN bitstream bs ON bs.uuid = b2b.bitstream_id
    JOIN metadatavalue md ON md.dspace_object_id = bnd.uuid
    LEFT JOIN bitstreamformatregistry bsf ON bsf.bitstream_format_id = bs.bitstream_format_id
    WHERE md.metadata_field_id = $1
      AND md.text_value = $2
      AND i.withdrawn IS FALSE
      AND bs.deleted IS FALSE
      AND ($3::text IS NULL OR bsf.mimetype LIKE $3)
    "#;

#[derive(sqlx::FromRow)]
struct AggregateRecord {
    count: Option<i64>,
    total_size: Option<i64>,
}

impl AggregateRecord {
    fn into_row(self) -> Option<AggregateRow> {
        match self.count {
            Some(count) if count > 0 => Some(AggregateRow::new(count, self.total_size)),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct PgStatisticsStore {
    pool: PgPool,
}

impl PgStatisticsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl StatisticsStore for PgStatisticsStore {
    type Context = PgReadContext;

    #[instrument(name = "db.statistics.begin", skip(self))]
    async fn begin(&self) -> AppResult<PgReadContext> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await?;

        Ok(PgReadContext { tx })
    }

    #[instrument(name = "db.statistics.ping", skip(self))]
    async fn ping(&self) -> AppResult<()> {
        let row = sqlx::query("SELECT 1 as one").fetch_one(&self.pool).await?;
        let _: i32 = row.try_get("one")?;

        Ok(())
    }
}

/// A read-only transaction. Dropping it without [`ReadContext::abort`] still
/// rolls back, but without logging a failure.
pub struct PgReadContext {
    tx: Transaction<'static, Postgres>,
}

impl PgReadContext {
    async fn count(&mut self, sql: &'static str) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(count)
    }
}

impl ReadContext for PgReadContext {
    #[instrument(name = "db.statistics.count_communities", skip(self))]
    async fn count_communities(&mut self) -> AppResult<i64> {
        self.count(COUNT_COMMUNITIES).await
    }

    #[instrument(name = "db.statistics.count_collections", skip(self))]
    async fn count_collections(&mut self) -> AppResult<i64> {
        self.count(COUNT_COLLECTIONS).await
    }

    #[instrument(name = "db.statistics.count_items", skip(self))]
    async fn count_items(&mut self) -> AppResult<i64> {
        self.count(COUNT_ITEMS).await
    }

    #[instrument(name = "db.statistics.count_withdrawn_items", skip(self))]
    async fn count_withdrawn_items(&mut self) -> AppResult<i64> {
        self.count(COUNT_WITHDRAWN_ITEMS).await
    }

    #[instrument(name = "db.statistics.find_metadata_field", skip(self))]
    async fn find_metadata_field(
        &mut self,
        schema: &'static str,
        element: &'static str,
    ) -> AppResult<Option<i32>> {
        let id = sqlx::query_scalar::<_, i32>(FIND_METADATA_FIELD)
            .bind(schema)
            .bind(element)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(id)
    }

    #[instrument(name = "db.statistics.run_aggregate", skip(self))]
    async fn run_aggregate(&mut self, query: &AggregateQuery) -> AppResult<Option<AggregateRow>> {
        let record = sqlx::query_as::<_, AggregateRecord>(AGGREGATE_BITSTREAMS)
            .bind(query.title_field_id)
            .bind(query.bundle_name)
            .bind(query.mime_type_pattern())
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(record.and_then(AggregateRecord::into_row))
    }

    #[instrument(name = "db.statistics.abort", skip(self))]
    async fn abort(self) -> AppResult<()> {
        self.tx.rollback().await?;

        Ok(())
    }
}
