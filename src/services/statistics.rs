use std::sync::Arc;
use std::time::Instant;

use time::OffsetDateTime;
use tokio::sync::OnceCell;
use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    models::{AggregateQuery, DC_SCHEMA, StatisticsReport, TITLE_ELEMENT},
    repository::{ReadContext, StatisticsStore},
    telemetry::{REPORT_DURATION, REPORTS_FAILED, REPORTS_GENERATED},
};

#[derive(Clone)]
pub struct StatisticsService<S> {
    store: S,
    title_field: Arc<OnceCell<i32>>,
}

impl<S: StatisticsStore> StatisticsService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            title_field: Arc::new(OnceCell::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs the whole report inside one read context. The context is released
    /// on every path; a failure to release it is logged and does not change
    /// the outcome.
    #[instrument(name = "statistics.generate", skip(self))]
    pub async fn generate(&self) -> AppResult<StatisticsReport> {
        let started = Instant::now();
        let mut ctx = self.store.begin().await?;

        let result = self.collect(&mut ctx).await;

        if let Err(e) = ctx.abort().await {
            tracing::warn!(error = %e, "Failed to release repository context");
        }

        match &result {
            Ok(report) => {
                REPORTS_GENERATED.add(1, &[]);
                REPORT_DURATION.record(started.elapsed().as_secs_f64(), &[]);
                tracing::info!(
                    statistics = report.statistics.len(),
                    "Repository statistics generated"
                );
            }
            Err(e) => {
                REPORTS_FAILED.add(1, &[]);
                tracing::warn!(error = %e, "Repository statistics failed");
            }
        }

        result
    }

    async fn collect(&self, ctx: &mut S::Context) -> AppResult<StatisticsReport> {
        let mut report = StatisticsReport::new(OffsetDateTime::now_utc());

        let title_field = self.title_field_id(ctx).await?;

        report.push("communities", ctx.count_communities().await?);
        report.push("collections", ctx.count_collections().await?);

        let items = ctx.count_items().await? - ctx.count_withdrawn_items().await?;
        report.push("items", items);

        tracing::debug!("Counting, summing bitstreams");
        let bitstreams = ctx
            .run_aggregate(&AggregateQuery::original_bitstreams(title_field))
            .await?;
        report.push_aggregate("bitstreams", "totalBytes", bitstreams);

        tracing::debug!("Counting, summing image bitstreams");
        let images = ctx
            .run_aggregate(&AggregateQuery::original_images(title_field))
            .await?;
        report.push_aggregate("images", "imageBytes", images);

        Ok(report)
    }

    /// The registry id never changes while the process runs, so it is
    /// resolved once. A failed lookup is retried by the next request.
    async fn title_field_id(&self, ctx: &mut S::Context) -> AppResult<i32> {
        let id = self
            .title_field
            .get_or_try_init(|| async move {
                let id = ctx
                    .find_metadata_field(DC_SCHEMA, TITLE_ELEMENT)
                    .await?
                    .ok_or(AppError::MetadataFieldNotFound {
                        schema: DC_SCHEMA,
                        element: TITLE_ELEMENT,
                    })?;
                tracing::info!(field_id = id, "Resolved dc.title metadata field");
                Ok::<_, AppError>(id)
            })
            .await?;

        Ok(*id)
    }
}
