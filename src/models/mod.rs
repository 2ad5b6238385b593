mod health;
mod statistics;

pub use health::HealthResponse;
pub use statistics::{
    AggregateQuery, AggregateRow, Statistic, StatisticsReport, BUNDLE_ORIGINAL, DC_SCHEMA,
    IMAGE_MIME_PREFIX, REPORT_DATE_FORMAT, TITLE_ELEMENT,
};
