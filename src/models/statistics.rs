use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::error::{AppError, AppResult};

pub const DC_SCHEMA: &str = "dc";
pub const TITLE_ELEMENT: &str = "title";
pub const BUNDLE_ORIGINAL: &str = "ORIGINAL";
pub const IMAGE_MIME_PREFIX: &str = "image/";

/// `yyyyMMdd'T'HHmmss'Z'`, always rendered in UTC.
pub const REPORT_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day]T[hour][minute][second]Z");

/// Result of one count/sum aggregate. `total_size` is zero when the SUM was NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateRow {
    count: i64,
    total_size: i64,
}

impl AggregateRow {
    pub fn new(count: i64, total_size: Option<i64>) -> Self {
        Self {
            count,
            total_size: total_size.unwrap_or(0).max(0),
        }
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn total_size(&self) -> i64 {
        self.total_size
    }
}

/// Parameters of a bitstream aggregate over one named bundle.
///
/// Bundle names live in the `dc.title` metadata of the bundle, so the query
/// needs the registry id of that field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateQuery {
    pub bundle_name: &'static str,
    pub title_field_id: i32,
    pub mime_type_prefix: Option<&'static str>,
}

impl AggregateQuery {
    pub fn original_bitstreams(title_field_id: i32) -> Self {
        Self {
            bundle_name: BUNDLE_ORIGINAL,
            title_field_id,
            mime_type_prefix: None,
        }
    }

    pub fn original_images(title_field_id: i32) -> Self {
        Self {
            bundle_name: BUNDLE_ORIGINAL,
            title_field_id,
            mime_type_prefix: Some(IMAGE_MIME_PREFIX),
        }
    }

    /// SQL `LIKE` pattern for the MIME prefix, with wildcards in the prefix escaped.
    pub fn mime_type_pattern(&self) -> Option<String> {
        self.mime_type_prefix.map(|prefix| {
            let mut pattern = String::with_capacity(prefix.len() + 1);
            for c in prefix.chars() {
                if matches!(c, '\\' | '%' | '_') {
                    pattern.push('\\');
                }
                pattern.push(c);
            }
            pattern.push('%');
            pattern
        })
    }

    pub fn matches_mime_type(&self, mime_type: &str) -> bool {
        self.mime_type_prefix
            .is_none_or(|prefix| mime_type.starts_with(prefix))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statistic {
    pub name: &'static str,
    pub value: i64,
}

#[derive(Debug, Clone)]
pub struct StatisticsReport {
    pub date: OffsetDateTime,
    pub statistics: Vec<Statistic>,
}

impl StatisticsReport {
    pub fn new(date: OffsetDateTime) -> Self {
        Self {
            date,
            statistics: Vec::with_capacity(7),
        }
    }

    pub fn push(&mut self, name: &'static str, value: i64) {
        self.statistics.push(Statistic { name, value });
    }

    /// Appends the count and byte total of `row`, or nothing when the aggregate is absent.
    pub fn push_aggregate(
        &mut self,
        count_name: &'static str,
        bytes_name: &'static str,
        row: Option<AggregateRow>,
    ) {
        if let Some(row) = row {
            self.push(count_name, row.count());
            self.push(bytes_name, row.total_size());
        }
    }

    pub fn formatted_date(&self) -> AppResult<String> {
        self.date
            .to_offset(time::UtcOffset::UTC)
            .format(REPORT_DATE_FORMAT)
            .map_err(|e| AppError::Document(e.to_string()))
    }
}
