use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::LazyLock;

pub static METER: LazyLock<Meter> =
    LazyLock::new(|| global::meter("dspace-repository-statistics"));

pub static REPORTS_GENERATED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("statistics.reports.generated")
        .with_description("Total statistics reports generated")
        .with_unit("{report}")
        .build()
});

pub static REPORTS_FAILED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("statistics.reports.failed")
        .with_description("Total statistics reports aborted by a database error")
        .with_unit("{report}")
        .build()
});

pub static REPORT_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("statistics.report.duration")
        .with_description("Time spent running the report queries in seconds")
        .with_unit("s")
        .build()
});

// --- HTTP Metrics ---

pub static HTTP_REQUESTS_TOTAL: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("http.requests.total")
        .with_description("Total number of HTTP requests")
        .with_unit("{request}")
        .build()
});

pub static HTTP_REQUEST_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("http.request.duration")
        .with_description("HTTP request duration in milliseconds")
        .with_unit("ms")
        .with_boundaries(vec![
            1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0,
        ])
        .build()
});
