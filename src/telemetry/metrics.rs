use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::LazyLock;

pub static METER: LazyLock<Meter> = LazyLock::new(|| global::meter("competitive-insights"));

// --- LLM client metrics ---

pub static GEN_AI_TOKEN_USAGE: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("gen_ai.client.token.usage")
        .with_description("Number of tokens used per LLM call")
        .with_unit("{token}")
        .build()
});

pub static GEN_AI_OPERATION_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("gen_ai.client.operation.duration")
        .with_description("Duration of LLM operations in seconds")
        .with_unit("s")
        .build()
});

pub static GEN_AI_ERROR_COUNT: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("gen_ai.client.error.count")
        .with_description("Number of LLM call errors")
        .with_unit("{error}")
        .build()
});

// --- Domain Metrics ---

pub static COMPETITORS_FOUND: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("competitors.found")
        .with_description("Number of competitor names parsed from one model reply")
        .with_unit("{competitor}")
        .build()
});

pub static COMPETITOR_ROWS_INSERTED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("competitors.rows_inserted")
        .with_description("Total competitor rows written to the store")
        .with_unit("{row}")
        .build()
});

pub static OPPORTUNITIES_EXPANDED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("opportunities.expanded")
        .with_description("Total summary rows updated with detailed opportunities")
        .with_unit("{row}")
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
            5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0,
            60000.0,
        ])
        .build()
});
