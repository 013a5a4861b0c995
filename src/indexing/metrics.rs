//! Prometheus metrics for the indexing pipeline

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

/// Indexing metrics collection
pub struct IndexingMetrics {
    /// Rows read from the forum store
    pub rows_scanned: CounterVec,

    /// Scan windows processed
    pub windows: CounterVec,

    /// Documents accepted by the engine
    pub documents_indexed: CounterVec,

    /// Rows dropped because they could not be converted
    pub conversion_failures: CounterVec,

    /// Bulk requests that reported item errors or failed outright
    pub bulk_failures: CounterVec,

    /// Bulk request duration in seconds
    pub bulk_duration: HistogramVec,
}

impl IndexingMetrics {
    pub fn new() -> Self {
        Self {
            rows_scanned: register_counter_vec!(
                "forum_search_rows_scanned_total",
                "Total number of rows read from the forum store",
                &["content_type"]
            )
            .unwrap(),

            windows: register_counter_vec!(
                "forum_search_windows_total",
                "Total number of scan windows processed",
                &["content_type"]
            )
            .unwrap(),

            documents_indexed: register_counter_vec!(
                "forum_search_documents_indexed_total",
                "Total number of documents written to the search engine",
                &["content_type"]
            )
            .unwrap(),

            conversion_failures: register_counter_vec!(
                "forum_search_conversion_failures_total",
                "Total number of rows that could not be converted into documents",
                &["content_type"]
            )
            .unwrap(),

            bulk_failures: register_counter_vec!(
                "forum_search_bulk_failures_total",
                "Total number of failed bulk requests",
                &["content_type"]
            )
            .unwrap(),

            bulk_duration: register_histogram_vec!(
                "forum_search_bulk_duration_seconds",
                "Bulk request duration in seconds",
                &["content_type"],
                vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
            )
            .unwrap(),
        }
    }

    pub fn record_window(&self, content_type: &str, rows: usize) {
        self.windows.with_label_values(&[content_type]).inc();
        self.rows_scanned
            .with_label_values(&[content_type])
            .inc_by(rows as f64);
    }

    pub fn record_conversion_failure(&self, content_type: &str) {
        self.conversion_failures
            .with_label_values(&[content_type])
            .inc();
    }

    pub fn record_bulk(&self, content_type: &str, indexed: usize, success: bool, duration_secs: f64) {
        self.documents_indexed
            .with_label_values(&[content_type])
            .inc_by(indexed as f64);
        if !success {
            self.bulk_failures.with_label_values(&[content_type]).inc();
        }
        self.bulk_duration
            .with_label_values(&[content_type])
            .observe(duration_secs);
    }
}

impl Default for IndexingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    /// Global indexing metrics instance
    pub static ref INDEXING_METRICS: IndexingMetrics = IndexingMetrics::new();
}

/// Render every registered metric in the Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
