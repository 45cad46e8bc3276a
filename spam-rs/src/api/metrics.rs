//! Prometheus metrics for API monitoring

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::spam::ClassificationResult;

/// Simple metrics collector
pub struct Metrics {
    /// Total HTTP requests
    pub http_requests_total: AtomicU64,
    /// Total HTTP errors (4xx, 5xx)
    pub http_errors_total: AtomicU64,
    /// Texts and images classified
    pub analyses_total: AtomicU64,
    pub spam_detected_total: AtomicU64,
    pub ham_detected_total: AtomicU64,
    /// Image requests that reached the OCR engine
    pub ocr_requests_total: AtomicU64,
    pub retrains_total: AtomicU64,
    /// Server start time
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            http_requests_total: AtomicU64::new(0),
            http_errors_total: AtomicU64::new(0),
            analyses_total: AtomicU64::new(0),
            spam_detected_total: AtomicU64::new(0),
            ham_detected_total: AtomicU64::new(0),
            ocr_requests_total: AtomicU64::new(0),
            retrains_total: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Increment HTTP requests counter
    pub fn inc_requests(&self) {
        self.http_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment HTTP errors counter
    pub fn inc_errors(&self) {
        self.http_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ocr_requests(&self) {
        self.ocr_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_retrains(&self) {
        self.retrains_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one classification outcome
    pub fn record_analysis(&self, result: &ClassificationResult) {
        self.analyses_total.fetch_add(1, Ordering::Relaxed);
        if result.is_spam {
            self.spam_detected_total.fetch_add(1, Ordering::Relaxed);
        } else {
            self.ham_detected_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn requests(&self) -> u64 {
        self.http_requests_total.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.http_errors_total.load(Ordering::Relaxed)
    }

    pub fn analyses(&self) -> u64 {
        self.analyses_total.load(Ordering::Relaxed)
    }

    pub fn spam_detected(&self) -> u64 {
        self.spam_detected_total.load(Ordering::Relaxed)
    }

    pub fn ham_detected(&self) -> u64 {
        self.ham_detected_total.load(Ordering::Relaxed)
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Format metrics in Prometheus format
    pub fn to_prometheus(&self) -> String {
        format!(
            r#"# HELP spam_rs_http_requests_total Total HTTP requests
# TYPE spam_rs_http_requests_total counter
spam_rs_http_requests_total {}

# HELP spam_rs_http_errors_total Total HTTP errors (4xx, 5xx)
# TYPE spam_rs_http_errors_total counter
spam_rs_http_errors_total {}

# HELP spam_rs_analyses_total Texts and images classified
# TYPE spam_rs_analyses_total counter
spam_rs_analyses_total {}

# HELP spam_rs_spam_detected_total Classifications above threshold
# TYPE spam_rs_spam_detected_total counter
spam_rs_spam_detected_total {}

# HELP spam_rs_ham_detected_total Classifications at or below threshold
# TYPE spam_rs_ham_detected_total counter
spam_rs_ham_detected_total {}

# HELP spam_rs_ocr_requests_total Image classification requests
# TYPE spam_rs_ocr_requests_total counter
spam_rs_ocr_requests_total {}

# HELP spam_rs_retrains_total Successful model retrains
# TYPE spam_rs_retrains_total counter
spam_rs_retrains_total {}

# HELP spam_rs_uptime_seconds Server uptime in seconds
# TYPE spam_rs_uptime_seconds gauge
spam_rs_uptime_seconds {}
"#,
            self.requests(),
            self.errors(),
            self.analyses(),
            self.spam_detected(),
            self.ham_detected(),
            self.ocr_requests_total.load(Ordering::Relaxed),
            self.retrains_total.load(Ordering::Relaxed),
            self.uptime_seconds(),
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(is_spam: bool) -> ClassificationResult {
        ClassificationResult {
            is_spam,
            spam_probability: if is_spam { 0.9 } else { 0.1 },
            threshold: 0.6,
            keywords: vec![],
            normalized_text: "x".to_string(),
        }
    }

    #[test]
    fn test_counters() {
        let metrics = Metrics::new();
        metrics.inc_requests();
        metrics.inc_requests();
        metrics.inc_errors();
        metrics.record_analysis(&result(true));
        metrics.record_analysis(&result(false));
        metrics.record_analysis(&result(false));

        assert_eq!(metrics.requests(), 2);
        assert_eq!(metrics.errors(), 1);
        assert_eq!(metrics.analyses(), 3);
        assert_eq!(metrics.spam_detected(), 1);
        assert_eq!(metrics.ham_detected(), 2);
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = Metrics::new();
        metrics.inc_retrains();
        let output = metrics.to_prometheus();
        assert!(output.contains("spam_rs_retrains_total 1"));
        assert!(output.contains("# TYPE spam_rs_uptime_seconds gauge"));
    }
}
