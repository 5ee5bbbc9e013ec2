use std::sync::LazyLock;

use prometheus::*;

static METRIC_SAVED_FILES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!("imstash_saved_files", "count of the files written to disk", &["kind"])
        .unwrap()
});

static METRIC_SAVED_BYTES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!("imstash_saved_bytes", "bytes written to disk", &["kind"]).unwrap()
});

static METRIC_ENCODE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "imstash_result_encode_duration",
        "duration of the result jpeg encoding in seconds"
    )
    .unwrap()
});

static METRIC_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("imstash_tracked_failures", "count of the failures reported by clients")
        .unwrap()
});

/// 记录一次落盘的文件
pub fn inc_saved_file(kind: &str, size: u64) {
    METRIC_SAVED_FILES.with_label_values(&[kind]).inc();
    METRIC_SAVED_BYTES.with_label_values(&[kind]).inc_by(size);
}

pub fn observe_encode_duration(duration: f32) {
    METRIC_ENCODE_DURATION.observe(duration as f64);
}

pub fn inc_tracked_failure() {
    METRIC_FAILURES.inc();
}

/// 以文本格式导出默认注册表中的所有指标
pub fn gather_text() -> anyhow::Result<String> {
    Ok(TextEncoder::new().encode_to_string(&prometheus::gather())?)
}
