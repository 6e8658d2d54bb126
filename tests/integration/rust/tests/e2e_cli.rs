//! End-to-end tests through the CLI runtime

use std::fs;
use std::sync::Arc;
use metric_store::MetricStore;
use tally_cli::{ExportFormat, Runtime};
use tempfile::TempDir;

/// Two programs over two concurrently processed logs
#[test]
fn test_programs_and_logs() {
    let dir = TempDir::new().unwrap();
    let errors = dir.path().join("errors.tally");
    let latency = dir.path().join("latency.tally");
    fs::write(&errors, "counter errors by level\n/^(ERROR|WARN) / {\n  errors[tolower($1)]++\n}\n").unwrap();
    fs::write(
        &latency,
        "counter requests\ngauge slowest\n/took (\\d+)ms/ {\n  requests++\n  $1 > slowest {\n    slowest = $1\n  }\n}\n",
    )
    .unwrap();

    let log_a = dir.path().join("a.log");
    let log_b = dir.path().join("b.log");
    // The gauge update is read-then-write, so all latency lines go to one input
    fs::write(&log_a, "ERROR disk full\nWARN slow\nERROR oops\n").unwrap();
    fs::write(&log_b, "INFO took 20ms\nINFO took 250ms\nINFO took 5ms\n").unwrap();

    let mut runtime = Runtime::new(Arc::new(MetricStore::new()));
    runtime.load_file(&errors).unwrap();
    runtime.load_file(&latency).unwrap();
    let stats = runtime.process_files(&[log_a, log_b]).unwrap();
    assert_eq!(stats.lines, 6);
    assert_eq!(stats.errors, 0);

    let text = runtime.export(ExportFormat::Text).unwrap();
    assert_eq!(
        text,
        "errors{level=\"error\"} 2\nerrors{level=\"warn\"} 1\nrequests 3\nslowest 250\n"
    );
}
