//! Directory batch workflow: analyze, persist, summarize.

use mc_pattern_analysis::batch::{analyze_directory, analyze_file, summarize_reports};
use mc_pattern_analysis::*;
use std::fs;
use std::path::Path;

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

fn batch_config() -> AnalysisConfig {
    AnalysisConfig::light().with_runs(40).with_window(5).with_seed(11)
}

#[test]
fn test_batch_isolates_failures() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    let rising: Vec<String> = (0..60).map(|i| format!("{}", 100.0 + i as f64 * 1.5)).collect();
    write(input.path(), "a_equity.json", &format!(r#"{{"equity": [{}]}}"#, rising.join(",")));
    write(
        input.path(),
        "b_trades.json",
        r#"[{"pnl": 5, "hour": 9}, {"pnl": -2, "hour": 10}, {"pnl": 3, "hour": 9}, {"pnl": -4, "hour": 11}]"#,
    );
    write(input.path(), "c_corrupt.json", "{\"trades\": [");
    write(input.path(), "d_wrong_shape.json", r#"{"candles": []}"#);
    write(input.path(), "readme.txt", "not an input");

    let summary = analyze_directory(input.path(), &batch_config(), Some(output.path())).unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed.len(), 2);
    assert_eq!(summary.total(), 4);
    assert!(summary.failed[0].source.ends_with("c_corrupt.json"));
    assert!(summary.failed[1].source.ends_with("d_wrong_shape.json"));
    assert!(summary.failed[1].error.contains("input"));

    assert!(summary.reports[0].source.ends_with("a_equity.json"));
    for item in &summary.reports {
        let written = item.written_to.as_ref().unwrap();
        assert!(written.exists());
        assert_eq!(item.report.mc.runs, 40);
    }

    let rows = summarize_reports(output.path()).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].sharpe >= rows[1].sharpe);
    assert_eq!(rows[0].grade, SharpeGrade::from_sharpe(rows[0].sharpe));
}

#[test]
fn test_rerun_skips_existing_reports() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "equity.json", r#"{"equity": [1.0, 2.0, 1.5, 3.0, 2.5, 4.0]}"#);

    let config = batch_config();
    let first = analyze_directory(dir.path(), &config, Some(dir.path())).unwrap();
    assert_eq!(first.total(), 1);

    // the report written next to the input is not picked up as an input
    let second = analyze_directory(dir.path(), &config, Some(dir.path())).unwrap();
    assert_eq!(second.total(), 1);
    assert_eq!(second.succeeded, 1);

    assert_eq!(summarize_reports(dir.path()).unwrap().len(), 2);
}

#[test]
fn test_sequential_and_parallel_batches_agree() {
    let dir = tempfile::tempdir().unwrap();
    for k in 0..3 {
        let pnl: Vec<String> = (0..40)
            .map(|i| format!(r#"{{"pnl": {}, "hour": {}}}"#, ((i * (k + 3)) % 7) as f64 - 3.0, i % 24))
            .collect();
        write(dir.path(), &format!("t{}.json", k), &format!("[{}]", pnl.join(",")));
    }

    let mut sequential = batch_config();
    sequential.parallel = false;
    let mut parallel = batch_config();
    parallel.parallel = true;

    let a = analyze_directory(dir.path(), &sequential, None).unwrap();
    let b = analyze_directory(dir.path(), &parallel, None).unwrap();
    assert_eq!(a.succeeded, 3);
    for (x, y) in a.reports.iter().zip(&b.reports) {
        assert_eq!(x.source, y.source);
        assert!(x.written_to.is_none());
        assert_eq!(x.report.mc, y.report.mc);
        assert_eq!(x.report.leverageability, y.report.leverageability);
    }
}

#[test]
fn test_analyze_file_missing() {
    let dir = tempfile::tempdir().unwrap();
    let err = analyze_file(&dir.path().join("absent.json"), &batch_config()).unwrap_err();
    assert!(matches!(err, PatternAnalysisError::IoError { .. }));
}
