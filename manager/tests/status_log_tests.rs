//! Status log writer and parser working on real files

mod common;

use common::fixtures::*;
use std::fs;
use tempfile::TempDir;

use snapshot_manager::errors::{LogError, ParseError};
use snapshot_manager::status_log::{parse_log, read_log, ParseWindow, RunStatus, StatusLogWriter};

#[tokio::test]
async fn test_writer_appends_and_parser_reads_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("status.log");

    let outcomes = vec![
        outcome("alpha", RunStatus::Success, 10),
        outcome("beta", RunStatus::Failure, 20),
    ];

    let mut writer = StatusLogWriter::open(&path).await.unwrap();
    for o in &outcomes {
        writer.append(o).await.unwrap();
    }
    drop(writer);

    let report = read_log(&path, &ParseWindow::default()).await.unwrap();
    assert_eq!(report.outcomes, outcomes);
    assert_eq!(report.skipped(), 0);
}

#[tokio::test]
async fn test_writer_never_truncates() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("status.log");
    fs::write(&path, "2024-12-02 13:00:00,000 - INFO - Starting run\n").unwrap();

    let mut writer = StatusLogWriter::open(&path).await.unwrap();
    writer
        .append(&outcome("alpha", RunStatus::Success, 1))
        .await
        .unwrap();
    drop(writer);

    let mut writer = StatusLogWriter::open(&path).await.unwrap();
    writer
        .append(&outcome("beta", RunStatus::Success, 2))
        .await
        .unwrap();
    drop(writer);

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("Starting run"));
    assert!(lines[1].contains("| alpha |"));
    assert!(lines[2].contains("| beta |"));
}

#[tokio::test]
async fn test_missing_log_is_reported() {
    let dir = TempDir::new().unwrap();
    let result = read_log(&dir.path().join("absent.log"), &ParseWindow::default()).await;
    assert!(matches!(result, Err(LogError::Missing { .. })));
}

#[test]
fn test_mixed_log_skips_and_counts_bad_lines() {
    let content = "\
2024-12-02 13:32:30,000 - INFO - Creating snapshot for server1
FINAL_STATUS | s | server1 | SUCCESS | host | 2024-12-02 13:32:34 | snap1 | 2 snapshots exist

2024-12-02 13:32:35,000 - INFO - FINAL_STATUS | s | server2 | FAILURE | host | 2024-12-02 13:32:35 |  | 0 snapshots exist
FINAL_STATUS | incomplete | entry
FINAL_STATUS | s | server3 | SUCCESS | host | 2024-12-02 13:32:36 | snap3 | 4 snapshots exist
OTHER_TAG | s | server4
";

    let report = parse_log(content, &ParseWindow::default());

    let servers: Vec<&str> = report
        .outcomes
        .iter()
        .map(|o| o.server_name.as_str())
        .collect();
    assert_eq!(servers, vec!["server1", "server2", "server3"]);
    assert_eq!(report.outcomes[1].snapshot_name, None);
    assert_eq!(report.outcomes[2].total_snapshots, 4);

    assert_eq!(report.ignored, 2);
    assert_eq!(report.malformed.len(), 1);
    assert_eq!(report.malformed[0].line_number, 5);
    assert_eq!(
        report.malformed[0].error,
        ParseError::FieldCount {
            expected: 8,
            found: 3
        }
    );
}

#[test]
fn test_truncated_last_line_is_malformed() {
    let full = outcome("alpha", RunStatus::Success, 1).to_line();
    let truncated = &full[..full.len() - 20];
    let content = format!("{}\n{}", full, truncated);

    let report = parse_log(&content, &ParseWindow::default());
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.malformed.len(), 1);
}

#[test]
fn test_window_since_and_last() {
    let content: String = (1..=5)
        .map(|n| outcome(&format!("server{}", n), RunStatus::Success, n * 60).to_line() + "\n")
        .collect();

    let since = ParseWindow {
        since: Some(at(180)),
        last: None,
    };
    let report = parse_log(&content, &since);
    let servers: Vec<&str> = report.outcomes.iter().map(|o| o.server_name.as_str()).collect();
    assert_eq!(servers, vec!["server3", "server4", "server5"]);
    assert_eq!(report.outside_window, 2);

    let last = ParseWindow {
        since: None,
        last: Some(2),
    };
    let report = parse_log(&content, &last);
    let servers: Vec<&str> = report.outcomes.iter().map(|o| o.server_name.as_str()).collect();
    assert_eq!(servers, vec!["server4", "server5"]);

    let both = ParseWindow {
        since: Some(at(240)),
        last: Some(5),
    };
    assert_eq!(parse_log(&content, &both).outcomes.len(), 2);
}

#[tokio::test]
async fn test_line_cut_inside_multibyte_char_is_malformed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("status.log");

    let mut content = Vec::new();
    content.extend_from_slice(outcome("alpha", RunStatus::Success, 1).to_line().as_bytes());
    content.push(b'\n');
    content.extend_from_slice(b"FINAL_STATUS | s | caf\xc3\n");
    content.extend_from_slice(outcome("beta", RunStatus::Failure, 2).to_line().as_bytes());
    content.push(b'\n');
    fs::write(&path, &content).unwrap();

    let report = read_log(&path, &ParseWindow::default()).await.unwrap();

    let names: Vec<&str> = report.outcomes.iter().map(|o| o.server_name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta"]);
    assert_eq!(report.malformed.len(), 1);
    assert_eq!(report.malformed[0].line_number, 2);
    assert_eq!(
        report.malformed[0].error,
        ParseError::InvalidEncoding { offset: 22 }
    );
}
