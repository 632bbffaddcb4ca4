mod common;

use common::RecordingClient;
use iafs::cli::MetadataArgs;
use iafs::client::ModifyBody;
use iafs::commands::{run_metadata, SPREADSHEET_PRIORITY};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use tempfile::TempDir;

struct Output {
    code: i32,
    stdout: String,
    stderr: String,
}

fn run(client: &RecordingClient, args: &MetadataArgs) -> Output {
    let mut out = Vec::new();
    let mut err = Vec::new();
    let code = run_metadata(client, args, &mut out, &mut err).unwrap();
    Output {
        code,
        stdout: String::from_utf8(out).unwrap(),
        stderr: String::from_utf8(err).unwrap(),
    }
}

fn identifiers(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

fn write_csv(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("metadata.csv");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_exists_reports_missing_item() {
    let client = RecordingClient::new().with_item("a", json!({"metadata": {"title": "A"}}));
    let args = MetadataArgs {
        identifiers: identifiers(&["a", "b"]),
        exists: true,
        ..Default::default()
    };

    let output = run(&client, &args);

    assert_eq!(output.code, 1);
    assert_eq!(output.stdout, "a exists\n");
    assert_eq!(output.stderr, "b does not exist\n");
    assert_eq!(client.get_calls.borrow().as_slice(), &["a", "b"]);
}

#[test]
fn test_exists_all_present() {
    let client = RecordingClient::new()
        .with_item("a", json!({"metadata": {}}))
        .with_item("b", json!({"files": []}));
    let args = MetadataArgs {
        identifiers: identifiers(&["a", "b"]),
        exists: true,
        ..Default::default()
    };

    let output = run(&client, &args);
    assert_eq!(output.code, 0);
    assert_eq!(output.stdout, "a exists\nb exists\n");
    assert!(output.stderr.is_empty());
}

#[test]
fn test_modify_submits_one_edit_per_identifier() {
    let client = RecordingClient::new()
        .with_item("a", json!({"metadata": {"title": "Old"}}))
        .with_item("b", json!({"metadata": {}}));
    let args = MetadataArgs {
        identifiers: identifiers(&["a", "b"]),
        modify: vec!["title:New".to_string()],
        target: Some("metadata".to_string()),
        ..Default::default()
    };

    let output = run(&client, &args);

    assert_eq!(output.code, 0);
    assert_eq!(client.modified_identifiers(), vec!["a", "b"]);
    for (_, edit) in client.modify_calls.borrow().iter() {
        assert_eq!(Value::Object(edit.fields.clone()), json!({"title": "New"}));
        assert_eq!(edit.target(), "metadata");
        assert!(!edit.append);
        assert_eq!(edit.priority, None);
    }
    assert_eq!(
        output.stdout,
        "a - success: https://catalogd.archive.org/log/a\n\
         b - success: https://catalogd.archive.org/log/b\n"
    );
}

#[test]
fn test_modify_failure_goes_to_stderr() {
    let client = RecordingClient::new()
        .with_item("a", json!({"metadata": {}}))
        .with_item("b", json!({"metadata": {}}))
        .with_response(
            "a",
            400,
            ModifyBody {
                success: false,
                log: None,
                error: Some("no changes to _meta.xml".to_string()),
            },
        );
    let args = MetadataArgs {
        identifiers: identifiers(&["a", "b"]),
        modify: vec!["title:Same".to_string()],
        ..Default::default()
    };

    let output = run(&client, &args);

    assert_eq!(output.code, 1);
    assert_eq!(output.stderr, "a - error (400): no changes to _meta.xml\n");
    assert_eq!(
        output.stdout,
        "b - success: https://catalogd.archive.org/log/b\n"
    );
    assert_eq!(client.modified_identifiers(), vec!["a", "b"]);
}

#[test]
fn test_append_sets_append_flag_and_priority() {
    let client = RecordingClient::new().with_item("a", json!({"metadata": {"subject": "x"}}));
    let args = MetadataArgs {
        identifiers: identifiers(&["a"]),
        append: vec!["subject:y".to_string()],
        priority: Some(-3),
        ..Default::default()
    };

    let output = run(&client, &args);

    assert_eq!(output.code, 0);
    let calls = client.modify_calls.borrow();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].1.append);
    assert_eq!(calls[0].1.priority, Some(-3));
    assert_eq!(calls[0].1.target(), "metadata");
}

#[test]
fn test_fetch_failure_continues_with_next_identifier() {
    let client = RecordingClient::new()
        .with_failing("down")
        .with_item("up", json!({"metadata": {}}));
    let args = MetadataArgs {
        identifiers: identifiers(&["down", "up"]),
        modify: vec!["title:T".to_string()],
        ..Default::default()
    };

    let output = run(&client, &args);

    assert_eq!(output.code, 1);
    assert!(output.stderr.starts_with("down - error:"));
    assert_eq!(client.modified_identifiers(), vec!["up"]);
}

#[test]
fn test_formats_prints_union() {
    let client = RecordingClient::new()
        .with_item(
            "a",
            json!({"files": [{"name": "a.pdf", "format": "PDF"}, {"name": "a.txt", "format": "TXT"}]}),
        )
        .with_item(
            "b",
            json!({"files": [{"name": "b.pdf", "format": "PDF"}, {"name": "b.bin"}]}),
        );
    let args = MetadataArgs {
        identifiers: identifiers(&["a", "b"]),
        formats: true,
        ..Default::default()
    };

    let output = run(&client, &args);

    assert_eq!(output.code, 0);
    let printed: BTreeSet<&str> = output.stdout.lines().collect();
    assert_eq!(printed, BTreeSet::from(["PDF", "TXT"]));
    assert!(client.modify_calls.borrow().is_empty());
}

#[test]
fn test_dump_prints_one_json_document_per_line() {
    let a = json!({"metadata": {"identifier": "a", "title": "A"}, "server": "ia1"});
    let b = json!({"metadata": {"identifier": "b"}});
    let client = RecordingClient::new()
        .with_item("a", a.clone())
        .with_item("b", b.clone());
    let args = MetadataArgs {
        identifiers: identifiers(&["a", "b"]),
        ..Default::default()
    };

    let output = run(&client, &args);

    assert_eq!(output.code, 0);
    let lines: Vec<Value> = output
        .stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines, vec![a, b]);
}

#[test]
fn test_spreadsheet_rows() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(
        &dir,
        "identifier,file,Title,creator\n\
         x,foo.txt,Bar,\n\
         ,bar.txt,Skipped,nobody\n\
         y,,Baz,someone\n",
    );
    let client = RecordingClient::new()
        .with_item("x", json!({"metadata": {}}))
        .with_item("y", json!({"metadata": {}}));
    let args = MetadataArgs {
        spreadsheet: Some(path),
        ..Default::default()
    };

    let output = run(&client, &args);

    assert_eq!(output.code, 0);
    let calls = client.modify_calls.borrow();
    assert_eq!(calls.len(), 2);

    let (id, edit) = &calls[0];
    assert_eq!(id, "x");
    assert_eq!(Value::Object(edit.fields.clone()), json!({"title": "Bar"}));
    assert_eq!(edit.priority, Some(SPREADSHEET_PRIORITY));
    assert!(!edit.append);

    let (id, edit) = &calls[1];
    assert_eq!(id, "y");
    assert_eq!(
        Value::Object(edit.fields.clone()),
        json!({"title": "Baz", "creator": "someone"})
    );
    assert_eq!(
        output.stdout.lines().collect::<Vec<_>>(),
        vec![
            "x - success: https://catalogd.archive.org/log/x",
            "y - success: https://catalogd.archive.org/log/y",
        ]
    );
}

#[test]
fn test_spreadsheet_explicit_priority_wins() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(&dir, "identifier,title\nx,Bar\n");
    let client = RecordingClient::new().with_item("x", json!({"metadata": {}}));
    let args = MetadataArgs {
        spreadsheet: Some(path),
        priority: Some(10),
        ..Default::default()
    };

    assert_eq!(run(&client, &args).code, 0);
    assert_eq!(client.modify_calls.borrow()[0].1.priority, Some(10));
}

#[test]
fn test_spreadsheet_runs_after_identifiers() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(&dir, "identifier,title\nrow,From sheet\n");
    let client = RecordingClient::new()
        .with_item("cli", json!({"metadata": {}}))
        .with_item("row", json!({"metadata": {}}));
    let args = MetadataArgs {
        identifiers: identifiers(&["cli"]),
        modify: vec!["title:From flag".to_string()],
        spreadsheet: Some(path),
        ..Default::default()
    };

    assert_eq!(run(&client, &args).code, 0);
    assert_eq!(client.modified_identifiers(), vec!["cli", "row"]);
}

#[test]
fn test_spreadsheet_failure_sets_exit_code() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(&dir, "identifier,title\nx,Bar\n");
    let client = RecordingClient::new()
        .with_item("x", json!({"metadata": {}}))
        .with_response(
            "x",
            503,
            ModifyBody {
                success: false,
                log: None,
                error: None,
            },
        );
    let args = MetadataArgs {
        spreadsheet: Some(path),
        ..Default::default()
    };

    let output = run(&client, &args);
    assert_eq!(output.code, 1);
    assert_eq!(output.stderr, "x - error (503): unknown error\n");
}

#[test]
fn test_validation_errors_make_no_calls() {
    let dir = TempDir::new().unwrap();
    let cases = vec![
        MetadataArgs::default(),
        MetadataArgs {
            identifiers: identifiers(&["a"]),
            modify: vec!["no-colon".to_string()],
            ..Default::default()
        },
        MetadataArgs {
            spreadsheet: Some(dir.path().join("missing.csv")),
            ..Default::default()
        },
    ];

    for args in cases {
        let client = RecordingClient::new();
        let output = run(&client, &args);

        assert_eq!(output.code, 1, "args: {:?}", args);
        assert!(output.stderr.contains("usage:"));
        assert!(output.stdout.is_empty());
        assert!(client.get_calls.borrow().is_empty());
        assert!(client.modify_calls.borrow().is_empty());
    }
}

#[test]
fn test_spreadsheet_short_row_is_skipped() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(&dir, "title,identifier\nOnlyTitle\nBar,x\n");
    let client = RecordingClient::new().with_item("x", json!({"metadata": {}}));
    let args = MetadataArgs {
        spreadsheet: Some(path),
        ..Default::default()
    };

    let output = run(&client, &args);

    assert_eq!(output.code, 0, "stderr: {}", output.stderr);
    assert!(output.stderr.is_empty());
    assert_eq!(client.modified_identifiers(), vec!["x"]);
    assert_eq!(
        Value::Object(client.modify_calls.borrow()[0].1.fields.clone()),
        json!({"title": "Bar"})
    );
}

#[test]
fn test_spreadsheet_long_row_ignores_extra_cells() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(&dir, "identifier,title\nx,Bar,stray\n");
    let client = RecordingClient::new().with_item("x", json!({"metadata": {}}));
    let args = MetadataArgs {
        spreadsheet: Some(path),
        ..Default::default()
    };

    assert_eq!(run(&client, &args).code, 0);
    assert_eq!(
        Value::Object(client.modify_calls.borrow()[0].1.fields.clone()),
        json!({"title": "Bar"})
    );
}
