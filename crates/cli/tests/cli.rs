// ABOUTME: Integration tests for the wp2payload CLI binary.
// ABOUTME: Tests HTML conversion output and dry-run imports against a mocked WordPress site.

use assert_cmd::assert::OutputAssertExt;
use assert_cmd::cargo::CommandCargoExt;
use httpmock::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "WP_BASE",
    "WP_TOKEN",
    "WP_USERNAME",
    "WP_PASSWORD",
    "PAYLOAD_URL",
    "PAYLOAD_API_KEY",
];

fn wp2payload_cmd() -> Command {
    let mut cmd = Command::cargo_bin("wp2payload").unwrap();
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn convert_prints_lexical_json() {
    let temp_dir = TempDir::new().unwrap();
    let html_path = temp_dir.path().join("post.html");
    fs::write(&html_path, "<h2>Title</h2><p>Hello <strong>world</strong></p>").unwrap();

    let output = wp2payload_cmd()
        .arg("convert")
        .arg(&html_path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let children = json["root"]["children"].as_array().unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0]["type"], "heading");
    assert_eq!(children[0]["tag"], "h2");
    assert_eq!(children[1]["children"][1]["text"], "world");
    assert_eq!(children[1]["children"][1]["format"], 1);
}

#[test]
fn convert_text_mode() {
    let temp_dir = TempDir::new().unwrap();
    let html_path = temp_dir.path().join("post.html");
    fs::write(&html_path, "<p>One &amp; two</p>").unwrap();

    wp2payload_cmd()
        .arg("convert")
        .arg("--text")
        .arg(&html_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("One & two"));
}

#[test]
fn convert_missing_file_fails() {
    wp2payload_cmd()
        .arg("convert")
        .arg("/definitely/not/here.html")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn import_requires_payload_url_unless_dry_run() {
    wp2payload_cmd()
        .arg("import")
        .arg("--wp-base")
        .arg("https://blog.example.com")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--payload-url"));
}

#[test]
fn import_dry_run_prints_summary() {
    let server = MockServer::start();
    let posts = server.mock(|when, then| {
        when.method(GET)
            .path("/wp-json/wp/v2/posts")
            .query_param("page", "1");
        then.status(200)
            .header("X-WP-TotalPages", "1")
            .json_body(serde_json::json!([{
                "id": 7,
                "slug": "hello",
                "link": server.url("/hello/"),
                "title": {"rendered": "Hello"},
                "content": {"rendered": "<p>Body</p>"}
            }]));
    });

    let work_dir = TempDir::new().unwrap();
    let post_map = r#"{"3": "existing"}"#;
    fs::write(work_dir.path().join("wp-post-map.json"), post_map).unwrap();

    wp2payload_cmd()
        .arg("import")
        .arg("--dry-run")
        .arg("--work-dir")
        .arg(work_dir.path())
        .env("WP_BASE", server.base_url())
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 1 of 1 posts (0 failed)"));

    posts.assert();
    let map = fs::read_to_string(work_dir.path().join("wp-post-map.json")).unwrap();
    assert_eq!(map, post_map);
    assert!(!work_dir.path().join("wp-media-map.json").exists());
}

#[test]
fn import_fatal_first_page_exits_nonzero() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/wp-json/wp/v2/posts");
        then.status(500);
    });

    let work_dir = TempDir::new().unwrap();
    wp2payload_cmd()
        .arg("import")
        .arg("--dry-run")
        .arg("--wp-base")
        .arg(server.base_url())
        .arg("--work-dir")
        .arg(work_dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("import aborted"));

    let log = fs::read_to_string(work_dir.path().join("import-errors.log")).unwrap();
    assert!(log.contains("[FATAL]"));
}

#[test]
fn invalid_timeout_is_rejected() {
    wp2payload_cmd()
        .arg("import")
        .arg("--dry-run")
        .arg("--wp-base")
        .arg("https://blog.example.com")
        .arg("--timeout")
        .arg("soon")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid timeout"));
}
