use cli::app;
use httpmock::prelude::*;
use std::fs;
use std::path::PathBuf;
use uploader_core::config::{AppConfig, PostUploadAction, EXAMPLE_CONFIG};

fn config_for(server: &MockServer, tags: &[&str]) -> AppConfig {
    AppConfig {
        paperless_url: server.base_url(),
        api_key: "testkey".to_string(),
        watch_folder: PathBuf::from("watch"),
        post_upload_action: PostUploadAction::None,
        processed_folder: PathBuf::from("processed"),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        settle_delay_ms: 1000,
        settle_check_size: false,
        settle_max_wait_ms: 60_000,
    }
}

#[tokio::test]
async fn bootstrap_drops_unknown_tags() {
    let server = MockServer::start_async().await;
    let tags = server.mock(|when, then| {
        when.method(GET)
            .path("/api/tags/")
            .header("authorization", "Token testkey");
        then.status(200)
            .body(r#"{"results":[{"id":1,"name":"invoices"}]}"#);
    });

    let boot = app::bootstrap(config_for(&server, &["invoices", "missing"]))
        .await
        .unwrap();
    tags.assert();
    assert_eq!(boot.tag_ids, vec![1]);
}

#[tokio::test]
async fn bootstrap_fails_when_catalog_unavailable() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/tags/");
        then.status(503);
    });

    let err = app::bootstrap(config_for(&server, &[]))
        .await
        .err()
        .unwrap();
    let msg = format!("{err:#}");
    assert!(msg.contains("failed to get tags from Paperless"), "{msg}");
    assert!(msg.contains("503"), "{msg}");
}

#[tokio::test]
async fn single_file_upload_succeeds() {
    let temp = tempfile::tempdir().unwrap();
    let file = temp.path().join("test.txt");
    fs::write(&file, "hello world").unwrap();

    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/tags/");
        then.status(200).body(r#"{"results":[{"id":5,"name":"inbox"}]}"#);
    });
    let upload = server.mock(|when, then| {
        when.method(POST)
            .path("/api/documents/post_document/")
            .body_includes("hello world")
            .body_matches(r#"name="tags"\r\n\r\n5\r\n"#);
        then.status(200);
    });

    let boot = app::bootstrap(config_for(&server, &["inbox"])).await.unwrap();
    app::upload_one(&boot, &file).await.unwrap();
    upload.assert();
    assert!(file.exists());
}

#[tokio::test]
async fn single_file_upload_surfaces_server_error() {
    let temp = tempfile::tempdir().unwrap();
    let file = temp.path().join("test.txt");
    fs::write(&file, "hello world").unwrap();

    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/tags/");
        then.status(200).body(r#"{"results":[]}"#);
    });
    server.mock(|when, then| {
        when.method(POST).path("/api/documents/post_document/");
        then.status(500).body("server error");
    });

    let boot = app::bootstrap(config_for(&server, &[])).await.unwrap();
    let err = app::upload_one(&boot, &file).await.unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("500"), "{msg}");
    assert!(msg.contains("server error"), "{msg}");
}

#[test]
fn create_config_respects_force() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("config.yaml");

    app::create_config(&path, false).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), EXAMPLE_CONFIG);

    fs::write(&path, "custom").unwrap();
    assert!(app::create_config(&path, false).is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), "custom");

    app::create_config(&path, true).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), EXAMPLE_CONFIG);
}

#[test]
fn example_config_path_defaults_to_config_yaml() {
    assert_eq!(app::example_config_path(None), PathBuf::from("config.yaml"));
    assert_eq!(
        app::example_config_path(Some("/etc/uploader.yaml")),
        PathBuf::from("/etc/uploader.yaml")
    );
}
