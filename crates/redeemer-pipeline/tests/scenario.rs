//! End-to-end run against mocked blob storage and a mocked redemption API.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use httpmock::prelude::*;
use redeemer_config::{ApiKey, DownloadFailurePolicy, ReplaySettings, StagingSettings};
use redeemer_pipeline::{HttpSubmitter, Pipeline, PipelineError, ReplayEngine};
use redeemer_store::AzureBlobStore;
use reqwest::Client;
use url::Url;

const CONNECTION_SUFFIX: &str = ";SharedAccessSignature=sv=2021&sig=secret";

fn listing(names: &[&str]) -> String {
    let blobs: String = names
        .iter()
        .map(|name| format!("<Blob><Name>{name}</Name><Properties /></Blob>"))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?><EnumerationResults><Blobs>{blobs}</Blobs><NextMarker /></EnumerationResults>"
    )
}

fn mock_storage(server: &MockServer, objects: &[(&str, &str)]) {
    let names: Vec<&str> = objects.iter().map(|(name, _)| *name).collect();
    server.mock(|when, then| {
        when.method(GET)
            .path("/acct/redeemed")
            .query_param("comp", "list")
            .query_param("prefix", "2024-bonus");
        then.status(200)
            .header("content-type", "application/xml")
            .body(listing(&names));
    });
    for (name, body) in objects {
        let body = (*body).to_string();
        server.mock(|when, then| {
            when.method(GET).path(format!("/acct/redeemed/{name}"));
            then.status(200).body(body);
        });
    }
}

fn pipeline(storage: &MockServer, api: &MockServer, tmp_dir: &std::path::Path) -> Result<Pipeline> {
    let client = Client::new();
    let store = AzureBlobStore::new(
        client.clone(),
        &format!("BlobEndpoint={}/acct{CONNECTION_SUFFIX}", storage.base_url()),
        "redeemed",
    )?;
    let settings = ReplaySettings::new(
        Url::parse(&api.url("/redeemed"))?,
        ApiKey::parse("subscription-key")?,
    );
    let submitter = Arc::new(HttpSubmitter::from_settings(client, &settings));
    let engine = ReplayEngine::from_settings(submitter, &settings);
    let staging = StagingSettings::new(tmp_dir, "2024-bonus", DownloadFailurePolicy::Abort)?;
    Ok(Pipeline::new(Arc::new(store), engine, staging))
}

#[tokio::test]
async fn replays_folder_and_reports_each_status() -> Result<()> {
    let storage = MockServer::start_async().await;
    let api = MockServer::start_async().await;
    mock_storage(
        &storage,
        &[("2024-bonus/a.json", r#"{"id":1}"#), ("2024-bonus/b.json", r#"{"id":2}"#)],
    );
    let accepted = api
        .mock_async(|when, then| {
            when.method(POST)
                .path("/redeemed")
                .header("Ocp-Apim-Subscription-Key", "subscription-key")
                .body(r#""{\"id\":1}""#);
            then.status(200).body("{}");
        })
        .await;
    let throttled = api
        .mock_async(|when, then| {
            when.method(POST)
                .path("/redeemed")
                .header("Ocp-Apim-Subscription-Key", "subscription-key")
                .body(r#""{\"id\":2}""#);
            then.status(429);
        })
        .await;

    let root = tempfile::tempdir()?;
    let tmp_dir = root.path().join("tmp");
    let started = Instant::now();
    let report = pipeline(&storage, &api, &tmp_dir)?.run().await?;
    let elapsed = started.elapsed();

    accepted.assert_hits_async(1).await;
    throttled.assert_hits_async(1).await;

    let rows: Vec<_> = report
        .outcomes()
        .iter()
        .map(|o| (o.source_file.clone(), o.status_code.as_str()))
        .collect();
    assert_eq!(
        rows,
        [
            (tmp_dir.join("2024-bonus/a.json"), "200"),
            (tmp_dir.join("2024-bonus/b.json"), "429"),
        ]
    );
    assert!(report.outcomes()[0].source_file.ends_with("tmp/2024-bonus/a.json"));
    assert!(elapsed >= Duration::from_millis(1_000));
    assert_eq!(
        std::fs::read_to_string(tmp_dir.join("2024-bonus/b.json"))?,
        r#"{"id":2}"#
    );
    Ok(())
}

#[tokio::test]
async fn missing_blob_aborts_before_any_submission() -> Result<()> {
    let storage = MockServer::start_async().await;
    let api = MockServer::start_async().await;
    storage.mock(|when, then| {
        when.method(GET)
            .path("/acct/redeemed")
            .query_param("comp", "list");
        then.status(200)
            .body(listing(&["2024-bonus/a.json", "2024-bonus/gone.json"]));
    });
    storage.mock(|when, then| {
        when.method(GET).path("/acct/redeemed/2024-bonus/a.json");
        then.status(200).body("{}");
    });
    storage.mock(|when, then| {
        when.method(GET).path("/acct/redeemed/2024-bonus/gone.json");
        then.status(404);
    });
    let submissions = api
        .mock_async(|when, then| {
            when.method(POST).path("/redeemed");
            then.status(200);
        })
        .await;

    let root = tempfile::tempdir()?;
    let err = pipeline(&storage, &api, &root.path().join("tmp"))?
        .run()
        .await
        .expect_err("download failure is fatal");

    assert!(
        matches!(err, PipelineError::Download { ref object, .. } if object == "2024-bonus/gone.json")
    );
    submissions.assert_hits_async(0).await;
    Ok(())
}

#[tokio::test]
async fn unreachable_api_is_a_transport_failure() -> Result<()> {
    let storage = MockServer::start_async().await;
    mock_storage(&storage, &[("2024-bonus/a.json", "{}")]);

    let client = Client::new();
    let store = AzureBlobStore::new(
        client.clone(),
        &format!("BlobEndpoint={}/acct{CONNECTION_SUFFIX}", storage.base_url()),
        "redeemed",
    )?;
    let settings = ReplaySettings::new(
        Url::parse("http://127.0.0.1:9/redeemed")?,
        ApiKey::parse("subscription-key")?,
    );
    let engine = ReplayEngine::from_settings(
        Arc::new(HttpSubmitter::from_settings(client, &settings)),
        &settings,
    );
    let root = tempfile::tempdir()?;
    let staging = StagingSettings::new(root.path(), "2024-bonus", DownloadFailurePolicy::Abort)?;

    let err = Pipeline::new(Arc::new(store), engine, staging)
        .run()
        .await
        .expect_err("nothing listens on the discard port");

    assert!(matches!(err, PipelineError::Transport { .. }));
    Ok(())
}
