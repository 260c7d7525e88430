//! Azure Blob Storage client built on `reqwest`.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use reqwest::{Client, Response};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

use crate::connection::{BlobEndpoint, parse_connection_string};
use crate::error::{StoreError, StoreResult};
use crate::listing::{ListPage, parse_list_page};
use crate::object::{ObjectStore, ObjectStream, RemoteObjectRef};

/// Blob container addressed through the REST API.
#[derive(Debug, Clone)]
pub struct AzureBlobStore {
    client: Client,
    endpoint: BlobEndpoint,
    container: String,
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

impl AzureBlobStore {
    /// Build a store for `container` from an account connection string.
    ///
    /// The supplied client carries timeouts and default headers.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string cannot be parsed.
    pub fn new(
        client: Client,
        connection_string: &str,
        container: impl Into<String>,
    ) -> StoreResult<Self> {
        Ok(Self {
            client,
            endpoint: parse_connection_string(connection_string)?,
            container: container.into(),
        })
    }

    /// Container this store reads from.
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    fn container_url(&self) -> StoreResult<Url> {
        let mut url = self.endpoint.base.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::InvalidConnectionString {
                reason: "invalid_blob_endpoint",
            })?
            .pop_if_empty()
            .push(&self.container);
        Ok(url)
    }

    fn object_url(&self, name: &str) -> StoreResult<Url> {
        let mut url = self.container_url()?;
        url.path_segments_mut()
            .map_err(|()| StoreError::InvalidConnectionString {
                reason: "invalid_blob_endpoint",
            })?
            .extend(name.split('/'));
        Ok(url)
    }

    async fn list_page(&self, prefix: &str, marker: Option<&str>) -> StoreResult<ListPage> {
        let mut url = self.container_url()?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("restype", "container")
                .append_pair("comp", "list")
                .append_pair("prefix", prefix);
            if let Some(marker) = marker {
                pairs.append_pair("marker", marker);
            }
        }

        let response = self.get("list_objects", url).await?;
        let redacted = redact(response.url());
        let body = response
            .text()
            .await
            .map_err(|source| StoreError::Request {
                operation: "list_objects",
                url: redacted,
                source,
            })?;
        let page = parse_list_page(&body)?;
        debug!(
            container = %self.container,
            prefix = %prefix,
            objects = page.names.len(),
            more = page.next_marker.is_some(),
            "listing page received"
        );
        Ok(page)
    }

    async fn get(&self, operation: &'static str, url: Url) -> StoreResult<Response> {
        let (url, headers) = self.endpoint.authorize(url, Utc::now())?;
        let redacted = redact(&url);
        let response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|source| StoreError::Request {
                operation,
                url: redacted.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                operation,
                url: redacted,
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ObjectStore for AzureBlobStore {
    fn list_objects<'a>(&'a self, prefix: &'a str) -> ObjectStream<'a> {
        stream::try_unfold(Cursor::Start, move |cursor| async move {
            let marker = match cursor {
                Cursor::Done => return Ok::<_, StoreError>(None),
                Cursor::Start => None,
                Cursor::Next(marker) => Some(marker),
            };
            let page = self.list_page(prefix, marker.as_deref()).await?;
            let next = page.next_marker.map_or(Cursor::Done, Cursor::Next);
            Ok(Some((page.names, next)))
        })
        .map_ok(|names| {
            stream::iter(
                names
                    .into_iter()
                    .map(|name| Ok::<_, StoreError>(RemoteObjectRef::new(name))),
            )
        })
        .try_flatten()
        .boxed()
    }

    async fn download_object(
        &self,
        object: &RemoteObjectRef,
        destination: &Path,
    ) -> StoreResult<u64> {
        let url = self.object_url(object.name())?;
        let response = self.get("download_object", url).await?;
        let redacted = redact(response.url());

        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(io_error("create_file", destination))?;
        let mut body = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|source| StoreError::Request {
                operation: "download_object",
                url: redacted.clone(),
                source,
            })?;
            file.write_all(&chunk)
                .await
                .map_err(io_error("write_file", destination))?;
            written = written.saturating_add(u64::try_from(chunk.len()).unwrap_or(u64::MAX));
        }
        file.flush().await.map_err(io_error("flush_file", destination))?;

        debug!(object = %object.name(), bytes = written, path = %destination.display(), "object downloaded");
        Ok(written)
    }
}

fn io_error<'a>(
    operation: &'static str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> StoreError + 'a {
    move |source| StoreError::Io {
        operation,
        path: path.to_path_buf(),
        source,
    }
}

fn redact(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const SAS_SUFFIX: &str = ";SharedAccessSignature=sv=2021&sig=secret";

    fn listing(names: &[&str], next_marker: Option<&str>) -> String {
        let blobs: String = names
            .iter()
            .map(|name| format!("<Blob><Name>{name}</Name><Properties /></Blob>"))
            .collect();
        let marker = next_marker.map_or_else(
            || "<NextMarker />".to_string(),
            |marker| format!("<NextMarker>{marker}</NextMarker>"),
        );
        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?><EnumerationResults><Blobs>{blobs}</Blobs>{marker}</EnumerationResults>"
        )
    }

    fn sas_store(server: &MockServer) -> AzureBlobStore {
        AzureBlobStore::new(
            Client::new(),
            &format!("BlobEndpoint={}/acct{SAS_SUFFIX}", server.base_url()),
            "redeemed",
        )
        .expect("valid connection string")
    }

    #[tokio::test]
    async fn list_objects_follows_markers_lazily() {
        let server = MockServer::start_async().await;
        let mut first_page = server.mock(|when, then| {
            when.method(GET)
                .path("/acct/redeemed")
                .query_param("restype", "container")
                .query_param("comp", "list")
                .query_param("prefix", "2024-bonus")
                .query_param("sig", "secret");
            then.status(200)
                .header("content-type", "application/xml")
                .body(listing(
                    &["2024-bonus/a.json", "2024-bonus/b.json"],
                    Some("page-2"),
                ));
        });

        let store = sas_store(&server);
        let mut objects = store.list_objects("2024-bonus");
        let first = objects.try_next().await.expect("page one").expect("object");
        let second = objects.try_next().await.expect("page one").expect("object");
        assert_eq!(first.name(), "2024-bonus/a.json");
        assert_eq!(second.name(), "2024-bonus/b.json");
        first_page.assert_hits(1);
        first_page.delete();

        let second_page = server.mock(|when, then| {
            when.method(GET)
                .path("/acct/redeemed")
                .query_param("prefix", "2024-bonus")
                .query_param("marker", "page-2");
            then.status(200).body(listing(&["2024-bonus/c.json"], None));
        });

        let rest: Vec<RemoteObjectRef> = objects.try_collect().await.expect("page two");
        assert_eq!(rest, vec![RemoteObjectRef::new("2024-bonus/c.json")]);
        second_page.assert_hits(1);
    }

    #[tokio::test]
    async fn list_objects_surfaces_status_errors() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/acct/redeemed");
            then.status(403)
                .body("<Error><Code>AuthenticationFailed</Code></Error>");
        });

        let store = sas_store(&server);
        let err = store
            .list_objects("2024-bonus")
            .try_collect::<Vec<_>>()
            .await
            .expect_err("403 should fail the listing");
        match err {
            StoreError::Status {
                operation,
                status,
                url,
            } => {
                assert_eq!(operation, "list_objects");
                assert_eq!(status, 403);
                assert!(!url.contains("secret"), "SAS leaked into error: {url}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn shared_key_requests_are_signed() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/acct/redeemed")
                .header_exists("authorization")
                .header_exists("x-ms-date")
                .header("x-ms-version", crate::auth::API_VERSION);
            then.status(200).body(listing(&[], None));
        });

        let store = AzureBlobStore::new(
            Client::new(),
            &format!(
                "AccountName=acct;AccountKey=c2VjcmV0;BlobEndpoint={}/acct",
                server.base_url()
            ),
            "redeemed",
        )
        .expect("valid connection string");
        let objects: Vec<RemoteObjectRef> = store
            .list_objects("2024-bonus")
            .try_collect()
            .await
            .expect("listing succeeds");
        assert!(objects.is_empty());
        mock.assert();
    }

    #[tokio::test]
    async fn download_object_overwrites_destination() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/acct/redeemed/2024-bonus/a.json");
            then.status(200).body(r#"{"id":"a"}"#);
        });

        let dir = tempfile::tempdir().expect("tempdir");
        let destination = dir.path().join("a.json");
        std::fs::write(&destination, "stale content that is longer").expect("seed file");

        let store = sas_store(&server);
        let written = store
            .download_object(&RemoteObjectRef::new("2024-bonus/a.json"), &destination)
            .await
            .expect("download succeeds");

        assert_eq!(written, 10);
        assert_eq!(
            std::fs::read_to_string(&destination).expect("read back"),
            r#"{"id":"a"}"#
        );
        mock.assert();
    }

    #[tokio::test]
    async fn download_object_reports_missing_blobs() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/acct/redeemed/2024-bonus/missing.json");
            then.status(404);
        });

        let dir = tempfile::tempdir().expect("tempdir");
        let destination = dir.path().join("missing.json");
        let err = sas_store(&server)
            .download_object(&RemoteObjectRef::new("2024-bonus/missing.json"), &destination)
            .await
            .expect_err("404 should fail");
        assert!(matches!(err, StoreError::Status { status: 404, .. }));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn download_object_reports_unwritable_destination() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/acct/redeemed/2024-bonus/a.json");
            then.status(200).body(r#"{"id":"a"}"#);
        });

        let dir = tempfile::tempdir().expect("tempdir");
        let destination = dir.path().join("absent").join("a.json");
        let err = sas_store(&server)
            .download_object(&RemoteObjectRef::new("2024-bonus/a.json"), &destination)
            .await
            .expect_err("missing parent directory should fail");
        match err {
            StoreError::Io {
                operation, path, ..
            } => {
                assert_eq!(operation, "create_file");
                assert_eq!(path, destination);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
