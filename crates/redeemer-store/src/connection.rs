//! Connection string parsing.

use base64::{Engine as _, engine::general_purpose};
use url::Url;

use crate::error::{StoreError, StoreResult};

const DEV_ACCOUNT_NAME: &str = "devstoreaccount1";
const DEV_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEV_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// How requests against the endpoint are authorised.
#[derive(Clone, PartialEq, Eq)]
pub(crate) enum Credential {
    SharedKey { account: String, key: Vec<u8> },
    Sas(String),
    Anonymous,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SharedKey { account, .. } => formatter
                .debug_struct("SharedKey")
                .field("account", account)
                .finish_non_exhaustive(),
            Self::Sas(_) => formatter.write_str("Sas(<redacted>)"),
            Self::Anonymous => formatter.write_str("Anonymous"),
        }
    }
}

/// Blob service base URL plus the credential used against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BlobEndpoint {
    pub(crate) base: Url,
    pub(crate) credential: Credential,
}

#[derive(Default)]
struct Fields<'a> {
    account_name: Option<&'a str>,
    account_key: Option<&'a str>,
    protocol: Option<&'a str>,
    suffix: Option<&'a str>,
    blob_endpoint: Option<&'a str>,
    sas: Option<&'a str>,
    development: bool,
}

/// Parse `Key=Value;...` connection strings.
pub(crate) fn parse_connection_string(raw: &str) -> StoreResult<BlobEndpoint> {
    let fields = split_fields(raw)?;

    if fields.development {
        let key = decode_key(DEV_ACCOUNT_KEY)?;
        return Ok(BlobEndpoint {
            base: parse_base(fields.blob_endpoint.unwrap_or(DEV_BLOB_ENDPOINT))?,
            credential: Credential::SharedKey {
                account: DEV_ACCOUNT_NAME.to_string(),
                key,
            },
        });
    }

    let base = if let Some(endpoint) = fields.blob_endpoint {
        parse_base(endpoint)?
    } else {
        let account = fields
            .account_name
            .ok_or(StoreError::InvalidConnectionString {
                reason: "missing_account_name",
            })?;
        let protocol = fields.protocol.unwrap_or("https");
        let suffix = fields.suffix.unwrap_or(DEFAULT_ENDPOINT_SUFFIX);
        parse_base(&format!("{protocol}://{account}.blob.{suffix}"))?
    };

    let credential = match (fields.account_key, fields.sas) {
        (Some(key), _) => Credential::SharedKey {
            account: fields
                .account_name
                .ok_or(StoreError::InvalidConnectionString {
                    reason: "account_key_without_account_name",
                })?
                .to_string(),
            key: decode_key(key)?,
        },
        (None, Some(sas)) => Credential::Sas(sas.trim_start_matches('?').to_string()),
        (None, None) => Credential::Anonymous,
    };

    Ok(BlobEndpoint { base, credential })
}

fn split_fields(raw: &str) -> StoreResult<Fields<'_>> {
    let mut fields = Fields::default();
    for part in raw.split(';').map(str::trim).filter(|part| !part.is_empty()) {
        let (key, value) = part
            .split_once('=')
            .ok_or(StoreError::InvalidConnectionString {
                reason: "segment_without_value",
            })?;
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "accountname" => fields.account_name = Some(value),
            "accountkey" => fields.account_key = Some(value),
            "defaultendpointsprotocol" => fields.protocol = Some(value),
            "endpointsuffix" => fields.suffix = Some(value),
            "blobendpoint" => fields.blob_endpoint = Some(value),
            "sharedaccesssignature" => fields.sas = Some(value),
            "usedevelopmentstorage" => fields.development = value.eq_ignore_ascii_case("true"),
            _ => {}
        }
    }
    if fields.account_name.is_none() && fields.blob_endpoint.is_none() && !fields.development {
        return Err(StoreError::InvalidConnectionString {
            reason: "missing_account_name",
        });
    }
    Ok(fields)
}

fn decode_key(key: &str) -> StoreResult<Vec<u8>> {
    general_purpose::STANDARD
        .decode(key)
        .map_err(|source| StoreError::InvalidAccountKey { source })
}

fn parse_base(endpoint: &str) -> StoreResult<Url> {
    let url = Url::parse(endpoint).map_err(|_| StoreError::InvalidConnectionString {
        reason: "invalid_blob_endpoint",
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(StoreError::InvalidConnectionString {
            reason: "invalid_blob_endpoint",
        });
    }
    Ok(url)
}
