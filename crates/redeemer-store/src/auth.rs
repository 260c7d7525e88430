//! Request authorisation against the blob service.

use std::collections::BTreeMap;

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use sha2::Sha256;
use url::Url;

use crate::connection::{BlobEndpoint, Credential};
use crate::error::{StoreError, StoreResult};

pub(crate) const API_VERSION: &str = "2021-08-06";
const HEADER_MS_DATE: &str = "x-ms-date";
const HEADER_MS_VERSION: &str = "x-ms-version";

impl BlobEndpoint {
    /// Attach credentials to a `GET` for `url`.
    pub(crate) fn authorize(
        &self,
        mut url: Url,
        now: DateTime<Utc>,
    ) -> StoreResult<(Url, HeaderMap)> {
        let date = now.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(HEADER_MS_DATE),
            header_value(&date)?,
        );
        headers.insert(
            HeaderName::from_static(HEADER_MS_VERSION),
            HeaderValue::from_static(API_VERSION),
        );

        match &self.credential {
            Credential::SharedKey { account, key } => {
                let canonical = string_to_sign("GET", &url, account, &date);
                let signature = sign(key, &canonical)?;
                headers.insert(
                    AUTHORIZATION,
                    header_value(&format!("SharedKey {account}:{signature}"))?,
                );
            }
            Credential::Sas(token) => {
                let pairs: Vec<(String, String)> = url::form_urlencoded::parse(token.as_bytes())
                    .into_owned()
                    .collect();
                url.query_pairs_mut().extend_pairs(pairs);
            }
            Credential::Anonymous => {}
        }

        Ok((url, headers))
    }
}

/// Canonical Shared Key string-to-sign for a body-less request.
pub(crate) fn string_to_sign(method: &str, url: &Url, account: &str, date: &str) -> String {
    // Content-Encoding through Range are all empty for a bodyless GET.
    let standard_headers = "\n".repeat(11);
    let canonical_headers =
        format!("{HEADER_MS_DATE}:{date}\n{HEADER_MS_VERSION}:{API_VERSION}\n");

    let mut resource = format!("/{account}{}", url.path());
    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in url.query_pairs() {
        params
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into_owned());
    }
    for (name, mut values) in params {
        values.sort();
        resource.push('\n');
        resource.push_str(&name);
        resource.push(':');
        resource.push_str(&values.join(","));
    }

    format!("{method}\n{standard_headers}{canonical_headers}{resource}")
}

/// Base64 HMAC-SHA256 of `payload` under `key`.
pub(crate) fn sign(key: &[u8], payload: &str) -> StoreResult<String> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key).map_err(|_| {
        StoreError::InvalidConnectionString {
            reason: "account_key_rejected",
        }
    })?;
    mac.update(payload.as_bytes());
    Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

fn header_value(value: &str) -> StoreResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| StoreError::InvalidConnectionString {
        reason: "credential_not_header_safe",
    })
}
