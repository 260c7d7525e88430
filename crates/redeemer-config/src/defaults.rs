//! Default values shared by the CLI and the pipeline.

/// Local base directory for staged payloads.
pub const DEFAULT_TMP_DIR: &str = "tmp";
/// Production endpoint accepting redeemed bonus requests.
pub const DEFAULT_API_URL: &str = "https://api-gad.io.italia.it/api/bonus-vacanze/v1/redeemed";
/// Wait inserted between consecutive replay submissions.
pub const DEFAULT_PACING_MS: u64 = 1_000;
/// Per-call timeout for the downstream API and the object store.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
/// Header carrying the downstream subscription key.
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Environment variables consulted for the storage connection string, in order.
pub const CONNECTION_STRING_VARS: [&str; 2] = [
    "REDEEMER_STORAGE_CONNECTION_STRING",
    "AZURE_STORAGE_CONNECTION_STRING",
];
