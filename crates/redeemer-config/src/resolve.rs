//! Storage connection string resolution.
//!
//! # Design
//! - Resolvers are tried in order; the first one yielding a value wins.
//! - A resolver returns `Ok(None)` when it simply has nothing to offer, and an
//!   error only when it was applicable but failed.

use std::io;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::defaults::CONNECTION_STRING_VARS;
use crate::error::{ConfigError, ConfigResult};
use crate::model::StorageConnection;

/// Source of a connection string for a storage account.
#[async_trait]
pub trait ConnectionResolver: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Look up the connection string for `account_name`.
    async fn resolve(&self, account_name: &str) -> ConfigResult<Option<StorageConnection>>;
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Reads the connection string from environment variables.
pub struct EnvConnectionResolver {
    vars: Vec<String>,
    lookup: Lookup,
}

impl EnvConnectionResolver {
    /// Resolver over the process environment and the default variable names.
    #[must_use]
    pub fn from_process_env() -> Self {
        Self::with_lookup(
            CONNECTION_STRING_VARS.iter().map(ToString::to_string).collect(),
            |name| std::env::var(name).ok(),
        )
    }

    /// Resolver over an arbitrary lookup function.
    #[must_use]
    pub fn with_lookup(
        vars: Vec<String>,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            vars,
            lookup: Box::new(lookup),
        }
    }
}

#[async_trait]
impl ConnectionResolver for EnvConnectionResolver {
    fn name(&self) -> &'static str {
        "environment"
    }

    async fn resolve(&self, _account_name: &str) -> ConfigResult<Option<StorageConnection>> {
        Ok(self.vars.iter().find_map(|var| {
            (self.lookup)(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .map(|value| {
                    debug!(variable = %var, "storage connection string taken from environment");
                    StorageConnection::new(value)
                })
        }))
    }
}

/// Asks the Azure CLI for the account's connection string.
#[derive(Debug, Clone)]
pub struct AzCliConnectionResolver {
    program: String,
}

impl Default for AzCliConnectionResolver {
    fn default() -> Self {
        Self::with_program("az")
    }
}

impl AzCliConnectionResolver {
    /// Use a specific executable instead of `az` from `PATH`.
    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl ConnectionResolver for AzCliConnectionResolver {
    fn name(&self) -> &'static str {
        "azure-cli"
    }

    async fn resolve(&self, account_name: &str) -> ConfigResult<Option<StorageConnection>> {
        let output = match Command::new(&self.program)
            .args([
                "storage",
                "account",
                "show-connection-string",
                "--name",
                account_name,
                "--query",
                "connectionString",
                "--output",
                "tsv",
            ])
            .kill_on_drop(true)
            .output()
            .await
        {
            Ok(output) => output,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(program = %self.program, "azure cli not installed");
                return Ok(None);
            }
            Err(source) => {
                return Err(ConfigError::CommandSpawn {
                    program: self.program.clone(),
                    source,
                });
            }
        };

        if !output.status.success() {
            return Err(ConfigError::CommandFailed {
                program: self.program.clone(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Ok(None);
        }
        Ok(Some(StorageConnection::new(stdout)))
    }
}

/// Ordered list of resolvers.
pub struct ResolverChain {
    resolvers: Vec<Box<dyn ConnectionResolver>>,
}

impl Default for ResolverChain {
    fn default() -> Self {
        Self::new(vec![
            Box::new(EnvConnectionResolver::from_process_env()),
            Box::new(AzCliConnectionResolver::default()),
        ])
    }
}

impl ResolverChain {
    /// Chain over the supplied resolvers, tried in order.
    #[must_use]
    pub fn new(resolvers: Vec<Box<dyn ConnectionResolver>>) -> Self {
        Self { resolvers }
    }

    /// Resolve the connection string for `account_name`.
    ///
    /// # Errors
    ///
    /// Propagates the first resolver failure, or returns
    /// [`ConfigError::ConnectionUnavailable`] when no resolver had a value.
    pub async fn resolve(&self, account_name: &str) -> ConfigResult<StorageConnection> {
        for resolver in &self.resolvers {
            if let Some(connection) = resolver.resolve(account_name).await? {
                debug!(resolver = resolver.name(), account = %account_name, "storage connection resolved");
                return Ok(connection);
            }
        }
        Err(ConfigError::ConnectionUnavailable {
            account_name: account_name.to_string(),
        })
    }
}
