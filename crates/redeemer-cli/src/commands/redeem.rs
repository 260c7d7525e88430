//! `redeem-bonuses`: validates arguments, then runs the download and replay
//! pipeline against the resolved store.

use std::sync::Arc;
use std::time::Duration;

use redeemer_config::validate::parse_api_url;
use redeemer_config::{ApiKey, ReplaySettings, StagingSettings, StorageProfile};
use redeemer_pipeline::{HttpSubmitter, Pipeline, ReplayEngine, ReplayReport};
use redeemer_store::AzureBlobStore;
use tracing::info;

use crate::cli::RedeemBonusesArgs;
use crate::client::{CliDependencies, CliError, CliResult};

/// Settings validated before any network call is made.
struct RedeemPlan {
    staging: StagingSettings,
    replay: ReplaySettings,
    profile: StorageProfile,
}

fn plan(args: RedeemBonusesArgs) -> CliResult<RedeemPlan> {
    let staging = StagingSettings::new(
        args.tmp_dir,
        &args.container_folder,
        args.on_download_error.into(),
    )?;
    let mut replay = ReplaySettings::new(parse_api_url(&args.api_url)?, ApiKey::parse(&args.api_key)?);
    replay.pacing = Duration::from_millis(args.pacing_ms);
    replay.body_encoding = args.body_encoding.into();
    let profile =
        StorageProfile::resolve(args.profile.as_deref(), args.storage_account, args.container)?;
    Ok(RedeemPlan {
        staging,
        replay,
        profile,
    })
}

pub(crate) async fn handle_redeem_bonuses(
    deps: &CliDependencies,
    args: RedeemBonusesArgs,
) -> CliResult<ReplayReport> {
    let RedeemPlan {
        staging,
        replay,
        profile,
    } = plan(args)?;

    let connection = deps.resolver.resolve(&profile.account_name).await?;
    let store = AzureBlobStore::new(deps.client.clone(), connection.expose(), profile.container)
        .map_err(|err| {
            CliError::failure(anyhow::Error::new(err).context("failed to configure object store"))
        })?;

    info!(
        account = %profile.account_name,
        container = store.container(),
        folder = %staging.container_folder,
        api_url = %replay.api_url,
        "starting redemption replay"
    );

    let submitter = Arc::new(HttpSubmitter::from_settings(deps.client.clone(), &replay));
    let engine = ReplayEngine::from_settings(submitter, &replay);
    Pipeline::new(Arc::new(store), engine, staging)
        .run()
        .await
        .map_err(CliError::failure)
}
