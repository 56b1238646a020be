use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use omni_core::{CreditPolicy, Identity, WorkflowState};
use omni_engine::{
    CommitOutcome, CreditLedger, FileStore, HttpProfileStore, IdentityProvider, Orchestrator,
    SimulatedConverter, SimulationSettings, WatchIdentityProvider,
};
use omni_logging::{omni_error, omni_info, omni_warn};

use super::cli::{Cli, Command, ConvertArgs};
use super::config::{self, AppConfig};
use super::{ingest, logging, render};

pub async fn run_app() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;
    logging::initialize(
        config.log_destination,
        logging::level_for_verbosity(cli.verbose),
    );
    omni_info!("omni starting");

    let identity = cli.identity.as_deref().map(Identity::new);
    match cli.command {
        Command::Convert(args) => convert(&config, identity, args).await,
        Command::Balance => balance(&config, identity).await,
        Command::Formats => {
            println!("{}", render::formats_table(&config.pricing.into()));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_ledger(config: &AppConfig, identity: Option<&Identity>) -> anyhow::Result<CreditLedger> {
    let policy = CreditPolicy::from(config.pricing);
    let local = Arc::new(FileStore::new(config.state_dir.clone()));
    match (&config.profile, identity) {
        (Some(profile), _) => {
            let store = HttpProfileStore::new(profile.settings())
                .context("failed to set up the profile service client")?;
            Ok(CreditLedger::new(local, Arc::new(store), policy))
        }
        (None, Some(identity)) => {
            bail!("signing in as {identity} needs a `profile` section in the config")
        }
        (None, None) => Ok(CreditLedger::guest_only(local, policy)),
    }
}

fn build_orchestrator(
    config: &AppConfig,
    identity: Option<Identity>,
    settings: SimulationSettings,
) -> anyhow::Result<Orchestrator> {
    let ledger = build_ledger(config, identity.as_ref())?;
    let converter = Arc::new(SimulatedConverter::new(settings));
    let provider: Arc<dyn IdentityProvider> = Arc::new(WatchIdentityProvider::new(identity));
    Ok(Orchestrator::new(ledger, converter).with_identity_provider(provider))
}

async fn balance(config: &AppConfig, identity: Option<Identity>) -> anyhow::Result<ExitCode> {
    let mut orchestrator = build_orchestrator(config, identity, SimulationSettings::default())?;
    orchestrator.start().await;
    println!("{}", render::balance_line(&orchestrator.view()));
    Ok(ExitCode::SUCCESS)
}

async fn convert(
    config: &AppConfig,
    identity: Option<Identity>,
    args: ConvertArgs,
) -> anyhow::Result<ExitCode> {
    let request = args.request()?;
    let files = ingest::load_files(&args.files)?;

    let settings = SimulationSettings {
        delay_scale: if args.instant { 0.0 } else { config.delay_scale },
        output_dir: Some(
            args.output_dir
                .clone()
                .unwrap_or_else(|| config.output_dir.clone()),
        ),
    };
    let mut orchestrator = build_orchestrator(config, identity, settings)?;
    orchestrator.start().await;

    if orchestrator.capture_files(files).await != WorkflowState::SelectionPending {
        bail!("no files to convert");
    }
    let view = orchestrator.view();
    println!("{}", render::selection_summary(&view));
    if let Some(cost) = orchestrator.state().quote(&request) {
        println!("{}", render::quote_line(cost, &view));
    }
    if args.dry_run {
        orchestrator.cancel_selection().await;
        return Ok(ExitCode::SUCCESS);
    }

    let mut views = orchestrator.subscribe();
    let printer = async move {
        let mut last = None;
        while views.changed().await.is_ok() {
            let line = render::progress_line(&views.borrow_and_update());
            if line.is_some() && line != last {
                if let Some(text) = &line {
                    println!("{text}");
                }
                last = line;
            }
        }
    };
    let driver = async move {
        let outcome = orchestrator.confirm(request).await;
        let view = orchestrator.view();
        let commit = orchestrator.take_pending_commit();
        (outcome, view, commit)
    };
    let ((), (outcome, view, commit)) = tokio::join!(printer, driver);

    println!("{}", render::outcome(&view));

    if let Some(commit) = commit {
        match commit.outcome().await {
            CommitOutcome::Persisted => {}
            CommitOutcome::Failed(reason) | CommitOutcome::Aborted(reason) => {
                omni_warn!("Balance update did not persist: {}", reason);
                eprintln!("Warning: the new balance could not be saved ({reason}).");
            }
        }
    }

    match outcome {
        WorkflowState::Complete => Ok(ExitCode::SUCCESS),
        other => {
            omni_error!("Conversion ended in {:?}", other);
            Ok(ExitCode::FAILURE)
        }
    }
}
