use social_relay::{
    config::Config,
    errors::{AppError, AppResult},
    metrics::Metrics,
    models::{
        action::{ActionRequest, CollectModule, CollectModuleRecord, CreateProfileRequest, PublishRequest, ReferenceModule},
        profile::{FollowInfo, ProfileSelector, ProfilesRequest},
    },
    services::{
        chain_submitter::ProviderTransactionSender,
        graphql_client::GraphqlClient,
        index_poller::IndexPoller,
        orchestrator::ActionOrchestrator,
        session_store::SessionStore,
        signer::{LocalWalletSigner, Signer},
        typed_data_builder::TypedDataBuilder,
    },
    utils::eth_address_validator::{is_valid_eth_address, parse_eth_address},
};

use args::{Args, Command};
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod args;

#[tokio::main]
async fn main() -> AppResult<()> {
    let args = Args::parse();

    // Load configuration from --config path (defaults to config/default.toml)
    let mut config = Config::load(&args.config)?;

    // Apply CLI overrides
    if let Some(graphql_url) = args.graphql_url.clone() {
        config.relay.graphql_url = graphql_url;
    }
    if let Some(rpc_url) = args.rpc_url.clone() {
        config.chain.rpc_url = rpc_url;
    }
    if let Some(private_key) = args.private_key.clone() {
        config.wallet.private_key = private_key;
    }

    init_logging(&config.logging.level)?;

    info!("🚀 Starting social-relay v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {}", args.config);
    info!("Relay: {}", config.get_graphql_url());

    let metrics = Metrics::new()?;

    let result = run(&config, args.command).await;
    if let Err(e) = &result {
        error!("Command failed: {}", e);
    }

    if args.print_metrics {
        println!("{}", metrics.render()?);
    }

    result
}

async fn run(config: &Config, command: Command) -> AppResult<()> {
    let graphql = Arc::new(GraphqlClient::new(
        config.get_graphql_url().to_string(),
        config.get_request_timeout(),
    ));

    let request = match command {
        Command::DoesFollow { follower, profile_ids } => {
            let follower = match follower {
                Some(follower) => follower,
                None => load_signer(config)?.address().to_string(),
            };
            if !is_valid_eth_address(&follower) {
                return Err(AppError::InvalidArgument(format!("invalid follower address: {}", follower)));
            }
            let follow_infos = profile_ids
                .into_iter()
                .map(|profile_id| FollowInfo {
                    follower_address: follower.clone(),
                    profile_id,
                })
                .collect();
            return print_json(&graphql.does_follow(follow_infos).await?);
        }
        Command::Profiles {
            ids,
            handles,
            owned_by,
            who_mirrored,
            limit,
            cursor,
        } => {
            let selector = if !ids.is_empty() {
                ProfileSelector::ProfileIds(ids)
            } else if !handles.is_empty() {
                ProfileSelector::Handles(handles)
            } else if !owned_by.is_empty() {
                ProfileSelector::OwnedBy(owned_by)
            } else if let Some(publication_id) = who_mirrored {
                ProfileSelector::WhoMirroredPublicationId(publication_id)
            } else {
                ProfileSelector::OwnedBy(vec![load_signer(config)?.address().to_string()])
            };
            let page = graphql.profiles(&ProfilesRequest { selector, limit, cursor }).await?;
            return print_json(&page);
        }
        Command::Currencies => {
            let signer = load_signer(config)?;
            let sessions = SessionStore::new(graphql.clone(), signer.clone());
            let session = sessions.ensure_session(signer.address()).await?;
            return print_json(&graphql.enabled_module_currencies(session.bearer()).await?);
        }
        Command::Follow { profile_id } => ActionRequest::Follow { profile_id },
        Command::Unfollow { profile_id } => ActionRequest::Unfollow { profile_id },
        Command::Collect { publication_id } => ActionRequest::Collect { publication_id },
        Command::Post {
            profile_id,
            content_uri,
            collect_module,
            follower_only_reference,
        } => {
            let record: CollectModuleRecord = serde_json::from_str(&collect_module)
                .map_err(|e| AppError::InvalidArgument(format!("collect module JSON: {}", e)))?;
            ActionRequest::Publish(PublishRequest {
                profile_id,
                content_uri,
                collect_module: CollectModule::try_from(record)?,
                reference_module: if follower_only_reference {
                    ReferenceModule::FollowerOnly
                } else {
                    ReferenceModule::Open
                },
            })
        }
        Command::CreateProfile {
            handle,
            profile_picture_uri,
            follow_nft_uri,
        } => ActionRequest::CreateProfile(CreateProfileRequest {
            handle,
            profile_picture_uri,
            follow_nft_uri,
        }),
    };

    let signer = load_signer(config)?;
    let sessions = Arc::new(SessionStore::new(graphql.clone(), signer.clone()));
    let hub = parse_eth_address(&config.chain.hub_contract)
        .ok_or_else(|| AppError::InvalidArgument(format!("invalid hub contract: {}", config.chain.hub_contract)))?;
    let sender = Arc::new(
        ProviderTransactionSender::connect(&config.chain.rpc_url, signer.wallet())
            .map_err(|e| AppError::Chain(e.to_string()))?,
    );

    let orchestrator = ActionOrchestrator::new(
        signer.clone(),
        sessions,
        TypedDataBuilder::new(graphql.clone()),
        sender,
        IndexPoller::new(graphql, config.get_poll_policy()),
        hub,
    );

    // Ctrl-C aborts the wait for indexing; the submitted transaction stands.
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            interrupt.cancel();
        }
    });

    let handle = orchestrator.execute(request, &cancel).await?;
    info!("✅ Indexed: {}", handle.hash);
    print_json(&handle)
}

/// Wallet signer; only commands that sign or default to the wallet address need it.
fn load_signer(config: &Config) -> AppResult<Arc<LocalWalletSigner>> {
    if config.wallet.private_key.trim().is_empty() {
        return Err(AppError::Wallet(
            "no private key configured (wallet.private_key or --private-key)".to_string(),
        ));
    }
    let signer =
        LocalWalletSigner::from_private_key(&config.wallet.private_key).map_err(|e| AppError::Wallet(e.to_string()))?;
    info!("Wallet address: {}", signer.address());
    Ok(Arc::new(signer))
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_logging(level: &str) -> AppResult<()> {
    let log_level = match level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "info" => tracing::Level::INFO,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => {
            eprintln!("Invalid log level: {}, defaulting to info", level);
            tracing::Level::INFO
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("social_relay={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    Ok(())
}
