//! `pagecrawl-automation` CLI entry-point.
//!
//! Available sub-commands:
//! - `execute`          — run the PageCrawl node over a batch of items.
//! - `lookup`           — search pages, folders, templates, workspaces or auths.
//! - `frequencies`      — list the check frequencies the account may use.
//! - `test-credentials` — validate the API token.
//! - `listen`           — register the webhook trigger and print deliveries.
//! - `serve`            — start the API server.
//! - `migrate`          — run pending database migrations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use api::AppState;
use engine::{ExecutionRequest, ExecutorConfig, ItemExecutor};
use nodes::http::ReqwestClient;
use nodes::pagecrawl::{self, Credentials, LookupKind, PageCrawlNode, PageCrawlTrigger, TriggerConfig};
use nodes::{ExecutionContext, Item, MemoryStaticData, StaticDataStore};

/// Static data scope used for the trigger's webhook id.
const TRIGGER_NODE_NAME: &str = "PageCrawl Trigger";

#[derive(Parser)]
#[command(
    name = "pagecrawl-automation",
    about = "PageCrawl.io website-change monitoring from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct CredentialArgs {
    /// PageCrawl API token.
    #[arg(long, env = "PAGECRAWL_API_TOKEN", hide_env_values = true)]
    api_token: String,
    /// API origin.
    #[arg(long, env = "PAGECRAWL_BASE_URL")]
    base_url: Option<String>,
}

impl CredentialArgs {
    fn client(&self) -> Result<Arc<ReqwestClient>> {
        let mut credentials = Credentials::new(self.api_token.clone());
        if let Some(base_url) = &self.base_url {
            credentials = credentials.with_base_url(base_url.clone());
        }
        let client = credentials.client()?;
        info!(base_url = %client.base_url(), "using PageCrawl API");
        Ok(Arc::new(client))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Run the PageCrawl node over the items in a JSON file.
    Execute {
        #[command(flatten)]
        credentials: CredentialArgs,
        /// Either `{items, continueOnFail, parameters}` or a bare array of
        /// item parameter objects.
        input: PathBuf,
        /// Emit error items instead of aborting on the first failure.
        #[arg(long)]
        continue_on_fail: bool,
        /// Write binary attachments (screenshots, diff images) here.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Search one of the pickers' listings.
    Lookup {
        #[command(flatten)]
        credentials: CredentialArgs,
        /// pages, folders, templates, workspaces or auths.
        kind: LookupKind,
        /// Case-insensitive substring filter.
        #[arg(long)]
        filter: Option<String>,
    },
    /// List the check frequencies available to the account.
    Frequencies {
        #[command(flatten)]
        credentials: CredentialArgs,
    },
    /// Validate the API token against the user endpoint.
    TestCredentials {
        #[command(flatten)]
        credentials: CredentialArgs,
    },
    /// Register the webhook, print deliveries as JSON lines, deregister on Ctrl-C.
    Listen {
        #[command(flatten)]
        credentials: CredentialArgs,
        /// Trigger configuration (JSON); defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Public origin PageCrawl can reach this process on.
        #[arg(long, env = "PAGECRAWL_PUBLIC_URL")]
        public_url: String,
        /// Webhook path segment.
        #[arg(long, default_value = "pagecrawl")]
        path: String,
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
        /// Persist the webhook id here; held in memory when absent.
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
        #[arg(long, default_value_t = Uuid::nil())]
        workflow_id: Uuid,
    },
    /// Start the REST API server.
    Serve {
        #[command(flatten)]
        credentials: CredentialArgs,
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
        #[arg(long, default_value_t = Uuid::nil())]
        workflow_id: Uuid,
    },
    /// Run pending database migrations.
    Migrate {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Execute {
            credentials,
            input,
            continue_on_fail,
            output_dir,
        } => {
            let mut request = read_request(&input)?;
            request.continue_on_fail |= continue_on_fail;

            let ctx = ExecutionContext::new(Uuid::new_v4(), credentials.client()?);
            let node = PageCrawlNode::with_parameters(request.parameters);
            let executor = ItemExecutor::new(ExecutorConfig {
                continue_on_fail: request.continue_on_fail,
            });
            let result = executor.run(&node, &request.items, &ctx).await?;

            if let Some(dir) = output_dir {
                write_attachments(&dir, &result.items)?;
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Command::Lookup {
            credentials,
            kind,
            filter,
        } => {
            let http = credentials.client()?;
            let results = pagecrawl::search(http.as_ref(), kind, filter.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }

        Command::Frequencies { credentials } => {
            let http = credentials.client()?;
            let offered = pagecrawl::frequencies(http.as_ref()).await;
            println!("{}", serde_json::to_string_pretty(&offered)?);
        }

        Command::TestCredentials { credentials } => {
            let http = credentials.client()?;
            let user = pagecrawl::test_credentials(http.as_ref())
                .await
                .context("credential test failed")?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }

        Command::Listen {
            credentials,
            config,
            public_url,
            path,
            bind,
            database_url,
            workflow_id,
        } => {
            let config = match config {
                Some(file) => serde_json::from_str::<TriggerConfig>(&read_file(&file)?)
                    .with_context(|| format!("invalid trigger config {}", file.display()))?,
                None => TriggerConfig::default(),
            };
            let http = credentials.client()?;
            let store = static_data_store(database_url.as_deref(), workflow_id).await?;
            let webhook_url = format!("{}/webhook/{}", public_url.trim_end_matches('/'), path);
            let trigger = Arc::new(PageCrawlTrigger::new(config, webhook_url, http.clone(), store)?);

            listen(trigger, http, workflow_id, &path, &bind).await?;
        }

        Command::Serve {
            credentials,
            bind,
            workflow_id,
        } => {
            info!("Starting API server on {bind}");
            let state = AppState::new(credentials.client()?, workflow_id);
            api::serve(&bind, state, shutdown_signal()).await?;
        }

        Command::Migrate { database_url } => {
            info!("Running migrations");
            let pool = db::create_pool(&database_url, 2).await?;
            db::run_migrations(&pool).await?;
            info!("Migrations applied successfully");
        }
    }

    Ok(())
}

/// Serve the webhook ingress and keep the registration alive until Ctrl-C.
///
/// The listener is bound before the webhook is registered, and the webhook is
/// removed whenever the loop ends, including when the server stops on its own.
async fn listen(
    trigger: Arc<PageCrawlTrigger>,
    http: Arc<ReqwestClient>,
    workflow_id: Uuid,
    path: &str,
    bind: &str,
) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("cannot bind webhook ingress on {bind}"))?;

    let (tx, mut rx) = mpsc::channel::<Vec<Item>>(64);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let state = AppState::new(http, workflow_id)
        .with_trigger(path, trigger.clone())
        .with_deliveries(tx);
    let mut server = tokio::spawn(api::serve_listener(listener, state, async move {
        let _ = stop_rx.await;
    }));

    let config = trigger.config();
    if trigger.check_exists().await {
        info!(webhook_url = %trigger.webhook_url(), "webhook already registered");
    } else {
        let id = trigger.create().await?;
        info!(
            webhook_id = %id,
            webhook_url = %trigger.webhook_url(),
            simplify = config.simplify_output,
            events = ?config.events,
            "listening for deliveries"
        );
    }

    let stopped_early = loop {
        tokio::select! {
            Some(items) = rx.recv() => {
                for item in items {
                    println!("{}", serde_json::to_string(&item.json)?);
                }
            }
            joined = &mut server => break Some(joined),
            _ = shutdown_signal() => break None,
        }
    };

    info!("removing webhook");
    let deleted = trigger.delete().await;
    match stopped_early {
        Some(joined) => {
            joined??;
            warn!("webhook ingress stopped unexpectedly");
        }
        None => {
            let _ = stop_tx.send(());
            server.await??;
        }
    }
    deleted?;
    Ok(())
}

async fn static_data_store(
    database_url: Option<&str>,
    workflow_id: Uuid,
) -> Result<Arc<dyn StaticDataStore>> {
    match database_url {
        Some(url) => {
            let pool = db::create_pool(url, 2).await?;
            db::run_migrations(&pool).await?;
            Ok(Arc::new(db::PgStaticDataStore::new(
                pool,
                workflow_id,
                TRIGGER_NODE_NAME,
            )))
        }
        None => {
            warn!("no DATABASE_URL, webhook id is kept in memory only");
            Ok(Arc::new(MemoryStaticData::new()))
        }
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("cannot read file {}", path.display()))
}

fn read_request(path: &Path) -> Result<ExecutionRequest> {
    let raw: Value = serde_json::from_str(&read_file(path)?)
        .with_context(|| format!("invalid JSON in {}", path.display()))?;
    let request = match raw {
        Value::Array(values) => ExecutionRequest {
            items: values.into_iter().map(Item::new).collect(),
            ..ExecutionRequest::default()
        },
        other => serde_json::from_value(other).context("invalid execution request")?,
    };
    Ok(request)
}

fn write_attachments(dir: &Path, items: &[Item]) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    for binary in items.iter().filter_map(|item| item.binary.as_ref()) {
        let target = dir.join(&binary.file_name);
        std::fs::write(&target, &binary.data)
            .with_context(|| format!("cannot write {}", target.display()))?;
        info!(file = %target.display(), bytes = binary.data.len(), "attachment written");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
