use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

use models::{Category, RatingChange};
use service::registry::{BusinessRegistry, Persistence};
use service::{App, RegistryEvent};

#[derive(Debug, Parser)]
#[command(name = "namerator", version, about = "Shared business-name list backed by a GitHub repository")]
struct Cli {
    /// TOML config file; missing file means defaults plus environment.
    #[arg(long, env = "CONFIG_PATH", default_value = configs::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Emit JSON logs on stdout instead of compact logs on stderr.
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show every business with its ratings.
    List {
        /// Print the raw snapshot JSON.
        #[arg(long)]
        json: bool,
    },
    /// Add a business name.
    Add {
        name: String,
        #[arg(long, short, value_parser = parse_category, default_value = "punny")]
        category: Category,
    },
    /// Rate a business 1-5; the same rating again removes it.
    Rate { id: String, stars: u8 },
    /// Delete a business you added.
    Delete { id: String },
    /// Remove every business.
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Claim records that have no author or timestamp.
    FixLegacy,
    /// Reload from the shared repository, dropping unsaved local changes.
    Refresh,
    /// Keep syncing until Ctrl+C, printing changes as they arrive.
    Watch {
        /// Serve /healthz and /metrics on this address.
        #[arg(long)]
        admin_addr: Option<String>,
    },
    /// Print this device's user id.
    Whoami,
    /// Store a token for `auth.mode = "oauth"`.
    SignIn { token: String },
    SignOut,
}

fn parse_category(raw: &str) -> Result<Category, String> {
    raw.parse::<Category>().map_err(|e| e.to_string())
}

fn init_logging(json: bool) {
    // 提前加载 .env，使得 RUST_LOG / NAMERATOR_* 生效
    dotenv().ok();
    if json {
        common::utils::logging::init_logging_json();
    } else {
        common::utils::logging::init_logging_default();
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let run_id = Uuid::new_v4();
    std::panic::set_hook(Box::new(move |info| {
        error!(event = "panic", %run_id, message = %info, "unhandled panic occurred");
    }));

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(cli)) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    std::env::set_var("CONFIG_PATH", &cli.config);
    let config = configs::AppConfig::load_and_validate().context("loading configuration")?;
    common::env::ensure_data_dir(&config.cache.path).await?;
    let app = App::bootstrap(config).await?;
    info!(event = "start", user_id = %app.user_id, version = env!("CARGO_PKG_VERSION"), "namerator ready");

    match cli.command {
        Command::Whoami => {
            println!("{}", app.user_id);
            return Ok(());
        }
        Command::SignIn { token } => {
            let session = oauth_session(&app)?;
            session.sign_in(&token).await?;
            println!("Signed in.");
            return Ok(());
        }
        Command::SignOut => {
            let session = oauth_session(&app)?;
            if session.sign_out().await? {
                println!("Signed out.");
            } else {
                println!("Not signed in.");
            }
            return Ok(());
        }
        Command::Watch { admin_addr } => return watch(&app, admin_addr).await,
        _ => {}
    }

    let registry = &app.registry;
    let mut events = registry.subscribe();
    registry.load().await;
    print_notices(&mut events);

    match cli.command {
        Command::List { json } => {
            if json {
                println!("{}", registry.snapshot().await.to_json_pretty()?);
            } else {
                print_list(&app).await;
            }
        }
        Command::Add { name, category } => {
            let applied = registry.create(&name, category, &app.user_id).await?;
            println!("Added {} ({})", applied.value.name, short_id(&applied.value.id.to_string()));
            report(&applied.persistence);
        }
        Command::Rate { id, stars } => {
            let id = registry.resolve(&id).await?;
            let applied = registry.rate(id, &app.user_id, stars).await?;
            match applied.value {
                Some(RatingChange::Set(r)) => println!("Rated {} {}", r, r.emoji()),
                Some(RatingChange::Replaced { previous, current }) => {
                    println!("Changed rating {previous} -> {current} {}", current.emoji())
                }
                Some(RatingChange::Removed(r)) => println!("Removed your rating of {r}"),
                None => println!("No such business."),
            }
            report(&applied.persistence);
        }
        Command::Delete { id } => {
            let id = registry.resolve(&id).await?;
            let applied = registry.delete(id, &app.user_id).await?;
            if applied.value {
                println!("Deleted.");
            } else {
                println!("Only the author can delete this business.");
            }
            report(&applied.persistence);
        }
        Command::Clear { yes } => {
            if !yes {
                return Err(anyhow!("refusing to remove every business without --yes"));
            }
            let applied = registry.clear_all().await?;
            println!("Removed {} businesses.", applied.value);
            report(&applied.persistence);
        }
        Command::FixLegacy => {
            let applied = registry.fix_legacy(&app.user_id).await?;
            report(&applied.persistence);
        }
        Command::Refresh => {
            registry.refresh().await;
            print_list(&app).await;
        }
        Command::Whoami | Command::SignIn { .. } | Command::SignOut | Command::Watch { .. } => {}
    }

    print_notices(&mut events);
    Ok(())
}

fn oauth_session(app: &App) -> anyhow::Result<Arc<service::credentials::OAuthSession>> {
    app.oauth
        .clone()
        .ok_or_else(|| anyhow!("sign-in needs auth.mode = \"oauth\" in the config file"))
}

async fn watch(app: &App, admin_addr: Option<String>) -> anyhow::Result<()> {
    let registry: Arc<BusinessRegistry> = app.registry.clone();
    let mut events = registry.subscribe();
    registry.load().await;
    print_list(app).await;

    let admin = admin_addr.map(|addr| {
        tokio::spawn(async move {
            if let Err(e) = common::admin_http::serve_admin(&addr, service::observability::encode_metrics).await {
                error!(event = "admin_failed", error = %e, "admin server stopped");
            }
        })
    });

    let sync = app.start_sync();
    info!(event = "watch", interval_secs = app.config.sync.interval_secs, "watching for changes");

    loop {
        tokio::select! {
            ev = events.recv() => match ev {
                Ok(RegistryEvent::Notice(notice)) => {
                    print_notice(&notice);
                    if notice == service::Notice::NewDataAvailable {
                        print_list(app).await;
                    }
                }
                Ok(RegistryEvent::Render) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => warn!(skipped = n, "event receiver lagged"),
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!(event = "shutdown_signal", "received Ctrl+C, shutting down");
                break;
            }
        }
    }

    sync.stop().await;
    if let Some(admin) = admin {
        admin.abort();
    }
    Ok(())
}

async fn print_list(app: &App) {
    let registry = &app.registry;
    let records = registry.records().await;
    if records.is_empty() {
        println!("No businesses yet. Add one with `namerator add`.");
    }
    for record in &records {
        let mine = if record.is_author(&app.user_id) { " *" } else { "" };
        let yours = record
            .rating_of(&app.user_id)
            .map(|r| format!("  you: {} {}", r, r.emoji()))
            .unwrap_or_default();
        println!(
            "{}  {:<32} [{}]  {}{}{}",
            short_id(&record.id.to_string()),
            record.name,
            record.category,
            record.rating_summary(),
            yours,
            mine
        );
    }
    println!("-- {} businesses, storage used: {}", records.len(), registry.storage_usage().await);
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn report(persistence: &Persistence) {
    if let Persistence::Saved(version) = persistence {
        info!(%version, "saved to shared repository");
    }
}

fn print_notices(events: &mut broadcast::Receiver<RegistryEvent>) {
    while let Ok(ev) = events.try_recv() {
        if let RegistryEvent::Notice(notice) = ev {
            print_notice(&notice);
        }
    }
}

fn print_notice(notice: &service::Notice) {
    if notice.is_error() {
        eprintln!("! {notice}");
    } else {
        eprintln!("* {notice}");
    }
}
