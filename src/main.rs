use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use serenity::Client;
use tokio::net::TcpListener;
use tokio::signal;

use discord_relay::config::Config;
use discord_relay::gateway::discord::{describe_start_error, DiscordGateway};
use discord_relay::gateway::events::{self, LifecycleEvent};
use discord_relay::gateway::handler::{RelayHandler, ShardManagerKey};
use discord_relay::readiness::SessionTracker;
use discord_relay::state::AppState;

#[derive(Parser)]
#[command(version, about = "Relay HTTP requests into Discord channels")]
struct Args {
    /// Listen port, overrides PORT.
    #[arg(long)]
    port: Option<u16>,
    /// Bind address, overrides RELAY_BIND_ADDR.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "discord_relay=debug,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("configuration error: {e}");
            std::process::exit(1);
        }
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    // Panics outside the request path are logged; the listener stays up.
    std::panic::set_hook(Box::new(|info| {
        tracing::error!("panic: {info}");
    }));

    print_banner(&config);
    run(config).await;
}

fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");

    eprintln!();
    eprintln!("  \x1b[1;36mdiscord-relay\x1b[0m \x1b[2mv{version}\x1b[0m");
    eprintln!();
    eprintln!("  \x1b[2mbind\x1b[0m         {}", config.bind_addr);
    eprintln!("  \x1b[2mport\x1b[0m         {}", config.port);
    eprintln!(
        "  \x1b[2mtimeout\x1b[0m      {}s",
        config.dispatch_timeout.as_secs()
    );
    eprintln!(
        "  \x1b[2msend limit\x1b[0m   {}/{}s",
        config.send_rate_limit.capacity, config.send_rate_limit.window_secs
    );
    eprintln!();
}

async fn run(config: Config) {
    let (events_tx, events_rx) = events::channel();
    let tracker = Arc::new(SessionTracker::new());
    tokio::spawn(tracker.clone().run(events_rx));

    let handler = RelayHandler::new(
        events_tx.clone(),
        config.presence_activity.clone(),
        config.ping_command,
    );
    let mut client = match Client::builder(&config.token, RelayHandler::intents())
        .event_handler(handler)
        .await
    {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("failed to build discord client: {e}");
            std::process::exit(1);
        }
    };

    let gateway = Arc::new(DiscordGateway::new(
        client.http.clone(),
        client.cache.clone(),
        client.shard_manager.clone(),
    ));
    let shard_manager = client.shard_manager.clone();
    client
        .data
        .write()
        .await
        .insert::<ShardManagerKey>(shard_manager.clone());

    // Reconnects are handled inside serenity; this only returns once every
    // shard has given up.
    tokio::spawn(async move {
        let _ = events_tx.send(LifecycleEvent::LoginAttempted);
        let _ = events_tx.send(LifecycleEvent::Connecting);
        if let Err(e) = client.start().await {
            let _ = events_tx.send(LifecycleEvent::FatalError(describe_start_error(&e)));
        }
        let _ = events_tx.send(LifecycleEvent::SessionDropped);
    });

    let state = AppState::new(
        gateway,
        tracker,
        config.dispatch_timeout,
        config.api_rate_limit,
        config.send_rate_limit,
        config.token.len(),
    );
    let app = discord_relay::routes::router(state);

    let listener = match TcpListener::bind((config.bind_addr.as_str(), config.port)).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("failed to bind {}:{}: {e}", config.bind_addr, config.port);
            std::process::exit(1);
        }
    };
    if let Ok(addr) = listener.local_addr() {
        eprintln!("  \x1b[32m→ listening on {addr}\x1b[0m");
        eprintln!();
    }

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    {
        tracing::error!("server error: {e}");
    }

    tracing::info!("shutting down discord gateway");
    shard_manager.shutdown_all().await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
