//! chatprobe CLI entry point.

mod args;
mod driver;

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::{error, info, warn};

use chatprobe_core::{
    actions, DomAccessor, Event, EventPayload, LocatorTable, MonitorConfig, Query, SessionMonitor,
};

use crate::args::{Cli, Commands, SessionArgs, WatchArgs};
use crate::driver::{ConnectOptions, WebDriverDom};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    // Examples needs no browser
    if let Commands::Examples = cli.command {
        print!("{}", args::EXAMPLES_TEXT);
        return;
    }

    if let Err(e) = run(cli).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Watch(watch_args) => watch(watch_args).await,
        Commands::Search(search_args) => {
            let monitor = connect_session(&search_args.session, MonitorConfig::default(), true)
                .await?;
            let outcome = monitor.search(&search_args.query).await;
            monitor.close().await?;
            print_json(&outcome?)
        }
        Commands::Messages(messages_args) => {
            let monitor = connect_session(&messages_args.session, MonitorConfig::default(), true)
                .await?;
            let outcome = monitor.recent_messages(&messages_args.chat).await;
            monitor.close().await?;
            print_json(&outcome?)
        }
        Commands::Send(send_args) => {
            let monitor = connect_session(&send_args.session, MonitorConfig::default(), true)
                .await?;
            let outcome = monitor.send_message(&send_args.chat, &send_args.text).await;
            monitor.close().await?;
            outcome?;
            print_json(&json!({ "chat": send_args.chat, "sent": true }))
        }
        Commands::Examples => unreachable!("handled in main"),
    }
}

/// Watch the session, printing one JSON line per event until Ctrl-C.
async fn watch(watch_args: WatchArgs) -> Result<()> {
    let config = MonitorConfig {
        poll_interval: Duration::from_millis(watch_args.poll_interval_ms),
        ..MonitorConfig::default()
    };
    let mut monitor = connect_session(&watch_args.session, config, false).await?;

    for event in [
        Event::Start,
        Event::Auth,
        Event::Qr,
        Event::QrChange,
        Event::Loading,
        Event::LoggedIn,
        Event::UnreadChat,
    ] {
        let qr_out = watch_args.qr_out.clone();
        monitor.on(event, move |payload| report(event, payload, qr_out.as_deref()));
    }

    let handle = monitor.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping after this tick");
            handle.stop();
        }
    });

    monitor.run().await?;
    Ok(())
}

/// Print one event as a JSON line, exporting QR bytes to a file when
/// configured.
fn report(event: Event, payload: &EventPayload, qr_out: Option<&str>) {
    let line = match payload {
        EventPayload::None => json!({ "event": event.name() }),
        EventPayload::Qr(qr) => {
            if let Some(path) = qr_out {
                if let Err(e) = std::fs::write(path, qr.as_bytes()) {
                    warn!(path, error = %e, "failed to write QR image");
                }
            }
            json!({ "event": event.name(), "qr_bytes": qr.as_bytes().len() })
        }
        EventPayload::Loading(still_loading) => {
            json!({ "event": event.name(), "still_loading": still_loading })
        }
        EventPayload::UnreadChat(chat) => json!({ "event": event.name(), "chat": chat }),
    };
    println!("{line}");
}

/// Connect a browser session, apply locator overrides, and optionally
/// require the page to already be logged in.
async fn connect_session(
    session: &SessionArgs,
    config: MonitorConfig,
    require_login: bool,
) -> Result<SessionMonitor<WebDriverDom>> {
    let dom = driver::connect(&ConnectOptions {
        webdriver: session.webdriver.clone(),
        page: session.page.clone(),
        headed: session.headed,
    })
    .await?;

    let locators = load_locators(session.locators.as_deref())?;

    if require_login {
        if let Err(e) = actions::wait_for(&dom, &locators.logged_in, config.wait_timeout).await {
            let _ = dom.close().await;
            return Err(e).context("session is not logged in (run `chatprobe watch` to pair)");
        }
    }

    Ok(SessionMonitor::with_config(dom, locators, config))
}

/// Default locators, with overrides from a JSON file when given.
fn load_locators(path: Option<&str>) -> Result<LocatorTable> {
    let mut locators = LocatorTable::default();
    if let Some(path) = path {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading locator overrides from {path}"))?;
        let overrides: HashMap<String, Query> =
            serde_json::from_str(&raw).with_context(|| format!("parsing {path}"))?;
        let rejected = locators.apply(overrides);
        if !rejected.is_empty() {
            warn!(names = ?rejected, "ignoring unknown locator overrides");
        }
    }
    Ok(locators)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
