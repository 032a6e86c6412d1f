use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{ClientEvent, HttpOrderApi, NoticeLevel, OrdersSession};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::SortArg;

#[derive(Parser, Debug)]
#[command(name = "orders-admin", about = "Administración de órdenes")]
struct Cli {
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    password: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lists one page of orders.
    List {
        #[arg(long)]
        cliente: Option<String>,
        #[arg(long)]
        desde: Option<String>,
        #[arg(long)]
        hasta: Option<String>,
        #[arg(long, value_enum, default_value = "fecha")]
        sort: SortArg,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    Show {
        id: i64,
    },
    /// Registers a new order. Items are given as producto:cantidad:precio.
    Create {
        #[arg(long)]
        cliente: String,
        #[arg(long = "item")]
        items: Vec<String>,
    },
    /// Edits an order. Passing any --item replaces all of its lines.
    Update {
        id: i64,
        #[arg(long)]
        cliente: Option<String>,
        #[arg(long = "item")]
        items: Vec<String>,
    },
    Anular {
        id: i64,
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = config::load_settings().with_overrides(cli.api_url, cli.username, cli.password);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let api = HttpOrderApi::new(&settings.api_base_url)
        .with_context(|| format!("invalid api url {}", settings.api_base_url))?;
    let session = OrdersSession::new(Arc::new(api));
    let mut events = session.subscribe_events();

    let username = settings
        .username
        .context("missing username (--username, ORDERS_USERNAME or admin.toml)")?;
    let password = settings
        .password
        .context("missing password (--password, ORDERS_PASSWORD or admin.toml)")?;
    session.login(&username, &password).await?;
    info!(api_url = %settings.api_base_url, %username, "signed in");

    let result = match cli.command {
        Command::List {
            cliente,
            desde,
            hasta,
            sort,
            page,
        } => commands::list(&session, cliente, desde, hasta, sort, page).await,
        Command::Show { id } => commands::show(&session, id).await,
        Command::Create { cliente, items } => commands::create(&session, cliente, items).await,
        Command::Update { id, cliente, items } => {
            commands::update(&session, id, cliente, items).await
        }
        Command::Anular { id, yes } => commands::anular(&session, id, yes).await,
    };

    print_notices(&mut events);
    session.logout().await;
    result
}

fn print_notices(events: &mut broadcast::Receiver<ClientEvent>) {
    while let Ok(event) = events.try_recv() {
        if let ClientEvent::Notice(notice) = event {
            match notice.level {
                NoticeLevel::Success => eprintln!("{}", notice.message),
                NoticeLevel::Error => eprintln!("error: {}", notice.message),
            }
        }
    }
}
