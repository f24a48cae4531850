use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use vm_proto::{Card, Credential, File, Payload, Text, WireItem, WireMeta};
use vm_service::{ItemService, Limits, ServiceConfig};
use vm_store::{SqliteItemStore, Store};

#[derive(Parser, Debug)]
#[command(author, version, about = "Vaultme personal vault", long_about = None)]
struct Cli {
    /// Identity of the vault owner.
    #[arg(long, env = "VAULTME_USER")]
    user: String,

    /// SQLite database file (overrides VAULTME_DATABASE_PATH).
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a free-form note
    AddText {
        #[arg(long)]
        name: String,
        #[arg(long)]
        text: String,
        #[arg(long = "meta", value_parser = parse_meta)]
        meta: Vec<WireMeta>,
    },
    /// Store a login and password
    AddCredential {
        #[arg(long)]
        name: String,
        #[arg(long)]
        login: String,
        #[arg(long)]
        password: String,
        #[arg(long = "meta", value_parser = parse_meta)]
        meta: Vec<WireMeta>,
    },
    /// Store bank card details
    AddCard {
        #[arg(long)]
        name: String,
        #[arg(long)]
        number: String,
        #[arg(long)]
        owner: String,
        /// Expiry date, YYYY-MM-DD
        #[arg(long, value_parser = parse_date)]
        valid_to: DateTime<Utc>,
        #[arg(long = "meta", value_parser = parse_meta)]
        meta: Vec<WireMeta>,
    },
    /// Store the contents of a file
    AddFile {
        path: PathBuf,
        #[arg(long = "meta", value_parser = parse_meta)]
        meta: Vec<WireMeta>,
    },
    /// Print one item
    Get { id: String },
    /// Print a page of items
    List {
        #[arg(long, default_value_t = 0)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Rename an item, keeping its payload and metadata
    Rename { id: String, name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vaultme=info,vm_service=info,vm_store=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ServiceConfig::from_env().context("reading configuration")?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }

    let store = Store::open(&config.database_path, config.max_connections)
        .await
        .with_context(|| format!("opening {}", config.database_path.display()))?;
    let service = ItemService::new(store.items(), Limits::from(&config));

    let result = run(&service, &cli.user, cli.command).await;
    store.close().await;
    result
}

async fn run(service: &ItemService<SqliteItemStore>, user: &str, command: Commands) -> Result<()> {
    match command {
        Commands::AddText { name, text, meta } => {
            create(service, user, name, Text { data: text }.into(), meta).await
        }
        Commands::AddCredential { name, login, password, meta } => {
            create(service, user, name, Credential { login, password }.into(), meta).await
        }
        Commands::AddCard { name, number, owner, valid_to, meta } => {
            let card = Card { number, owner, validity_to: valid_to };
            create(service, user, name, card.into(), meta).await
        }
        Commands::AddFile { path, meta } => {
            let (name, file) = read_file(&path)?;
            create(service, user, name, file.into(), meta).await
        }
        Commands::Get { id } => print_json(&service.get_item(user, &id).await?),
        Commands::List { limit, offset } => {
            print_json(&service.list_items(user, limit, offset).await?)
        }
        Commands::Rename { id, name } => {
            let mut item = service.get_item(user, &id).await?;
            item.name = name;
            item.version += 1;
            let id = service.update_item(user, item).await?;
            print_json(&service.get_item(user, &id).await?)
        }
    }
}

async fn create(
    service: &ItemService<SqliteItemStore>,
    user: &str,
    name: String,
    payload: Payload,
    meta: Vec<WireMeta>,
) -> Result<()> {
    let id = service
        .create_item(user, WireItem::draft(name, payload, meta))
        .await?;
    println!("{id}");
    Ok(())
}

fn read_file(path: &Path) -> Result<(String, File)> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("{} has no usable file name", path.display()))?
        .to_string();
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(&file_name)
        .to_string();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_string();
    Ok((file_name, File { name: stem, extension, data }))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_meta(s: &str) -> Result<WireMeta, String> {
    let (tag, text) = s
        .split_once('=')
        .ok_or_else(|| format!("expected tag=text, got {s:?}"))?;
    if tag.is_empty() {
        return Err("meta tag must not be empty".into());
    }
    Ok(WireMeta { tag: tag.to_string(), text: text.to_string() })
}

fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| e.to_string())?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| format!("invalid date {s:?}"))?;
    Ok(Utc.from_utc_datetime(&midnight))
}
