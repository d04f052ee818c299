use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use threadcat_config::{Config, init_tracing};
use threadcat_core::JsonStore;
use threadcat_core::links::{parse_private_link, parse_public_handle};
use threadcat_core::query::{QueryEngine, ReviewSort, Scope, activity_review};
use threadcat_core::{Registration, message_link};
use tracing::{debug, info};

mod table;

#[derive(Parser)]
#[command(name = "threadcatctl", about = "Inspect a threadcat catalog offline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List tracked chats with their cursors and record counts
    Chats,
    /// Start tracking a chat from a private t.me/c/ link
    Register { link: String },
    /// Count records filed under a taxonomy major (and optional minor)
    Count {
        #[arg(long, value_enum, default_value = "all")]
        scope: ScopeArg,
        major: String,
        minor: Option<String>,
    },
    /// Draw a random sample of media groups
    Sample {
        #[arg(long, value_enum, default_value = "all")]
        scope: ScopeArg,
        major: String,
        /// Minors to draw from; all of the major when omitted
        minors: Vec<String>,
        #[arg(short = 'n', long)]
        size: Option<usize>,
    },
    /// Per-chat topic activity table
    Review {
        #[arg(long, value_enum, default_value = "latest")]
        sort: SortArg,
    },
    /// Print the tag taxonomy
    Taxonomy,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ScopeArg {
    All,
    Favorites,
}

impl From<ScopeArg> for Scope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::All => Scope::All,
            ScopeArg::Favorites => Scope::Favorites,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SortArg {
    Latest,
    Count,
}

impl From<SortArg> for ReviewSort {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Latest => ReviewSort::Latest,
            SortArg::Count => ReviewSort::Count,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let load = Config::load()?;
    debug!(source = ?load.source, env_file = load.env_file_loaded, "configuration loaded");
    let config = load.config;
    let store = Arc::new(JsonStore::new(config.storage.paths()));

    match cli.command {
        Command::Chats => list_chats(&store).await,
        Command::Register { link } => register(&store, &link).await,
        Command::Count {
            scope,
            major,
            minor,
        } => {
            let engine = QueryEngine::new(store, config.query);
            let count = engine
                .count(scope.into(), &major, minor.as_deref())
                .await;
            match minor {
                Some(minor) => println!("{major}/{minor}: {count}"),
                None => println!("{major}: {count}"),
            }
            Ok(())
        }
        Command::Sample {
            scope,
            major,
            minors,
            size,
        } => {
            let engine = QueryEngine::new(store, config.query);
            let candidates = engine.candidates(scope.into(), &major, &minors).await;
            if candidates.is_empty() {
                println!("No media under {major} ({}).", Scope::from(scope).as_str());
                return Ok(());
            }
            for group in engine.sample(&candidates, size) {
                for record in &group.records {
                    println!(
                        "{} [{}] {} {}",
                        record.chat_title,
                        record.topic_name,
                        record.kind.as_str(),
                        message_link(record)
                    );
                }
            }
            Ok(())
        }
        Command::Review { sort } => {
            let status = store.status_table().await;
            let catalog = store.catalog().await;
            let review = activity_review(&status, &catalog, sort.into());
            println!("{}", table::render_review(&review));
            Ok(())
        }
        Command::Taxonomy => {
            let taxonomy = store.taxonomy().await;
            if taxonomy.is_empty() {
                println!("Taxonomy is empty.");
            }
            for major in taxonomy.majors() {
                println!("{major}");
                for minor in taxonomy.minors(major) {
                    let topics = taxonomy.keys_for(major, Some(minor)).len();
                    println!("  {minor} ({topics} topics)");
                }
            }
            Ok(())
        }
    }
}

async fn list_chats(store: &JsonStore) -> Result<()> {
    let status = store.status_table().await;
    if status.is_empty() {
        println!("No chats tracked.");
        return Ok(());
    }
    let counts = store.record_counts().await;
    for (chat_id, entry) in &status {
        println!(
            "{chat_id}  {}  cursor={}  topics={}  records={}",
            entry.title,
            entry.last_id,
            entry.topic_map.len(),
            counts.get(chat_id).copied().unwrap_or(0)
        );
    }
    Ok(())
}

async fn register(store: &JsonStore, link: &str) -> Result<()> {
    let Some(chat) = parse_private_link(link) else {
        if let Some(handle) = parse_public_handle(link) {
            bail!("@{handle} is a public handle and needs a live connection to resolve");
        }
        bail!("not a chat link: {link}");
    };

    match store.register_chat(chat.chat_id, &chat.title).await? {
        Registration::Registered => {
            info!(chat_id = %chat.chat_id, "chat registered");
            println!("Tracking {} as \"{}\".", chat.chat_id, chat.title);
        }
        Registration::AlreadyTracked(title) => {
            println!("{} is already tracked as \"{title}\".", chat.chat_id);
        }
    }
    Ok(())
}
