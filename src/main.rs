use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

use doubtq::DoubtSession;
use doubtq::domain::Doubt;
use doubtq::session::{HistoryFilter, SortOrder};
use doubtq::storage::{DoubtStore, JsonlStorage};

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;

type Session = DoubtSession<DoubtStore<JsonlStorage>>;

fn setup_logging(config: &Config) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("doubtq")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("doubtq.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let filter = config.log_filter(std::env::var("RUST_LOG").ok());

    env_logger::Builder::new()
        .parse_filters(&filter)
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn open_session(config: &Config) -> Result<Session> {
    let storage = JsonlStorage::new(&config.storage.data_dir)
        .context(format!("Failed to open storage at {}", config.storage.data_dir.display()))?;
    let session = DoubtSession::open(DoubtStore::new(storage), config.identity.clone())
        .await
        .context("Failed to load doubts")?;
    Ok(session.with_ranks(config.ranks))
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
        println!("  Data dir: {}", config.storage.data_dir.display());
        println!("  Acting as: {}", config.identity.display_name());
    }

    let mut session = open_session(config).await?;

    match &cli.command {
        Commands::Ask {
            title,
            description,
            priority,
        } => handle_ask_command(&mut session, title, description, *priority).await,
        Commands::Next => handle_next_command(&session),
        Commands::Resolve { id, answer } => handle_resolve_command(&mut session, id, answer).await,
        Commands::Queue => handle_queue_command(&session),
        Commands::Stats => handle_stats_command(&session),
        Commands::History { filter, order } => handle_history_command(&session, filter, order),
    }
}

fn tier_label(doubt: &Doubt) -> ColoredString {
    if doubt.is_priority {
        "[priority]".red().bold()
    } else {
        "[general]".blue()
    }
}

fn print_doubt(doubt: &Doubt) {
    println!("{} {} {}", tier_label(doubt), doubt.id.dimmed(), doubt.title.bold());
    if !doubt.description.is_empty() {
        println!("    {}", doubt.description);
    }
    if let Some(name) = doubt.student_name.as_deref().or(doubt.student_id.as_deref()) {
        println!("    asked by {}", name);
    }
    if let Some(answer) = &doubt.answer {
        println!("    {} {}", "answer:".green(), answer);
    }
}

async fn handle_ask_command(session: &mut Session, title: &str, description: &str, priority: bool) -> Result<()> {
    info!("Submitting doubt: {} (priority: {})", title, priority);
    let doubt = session
        .submit(title, description, priority)
        .await
        .context("Failed to submit doubt")?;

    println!("{} {}", "Submitted:".green(), doubt.id);
    if let Some(position) = session.scheduler().position_of(&doubt.id) {
        println!("  Position in queue: {}", position);
    }
    Ok(())
}

fn handle_next_command(session: &Session) -> Result<()> {
    match session.next() {
        Some(doubt) => print_doubt(doubt),
        None => println!("{}", "Queue empty".cyan()),
    }
    Ok(())
}

async fn handle_resolve_command(session: &mut Session, id: &str, answer: &str) -> Result<()> {
    info!("Resolving doubt: {}", id);
    let doubt = session
        .resolve(id, answer)
        .await
        .context(format!("Failed to resolve {}", id))?;

    println!("{} {}", "Resolved:".green(), doubt.id);
    match session.next() {
        Some(next) => println!("  Next up: {} {}", next.id, next.title),
        None => println!("  {}", "Queue empty".cyan()),
    }
    Ok(())
}

fn handle_queue_command(session: &Session) -> Result<()> {
    let priority = session.priority_queue_with_rank();
    let general = session.general_queue();

    println!("{} ({})", "Priority queue".red().bold(), priority.len());
    for (index, entry) in priority.iter().enumerate() {
        println!("  {:>3}. [rank {}] {} {}", index + 1, entry.priority, entry.item.id.dimmed(), entry.item.title);
    }

    println!("{} ({})", "General queue".blue().bold(), general.len());
    for (index, doubt) in general.iter().enumerate() {
        println!("  {:>3}. {} {}", priority.len() + index + 1, doubt.id.dimmed(), doubt.title);
    }
    Ok(())
}

fn handle_stats_command(session: &Session) -> Result<()> {
    let stats = session.stats();
    println!("{}", "Doubt statistics".bold());
    println!("  Total:     {}", stats.total);
    println!(
        "  Pending:   {} ({} priority, {} general)",
        stats.pending, stats.priority_pending, stats.general_pending
    );
    println!("  Answered:  {}", stats.answered);
    println!("  Resolved:  {}%", stats.resolution_rate());
    Ok(())
}

fn handle_history_command(session: &Session, filter: &str, order: &str) -> Result<()> {
    let filter: HistoryFilter = filter.parse()?;
    let order: SortOrder = order.parse()?;
    info!("Listing history - filter: {:?}, order: {:?}", filter, order);

    let doubts = session.history(filter, order);
    if doubts.is_empty() {
        println!("{}", "No doubts".cyan());
    }
    for doubt in doubts {
        print_doubt(doubt);
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
