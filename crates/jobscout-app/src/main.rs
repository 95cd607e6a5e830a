//! jobscout binary - composition root.
//!
//! Ties the workspace crates into a single executable:
//! 1. Load configuration from TOML
//! 2. Open the SQLite database
//! 3. Build the listings and completion HTTP clients
//! 4. Warm up the area index (soft failure keeps the legacy fallback)
//! 5. Drive the chat engine from a stdin read loop
//!
//! The read loop is a stand-in delivery surface: it hands free text and
//! commands to the engine and renders the structured replies as plain
//! text.

mod cli;
mod render;

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use jobscout_areas::AreaIndex;
use jobscout_chat::{ChatEngine, Reply};
use jobscout_core::JobscoutConfig;
use jobscout_listings::{ListingsClient, VacancySource};
use jobscout_llm::{CompletionBackend, CompletionClient, CompletionService};
use jobscout_storage::{Database, FavoriteAdd};

use cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config first; the log level may come from it.
    let config_path = args.resolve_config_path();
    let config = JobscoutConfig::load_or_default(&config_path);

    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    tracing::info!("Starting jobscout v{}", env!("CARGO_PKG_VERSION"));

    // Storage.
    let data_dir = args.resolve_data_dir(&config.general.data_dir);
    std::fs::create_dir_all(&data_dir)?;
    let db_path = data_dir.join("jobscout.db");
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    // HTTP clients, built once and shared for the process lifetime.
    let listings: Arc<dyn VacancySource> = Arc::new(ListingsClient::new(&config.listings)?);

    let completions = if config.llm.is_configured() {
        let client = CompletionClient::new(&config.llm)?;
        tracing::info!(model = %config.llm.model, "Completion service configured");
        Some(CompletionService::new(
            Arc::new(client) as Arc<dyn CompletionBackend>
        ))
    } else {
        tracing::warn!("No completion API keys configured, running on local fallbacks");
        None
    };

    // Area index: a failed load keeps the legacy table as the fallback.
    let areas = Arc::new(AreaIndex::new());
    match areas.load(listings.as_ref()).await {
        Ok(count) => tracing::info!(places = count, "Area index ready"),
        Err(e) => tracing::warn!(error = %e, "Area index unavailable, using legacy fallback"),
    }

    let engine = ChatEngine::new(&config, listings, completions, areas, db);
    engine.register_user(args.user_id, None, None, None)?;

    run_repl(&engine, args.user_id).await?;

    tracing::info!("Shutting down");
    Ok(())
}

/// Line-based delivery surface over stdin/stdout.
async fn run_repl(engine: &ChatEngine, user_id: i64) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all("jobscout готов. Напишите запрос (или /help).\n> ".as_bytes())
        .await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            continue;
        }
        if input == "/quit" || input == "/exit" {
            break;
        }

        let output = dispatch(engine, user_id, input).await;
        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;
    }
    Ok(())
}

/// Route one input line to the engine and render the outcome.
async fn dispatch(engine: &ChatEngine, user_id: i64, input: &str) -> String {
    let reply = match engine.handle_message(user_id, input).await {
        // Commands come back as Bypass; dispatch them here, the way a
        // chat framework would route its own command handlers.
        Ok(Reply::Bypass) => run_command(engine, user_id, input).await,
        other => other,
    };

    match reply {
        Ok(reply) => render::reply(&reply),
        Err(e) => {
            tracing::error!(user_id, input, error = %e, "Interaction failed");
            e.user_message().to_string()
        }
    }
}

async fn run_command(
    engine: &ChatEngine,
    user_id: i64,
    input: &str,
) -> Result<Reply, jobscout_chat::ChatError> {
    let (command, rest) = match input.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (input, ""),
    };

    match command {
        "/search" if !rest.is_empty() => engine.search(user_id, rest).await,
        "/search" => Ok(Reply::text(
            "Укажите запрос: /search Python junior Москва 150000",
        )),
        "/page" => match rest.parse::<usize>() {
            Ok(n) if n > 0 => engine.show_page(user_id, n - 1),
            _ => Ok(Reply::text("Укажите номер страницы: /page 2")),
        },
        "/next" => engine.next_page(user_id),
        "/prev" => engine.prev_page(user_id),
        "/best" => Ok(Reply::Ranked(engine.best_vacancies(user_id, 3).await?)),
        "/worst" => Ok(Reply::Ranked(engine.worst_vacancies(user_id, 3).await?)),
        "/fav" if !rest.is_empty() => {
            let added = engine.add_favorite(user_id, rest).await?;
            Ok(Reply::text(match added {
                FavoriteAdd::Added => "⭐ Вакансия добавлена в избранное!",
                FavoriteAdd::AlreadyPresent => "Вакансия уже в избранном.",
            }))
        }
        "/unfav" if !rest.is_empty() => {
            let removed = engine.remove_favorite(user_id, rest)?;
            Ok(Reply::text(if removed {
                "Вакансия удалена из избранного."
            } else {
                "Такой вакансии нет в избранном."
            }))
        }
        "/favorites" => engine.favorites(user_id),
        "/stats" => engine.stats(user_id),
        "/help" | "/start" => Ok(Reply::text(format!(
            "Я помогаю искать вакансии. Просто напишите запрос в свободной форме.\n\n{}\n\n\
             Команды: /search, /page N, /next, /prev, /best, /worst, /fav ID, /unfav ID, \
             /favorites, /stats, /quit",
            engine.capabilities()
        ))),
        _ => Ok(Reply::text("Неизвестная команда. Попробуйте /help.")),
    }
}
