use std::path::PathBuf;
use std::process::exit;

use clap::{Parser, Subcommand};
use updrop::common::{ConfigStore, UpdropError};
use updrop::history::HistoryStore;
use updrop::services::Service;
use updrop::{ui, upload};

#[derive(Parser)]
#[command(name = "updrop")]
#[command(about = "Upload a file to Pixeldrain, Gofile, or Google Drive")]
struct Cli {
    /// No subcommand drops into the interactive menu.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload one file and print the share link
    Upload {
        #[arg(help = "Path to file to upload")]
        path: PathBuf,

        #[arg(short, long, value_enum, help = "Destination service")]
        service: Service,
    },
    /// Set or clear per-service credentials
    Config,
    /// List recent uploads
    History,
}

#[tokio::main]
async fn main() {
    init_logging();

    let cli = Cli::parse();

    let stores = ConfigStore::open_default().and_then(|config| {
        let history = HistoryStore::open_default()?;
        Ok((config, history))
    });
    let (store, history) = match stores {
        Ok(stores) => stores,
        Err(e) => {
            eprintln!("Error: {e}");
            exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Upload { path, service }) => {
            // fail fast before spinning anything up
            if !path.exists() {
                eprintln!("Error: File not found: {}", path.display());
                exit(1);
            }

            let (cancel, watcher) = upload::cancel_on_ctrl_c();
            let result = upload::run_upload(&path, service, &store, &history, &cancel).await;
            watcher.abort();
            result.map(|_| ())
        }
        Some(Commands::Config) => ui::configure_menu(&store).await,
        Some(Commands::History) => ui::show_history(&history),
        None => ui::main_menu(&store, &history).await,
    };

    match result {
        Ok(()) => {}
        Err(UpdropError::Cancelled) => {
            eprintln!("Upload cancelled.");
            exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            exit(1);
        }
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,updrop=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
