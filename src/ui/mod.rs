//! Interactive shell: keyboard-driven menus for uploading, credential
//! setup, and history browsing. Thin glue over `dialoguer`; all real
//! work happens in the upload engine and service adapters.

use std::path::PathBuf;

use console::style;
use dialoguer::{Confirm, Input, Password, Select};
use indicatif::HumanBytes;

use crate::common::config::ConfigStore;
use crate::common::errors::{Result, UpdropError};
use crate::history::HistoryStore;
use crate::services::{self, Service};
use crate::upload;

/// Top-level menu loop. Runs until the user picks Quit.
pub async fn main_menu(store: &ConfigStore, history: &HistoryStore) -> Result<()> {
    loop {
        let items = [
            "Upload a file",
            "Configure services",
            "Upload history",
            "Quit",
        ];
        let selection = Select::new()
            .with_prompt("updrop")
            .items(&items)
            .default(0)
            .interact()
            .map_err(anyhow::Error::from)?;

        match selection {
            0 => upload_flow(store, history).await?,
            1 => configure_menu(store).await?,
            2 => history_menu(history)?,
            _ => break,
        }
    }
    Ok(())
}

/// Prompt for a path and destination, then run one upload. Upload
/// errors are reported here and do not kill the menu loop.
async fn upload_flow(store: &ConfigStore, history: &HistoryStore) -> Result<()> {
    let path: String = Input::new()
        .with_prompt("File path")
        .interact_text()
        .map_err(anyhow::Error::from)?;
    let path = PathBuf::from(path.trim());

    let labels: Vec<String> = Service::ALL.iter().map(ToString::to_string).collect();
    let selection = Select::new()
        .with_prompt("Destination")
        .items(&labels)
        .default(0)
        .interact()
        .map_err(anyhow::Error::from)?;
    let service = Service::ALL[selection];

    // fresh token per upload so a cancelled one doesn't poison the next
    let (cancel, watcher) = upload::cancel_on_ctrl_c();
    let result = upload::run_upload(&path, service, store, history, &cancel).await;
    watcher.abort();

    match result {
        Ok(_) => {}
        Err(UpdropError::Cancelled) => println!("Upload cancelled."),
        Err(e) => println!("{} {e}", style("Upload failed:").red().bold()),
    }
    Ok(())
}

/// Per-service credential setup.
pub async fn configure_menu(store: &ConfigStore) -> Result<()> {
    loop {
        let config = store.load()?;
        let items = [
            format!("Pixeldrain ({})", status(config.pixeldrain.api_key.is_some())),
            format!("Gofile ({})", status(config.gofile.api_token.is_some())),
            format!(
                "Google Drive ({})",
                status(config.google_drive.refresh_token.is_some())
            ),
            "Back".to_string(),
        ];
        let selection = Select::new()
            .with_prompt("Configure")
            .items(&items)
            .default(0)
            .interact()
            .map_err(anyhow::Error::from)?;

        match selection {
            0 => configure_pixeldrain(store)?,
            1 => configure_gofile(store)?,
            2 => configure_gdrive(store).await?,
            _ => break,
        }
    }
    Ok(())
}

fn status(configured: bool) -> console::StyledObject<&'static str> {
    if configured {
        style("configured").green()
    } else {
        style("not set").dim()
    }
}

fn configure_pixeldrain(store: &ConfigStore) -> Result<()> {
    let key: String = Password::new()
        .with_prompt("Pixeldrain API key (empty to clear)")
        .allow_empty_password(true)
        .interact()
        .map_err(anyhow::Error::from)?;

    store.update(|c| {
        c.pixeldrain.api_key = if key.is_empty() { None } else { Some(key) };
    })?;
    println!("Saved.");
    Ok(())
}

fn configure_gofile(store: &ConfigStore) -> Result<()> {
    let token: String = Password::new()
        .with_prompt("Gofile API token (empty for anonymous uploads)")
        .allow_empty_password(true)
        .interact()
        .map_err(anyhow::Error::from)?;

    store.update(|c| {
        c.gofile.api_token = if token.is_empty() { None } else { Some(token) };
    })?;
    println!("Saved.");
    Ok(())
}

async fn configure_gdrive(store: &ConfigStore) -> Result<()> {
    let current = store.load()?;

    let client_id: String = Input::new()
        .with_prompt("Google OAuth client id")
        .with_initial_text(current.google_drive.client_id.unwrap_or_default())
        .interact_text()
        .map_err(anyhow::Error::from)?;
    let client_secret: String = Password::new()
        .with_prompt("Google OAuth client secret")
        .interact()
        .map_err(anyhow::Error::from)?;

    // new credentials invalidate any refresh token minted by the old ones
    store.update(|c| {
        c.google_drive.client_id = Some(client_id.trim().to_string());
        c.google_drive.client_secret = Some(client_secret);
        c.google_drive.refresh_token = None;
    })?;
    println!("Saved.");

    let authorize_now = Confirm::new()
        .with_prompt("Authorize with Google now?")
        .default(true)
        .interact()
        .map_err(anyhow::Error::from)?;
    if authorize_now {
        match services::gdrive::GoogleDrive::connect(reqwest::Client::new(), store).await {
            Ok(_) => println!("{}", style("Google Drive authorized.").green()),
            Err(e) => println!("{} {e}", style("Authorization failed:").red().bold()),
        }
    }
    Ok(())
}

/// List recent uploads, newest first.
pub fn show_history(history: &HistoryStore) -> Result<()> {
    let records = history.load();
    if records.is_empty() {
        println!("No uploads yet.");
        return Ok(());
    }

    for record in &records {
        // RFC 3339 timestamps are readable enough without reformatting
        let date = record.uploaded_at.split('T').next().unwrap_or("");
        println!(
            "{}  {:>10}  {:<12}  {}  {}",
            style(date).dim(),
            HumanBytes(record.file_size).to_string(),
            record.service.to_string(),
            record.file_name,
            style(&record.link).cyan()
        );
    }
    Ok(())
}

/// History listing plus the option to wipe it (interactive mode only).
fn history_menu(history: &HistoryStore) -> Result<()> {
    show_history(history)?;
    if history.load().is_empty() {
        return Ok(());
    }

    let clear = Confirm::new()
        .with_prompt("Clear history?")
        .default(false)
        .interact()
        .map_err(anyhow::Error::from)?;
    if clear {
        history.clear()?;
        println!("History cleared.");
    }
    Ok(())
}
