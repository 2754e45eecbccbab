use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use rmd::{
    Config, Notifier, Profile, ReminderStore, SqliteStore,
    cli::{Cli, Commands},
    logging, utils,
};
use std::path::Path;
use tracing::info;

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    let cli = Cli::parse();

    // --dev selects a separate config/storage profile
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from_path(Path::new(path), profile)?,
        None => Config::load_with_profile(profile)?,
    };

    let log_dir = utils::get_data_dir(profile)
        .map(|dir| dir.join("logs"))
        .ok_or_else(|| eyre!("Could not determine data directory for logs"))?;
    let _log_guard = logging::init(&log_dir, &config.log_level)?;
    info!(?profile, storage = %config.storage_path, "starting");

    let storage = SqliteStore::open(&config.get_storage_path())?;
    let mut store = ReminderStore::load(storage, config.storage_key.clone());

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => {
            let notifier = Notifier::request_permission(&config.notifications);
            let app = rmd::tui::App::new(config, store, notifier);
            rmd::tui::run_event_loop(app)?;
        }
        Commands::Add { text, at } => {
            rmd::cli::handle_add(text, at, &mut store, &config.time_format)?;
        }
        Commands::List => {
            rmd::cli::handle_list(&store, &config.time_format);
        }
        Commands::Delete { id } => {
            rmd::cli::handle_delete(id, &mut store)?;
        }
        Commands::Watch => {
            let notifier = Notifier::request_permission(&config.notifications);
            rmd::cli::handle_watch(&mut store, &notifier)?;
        }
    }

    Ok(())
}
