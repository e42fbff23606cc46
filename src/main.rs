use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use std::path::PathBuf;
use todofold::{
    Config, Database, Profile,
    cli::{self, Cli, Commands},
    logging,
    models::TodoFilter,
};

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    let cli = Cli::parse();

    // --dev keeps config, database and log apart from the real ones
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from_path(&PathBuf::from(path)),
        None => Config::load_with_profile(profile),
    }
    .wrap_err("Failed to load configuration")?;

    let log_path = config.log_path(profile);
    logging::init(&log_path, &config.log_level)?;

    let db_path = config.database_path(profile);
    let db = Database::open(
        db_path
            .to_str()
            .ok_or_else(|| eyre!("Database path contains invalid UTF-8"))?,
        config.busy_timeout(),
    )
    .wrap_err_with(|| format!("Failed to open database at {}", db_path.display()))?;

    let user_name = cli.user.clone().unwrap_or_else(|| config.user.clone());
    let user = db.ensure_user(&user_name)?;
    tracing::info!(user = %user.name, user_id = user.id, "session started");

    let mut stdout = std::io::stdout();
    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => {
            let app = todofold::tui::App::new(config, profile, db, user)?;
            todofold::tui::run_event_loop(app)?;
        }
        Commands::Add { title, category, priority, deadline } => {
            cli::handle_add(&db, user.id, title, category, priority, deadline, &mut stdout)?;
        }
        Commands::List { category, priority, json } => {
            let filter = TodoFilter { category_id: category, priority };
            cli::handle_list(&db, user.id, filter, json, &mut stdout)?;
        }
        Commands::Categories { json } => {
            cli::handle_categories(&db, user.id, json, &mut stdout)?;
        }
        Commands::AddCategory { name } => {
            cli::handle_add_category(&db, user.id, name, &mut stdout)?;
        }
        Commands::Move { todo, category } => {
            cli::handle_move(&db, user.id, todo, &category, &mut stdout)?;
        }
        Commands::Submit { body } => {
            cli::handle_submit(&db, user.id, &body, &mut stdout)?;
        }
    }

    Ok(())
}
