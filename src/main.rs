use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use claudebar::app::{App, AppParts};
use claudebar::config::{CredentialStore, JsonConfigStore};
use claudebar::logging;
use claudebar::platform::SnapPosition;
use claudebar::poller::TickOutcome;
use claudebar::presentation::{self, LogTray, Presenter, TerminalOverlay};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "claudebar")]
#[command(about = "Shows claude.ai session and weekly usage")]
#[command(version)]
#[command(long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CLAUDEBAR_GIT_SHA"), ")"))]
struct Cli {
    /// Verify and save a session key (the claude.ai `sessionKey` cookie)
    #[arg(long, value_name = "KEY")]
    session_key: Option<String>,

    /// Fetch usage once, print it and exit
    #[arg(long)]
    once: bool,

    /// Clear saved credentials and exit
    #[arg(long, conflicts_with_all = ["once", "session_key"])]
    logout: bool,

    /// Mirror logs to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_file = logging::init(cli.verbose);

    let store = Arc::new(JsonConfigStore::open_default().context("Failed to open settings")?);
    tracing::info!("Settings: {}", store.path().display());
    if let Some(path) = &log_file {
        tracing::info!("Log file: {}", path.display());
    }

    let (ui, ui_rx) = presentation::channel();
    let app = App::new(AppParts::system(Arc::clone(&store) as Arc<dyn CredentialStore>), ui);

    if cli.logout {
        app.logout()?;
        println!("Saved credentials cleared.");
        return Ok(());
    }

    if let Some(key) = cli.session_key {
        let setter = Arc::clone(&app);
        tokio::task::spawn_blocking(move || setter.set_session_key(key.trim()))
            .await?
            .context("Session key was rejected")?;
        println!("Session key saved.");
    }

    if cli.once {
        return run_once(&app).await;
    }

    let config = store.get();
    let position = config
        .overlay_position
        .parse()
        .unwrap_or(SnapPosition::Top);
    let presenter = Presenter::new(
        Box::new(TerminalOverlay::new(
            std::io::stdout(),
            position,
            config.visible_stats.clone(),
        )),
        Box::new(LogTray::default()),
        app.platform(),
        config.overlay_opacity,
    );
    let presenter_task = tokio::spawn(presenter.run(ui_rx));

    let refresh_loop = app.start();
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    app.shutdown();

    if let Some(handle) = refresh_loop {
        handle.await.context("Refresh loop panicked")?;
    }
    drop(app);
    presenter_task.abort();
    Ok(())
}

async fn run_once(app: &Arc<App>) -> Result<()> {
    let runner = Arc::clone(app);
    let outcome = tokio::task::spawn_blocking(move || runner.authenticate())
        .await?
        .context("Authentication failed")?;

    match outcome {
        TickOutcome::Updated(usage) => {
            let [session, weekly] = presentation::tray_labels(&usage, Utc::now());
            println!("{}", session);
            println!("{}", weekly);
            Ok(())
        }
        TickOutcome::Failed(e) => bail!("Failed to fetch usage: {}", e),
        TickOutcome::Skipped => bail!("No credentials available"),
    }
}
