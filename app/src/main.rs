//! Notes client entry-point: loads configuration, wires the emulated
//! services, and drives the application from the terminal.

use std::env;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::{Context, Result, eyre};
use mockable::{Clock, DefaultClock};
use ortho_config::OrthoConfig;
use tokio::io::{BufReader, stdin};
use tokio::runtime::Builder;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use notes::config::AppSettings;
use notes::domain::{NotesApp, NotesAppOptions, NotesAppPorts};
use notes::inbound::terminal::{draw, forward_input};
use notes::outbound::memory::{InMemoryAuthService, InMemoryNoteStore, PopupOutcome};

/// How long an emulated write stays pending before the store commits it.
const COMMIT_DELAY: Duration = Duration::from_millis(250);

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(std::io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load_from_iter(env::args_os())
        .map_err(|error| eyre!("failed to load configuration: {error}"))?;

    // The stdin reader blocks a pool thread; do not wait for it on exit.
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to build the runtime")?;
    let outcome = runtime.block_on(run(settings));
    runtime.shutdown_background();
    outcome
}

async fn run(settings: AppSettings) -> Result<()> {
    let connection = settings.connection();
    info!(
        project_id = %connection.project_id,
        auth_domain = %connection.auth_domain,
        storage_bucket = %connection.storage_bucket,
        api_key_configured = connection.api_key_configured,
        app_id = ?connection.app_id,
        "notes client configured"
    );

    let demo = settings
        .demo_identity()
        .wrap_err("invalid demo identity")?;
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let ports = NotesAppPorts {
        auth: Arc::new(InMemoryAuthService::new(PopupOutcome::Complete(demo))),
        store: Arc::new(
            InMemoryNoteStore::new(Arc::clone(&clock)).with_commit_delay(COMMIT_DELAY),
        ),
        clock,
    };
    let app = NotesApp::new(
        ports,
        NotesAppOptions {
            focus_delay: settings.focus_delay(),
        },
    );

    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let reader = tokio::spawn(async move {
        if let Err(error) = forward_input(BufReader::new(stdin()), input_tx).await {
            warn!(%error, "failed to read terminal input");
        }
    });

    let out = stdout();
    app.run(input_rx, |view| {
        if let Err(error) = draw(&mut out.lock(), view) {
            warn!(%error, "failed to draw view");
        }
    })
    .await
    .wrap_err("notes client failed to start")?;

    reader.abort();
    info!("notes client stopped");
    Ok(())
}
