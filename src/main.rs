//! CLI entry point for `ewsharvest`.

use std::path::PathBuf;

use clap::Parser;
use humansize::{format_size, BINARY};

use ewsharvest::harvest::{ArtifactKind, HarvestEvent, Harvester};
use ewsharvest::prompt::{CredentialProvider, TerminalPrompt};

/// Download file attachments from an Exchange inbox.
///
/// Prompts for credentials, logs in, and saves every attachment with an
/// allowed extension to DOWNLOAD_ROOT/YYYY-MM-DD-HH-MM-SS/NAME.
#[derive(Parser)]
#[command(name = "ewsharvest", version)]
struct Cli {
    /// Configuration file (defaults to the standard config location)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ewsharvest::config::load_config(cli.config.as_deref())?;

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    let settings = config.settings()?;

    let credentials = TerminalPrompt::stdio().obtain()?;
    let mut stdout = std::io::stdout();
    let inbox = ewsharvest::session::establish(&credentials, &settings, &mut stdout)?;

    let harvester = Harvester::new(&inbox, &settings);
    let report = harvester.run(&mut |event| match event {
        HarvestEvent::Boundary(boundary) => {
            println!("Retrieving attachments from {boundary}...");
        }
        HarvestEvent::Saved {
            kind: ArtifactKind::File,
            path,
        } => println!("Saved attachment to {}", path.display()),
        HarvestEvent::Saved {
            kind: ArtifactKind::Email,
            path,
        } => println!("Saved email to {}", path.display()),
        HarvestEvent::Skipped { name } => println!("Skipping {name}.."),
    })?;

    println!(
        "Done: {} item(s), {} saved ({}), {} skipped.",
        report.items,
        report.saved.len(),
        format_size(report.bytes, BINARY),
        report.skipped
    );
    Ok(())
}

/// Log to stderr, and to a file in the cache directory when enabled.
///
/// A run is one batch pass, so logs stay on stderr unless
/// `general.log_to_file` asks for a persistent copy.
fn setup_logging(level: &str, config: &ewsharvest::config::Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let file_layer = config
        .general
        .log_to_file
        .then(|| ewsharvest::config::cache_dir(config))
        .filter(|dir| std::fs::create_dir_all(dir).is_ok())
        .map(|dir| {
            fmt::layer()
                .with_ansi(false)
                .with_writer(tracing_appender::rolling::never(dir, "ewsharvest.log"))
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
}
