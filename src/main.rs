use std::fs::File;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use fleetdrop_config::Config;
use fleetdrop_ingest::{FsPlacer, Ingestor, UploadRequest, UploadedFile};

/// Fleetdrop - files agent uploads into a deterministic directory tree
#[derive(Parser)]
#[command(name = "fleetdrop")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.fleetdrop)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// JSON config file; overrides the data directory layout
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the HTTP upload service
  Serve {
    /// Address to listen on (default from config, 0.0.0.0:3000)
    #[arg(long)]
    bind: Option<SocketAddr>,
  },

  /// Ingest a local file once, as if an agent had uploaded it
  Ingest {
    /// Hardware address of the agent, e.g. AA:BB:CC:DD:EE:FF
    #[arg(long)]
    mac: String,

    /// Agent name
    #[arg(long)]
    agent: String,

    /// Agent version
    #[arg(long)]
    agent_version: String,

    /// File to ingest; it is copied, never consumed
    file: PathBuf,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();
  let config = load_config(cli.config.as_deref(), cli.data_dir)?;

  match cli.command {
    Some(Commands::Serve { bind }) => {
      let mut config = config;
      if let Some(bind) = bind {
        config.server.bind = bind;
      }
      serve(config)?;
    }
    Some(Commands::Ingest {
      mac,
      agent,
      agent_version,
      file,
    }) => {
      ingest_file(&config, mac, agent, agent_version, &file)?;
    }
    None => {
      println!("fleetdrop - use --help to see available commands");
    }
  }

  Ok(())
}

fn load_config(config_file: Option<&Path>, data_dir: Option<PathBuf>) -> Result<Config> {
  if let Some(path) = config_file {
    return Config::load(path).context("failed to load configuration");
  }

  let data_dir = match data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".fleetdrop"),
  };
  Ok(Config::for_data_dir(data_dir))
}

fn serve(config: Config) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { serve_async(config).await })
}

async fn serve_async(config: Config) -> Result<()> {
  let cancel = CancellationToken::new();

  let shutdown = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      tracing::info!("shutting down");
    }
    shutdown.cancel();
  });

  fleetdrop_http::serve(&config, cancel)
    .await
    .with_context(|| format!("upload service failed on {}", config.server.bind))
}

fn ingest_file(
  config: &Config,
  mac: String,
  agent: String,
  agent_version: String,
  file: &Path,
) -> Result<()> {
  let declared_filename = file
    .file_name()
    .and_then(|n| n.to_str())
    .with_context(|| format!("not a usable file name: {}", file.display()))?
    .to_string();

  // Stage a copy so the caller's file stays where it is.
  std::fs::create_dir_all(&config.staging_dir).with_context(|| {
    format!(
      "failed to create staging directory: {}",
      config.staging_dir.display()
    )
  })?;
  let mut staged = tempfile::Builder::new()
    .prefix("upload-")
    .tempfile_in(&config.staging_dir)
    .context("failed to create staging file")?;
  let mut source =
    File::open(file).with_context(|| format!("failed to open {}", file.display()))?;
  io::copy(&mut source, staged.as_file_mut())
    .with_context(|| format!("failed to stage {}", file.display()))?;

  let request = UploadRequest::new(
    mac,
    agent,
    agent_version,
    UploadedFile::new(staged.into_temp_path(), declared_filename),
  );

  let ingestor = Ingestor::new(FsPlacer::new(&config.store_root));
  let stored = ingestor.ingest(request).context("ingestion failed")?;

  println!("{}", stored.path.display());
  Ok(())
}
