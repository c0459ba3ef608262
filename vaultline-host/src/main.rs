use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use vaultline_host::logging::init_tracing;
use vaultline_host::{ErrorKind, HostConfig, HostState, VaultRequest, VaultResponse};
use vaultline_transport::{DisplayEndpoint, pair};

#[derive(Parser, Debug)]
#[command(author, version, about = "Vaultline host service", long_about = None)]
struct Cli {
    /// JSON config file. Defaults apply to anything it leaves out.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides `data_dir` from the config.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Overrides `log_filter` from the config.
    #[arg(long)]
    log_filter: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => HostConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => HostConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(filter) = cli.log_filter {
        config.log_filter = filter;
    }
    config.validate()?;

    init_tracing(&config.log_filter);

    // One event loop: crypto work blocks it, requests are serialized.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    runtime.block_on(run(config))
}

async fn run(config: HostConfig) -> Result<()> {
    let state = Arc::new(HostState::open(&config).context("opening host state")?);
    let (mut host, mut display) = pair(config.channel_buffer);

    let server_state = Arc::clone(&state);
    let server = tokio::spawn(async move { host.serve(server_state.as_ref()).await });

    display.handshake().await.context("IPC handshake self-check")?;
    info!("IPC session ready; reading requests from stdin");

    pump_stdin(&mut display).await?;

    drop(display);
    match server.await? {
        Ok(()) => Ok(()),
        Err(err) => {
            error!(error = %err, "IPC session ended with a violation");
            Err(err.into())
        }
    }
}

/// Reads one JSON request per line, forwards it over the sealed session and
/// writes one JSON response per line.
async fn pump_stdin(display: &mut DisplayEndpoint) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<VaultRequest>(&line) {
            Ok(request) => display.call::<_, VaultResponse>(&request).await?,
            Err(err) => VaultResponse::Error {
                kind: ErrorKind::InvalidInput,
                message: format!("unparseable request: {err}"),
                field_index: None,
            },
        };
        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }
    Ok(())
}
