use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use inkwire_server::{
    serve, RelayConfig, DEFAULT_MAX_MESSAGE_BYTES, DEFAULT_PEER_QUEUE, DEFAULT_PORT,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    #[arg(long, env = "INKWIRE_BIND", default_value = "0.0.0.0")]
    bind: IpAddr,
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    #[arg(long, env = "INKWIRE_PUBLIC_DIR")]
    public_dir: Option<PathBuf>,
    /// Frames buffered per peer before new frames are dropped for it.
    #[arg(long, default_value_t = DEFAULT_PEER_QUEUE)]
    peer_queue: usize,
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_BYTES)]
    max_message_bytes: usize,
}

impl Args {
    fn into_config(self) -> RelayConfig {
        let public_dir = self
            .public_dir
            .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../public"));
        RelayConfig {
            bind: self.bind,
            port: self.port,
            public_dir,
            peer_queue: self.peer_queue,
            max_message_bytes: self.max_message_bytes,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkwire_server=info,tower_http=info".into()),
        )
        .init();

    let config = Args::parse().into_config();
    match serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "relay stopped");
            ExitCode::FAILURE
        }
    }
}
