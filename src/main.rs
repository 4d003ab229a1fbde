use std::net::SocketAddr;

use clap::Parser;
use hemmer_provider_ucmdb::{init_logging, serve, serve_on, ProviderError, UcmdbProvider};

/// Hemmer provider plugin for UCMDB
#[derive(Parser, Debug)]
#[command(name = "hemmer-provider-ucmdb", version, about, long_about = None)]
struct Args {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long)]
    debug: bool,

    /// Listen on this address instead of an ephemeral localhost port
    #[arg(long, env = "UCMDB_PROVIDER_ADDRESS")]
    address: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), ProviderError> {
    let args = Args::parse();
    init_logging(if args.debug { "debug" } else { "info" });

    let provider = UcmdbProvider::new();
    match args.address {
        Some(addr) => serve_on(provider, addr).await,
        None => serve(provider).await,
    }
}
