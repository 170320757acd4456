//! Process entrypoint: parses the CLI, opens the database, wires up
//! structured logging with a runtime-reloadable filter (`POST
//! /api/v1/log/:level`), and starts the ingress/bus server.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use iotronic_conductor::cli::Cli;
use iotronic_conductor::db::Database;
use iotronic_conductor::gateway::dns::InMemoryDnsGateway;
use iotronic_conductor::gateway::DnsGateway;
use iotronic_conductor::state::GlobalState;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{prelude::*, reload, EnvFilter};

fn make_env_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_env_var("IOTRONIC_LOG")
        .with_default_directive(level.into())
        .from_env_lossy()
        .add_directive("hyper_util=off".parse().unwrap())
        .add_directive("hyper=off".parse().unwrap())
        .add_directive("tarpc::client=ERROR".parse().unwrap())
        .add_directive("tarpc::server=ERROR".parse().unwrap())
        .add_directive("tower_http::trace::on_request=off".parse().unwrap())
        .add_directive("tower_http::trace::on_response=off".parse().unwrap())
}

#[tokio::main]
async fn main() {
    let filter_level = if cfg!(debug_assertions) {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let (env_filter, reload_handler) = reload::Layer::new(make_env_filter(filter_level));
    let (stdout, _guard) = tracing_appender::non_blocking(io::stdout());
    let output = tracing_subscriber::fmt::layer().with_writer(stdout);
    let output = if cfg!(debug_assertions) {
        output.with_file(true).with_line_number(true)
    } else {
        output
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(output)
        .try_init()
        .unwrap();

    let cli = Cli::parse();
    let config = cli.load_config().expect("load configuration");

    let db = Database::open(&cli.path.join("store")).expect("open database");
    let socket_addr = SocketAddr::new(cli.bind_addr, cli.port);

    // No concrete production DNS provider is wired up here: the DNS client
    // is an external collaborator out of scope for this crate.
    // `InMemoryDnsGateway` still enforces the uniqueness invariant the
    // webservice workflow depends on.
    let dns: Arc<dyn DnsGateway> = Arc::new(InMemoryDnsGateway::default());

    let state = GlobalState::load(config, db, dns, reload_handler).expect("load state");

    info!("starting server on {socket_addr}");
    if let Err(err) = iotronic_conductor::server::start(Arc::clone(&state), socket_addr).await {
        error!("error starting server: {err:?}");
    }
}
