use std::sync::Arc;
use std::time::Duration;

use checkers_core::discovery::{DiscoveryPublisher, NoopDiscoveryPublisher};
use checkers_core::handler::handle_connection;
use checkers_core::idgen::RandomIdGenerator;
use checkers_core::logger::Logger;
use checkers_core::server::Server;
use clap::{ArgAction, Parser};
use tokio::net::TcpListener;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "server",
    version,
    about = "Multi-game checkers server",
    long_about = "Hosts concurrently-playable checkers games over a line-oriented\n\
                  TCP protocol. See src/protocol.rs for the full command set."
)]
struct Args {
    /// Interface to bind to
    #[arg(long, default_value = "0.0.0.0")]
    interface: String,

    /// Port to bind to (0 picks an ephemeral port)
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Increase output verbosity (-v verbose, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Seconds of inactivity after which an idle game is reaped
    #[arg(long, default_value_t = 300)]
    prune_inactive: u64,

    /// Advertise this server as a zero-configuration LAN service
    #[arg(long, default_value_t = false)]
    zeroconf: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let log = Arc::new(Logger::new(args.verbose));

    let addr = format!("{}:{}", args.interface, args.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {addr}: {e}");
            std::process::exit(1);
        }
    };

    let bound_addr = listener.local_addr().expect("bound socket has a local address");
    log.info(format!("listening on {bound_addr}"));

    if args.zeroconf {
        let publisher = NoopDiscoveryPublisher::new(&log);
        publisher.publish(&args.interface, bound_addr.port());
    }

    let server = Arc::new(Server::new(
        Duration::from_secs(args.prune_inactive),
        Box::new(RandomIdGenerator),
        log.clone(),
    ));

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, addr) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        log.warn(format!("accept error: {e}"));
                        continue;
                    }
                };
                let server = server.clone();
                let log = log.clone();
                tokio::spawn(async move {
                    handle_connection(stream, addr, server, log).await;
                });
            }
            _ = server.wait_for_shutdown() => {
                log.info("shutdown requested, no longer accepting new connections");
                break;
            }
        }
    }
}
