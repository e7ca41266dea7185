//! Chat hub server
//!
//! Run with: cargo run -- [BIND_ADDR]
//!
//! Examples:
//!   cargo run                          # binds to 0.0.0.0:8080
//!   cargo run -- localhost             # binds to 127.0.0.1:8080
//!   cargo run -- 127.0.0.1:9000        # binds to 127.0.0.1:9000
//!
//! Connect with any WebSocket client on `ws://HOST:PORT/ws` and send either
//! `{"type":1,"body":"hello"}` or plain text.

use std::net::SocketAddr;

use chat_hub::server::DEFAULT_PORT;
use chat_hub::{DefaultHandler, HubServer, ServerConfig};

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:8080
/// - "localhost:9000" -> 127.0.0.1:9000
/// - "127.0.0.1" -> 127.0.0.1:8080
/// - "0.0.0.0:9000" -> 0.0.0.0:9000
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: chat-hub [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:{DEFAULT_PORT})");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  chat-hub                     # binds to 0.0.0.0:{DEFAULT_PORT}");
    eprintln!("  chat-hub localhost           # binds to 127.0.0.1:{DEFAULT_PORT}");
    eprintln!("  chat-hub localhost:9000      # binds to 127.0.0.1:9000");
    eprintln!("  chat-hub 0.0.0.0:9000        # binds to 0.0.0.0:9000");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let config = match args.get(1) {
        Some(addr_str) => match parse_bind_addr(addr_str) {
            Ok(addr) => ServerConfig::with_addr(addr),
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => ServerConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chat_hub=debug".parse()?),
        )
        .init();

    let server = HubServer::new(config, DefaultHandler);

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Server error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    let stats = server.hub().stats();
    tracing::info!(
        joins = stats.joins,
        broadcasts = stats.broadcasts,
        evictions = stats.evictions,
        "Hub stopped"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bind_addr() {
        assert_eq!(
            parse_bind_addr("localhost").unwrap(),
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_bind_addr("localhost:9000").unwrap(),
            "127.0.0.1:9000".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_bind_addr("10.0.0.1").unwrap(),
            "10.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );
        assert!(parse_bind_addr("not an address").is_err());
    }
}
