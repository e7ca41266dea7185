//! Hub server listener
//!
//! Handles the TCP accept loop, upgrades each connection to a WebSocket and
//! hands it to a peer.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{header, StatusCode};

use crate::connection::WsConnection;
use crate::error::{Error, Result};
use crate::hub::{Hub, WeakHub};
use crate::peer::{Peer, PeerContext};
use crate::server::config::ServerConfig;
use crate::server::handler::HubHandler;
use crate::stats::PeerStats;

/// WebSocket front end for a hub
pub struct HubServer<H: HubHandler> {
    config: Arc<ServerConfig>,
    handler: Arc<H>,
    hub: Hub,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl<H: HubHandler> HubServer<H> {
    /// Create a server and start its hub.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: ServerConfig, handler: H) -> Self {
        let hub = Hub::start(config.hub.clone());
        Self::with_hub(config, handler, hub)
    }

    /// Create a server in front of an existing hub
    pub fn with_hub(config: ServerConfig, handler: H, hub: Hub) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config: Arc::new(config),
            handler: Arc::new(handler),
            hub,
            connection_semaphore,
        }
    }

    /// The hub behind this server
    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_until(listener, shutdown).await
    }

    /// Accept connections on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        self.log_listening(&listener);
        self.accept_loop(&listener).await
    }

    /// Accept connections on an already bound listener until `shutdown`
    /// resolves
    pub async fn serve_until<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        self.log_listening(&listener);

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        }
    }

    fn log_listening(&self, listener: &TcpListener) {
        let addr = listener.local_addr().unwrap_or(self.config.bind_addr);
        tracing::info!(addr = %addr, path = %self.config.path, "Hub server listening");
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match Arc::clone(sem).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        tracing::debug!(peer = %peer_addr, "New connection");

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::warn!(error = %e, "Failed to configure socket");
            }
        }

        let config = Arc::clone(&self.config);
        let handler = Arc::clone(&self.handler);
        let hub = self.hub.downgrade();

        tokio::spawn(async move {
            // Held until the connection is fully retired
            let _permit = permit;

            if let Err(e) = serve_connection(socket, peer_addr, &config, handler.as_ref(), hub).await
            {
                tracing::debug!(peer = %peer_addr, error = %e, "Connection error");
            }

            tracing::debug!(peer = %peer_addr, "Connection closed");
        });
    }
}

async fn serve_connection<H: HubHandler>(
    socket: TcpStream,
    peer_addr: SocketAddr,
    config: &ServerConfig,
    handler: &H,
    hub: WeakHub,
) -> Result<()> {
    let mut request_info: Option<(String, Option<String>)> = None;

    let check_request = |request: &Request, response: Response| {
        let path = request.uri().path();
        if path != config.path {
            return Err(error_response(StatusCode::NOT_FOUND, "not found"));
        }

        let origin = request
            .headers()
            .get(header::ORIGIN)
            .and_then(|value| value.to_str().ok());
        if !config.origin_allowed(origin) {
            return Err(error_response(StatusCode::FORBIDDEN, "origin not allowed"));
        }

        request_info = Some((path.to_string(), origin.map(str::to_string)));
        Ok(response)
    };

    let upgrade = tokio_tungstenite::accept_hdr_async(socket, check_request);
    let stream = tokio::time::timeout(config.handshake_timeout, upgrade)
        .await
        .map_err(|_| Error::HandshakeTimeout)??;

    let (path, origin) = request_info.unwrap_or_default();
    let context = PeerContext::new(peer_addr).with_request(path, origin);

    if !handler.on_connection(&context).await {
        tracing::debug!(peer = %peer_addr, "Connection refused by handler");
        let mut stream = stream;
        let _ = stream.close(None).await;
        return Ok(());
    }

    let connection = WsConnection::new(stream).idle_timeout(config.idle_timeout);
    let peer = Peer::new(connection, hub, context.clone(), config.peer.clone());

    // The hook runs even if the hub was gone and the peer never joined
    match peer.run().await {
        Ok(stats) => {
            handler.on_disconnect(&context, &stats).await;
            Ok(())
        }
        Err(e) => {
            handler.on_disconnect(&context, &PeerStats::new()).await;
            Err(e)
        }
    }
}

fn error_response(status: StatusCode, reason: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(reason.to_string()));
    *response.status_mut() = status;
    response
}
