//! Application hooks around the peer lifecycle

use std::future::Future;

use crate::peer::PeerContext;
use crate::stats::PeerStats;

/// Callbacks invoked by the server for every connection.
///
/// All methods have defaults, so an implementation only overrides what it
/// needs. They run on the connection's own task, never on the hub worker.
pub trait HubHandler: Send + Sync + 'static {
    /// Called after the upgrade, before the peer joins the hub.
    ///
    /// Return `false` to close the connection without admitting it.
    fn on_connection(&self, ctx: &PeerContext) -> impl Future<Output = bool> + Send {
        let _ = ctx;
        async { true }
    }

    /// Called after the peer has left the hub and its connection is closed.
    ///
    /// Also called when the hub was closed before the peer could join; the
    /// stats are then empty and `stats.peer_id` is `None`.
    fn on_disconnect(&self, ctx: &PeerContext, stats: &PeerStats) -> impl Future<Output = ()> + Send {
        let _ = (ctx, stats);
        async {}
    }
}

/// Handler that admits every connection
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHandler;

impl HubHandler for DefaultHandler {}
