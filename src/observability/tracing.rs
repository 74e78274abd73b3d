//! Per-connection spans.
//!
//! Every event emitted while serving a connection is recorded inside its span,
//! so log lines carry `connection_id` and `peer_addr` without repeating them.

use std::net::SocketAddr;

use crate::net::connection::ConnectionId;

/// Span covering one connection from accept to close.
pub fn connection_span(id: ConnectionId, peer_addr: SocketAddr) -> ::tracing::Span {
    ::tracing::info_span!("connection", connection_id = %id, peer_addr = %peer_addr)
}
