use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::debug;

use crate::console::write_stdout;

/// Binds `port` on all interfaces and blocks until exactly one peer
/// connects. The listener is dropped after the first accept, so no further
/// connections are possible for the lifetime of the process.
///
/// Passing port 0 asks the OS for an ephemeral port; the banner always
/// reports the port actually bound.
pub async fn listen(port: u16) -> Result<TcpStream> {
    let listener = bind(port)?;
    let local = listener
        .local_addr()
        .context("failed to read bound address")?;

    write_stdout(&format!(
        "[INFO] Waiting for peer to connect on port {}...",
        local.port()
    ))
    .await?;

    accept_peer(listener).await
}

/// Binds the listening socket without accepting anything yet.
pub fn bind(port: u16) -> Result<TcpListener> {
    let socket = TcpSocket::new_v4().context("failed to create listening socket")?;
    socket
        .set_reuseaddr(true)
        .context("failed to set SO_REUSEADDR")?;
    socket
        .bind(SocketAddr::from(([0, 0, 0, 0], port)))
        .with_context(|| format!("failed to bind port {port}"))?;

    // Backlog of one: a single pending peer is all this utility ever serves.
    socket.listen(1).context("failed to listen")
}

/// Waits for the first inbound connection, then drops the listener.
pub async fn accept_peer(listener: TcpListener) -> Result<TcpStream> {
    let (stream, peer) = listener
        .accept()
        .await
        .context("failed to accept peer connection")?;

    write_stdout(&format!("[CONNECTED] Peer connected from {peer}")).await?;
    debug!(%peer, "accepted peer connection");
    Ok(stream)
}

/// Opens one connection attempt to the peer. No retry, no backoff: a
/// refused or unreachable peer is fatal to the caller.
pub async fn dial(ip: IpAddr, port: u16) -> Result<TcpStream> {
    let addr = SocketAddr::new(ip, port);
    let stream = TcpStream::connect(addr)
        .await
        .context("Connection failed")?;

    write_stdout(&format!("[CONNECTED] Connected to peer at {addr}")).await?;
    debug!(%addr, "connected to peer");
    Ok(stream)
}
