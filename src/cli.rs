use std::{net::IpAddr, path::PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::transcript::DEFAULT_LOG_FILE;

/// Two-party TCP chat: one side listens, the other dials in.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path of the append-only chat transcript.
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,
}

/// Which side of the connection this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
}

/// Reads the role answer. Input is trimmed and matched case-insensitively.
pub async fn read_role<R>(input: &mut R) -> Result<Role>
where
    R: AsyncBufRead + Unpin,
{
    let answer = read_trimmed_line(input).await?;
    match answer.to_lowercase().as_str() {
        "server" => Ok(Role::Server),
        "client" => Ok(Role::Client),
        _ => bail!("Invalid mode. Please choose 'server' or 'client'."),
    }
}

/// Reads the port to listen on. Any u16 is accepted; 0 asks the OS for an
/// ephemeral port, which the listener banner then reports.
pub async fn read_listen_port<R>(input: &mut R) -> Result<u16>
where
    R: AsyncBufRead + Unpin,
{
    let answer = read_trimmed_line(input).await?;
    answer
        .parse::<u16>()
        .map_err(|_| anyhow!("Invalid port. Must be between 0 and 65535."))
}

/// Reads the peer's IP address, accepting any IPv4 or IPv6 literal.
pub async fn read_peer_ip<R>(input: &mut R) -> Result<IpAddr>
where
    R: AsyncBufRead + Unpin,
{
    let answer = read_trimmed_line(input).await?;
    answer
        .parse::<IpAddr>()
        .map_err(|_| anyhow!("Invalid IP address format."))
}

/// Reads the peer's port, which must fall in the connectable range.
pub async fn read_peer_port<R>(input: &mut R) -> Result<u16>
where
    R: AsyncBufRead + Unpin,
{
    let answer = read_trimmed_line(input).await?;
    match answer.parse::<u32>() {
        Ok(port @ 1..=65535) => Ok(port as u16),
        _ => bail!("Invalid port. Must be between 1 and 65535."),
    }
}

async fn read_trimmed_line<R>(input: &mut R) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let bytes = input
        .read_line(&mut line)
        .await
        .context("failed to read operator input")?;
    if bytes == 0 {
        bail!("input closed before setup finished");
    }
    Ok(line.trim().to_string())
}
