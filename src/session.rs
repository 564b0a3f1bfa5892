use std::io;

use anyhow::Result;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    select,
};
use tracing::{debug, warn};

use crate::{
    console::{write_prompt, write_stderr, write_stdout},
    transcript::{current_timestamp, Direction, Transcript},
};

/// Upper bound on a single socket read. There is no framing on the wire, so
/// one send may arrive split across several reads or coalesced with the
/// next; the chunk size only caps how much is decoded at once.
pub const READ_CHUNK: usize = 1024;

const PROMPT: &str = "You: ";

/// Runs the chat session over `stream` until either direction closes, an
/// I/O error occurs, the operator input reaches EOF, or ctrl-c is pressed.
pub async fn run<I>(stream: TcpStream, operator_input: I, transcript: &Transcript) -> Result<()>
where
    I: AsyncBufRead + Unpin,
{
    let (reader, mut writer) = stream.into_split();
    let outcome = run_loops(reader, &mut writer, operator_input, transcript).await;
    shutdown_writer(&mut writer).await;
    outcome
}

/// The message loop pair: an outbound arm reading operator lines and an
/// inbound arm reading raw peer chunks, multiplexed so neither blocks the
/// other and the first detected closure ends both together.
pub async fn run_loops<R, W, I>(
    mut peer_reader: R,
    peer_writer: &mut W,
    mut operator_input: I,
    transcript: &Transcript,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    I: AsyncBufRead + Unpin,
{
    let mut chunk = [0u8; READ_CHUNK];
    let mut line = String::new();

    write_prompt(PROMPT).await?;

    loop {
        line.clear();
        select! {
            read = peer_reader.read(&mut chunk) => {
                if !handle_peer_chunk(read, &chunk, transcript).await? {
                    break;
                }
            }
            read = operator_input.read_line(&mut line) => {
                if !handle_operator_line(read, &line, peer_writer, transcript).await? {
                    break;
                }
                write_prompt(PROMPT).await?;
            }
            ctrl_c = tokio::signal::ctrl_c() => {
                handle_ctrl_c(ctrl_c).await?;
                break;
            }
        }
    }

    Ok(())
}

/// Processes one inbound read. Returns `Ok(false)` once the peer is gone.
async fn handle_peer_chunk(
    read: io::Result<usize>,
    chunk: &[u8; READ_CHUNK],
    transcript: &Transcript,
) -> Result<bool> {
    let received = match read {
        Ok(0) => {
            write_stdout("\n[INFO] Connection closed by peer.").await?;
            return Ok(false);
        }
        Ok(received) => received,
        Err(err) => {
            write_stderr(&format!("[ERROR] Receiving failed: {err}")).await?;
            return Ok(false);
        }
    };

    // A chunk may be a partial message or several coalesced ones; decode
    // whatever arrived. A multibyte character split across reads decodes
    // lossily.
    let text = String::from_utf8_lossy(&chunk[..received]);
    let timestamp = current_timestamp();
    write_stdout(&format!("\n{timestamp} Peer: {text}")).await?;
    transcript
        .append_stamped(&timestamp, Direction::Peer, &text)
        .await?;
    debug!(bytes = received, "peer chunk received");

    write_prompt(PROMPT).await?;
    Ok(true)
}

/// Processes one operator line. Returns `Ok(false)` once the session should
/// end: input EOF or a failed send.
async fn handle_operator_line<W>(
    read: io::Result<usize>,
    line: &str,
    peer_writer: &mut W,
    transcript: &Transcript,
) -> Result<bool>
where
    W: AsyncWrite + Unpin,
{
    let bytes = match read {
        Ok(bytes) => bytes,
        Err(err) => {
            write_stderr(&format!("[ERROR] Reading input failed: {err}")).await?;
            return Ok(false);
        }
    };
    if bytes == 0 {
        debug!("operator input closed");
        return Ok(false);
    }

    let text = line.trim();
    if text.is_empty() {
        write_stdout("[WARN] Cannot send empty message.").await?;
        return Ok(true);
    }

    // Raw bytes, no delimiter: the receiving side must not assume one send
    // arrives as one read.
    if let Err(err) = send_text(peer_writer, text).await {
        write_stderr(&format!("[ERROR] Sending failed: {err}")).await?;
        return Ok(false);
    }

    transcript.append(Direction::You, text).await?;
    Ok(true)
}

async fn send_text<W>(peer_writer: &mut W, text: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    peer_writer.write_all(text.as_bytes()).await?;
    peer_writer.flush().await
}

async fn handle_ctrl_c(result: io::Result<()>) -> Result<()> {
    if let Err(error) = result {
        warn!(?error, "ctrl-c handler failed");
    }
    write_stdout("\n[INFO] Shutting down...").await?;
    Ok(())
}

async fn shutdown_writer<W>(peer_writer: &mut W)
where
    W: AsyncWrite + Unpin,
{
    if let Err(error) = peer_writer.shutdown().await {
        warn!(?error, "failed to shut down peer writer cleanly");
    }
}
