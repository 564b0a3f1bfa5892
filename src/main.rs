use anyhow::Result;
use clap::Parser;
use tokio::io::BufReader;

use p2p_chat::{
    cli::{self, Cli, Role},
    console::{write_prompt, write_stdout},
    net, session,
    transcript::Transcript,
};

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("[ERROR] {err:#}");
            1
        }
    };

    // A stdin read may still be parked on the blocking pool; exiting here
    // keeps a finished session from waiting on one more keystroke.
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<()> {
    let transcript = Transcript::open(&cli.log_file).await?;
    let mut input = BufReader::new(tokio::io::stdin());

    write_stdout("=== P2P Chat System ===").await?;
    write_prompt("Start as (server/client)? ").await?;
    let role = cli::read_role(&mut input).await?;

    let stream = match role {
        Role::Server => {
            write_prompt("Enter port to listen on: ").await?;
            let port = cli::read_listen_port(&mut input).await?;
            net::listen(port).await?
        }
        Role::Client => {
            write_prompt("Enter peer IP address: ").await?;
            let ip = cli::read_peer_ip(&mut input).await?;
            write_prompt("Enter peer port: ").await?;
            let port = cli::read_peer_port(&mut input).await?;
            net::dial(ip, port).await?
        }
    };

    session::run(stream, input, &transcript).await
}
