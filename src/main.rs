use anyhow::anyhow;
use clap::Parser;
use std::fs::File;
use std::net::SocketAddr;
use std::process::ExitCode;
use tokio::net::UdpSocket;
use tokio::time::Duration;

use tftpc::{BlockSize, Cli, Op, Outcome, TransferSession};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    env_logger::init();
    let args = Cli::parse();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    let server = SocketAddr::new(args.server, args.port);
    let block_size =
        BlockSize::new(args.blksize).ok_or(anyhow!("block size selector out of range"))?;
    let recv_timeout = Duration::from_millis(args.timeout);

    let remote = match &args.remote {
        Some(name) => name.clone(),
        None => args
            .local
            .file_name()
            .ok_or(anyhow!("{:?} has no file name", args.local))?
            .to_str()
            .ok_or(anyhow!("Illegal characters"))?
            .to_string(),
    };

    // Local file trouble must surface before anything goes on the wire.
    let outcome = match args.op {
        Op::Get => {
            let dest = File::create(&args.local)?;
            println!("Downloading {remote} from {server}...");
            TransferSession::download(
                &socket,
                server,
                &remote,
                dest,
                args.mode,
                block_size,
                recv_timeout,
            )
            .await
        }
        Op::Put => {
            let source = File::open(&args.local)?;
            let tsize = source.metadata()?.len();
            println!(
                "Uploading {} to {server} as {remote}...",
                args.local.display()
            );
            TransferSession::upload(
                &socket,
                server,
                source,
                &remote,
                args.mode,
                block_size,
                tsize,
                recv_timeout,
            )
            .await
        }
    };

    match outcome {
        Outcome::Completed => {
            println!(
                "{} completed successfully.",
                if args.op == Op::Get { "Get" } else { "Put" }
            );
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Failed(reason) => {
            eprintln!("Error: {reason}");
            Ok(ExitCode::FAILURE)
        }
    }
}
