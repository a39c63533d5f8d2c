use log::{debug, warn};
use std::fs::File;
use std::io::{Read, Write};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::{timeout, Duration};

use crate::catalog;
use crate::options::{negotiated_block_size, BlockSize};
use crate::packet::TftpPacket;
use crate::HEADER_LEN;

/// Transfer mode string carried in the request. Neither mode transforms the
/// payload; the server decides what to make of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    Netascii,
    Octet,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Netascii => "netascii",
            Mode::Octet => "octet",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a transfer attempt ended short of completion. Local to one attempt;
/// the caller reports it and may start a fresh session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailReason {
    #[error("received a packet that could not be decoded")]
    MalformedPacket,
    #[error("server negotiated an unsupported block size: {0}")]
    UnsupportedBlockSize(String),
    #[error("protocol violation: unexpected packet for the current state")]
    ProtocolViolation,
    #[error("no response from server within the timeout")]
    Timeout,
    #[error("transport error: {0}")]
    TransportError(String),
    #[error("local file error: {0}")]
    FileError(String),
    #[error("{description}")]
    PeerError { code: u16, description: String },
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed(FailReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Get,
    Put,
}

/// Drives a single download or upload to a terminal outcome. One session per
/// transfer attempt; the socket is borrowed, the file is owned and closed on
/// every exit path.
pub struct TransferSession<'a> {
    socket: &'a UdpSocket,
    peer: SocketAddr,
    peer_bound: bool,
    direction: Direction,
    file: File,
    block_size: BlockSize,
    block: u16,
    oack_done: bool,
    recv_timeout: Duration,
}

impl<'a> TransferSession<'a> {
    pub async fn download(
        socket: &'a UdpSocket,
        server: SocketAddr,
        remote_filename: &str,
        dest: File,
        mode: Mode,
        block_size: BlockSize,
        recv_timeout: Duration,
    ) -> Outcome {
        let request =
            TftpPacket::request(false, remote_filename, mode.as_str(), block_size.bytes(), None);
        let session = TransferSession {
            socket,
            peer: server,
            peer_bound: false,
            direction: Direction::Get,
            file: dest,
            block_size,
            block: 0,
            oack_done: false,
            recv_timeout,
        };
        session.run(request).await
    }

    pub async fn upload(
        socket: &'a UdpSocket,
        server: SocketAddr,
        source: File,
        remote_filename: &str,
        mode: Mode,
        block_size: BlockSize,
        tsize: u64,
        recv_timeout: Duration,
    ) -> Outcome {
        let request = TftpPacket::request(
            true,
            remote_filename,
            mode.as_str(),
            block_size.bytes(),
            Some(tsize),
        );
        let session = TransferSession {
            socket,
            peer: server,
            peer_bound: false,
            direction: Direction::Put,
            file: source,
            block_size,
            block: 1,
            oack_done: false,
            recv_timeout,
        };
        session.run(request).await
    }

    async fn run(mut self, request: TftpPacket) -> Outcome {
        match self.drive(request).await {
            Ok(()) => Outcome::Completed,
            Err(reason) => {
                warn!("transfer failed: {reason}");
                Outcome::Failed(reason)
            }
        }
    }

    async fn drive(&mut self, request: TftpPacket) -> Result<(), FailReason> {
        debug!("{:?} request to {}", self.direction, self.peer);
        self.send(&request).await?;

        loop {
            let mut buf = vec![0u8; usize::from(self.block_size.bytes()) + HEADER_LEN];
            let (num, from) =
                match timeout(self.recv_timeout, self.socket.recv_from(&mut buf)).await {
                    Ok(Ok(received)) => received,
                    Ok(Err(e)) => return Err(FailReason::TransportError(e.to_string())),
                    Err(_) => return Err(FailReason::Timeout),
                };

            // Transfer-ID binding: the first response fixes the peer endpoint.
            if !self.peer_bound {
                self.peer = from;
                self.peer_bound = true;
            }

            let pkt = TftpPacket::deserialize(&buf[..num]).map_err(|e| {
                warn!("undecodable datagram from {from}: {e}");
                FailReason::MalformedPacket
            })?;

            match pkt {
                TftpPacket::DATA { block, data } if self.direction == Direction::Get => {
                    // Before an OACK has concluded negotiation the ack steps
                    // one past the carried block number.
                    let ack = if self.oack_done {
                        block
                    } else {
                        block.wrapping_add(1)
                    };
                    self.send(&TftpPacket::ACK(ack)).await?;
                    self.block = block;
                    self.file
                        .write_all(&data)
                        .map_err(|e| FailReason::FileError(e.to_string()))?;

                    if data.len() < usize::from(self.block_size.bytes()) {
                        debug!("terminal block #{block} ({} bytes)", data.len());
                        return Ok(());
                    }
                }
                TftpPacket::ACK(block) if self.direction == Direction::Put => {
                    let last = self.send_next_data(block.wrapping_add(1)).await?;
                    if last {
                        return Ok(());
                    }
                }
                TftpPacket::ERROR { code, msg } => {
                    // Courtesy echo; the transfer is over either way.
                    let _ = self
                        .socket
                        .send_to(&TftpPacket::ERROR { code, msg }.serialize(), self.peer)
                        .await;
                    return Err(FailReason::PeerError {
                        code,
                        description: catalog::describe_or_unknown(code),
                    });
                }
                TftpPacket::OACK(options) => {
                    self.block_size = negotiated_block_size(&options)?;
                    debug!("negotiated block size {} bytes", self.block_size.bytes());
                    match self.direction {
                        Direction::Get => self.send(&TftpPacket::ACK(self.block)).await?,
                        Direction::Put => {
                            // First data block goes out before any ack arrives.
                            self.send_next_data(self.block).await?;
                        }
                    }
                    self.oack_done = true;
                }
                other => {
                    warn!("unexpected {other:?} in a {:?} transfer", self.direction);
                    return Err(FailReason::ProtocolViolation);
                }
            }
        }
    }

    /// Read one block-size chunk from the source and send it as `block`.
    /// Returns true when the chunk was the terminal one.
    async fn send_next_data(&mut self, block: u16) -> Result<bool, FailReason> {
        let mut chunk = vec![0u8; usize::from(self.block_size.bytes())];
        let num = self
            .file
            .read(&mut chunk)
            .map_err(|e| FailReason::FileError(e.to_string()))?;
        chunk.truncate(num);

        self.send(&TftpPacket::DATA { block, data: chunk }).await?;
        self.block = block;

        if num < usize::from(self.block_size.bytes()) {
            debug!("terminal block #{block} ({num} bytes)");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn send(&self, pkt: &TftpPacket) -> Result<(), FailReason> {
        self.socket
            .send_to(&pkt.serialize(), self.peer)
            .await
            .map_err(|e| FailReason::TransportError(e.to_string()))?;
        Ok(())
    }
}
