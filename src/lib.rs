mod catalog;
mod cli;
mod options;
mod packet;
mod session;

pub use crate::catalog::{describe, describe_or_unknown};
pub use crate::cli::{Cli, Op};
pub use crate::options::{negotiated_block_size, BlockSize, BLOCK_SIZES};
pub use crate::packet::TftpPacket;
pub use crate::session::{FailReason, Mode, Outcome, TransferSession};

pub const DEF_PORT: u16 = 69; // RFC 1350
pub const DEF_BLOCK_SELECTOR: u8 = 2; // 512 bytes
pub const DEF_TIMEOUT_MS: u64 = 5000;

pub const HEADER_LEN: usize = 4; // zero byte + opcode + block number
