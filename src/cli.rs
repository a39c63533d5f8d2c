use anstyle::AnsiColor;
use clap::builder::styling::Styles;
use clap::{Parser, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::session::Mode;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default())
    .usage(AnsiColor::Green.on_default())
    .literal(AnsiColor::Cyan.on_default())
    .placeholder(AnsiColor::Red.on_default());

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Op {
    /// Download a file from the server
    Get,
    /// Upload a file to the server
    Put,
}

#[derive(Parser, Debug)]
#[command(name = "tftpc")]
#[command(about = "A simple TFTP client", long_about = None)]
#[command(styles = STYLES)]
pub struct Cli {
    /// Server ip
    pub server: IpAddr,

    /// Operation
    #[arg(value_enum)]
    pub op: Op,

    /// Local file (destination for get, source for put)
    pub local: PathBuf,

    /// Remote filename (defaults to the local file name)
    pub remote: Option<String>,

    /// Server port
    #[arg(short, long, default_value_t = crate::DEF_PORT)]
    pub port: u16,

    /// Transfer mode
    #[arg(short, long, value_enum, default_value_t = Mode::Octet)]
    pub mode: Mode,

    /// Block size selector (1-9)
    #[arg(short, long, default_value_t = crate::DEF_BLOCK_SELECTOR,
          value_parser = clap::value_parser!(u8).range(1..=9))]
    pub blksize: u8,

    /// Receive timeout (ms)
    #[arg(short, long, default_value_t = crate::DEF_TIMEOUT_MS)]
    pub timeout: u64,
}
