use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tier",
    about = "Tier: identity-aware, read-through block store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a TOML config file (default: ./tier.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Local block directory
    #[arg(long, global = true)]
    pub local: Option<PathBuf>,

    /// Origin block directory consulted on local miss
    #[arg(long, global = true)]
    pub origin: Option<PathBuf>,

    /// Re-hash blocks on every local read
    #[arg(long, global = true)]
    pub hash_on_read: bool,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum Codec {
    Raw,
    DagCbor,
}

impl Codec {
    pub fn code(self) -> u64 {
        match self {
            Codec::Raw => tier_types::RAW,
            Codec::DagCbor => tier_types::DAG_CBOR,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Store a file as a block and print its CID
    Put(PutArgs),
    /// Write a block's bytes to stdout or a file
    Get(GetArgs),
    /// Check whether a block is available
    Has(CidArgs),
    /// Print a block's size in bytes
    Size(CidArgs),
    /// Delete a block from the local store
    Rm(CidArgs),
    /// List every CID in the local store
    Ls(LsArgs),
}

#[derive(Args)]
pub struct PutArgs {
    pub file: PathBuf,
    #[arg(long, default_value = "raw")]
    pub codec: Codec,
    /// Embed the content in the CID instead of hashing it
    #[arg(long)]
    pub identity: bool,
}

#[derive(Args)]
pub struct GetArgs {
    pub cid: String,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct CidArgs {
    pub cid: String,
}

#[derive(Args)]
pub struct LsArgs {
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}
