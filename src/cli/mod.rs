//! CLI module for Streamgate

pub mod serve;

use clap::{Parser, Subcommand};

/// Streamgate - API access-control gateway
#[derive(Parser)]
#[command(name = "streamgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the gateway server
    Serve,
}
