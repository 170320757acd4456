use anyhow::Result;
use clap::{Parser, ValueHint};

#[derive(Debug, Parser)]
#[clap(name = "iotronic", author)]
pub struct Cli {
    /// The url the conductor's ingress API is on.
    #[clap(short, long, default_value = "http://localhost:8000", value_hint = ValueHint::Url)]
    pub url: String,
    /// The subcommand to run.
    #[clap(subcommand)]
    pub subcommand: crate::commands::Commands,
}

impl Cli {
    /// Runs the subcommand.
    pub fn run(self) -> Result<()> {
        self.subcommand.run(&self.url)
    }
}
