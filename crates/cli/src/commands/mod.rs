use anyhow::Result;
use clap::{CommandFactory, Parser};
use serde_json::Value;

use crate::cli::Cli;

mod board;
mod fleet;
mod plugin;
mod port;
mod service;
mod webservice;

#[derive(Debug, Parser)]
pub enum Commands {
    /// Generate shell completions.
    #[command(arg_required_else_help = true)]
    Autocomplete {
        /// Which shell you want to generate completions for.
        shell: clap_complete::Shell,
    },
    #[clap(alias = "b")]
    Board(board::Board),
    #[clap(alias = "p")]
    Plugin(plugin::Plugin),
    #[clap(alias = "s")]
    Service(service::Service),
    Port(port::Port),
    #[clap(alias = "w")]
    Webservice(webservice::Webservice),
    #[clap(alias = "f")]
    Fleet(fleet::Fleet),
    Request {
        id: String,
    },
    Result {
        id: String,
    },
    SetLogLevel {
        level: String,
    },
}

impl Commands {
    pub fn run(self, url: &str) -> Result<()> {
        let client = reqwest::blocking::Client::new();

        let response = match self {
            Commands::Autocomplete { shell } => {
                let mut cmd = Cli::command();
                let cmd_name = cmd.get_name().to_string();

                clap_complete::generate(shell, &mut cmd, cmd_name, &mut std::io::stdout());
                return Ok(());
            }
            Commands::Board(board) => board.run(url, &client),
            Commands::Plugin(plugin) => plugin.run(url, &client),
            Commands::Service(service) => service.run(url, &client),
            Commands::Port(port) => port.run(url, &client),
            Commands::Webservice(webservice) => webservice.run(url, &client),
            Commands::Fleet(fleet) => fleet.run(url, &client),
            Commands::Request { id } => client
                .get(format!("{url}/api/v1/requests/{id}"))
                .send()
                .map_err(anyhow::Error::from),
            Commands::Result { id } => client
                .get(format!("{url}/api/v1/results/{id}"))
                .send()
                .map_err(anyhow::Error::from),
            Commands::SetLogLevel { level } => {
                client.post(format!("{url}/api/v1/log/{level}")).send()?;
                return Ok(());
            }
        }?;

        print_response(response)
    }
}

/// Shared response formatting: every subcommand prints the raw JSON body, or
/// reports the status line when the conductor rejected the request.
pub(crate) fn print_response(response: reqwest::blocking::Response) -> Result<()> {
    if !response.status().is_success() {
        eprintln!("error {}", response.status());
    }

    let value = match response.content_length() {
        Some(0) | None => None,
        _ => response.json::<Value>().map(Some)?,
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
