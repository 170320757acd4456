use anyhow::Result;
use clap::Parser;
use reqwest::blocking::{Client, Response};

/// For enabling a board's web exposure and exposing individual named
/// webservices on it.
#[derive(Debug, Parser)]
pub struct Webservice {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser)]
enum Commands {
    /// Enable web exposure on a board (`dns.zone`, e.g. `board1.example.com`).
    Enable {
        board: String,
        dns: String,
        zone: String,
        email: String,
    },
    /// Disable web exposure on a board.
    Disable { board: String },
    /// Renew the webservice's certificate.
    Renew { board: String },
    /// Expose a named webservice (e.g. a dashboard on port 80) on a board.
    Expose {
        board: String,
        name: String,
        port: u16,
        #[clap(long)]
        secure: bool,
    },
    /// Stop exposing a previously exposed webservice.
    Unexpose { board: String, id: String },
}

impl Webservice {
    pub fn run(self, url: &str, client: &Client) -> Result<Response> {
        use Commands::*;
        Ok(match self.command {
            Enable {
                board,
                dns,
                zone,
                email,
            } => client
                .post(format!("{url}/api/v1/boards/{board}/webservice"))
                .json(&serde_json::json!({ "dns": dns, "zone": zone, "email": email }))
                .send()?,
            Disable { board } => client
                .delete(format!("{url}/api/v1/boards/{board}/webservice"))
                .send()?,
            Renew { board } => client
                .post(format!("{url}/api/v1/boards/{board}/webservice/renew"))
                .send()?,
            Expose {
                board,
                name,
                port,
                secure,
            } => client
                .post(format!("{url}/api/v1/boards/{board}/webservice/expose"))
                .json(&serde_json::json!({ "name": name, "port": port, "secure": secure }))
                .send()?,
            Unexpose { board, id } => client
                .delete(format!("{url}/api/v1/boards/{board}/webservice/expose/{id}"))
                .send()?,
        })
    }
}
