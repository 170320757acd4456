use anyhow::Result;
use clap::Parser;
use reqwest::blocking::{Client, Response};

/// For defining services and driving their exposure on a board.
#[derive(Debug, Parser)]
pub struct Service {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser)]
enum Commands {
    /// List every service definition.
    List,
    /// Define a new service (`tcp` or `udp`, on its local `port`).
    Create {
        name: String,
        protocol: String,
        port: u16,
    },
    /// Delete a service definition.
    Delete { id: String },
    /// Run a service action (`enable`, `disable`, `restore`) on a board.
    Action {
        board: String,
        service: String,
        action: String,
    },
}

impl Service {
    pub fn run(self, url: &str, client: &Client) -> Result<Response> {
        use Commands::*;
        Ok(match self.command {
            List => client.get(format!("{url}/api/v1/services")).send()?,
            Create {
                name,
                protocol,
                port,
            } => client
                .post(format!("{url}/api/v1/services"))
                .json(&serde_json::json!({ "name": name, "protocol": protocol, "port": port }))
                .send()?,
            Delete { id } => client.delete(format!("{url}/api/v1/services/{id}")).send()?,
            Action {
                board,
                service,
                action,
            } => client
                .post(format!(
                    "{url}/api/v1/boards/{board}/services/{service}/action/{action}"
                ))
                .send()?,
        })
    }
}
