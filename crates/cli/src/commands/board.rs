use anyhow::Result;
use clap::Parser;
use reqwest::blocking::{Client, Response};

/// For creating, inspecting, and driving actions on boards.
#[derive(Debug, Parser)]
pub struct Board {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser)]
enum Commands {
    /// List every board.
    List,
    /// Register a new board and get back its enrollment code.
    Create { name: String, code: String },
    /// Get a specific board.
    Get { id: String },
    /// Delete a board.
    Delete { id: String },
    /// Run a device action (`reboot`, `signal`, ...) on a board.
    Action { id: String, action: String },
    /// Re-dispatch enable for every service/webservice the board had before
    /// going offline.
    RestoreServices { id: String },
}

impl Board {
    pub fn run(self, url: &str, client: &Client) -> Result<Response> {
        use Commands::*;
        Ok(match self.command {
            List => client.get(format!("{url}/api/v1/boards")).send()?,
            Create { name, code } => client
                .post(format!("{url}/api/v1/boards"))
                .json(&serde_json::json!({ "name": name, "code": code }))
                .send()?,
            Get { id } => client.get(format!("{url}/api/v1/boards/{id}")).send()?,
            Delete { id } => client.delete(format!("{url}/api/v1/boards/{id}")).send()?,
            Action { id, action } => client
                .post(format!("{url}/api/v1/boards/{id}/action/{action}"))
                .send()?,
            RestoreServices { id } => client
                .post(format!("{url}/api/v1/boards/{id}/restore_services"))
                .send()?,
        })
    }
}
