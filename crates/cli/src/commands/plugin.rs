use anyhow::Result;
use clap::Parser;
use reqwest::blocking::{Client, Response};

/// For creating, updating, injecting, and driving actions on plugins.
#[derive(Debug, Parser)]
pub struct Plugin {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser)]
enum Commands {
    /// List every plugin.
    List,
    /// Register a new plugin. `code` is a path to the plugin's source file.
    Create {
        name: String,
        owner: String,
        code: std::path::PathBuf,
        #[clap(long)]
        public: bool,
        #[clap(long)]
        callable: bool,
    },
    /// Remove a plugin definition.
    Delete { id: String },
    /// Inject a plugin onto a board.
    Inject {
        board: String,
        plugin: String,
        #[clap(long)]
        onboot: bool,
    },
    /// Remove an injected plugin from a board.
    Remove { board: String, plugin: String },
    /// Run a plugin action (`start`, `stop`, ...) on a board.
    Action {
        board: String,
        plugin: String,
        action: String,
    },
}

impl Plugin {
    pub fn run(self, url: &str, client: &Client) -> Result<Response> {
        use Commands::*;
        Ok(match self.command {
            List => client.get(format!("{url}/api/v1/plugins")).send()?,
            Create {
                name,
                owner,
                code,
                public,
                callable,
            } => {
                let code = std::fs::read(&code)?;
                client
                    .post(format!("{url}/api/v1/plugins"))
                    .json(&serde_json::json!({
                        "name": name,
                        "owner": owner,
                        "code": code,
                        "public": public,
                        "callable": callable,
                    }))
                    .send()?
            }
            Delete { id } => client.delete(format!("{url}/api/v1/plugins/{id}")).send()?,
            Inject {
                board,
                plugin,
                onboot,
            } => client
                .post(format!("{url}/api/v1/boards/{board}/plugins/{plugin}/inject"))
                .json(&serde_json::json!({ "onboot": onboot }))
                .send()?,
            Remove { board, plugin } => client
                .delete(format!("{url}/api/v1/boards/{board}/plugins/{plugin}"))
                .send()?,
            Action {
                board,
                plugin,
                action,
            } => client
                .post(format!(
                    "{url}/api/v1/boards/{board}/plugins/{plugin}/action/{action}"
                ))
                .send()?,
        })
    }
}
