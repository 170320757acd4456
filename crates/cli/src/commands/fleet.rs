use anyhow::Result;
use clap::Parser;
use reqwest::blocking::{Client, Response};

/// For grouping boards into fleets.
#[derive(Debug, Parser)]
pub struct Fleet {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser)]
enum Commands {
    /// List fleets, optionally filtered to one project.
    List {
        #[clap(long)]
        project: Option<String>,
    },
    /// Create a new fleet.
    Create { name: String, project: String },
}

impl Fleet {
    pub fn run(self, url: &str, client: &Client) -> Result<Response> {
        use Commands::*;
        Ok(match self.command {
            List { project } => {
                let mut req = client.get(format!("{url}/api/v1/fleets"));
                if let Some(project) = project {
                    req = req.query(&[("project", project)]);
                }
                req.send()?
            }
            Create { name, project } => client
                .post(format!("{url}/api/v1/fleets"))
                .json(&serde_json::json!({ "name": name, "project": project }))
                .send()?,
        })
    }
}
