use anyhow::Result;
use clap::Parser;
use reqwest::blocking::{Client, Response};

/// For attaching and detaching virtual network interfaces.
#[derive(Debug, Parser)]
pub struct Port {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser)]
enum Commands {
    /// Attach a VIF to a board.
    Create {
        board: String,
        vif_name: String,
        mac: String,
        ip: std::net::IpAddr,
        network: String,
        cidr_prefix_len: u8,
    },
    /// Detach a VIF.
    Delete { id: String },
}

impl Port {
    pub fn run(self, url: &str, client: &Client) -> Result<Response> {
        use Commands::*;
        Ok(match self.command {
            Create {
                board,
                vif_name,
                mac,
                ip,
                network,
                cidr_prefix_len,
            } => client
                .post(format!("{url}/api/v1/boards/{board}/ports"))
                .json(&serde_json::json!({
                    "vif_name": vif_name,
                    "mac": mac,
                    "ip": ip,
                    "network": network,
                    "cidr_prefix_len": cidr_prefix_len,
                }))
                .send()?,
            Delete { id } => client.delete(format!("{url}/api/v1/ports/{id}")).send()?,
        })
    }
}
