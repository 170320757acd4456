//! A local [`super::ProxyGateway`] that writes the literal reverse-proxy
//! file contracts directly to disk: one `maps/map_<b>`,
//! `upstreams/upstream_<b>`, and `servers/<b>` file per board-dns. Used by
//! tests and by a conductor configured to co-locate with its single bus
//! agent.

use std::path::PathBuf;

use async_trait::async_trait;
use iotronic_common::ids::BoardUuid;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{GatewayError, ProxyGateway};

pub struct FilesystemProxyGateway {
    root: PathBuf,
}

impl FilesystemProxyGateway {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn map_path(&self, board: BoardUuid) -> PathBuf {
        self.root.join("maps").join(format!("map_{board}"))
    }

    fn upstream_path(&self, board: BoardUuid) -> PathBuf {
        self.root.join("upstreams").join(format!("upstream_{board}"))
    }

    fn server_path(&self, board: BoardUuid) -> PathBuf {
        self.root.join("servers").join(board.to_string())
    }

    /// Truncate-and-rewrite a single file under the same write discipline
    /// the allowlist file requires.
    async fn atomic_write(path: &PathBuf, contents: &str) -> Result<(), GatewayError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .await?;
        file.write_all(contents.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

fn server_block(endpoint: &str, http_port: u16, zone: &str, board: BoardUuid) -> String {
    format!(
        "server {{\n  listen 80;\n  server_name .{board}.{zone};\n  location / {{ proxy_pass http://{endpoint}:{http_port}; }}\n}}\n",
    )
}

#[async_trait]
impl ProxyGateway for FilesystemProxyGateway {
    async fn enable_webservice(
        &self,
        board: BoardUuid,
        zone: &str,
        fqdn: &str,
        http_port: u16,
        https_port: u16,
        endpoint: &str,
    ) -> Result<(), GatewayError> {
        let map = format!("~{fqdn}.{zone} {board};\n");
        Self::atomic_write(&self.map_path(board), &map).await?;

        let upstream = format!(
            "upstream {board} {{ server {endpoint}:{https_port} max_fails=3 fail_timeout=10s; }}\n",
        );
        Self::atomic_write(&self.upstream_path(board), &upstream).await?;

        let server = server_block(endpoint, http_port, zone, board);
        Self::atomic_write(&self.server_path(board), &server).await?;
        Ok(())
    }

    async fn disable_webservice(&self, board: BoardUuid) -> Result<(), GatewayError> {
        for path in [
            self.map_path(board),
            self.upstream_path(board),
            self.server_path(board),
        ] {
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn add_redirect(&self, board: BoardUuid, host: &str) -> Result<(), GatewayError> {
        let path = self.server_path(board);
        let contents = fs::read_to_string(&path).await?;
        let mut lines: Vec<&str> = contents.lines().collect();
        let redirect = format!(
            "  if ($host = {host}) {{ return 301 https://$host$request_uri; }}",
        );
        let insert_at = lines.len().min(4);
        lines.insert(insert_at, &redirect);
        let rewritten = lines.join("\n") + "\n";
        Self::atomic_write(&path, &rewritten).await
    }

    async fn remove_redirect(&self, board: BoardUuid, host: &str) -> Result<(), GatewayError> {
        let path = self.server_path(board);
        let contents = fs::read_to_string(&path).await?;
        let needle = format!("if ($host = {host})");
        let rewritten: String = contents
            .lines()
            .filter(|line| !line.contains(&needle))
            .collect::<Vec<_>>()
            .join("\n")
            + "\n";
        Self::atomic_write(&path, &rewritten).await
    }

    async fn reload_proxy(&self) -> Result<(), GatewayError> {
        // No actual nginx process to signal in the filesystem-only gateway.
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn writes_map_upstream_and_server_files() {
        let dir = tempdir().unwrap();
        let gw = FilesystemProxyGateway::new(dir.path());
        let board = BoardUuid::new();

        gw.enable_webservice(board, "example.org", "foo", 80, 443, "10.0.0.5")
            .await
            .unwrap();

        let map = fs::read_to_string(gw.map_path(board)).await.unwrap();
        assert!(map.contains("~foo.example.org"));

        let upstream = fs::read_to_string(gw.upstream_path(board)).await.unwrap();
        assert!(upstream.contains("server 10.0.0.5:443"));

        let server = fs::read_to_string(gw.server_path(board)).await.unwrap();
        assert!(server.contains("proxy_pass http://10.0.0.5:80"));
    }

    #[tokio::test]
    async fn disable_removes_all_three_files() {
        let dir = tempdir().unwrap();
        let gw = FilesystemProxyGateway::new(dir.path());
        let board = BoardUuid::new();
        gw.enable_webservice(board, "z", "f", 80, 443, "1.2.3.4")
            .await
            .unwrap();

        gw.disable_webservice(board).await.unwrap();
        assert!(!gw.map_path(board).exists());
        assert!(!gw.upstream_path(board).exists());
        assert!(!gw.server_path(board).exists());
    }

    #[tokio::test]
    async fn redirect_is_inserted_and_removable() {
        let dir = tempdir().unwrap();
        let gw = FilesystemProxyGateway::new(dir.path());
        let board = BoardUuid::new();
        gw.enable_webservice(board, "z", "f", 80, 443, "1.2.3.4")
            .await
            .unwrap();

        gw.add_redirect(board, "foo.z").await.unwrap();
        let server = fs::read_to_string(gw.server_path(board)).await.unwrap();
        assert!(server.contains("if ($host = foo.z)"));

        gw.remove_redirect(board, "foo.z").await.unwrap();
        let server = fs::read_to_string(gw.server_path(board)).await.unwrap();
        assert!(!server.contains("if ($host = foo.z)"));
    }
}
