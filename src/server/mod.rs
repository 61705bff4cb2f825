pub mod api;

use crate::agent::ChatAgent;
use crate::cli::Args;
use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use log::warn;

pub struct Server {
    addr: String,
    agent: Arc<ChatAgent>,
    args: Args,
}

impl Server {
    pub fn new(addr: String, agent: Arc<ChatAgent>, args: Args) -> Self {
        Self { addr, agent, args }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.addr
            .parse::<SocketAddr>()
            .map_err(|e| format!("Invalid server address '{}': {}", self.addr, e))?;

        let public_dir = PathBuf::from(&self.args.public_dir);
        if !public_dir.join("index.html").is_file() {
            warn!("No index.html found in '{}'; GET / will return 404", public_dir.display());
        }

        let app = api::router(self.agent.clone(), &public_dir);
        api::start_http_server(addr, app, &self.args).await
    }
}
