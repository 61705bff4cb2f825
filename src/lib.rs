pub mod agent;
pub mod models;
pub mod server;
pub mod llm;
pub mod cli;
pub mod history;

use agent::ChatAgent;
use cli::Args;
use history::initialize_history_store;
use llm::{ chat::new_client as new_chat_client, GenerationConfig, LlmConfig };
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Public Directory: {}", args.public_dir);
    info!("Chat Model: {}", args.chat_model);
    info!("Chat Base URL: {}", args.chat_base_url);
    info!("Chat Timeout: {}s", args.chat_timeout_secs);
    info!("History File: {}", args.history_file);
    info!("Max History Pairs: {}", args.max_history);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let chat_config = LlmConfig {
        api_key: args.gemini_api_key.clone(),
        completion_model: args.chat_model.clone(),
        base_url: args.chat_base_url.clone(),
        timeout: Some(args.chat_timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs),
    };
    let gateway = new_chat_client(&chat_config)?;
    let history_store = initialize_history_store(&args);
    let agent = Arc::new(ChatAgent::new(gateway, history_store, GenerationConfig::default()));

    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, agent, args);
    server.run().await?;

    Ok(())
}
