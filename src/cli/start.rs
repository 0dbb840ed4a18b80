use crate::bank::{AccountStore, Bank};
use crate::config::NodeConfig;
use crate::db::JsonAccountDb;
use crate::node::{heartbeater, ConnectionServer, NodeContext, NodeError, NodeStats};
use colored::Colorize;
use std::sync::Arc;

pub async fn start(conf: NodeConfig) -> Result<(), NodeError> {
    let bank = Bank::new(JsonAccountDb::new(&conf.db)?)?;

    println!(
        "{} v{}",
        "Bank node!".bright_green(),
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("{} {}:{}", "Listening:".bright_yellow(), conf.ip, conf.port);
    println!("{} {}", "Ledger:".bright_yellow(), conf.db.display());
    println!("{} {}", "Accounts:".bright_yellow(), bank.client_count()?);
    println!(
        "{} {}",
        "Max connections:".bright_yellow(),
        conf.max_connections
    );
    println!("{} {} ms", "Timeout:".bright_yellow(), conf.timeout_ms);

    let stats = Arc::new(NodeStats::default());
    let context = Arc::new(NodeContext::new(conf, bank, stats.clone()));
    let server = ConnectionServer::start(Arc::clone(&context)).await?;

    let heartbeat = tokio::spawn(heartbeater(
        Arc::clone(&context),
        stats,
        server.shutdown_signal(),
    ));

    tokio::signal::ctrl_c().await?;
    log::info!("Shutting down...");
    server.stop().await;
    if let Ok(Err(e)) = heartbeat.await {
        log::error!("Heartbeat error: {}", e);
    }
    Ok(())
}
