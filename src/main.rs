use banknode::node::NodeError;

#[tokio::main]
async fn main() -> Result<(), NodeError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = banknode::cli::initialize_cli().await {
        log::error!("{}", e);
        return Err(e);
    }
    Ok(())
}
