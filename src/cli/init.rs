use super::get_db_path;
use crate::config::{NodeConfig, DEFAULT_PORT};
use crate::node::NodeError;
use colored::Colorize;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

pub fn init(
    ip: Option<Ipv4Addr>,
    port: Option<u16>,
    db: Option<PathBuf>,
    conf_path: &Path,
) -> Result<(), NodeError> {
    if conf_path.exists() {
        println!("Bank node is already initialized!");
        return Ok(());
    }
    let conf = NodeConfig::new(
        ip.unwrap_or(Ipv4Addr::LOCALHOST),
        port.unwrap_or(DEFAULT_PORT),
        db.unwrap_or_else(get_db_path),
    );
    conf.validate()?;
    conf.save(conf_path)?;
    println!(
        "{} {}",
        "Config written to:".bright_yellow(),
        conf_path.display()
    );
    Ok(())
}
