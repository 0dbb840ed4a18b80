use crate::config::NodeConfig;
use crate::node::NodeError;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

mod init;
mod send;
mod start;
pub use init::*;
pub use send::*;
pub use start::*;

#[derive(StructOpt)]
#[structopt(name = "banknode", about = "Peer-to-peer bank node")]
struct CliOptions {
    /// Path of the node config file [default: ~/.banknode.yaml]
    #[structopt(long)]
    config: Option<PathBuf>,
    #[structopt(subcommand)]
    cmd: CliCommand,
}

#[derive(StructOpt)]
enum CliCommand {
    /// Write a default config file
    Init {
        #[structopt(long)]
        ip: Option<Ipv4Addr>,
        #[structopt(long)]
        port: Option<u16>,
        #[structopt(long)]
        db: Option<PathBuf>,
    },
    /// Start the node
    Start {},
    /// Send a single command to the bank node running on <ip>
    Send { ip: Ipv4Addr, line: Vec<String> },
}

fn home_path(name: &str) -> PathBuf {
    home::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(Path::new(name))
}

pub fn get_conf_path() -> PathBuf {
    home_path(".banknode.yaml")
}

pub fn get_db_path() -> PathBuf {
    home_path(".banknode-accounts.json")
}

/// Loads the config, or `None` when there is no config file yet.
pub fn get_conf(path: &Path) -> Result<Option<NodeConfig>, NodeError> {
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(NodeConfig::load(path)?))
}

pub async fn initialize_cli() -> Result<(), NodeError> {
    let opts = CliOptions::from_args();
    let conf_path = opts.config.unwrap_or_else(get_conf_path);

    match opts.cmd {
        CliCommand::Init { ip, port, db } => {
            init(ip, port, db, &conf_path)?;
        }
        CliCommand::Start {} => {
            let conf = get_conf(&conf_path)?.ok_or(NodeError::NotInitialized)?;
            start(conf).await?;
        }
        CliCommand::Send { ip, line } => {
            let conf = get_conf(&conf_path)?.ok_or(NodeError::NotInitialized)?;
            println!("{}", send(&conf, ip, &line.join(" ")).await);
        }
    }

    Ok(())
}
