pub mod bank;
pub mod cli;
pub mod common;
pub mod config;
pub mod core;
pub mod db;
pub mod net;
pub mod node;
pub mod protocol;
pub mod robbery;
