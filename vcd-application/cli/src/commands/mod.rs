//! CLI 命令处理

pub mod common;
pub mod delete;
pub mod deploy;
pub mod ip;
