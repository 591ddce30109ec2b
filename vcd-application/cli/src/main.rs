//! VCD CLI 应用

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "vcd")]
#[command(about = "VCD - vCenter 虚拟机批量部署工具", long_about = None)]
#[command(version)]
struct Cli {
    /// 日志级别 (DEBUG/INFO/WARNING)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// 输出日志文件，默认 vm_operation_<时间戳>.log
    #[arg(short, long)]
    outlogfile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 按 YAML 配置批量部署虚拟机
    Deploy {
        /// YAML 配置文件路径
        #[arg(short = 'y', long)]
        yamlfile: String,

        /// 要部署的 YAML 小节名称
        #[arg(short = 's', long)]
        section: String,
    },

    /// 关机并删除虚拟机
    Delete {
        /// YAML 配置文件路径（只读取 VCenter 小节）
        #[arg(short = 'y', long)]
        yamlfile: String,

        /// 虚拟机名称列表（逗号分隔）
        #[arg(long)]
        vms: String,
    },

    /// 查询虚拟机的客户机 IP 地址
    Ip {
        /// YAML 配置文件路径（只读取 VCenter 小节）
        #[arg(short = 'y', long)]
        yamlfile: String,

        /// 虚拟机名称列表（逗号分隔）
        #[arg(long)]
        vms: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        other => anyhow::bail!("无效的日志级别 {}，请在 DEBUG/INFO/WARNING 中选择", other),
    };

    tracing_subscriber::fmt().with_max_level(log_level).init();

    let outlogfile = cli.outlogfile.unwrap_or_else(|| {
        format!(
            "vm_operation_{}.log",
            chrono::Local::now().format("%Y_%m_%d_%H_%M_%S")
        )
    });

    info!("VCD CLI 启动");

    // 处理命令
    match cli.command {
        Commands::Deploy { yamlfile, section } => {
            commands::deploy::handle(&yamlfile, &section, &outlogfile).await?
        }
        Commands::Delete { yamlfile, vms } => commands::delete::handle(&yamlfile, &vms).await?,
        Commands::Ip { yamlfile, vms } => commands::ip::handle(&yamlfile, &vms).await?,
    }

    Ok(())
}
