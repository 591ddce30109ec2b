//! 性能结果解析工具
//!
//! 从性能测试输出文件中提取每个测试的运行结果与最优性能数据。

use anyhow::{Context, Result};
use clap::Parser;

mod parser;

#[derive(Parser)]
#[command(name = "perfparse")]
#[command(about = "解析性能测试结果文件", long_about = None)]
#[command(version)]
struct Cli {
    /// 性能结果文件路径
    #[arg(short = 'f', long = "perfile")]
    perfile: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    println!(
        "Parsing performance results file '{}' to get performance run details",
        cli.perfile
    );

    let content = std::fs::read_to_string(&cli.perfile)
        .with_context(|| format!("读取性能结果文件失败: {}", cli.perfile))?;

    print!("{}", parser::render_report(&content)?);
    Ok(())
}
