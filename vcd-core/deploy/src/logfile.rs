//! 纯文本日志写入
//!
//! 与 tracing 控制台日志分开的两类落盘日志：
//! - 部署清单：每创建成功一台虚拟机追加一行 `DEPLOYVM:<名称>` 记录
//! - 通用日志：带时间戳与进程信息的里程碑记录

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::Local;

use crate::error::Result;

/// 追加一行原始文本（部署清单用）
pub fn append_line(path: &Path, msg: &str) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", msg)?;
    Ok(())
}

/// 追加一行带时间戳与进程信息的记录
///
/// 格式: `YYYY-MM-DD HH:MM:SS {<程序名>}{PID: <进程号>} <消息>`
pub fn append_timestamped(path: &Path, msg: &str) -> Result<()> {
    let invoker = std::env::args().next().unwrap_or_default();
    let line = format!(
        "{} {{{}}}{{PID: {}}} {}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        invoker,
        std::process::id(),
        msg
    );
    append_line(path, &line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_append_line_accumulates() {
        let path = std::env::temp_dir().join("vcd_logfile_test_lines.log");
        let _ = fs::remove_file(&path);

        append_line(&path, "DEPLOYVM:vm-00212").unwrap();
        append_line(&path, "DEPLOYVM:vm-00213").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "DEPLOYVM:vm-00212\nDEPLOYVM:vm-00213\n");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_append_timestamped_format() {
        let path = std::env::temp_dir().join("vcd_logfile_test_stamped.log");
        let _ = fs::remove_file(&path);

        append_timestamped(&path, "开始部署").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let line = content.lines().next().unwrap();
        // 前缀是 "YYYY-MM-DD HH:MM:SS "
        assert_eq!(line.as_bytes()[4], b'-');
        assert_eq!(line.as_bytes()[10], b' ');
        assert!(line.contains("{PID: "));
        assert!(line.ends_with("开始部署"));
        let _ = fs::remove_file(&path);
    }
}
