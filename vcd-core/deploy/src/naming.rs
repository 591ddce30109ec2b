//! 虚拟机名称序列生成
//!
//! 基础名必须以数字结尾，数字段决定整组名称的起始序号与
//! 零填充宽度。

use chrono::{Local, TimeZone};

use crate::error::{DeployError, Result};

/// 序号超过该值时视为时间戳种子，转为本地时间格式后缀
const TIMESTAMP_SEED: u64 = 10000;

/// 从基础名生成连续的虚拟机名称序列
///
/// 数字后缀逐一递增，保持原有零填充宽度：`vm-00212` 的下一个
/// 是 `vm-00213`。序号大于 10000 时按 Unix 时间戳解释，后缀为
/// 对应本地时间的 `%m%d%H%M%S`，让同一秒内的多次部署互不冲突。
///
/// 基础名不以数字结尾时返回 [`DeployError::InvalidBaseName`]。
pub fn build_vm_names(base_vmname: &str, count: usize) -> Result<Vec<String>> {
    let prefix_end = base_vmname
        .trim_end_matches(|c: char| c.is_ascii_digit())
        .len();
    let (prefix, digits) = base_vmname.split_at(prefix_end);
    if digits.is_empty() {
        return Err(DeployError::InvalidBaseName(format!(
            "{} 不以数字结尾",
            base_vmname
        )));
    }

    let start: u64 = digits
        .parse()
        .map_err(|_| DeployError::InvalidBaseName(format!("{} 数字后缀过长", base_vmname)))?;
    let width = digits.len();

    let mut names = Vec::with_capacity(count);
    for i in 0..count as u64 {
        let seq = start.checked_add(i).ok_or_else(|| {
            DeployError::InvalidBaseName(format!("{} 数字序号溢出", base_vmname))
        })?;
        let suffix = if seq > TIMESTAMP_SEED {
            match Local.timestamp_opt(seq as i64, 0).single() {
                Some(time) => time.format("%m%d%H%M%S").to_string(),
                None => format!("{:0width$}", seq, width = width),
            }
        } else {
            format!("{:0width$}", seq, width = width)
        };
        names.push(format!("{}{}", prefix, suffix));
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_padding_preserved() {
        let names = build_vm_names("vm-00212", 3).unwrap();
        assert_eq!(names, vec!["vm-00212", "vm-00213", "vm-00214"]);
    }

    #[test]
    fn test_no_padding() {
        let names = build_vm_names("node9", 3).unwrap();
        assert_eq!(names, vec!["node9", "node10", "node11"]);
    }

    #[test]
    fn test_timestamp_seed_rollover() {
        // 种子是 Unix 时间戳，后缀转为 10 位本地时间
        let names = build_vm_names("vm-1625573421", 2).unwrap();
        assert_eq!(names.len(), 2);
        for name in &names {
            assert!(name.starts_with("vm-"));
            let suffix = &name[3..];
            assert_eq!(suffix.len(), 10);
            assert!(suffix.chars().all(|c| c.is_ascii_digit()));
        }
        // 相邻两秒的时间戳后缀不同
        assert_ne!(names[0], names[1]);
    }

    #[test]
    fn test_rejects_sequence_overflow() {
        // 起始序号已是 u64 最大值，第二个名称无法递增
        assert!(matches!(
            build_vm_names("vm-18446744073709551615", 2),
            Err(DeployError::InvalidBaseName(_))
        ));
    }

    #[test]
    fn test_rejects_name_without_digits() {
        assert!(matches!(
            build_vm_names("vm-base", 2),
            Err(DeployError::InvalidBaseName(_))
        ));
    }
}
