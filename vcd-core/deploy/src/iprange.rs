//! IPv4 地址范围展开
//!
//! 把 `192.168.0.41-192.168.0.51` 或简写 `192.168.0.41-51`
//! 展开为逐个地址的列表。

use std::net::Ipv4Addr;

use crate::error::{DeployError, Result};

/// 展开一个地址或地址范围
///
/// - 空白字符先全部剔除
/// - 不含连字符的文本原样返回单元素列表（`dhcp` 等标记也走这里）
/// - 范围右端不超过 3 个字符时视为简写，替换左端末尾的数字段
/// - 范围按无符号整形升序展开，两端都包含在内
pub fn expand(text: &str) -> Result<Vec<String>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();

    if !compact.contains('-') {
        return Ok(vec![compact]);
    }

    // 连续多个连字符与单个等价
    let parts: Vec<&str> = compact.split('-').filter(|s| !s.is_empty()).collect();
    if parts.len() != 2 {
        return Err(DeployError::InvalidRange(text.to_string()));
    }

    let start_txt = parts[0];
    let last_txt = if parts[1].len() <= 3 {
        // 简写：右端只写末段，替换左端末尾的数字段
        let prefix_end = start_txt
            .trim_end_matches(|c: char| c.is_ascii_digit())
            .len();
        format!("{}{}", &start_txt[..prefix_end], parts[1])
    } else {
        parts[1].to_string()
    };

    let start: Ipv4Addr = start_txt
        .parse()
        .map_err(|_| DeployError::InvalidRange(text.to_string()))?;
    let last: Ipv4Addr = last_txt
        .parse()
        .map_err(|_| DeployError::InvalidRange(text.to_string()))?;

    let (lo, hi) = (u32::from(start), u32::from(last));
    if lo > hi {
        return Err(DeployError::InvalidRange(text.to_string()));
    }

    Ok((lo..=hi).map(|n| Ipv4Addr::from(n).to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_address_passthrough() {
        assert_eq!(expand("192.168.0.41").unwrap(), vec!["192.168.0.41"]);
        // DHCP 标记不校验，原样通过
        assert_eq!(expand("dhcp").unwrap(), vec!["dhcp"]);
    }

    #[test]
    fn test_full_range() {
        let ips = expand("192.168.0.41-192.168.0.43").unwrap();
        assert_eq!(ips, vec!["192.168.0.41", "192.168.0.42", "192.168.0.43"]);
    }

    #[test]
    fn test_shorthand_range() {
        let ips = expand("192.168.0.41-51").unwrap();
        assert_eq!(ips.len(), 11);
        assert_eq!(ips[0], "192.168.0.41");
        assert_eq!(ips[10], "192.168.0.51");
    }

    #[test]
    fn test_double_hyphen_and_spaces() {
        let ips = expand(" 192.168.0.41 -- 51 ").unwrap();
        assert_eq!(ips.len(), 11);
    }

    #[test]
    fn test_range_crosses_octet_boundary() {
        let ips = expand("192.168.0.254-192.168.1.1").unwrap();
        assert_eq!(
            ips,
            vec!["192.168.0.254", "192.168.0.255", "192.168.1.0", "192.168.1.1"]
        );
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        assert!(expand("192.168.0.51-41").is_err());
        assert!(expand("192.168.0.x-51").is_err());
        assert!(expand("1-2-3").is_err());
    }
}
