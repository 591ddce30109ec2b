//! 性能结果文件解析
//!
//! 文件按 `&&&& RUNNING <测试名>` 行切分为测试小节，相邻两个
//! RUNNING 标记之间是一个测试的完整输出；最后一个 RUNNING 之后
//! 的内容没有后继标记收尾，不参与报告。
//!
//! 每个小节内：
//! - 测试结果取最后一个 `&&&& <状态> <测试名>` 行的状态字段，
//!   没有时记为 "Not found"
//! - `&&&& PERF` 行成对划出性能数据块，块内逐行归类统计：
//!   时延类取归一化后的最小值，吞吐类取最大值

use std::fmt::Write as _;

use anyhow::Result;
use regex::Regex;

/// 输出标签与数值的对齐列宽
const COLUMN_WIDTH: usize = 50;

/// 渲染整个性能报告
pub fn render_report(content: &str) -> Result<String> {
    let running = Regex::new(r"^&&&& RUNNING\s+(\S+)")?;
    let lines: Vec<&str> = content.lines().collect();

    let mut out = String::new();
    let mut start: Option<usize> = None;
    let mut prev_name: Option<String> = None;

    for (i, raw) in lines.iter().enumerate() {
        let Some(caps) = running.captures(raw.trim()) else {
            continue;
        };
        let Some(name) = caps.get(1).map(|m| m.as_str().to_string()) else {
            continue;
        };

        if let (Some(section_start), Some(prev)) = (start, prev_name.as_deref()) {
            render_test(&mut out, prev, &lines[section_start..i])?;
        }
        start = Some(i);
        prev_name = Some(name);
    }

    Ok(out)
}

/// 渲染一个测试小节
fn render_test(out: &mut String, test_name: &str, section: &[&str]) -> Result<()> {
    // 结果取小节内最后一个状态行 (如 "&&&& PASSED <测试名> ...")
    let status = Regex::new(&format!(
        r"^&&&&\s+(\S+)\s+{}",
        regex::escape(test_name)
    ))?;
    let mut test_result = "Not found".to_string();
    for line in &section[1..] {
        if let Some(result) = status
            .captures(line.trim())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
        {
            test_result = result;
        }
    }

    writeln!(out, "Test Name: \t {}", test_name)?;
    writeln!(out, "Test Result: \t {}", test_result)?;

    // PERF 标记成对划出性能数据块
    let mut block_start: Option<usize> = None;
    for (i, line) in section.iter().enumerate() {
        if !line.trim().starts_with("&&&& PERF") {
            continue;
        }
        match block_start {
            None => block_start = Some(i),
            Some(s) => {
                render_perf_block(out, &section[s..=i])?;
                block_start = None;
            }
        }
    }

    Ok(())
}

/// 单个类别的最优值
#[derive(Default)]
struct Best {
    perf_name: String,
    val: f64,
    set: bool,
}

impl Best {
    fn update_max(&mut self, perf_name: &str, val: f64) {
        if !self.set || val > self.val {
            self.perf_name = perf_name.to_string();
            self.val = val;
            self.set = true;
        }
    }

    fn update_min(&mut self, perf_name: &str, val: f64) {
        if !self.set || val < self.val {
            self.perf_name = perf_name.to_string();
            self.val = val;
            self.set = true;
        }
    }
}

/// 渲染一个性能数据块的分类最优值
fn render_perf_block(out: &mut String, block: &[&str]) -> Result<()> {
    let prefix = Regex::new(r"&&&& PERF\s*")?;
    let thread_re = Regex::new(r"\S+Thread_+size\S+latency")?;
    let warp_re = Regex::new(r"\S+Warp_+size\S+latency")?;
    let block_re = Regex::new(r"\S+Block_+size\S+latency")?;
    let latency_re = Regex::new(r"_+latency$")?;
    let size_re = Regex::new(r"size_+(\d+)_+latency")?;

    let mut uni = Best::default();
    let mut bidi = Best::default();
    let mut thread = Best::default();
    let mut warp = Best::default();
    let mut block_best = Best::default();
    let mut latency = Best::default();
    let mut throughput = Best::default();
    let mut unit = String::new();

    for raw in block {
        let line = prefix.replace(raw.trim(), "");
        let parts: Vec<&str> = line.split_whitespace().collect();
        // 每行固定三列: 性能项名称 数值 单位
        if parts.len() != 3 {
            continue;
        }

        let perf_name = parts[0];
        unit = parts[2].to_string();

        if perf_name.contains("_uni___") {
            if let Ok(val) = parts[1].parse::<f64>() {
                uni.update_max(perf_name, val);
            }
            continue;
        }
        if perf_name.contains("_bidi___") {
            if let Ok(val) = parts[1].parse::<f64>() {
                bidi.update_max(perf_name, val);
            }
            continue;
        }

        if thread_re.is_match(perf_name) {
            if let Some(val) = normalized_latency(&size_re, perf_name, parts[1]) {
                thread.update_min(perf_name, val);
            }
            continue;
        }
        if warp_re.is_match(perf_name) {
            if let Some(val) = normalized_latency(&size_re, perf_name, parts[1]) {
                warp.update_min(perf_name, val);
            }
            continue;
        }
        if block_re.is_match(perf_name) {
            if let Some(val) = normalized_latency(&size_re, perf_name, parts[1]) {
                block_best.update_min(perf_name, val);
            }
            continue;
        }
        if latency_re.is_match(perf_name) {
            if let Some(val) = normalized_latency(&size_re, perf_name, parts[1]) {
                latency.update_min(perf_name, val);
            }
            continue;
        }
        if unit.ends_with("GB/sec") {
            if let Ok(val) = parts[1].parse::<f64>() {
                throughput.update_max(perf_name, val);
            }
        }
    }

    // 单位去掉前导的 "+" 或 "-" (如 "+GB/sec" / "-us")
    let unit = unit
        .strip_prefix('+')
        .or_else(|| unit.strip_prefix('-'))
        .unwrap_or(&unit);

    print_best(out, "latency test", &latency, unit)?;
    print_best(out, "throughput test", &throughput, unit)?;
    print_best(out, "thread latency test", &thread, unit)?;
    print_best(out, "warp latency test", &warp, unit)?;
    print_best(out, "block latency test", &block_best, unit)?;
    print_best(out, "uni throughput test", &uni, unit)?;
    print_best(out, "bidi throughput test", &bidi, unit)?;

    writeln!(out, "{}", "-".repeat(120))?;
    Ok(())
}

/// 时延按字节大小归一化，保留 6 位小数
///
/// 名称形如 `shmem_p_latency___None___size__256___latency`，
/// 取 size 字段做除数；取不到 size 或数值无效时整行跳过。
fn normalized_latency(size_re: &Regex, perf_name: &str, value: &str) -> Option<f64> {
    let size: f64 = size_re
        .captures(perf_name)?
        .get(1)?
        .as_str()
        .parse()
        .ok()?;
    let val: f64 = value.parse().ok()?;
    Some(((val / size) * 1e6).round() / 1e6)
}

fn print_best(out: &mut String, label: &str, best: &Best, unit: &str) -> Result<()> {
    if !best.set {
        return Ok(());
    }
    writeln!(
        out,
        "{:<width$}{:<width$}",
        format!("\t\t {} best performance:", label),
        best.perf_name,
        width = COLUMN_WIDTH
    )?;
    writeln!(
        out,
        "{:<width$}{:<width$}",
        format!("\t\t {} result:", label),
        format!("{:.6} {}", best.val, unit),
        width = COLUMN_WIDTH
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LATENCY_SAMPLE: &str = "\
&&&& RUNNING device/pt-to-pt/shmem_p_latency -n 2 -npernode 2
some unrelated output
&&&& PERF
shmem_p_latency___None___size__4___latency 1.0 -us
shmem_p_latency___None___size__256___latency 3.95264 -us
&&&& PERF
&&&& PASSED device/pt-to-pt/shmem_p_latency -n 2 -npernode 2
&&&& RUNNING device/pt-to-pt/shmem_put_bw -n 2 -npernode 2
trailing content never reported
";

    #[test]
    fn test_latency_section() {
        let out = render_report(LATENCY_SAMPLE).unwrap();

        assert!(out.contains("Test Name: \t device/pt-to-pt/shmem_p_latency"));
        assert!(out.contains("Test Result: \t PASSED"));
        // 3.95264 / 256 = 0.015440，归一化后优于 1.0 / 4
        assert!(out.contains("0.015440 us"));
        assert!(out.contains("shmem_p_latency___None___size__256___latency"));
        assert!(out.contains(&"-".repeat(120)));
    }

    #[test]
    fn test_last_section_not_reported() {
        let out = render_report(LATENCY_SAMPLE).unwrap();
        // 最后一个 RUNNING 小节没有收尾标记，不出现在报告里
        assert!(!out.contains("shmem_put_bw"));
    }

    const THROUGHPUT_SAMPLE: &str = "\
&&&& RUNNING bwtest -n 2
&&&& PERF
shmem_put_bw_uni___None___size__1024___BW 10.5 +GB/sec
shmem_put_bw_uni___None___size__2048___BW 12.25 +GB/sec
shmem_put_bw_bidi___None___size__1024___BW 20.0 +GB/sec
shmem_p_bw___None___size__1024___BW 0.232831 +GB/sec
&&&& PERF
&&&& FAILED bwtest -n 2
&&&& RUNNING sentinel
";

    #[test]
    fn test_throughput_section() {
        let out = render_report(THROUGHPUT_SAMPLE).unwrap();

        assert!(out.contains("Test Result: \t FAILED"));
        // uni/bidi 取最大值
        assert!(out.contains("shmem_put_bw_uni___None___size__2048___BW"));
        assert!(out.contains("12.250000 GB/sec"));
        assert!(out.contains("20.000000 GB/sec"));
        // 未分类的 GB/sec 行落入普通吞吐类别
        assert!(out.contains("throughput test best performance:"));
        assert!(out.contains("0.232831 GB/sec"));
    }

    const SCOPED_SAMPLE: &str = "\
&&&& RUNNING scopes -n 2
&&&& PERF
shmem_put_latency___Thread___size__4___latency 4.20352 -us
shmem_put_latency___Warp___size__4___latency 2.0 -us
shmem_put_latency___Block___size__8___latency 4.0 -us
&&&& PERF
&&&& RUNNING sentinel
";

    #[test]
    fn test_scoped_latency_categories() {
        let out = render_report(SCOPED_SAMPLE).unwrap();

        // 没有状态行时结果记为 Not found
        assert!(out.contains("Test Result: \t Not found"));
        assert!(out.contains("thread latency test best performance:"));
        assert!(out.contains("1.050880 us"));
        assert!(out.contains("warp latency test best performance:"));
        assert!(out.contains("0.500000 us"));
        assert!(out.contains("block latency test best performance:"));
    }

    #[test]
    fn test_unpaired_perf_marker_ignored() {
        let sample = "\
&&&& RUNNING solo -n 2
&&&& PERF
shmem_p_latency___None___size__4___latency 1.0 -us
&&&& RUNNING sentinel
";
        let out = render_report(sample).unwrap();
        // 只有一个 PERF 标记，数据块不成对，不输出性能数据
        assert!(out.contains("Test Name: \t solo"));
        assert!(!out.contains("latency test best performance:"));
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let sample = "\
&&&& RUNNING robust -n 2
&&&& PERF
not a perf line
shmem_p_latency___None___size__4___latency 1.0 -us extra
shmem_p_latency___None___size__4___latency 2.0 -us
&&&& PERF
&&&& RUNNING sentinel
";
        let out = render_report(sample).unwrap();
        // 非三列的行全部跳过，只统计合法行
        assert!(out.contains("0.500000 us"));
    }
}
