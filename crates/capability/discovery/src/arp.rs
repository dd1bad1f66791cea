//! ARP 表读取与解析。
//!
//! Linux 上调用 `arp -n`（表格格式），其余平台调用 `arp -a`
//! （`hostname (ip) at mac on if` 格式）。两种输出都能解析。

use crate::DiscoveryError;
use std::net::Ipv4Addr;
use tokio::process::Command;

/// 一条 ARP 表项。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpEntry {
    pub ip: Ipv4Addr,
    /// 规范化为小写 `aa:bb:cc:dd:ee:ff`。
    pub mac: String,
    pub hostname: Option<String>,
}

/// 读取并解析系统 ARP 表。
pub async fn read_arp_table() -> Result<Vec<ArpEntry>, DiscoveryError> {
    let output = Command::new("arp")
        .arg(if cfg!(target_os = "linux") { "-n" } else { "-a" })
        .output()
        .await
        .map_err(|err| DiscoveryError::ArpRead(err.to_string()))?;
    if !output.status.success() {
        return Err(DiscoveryError::ArpRead(format!(
            "arp exited with {}",
            output.status
        )));
    }
    let text = String::from_utf8_lossy(&output.stdout);
    Ok(parse_arp_output(&text))
}

/// 解析 `arp` 输出，表格格式与括号格式都接受。
pub fn parse_arp_output(text: &str) -> Vec<ArpEntry> {
    text.lines().filter_map(parse_arp_line).collect()
}

fn parse_arp_line(line: &str) -> Option<ArpEntry> {
    let line = line.trim();
    if line.is_empty() || line.contains("incomplete") {
        return None;
    }
    if line.contains(" at ") && line.contains('(') {
        return parse_paren_format(line);
    }
    parse_table_format(line)
}

/// `hostname (192.168.1.50) at aa:bb:cc:dd:ee:ff on en0 …`
fn parse_paren_format(line: &str) -> Option<ArpEntry> {
    let open = line.find('(')?;
    let close = line.find(')')?;
    let ip: Ipv4Addr = line.get(open + 1..close)?.parse().ok()?;
    let hostname = match line[..open].trim() {
        "" | "?" => None,
        name => Some(name.to_string()),
    };
    let after_at = line.split(" at ").nth(1)?;
    let mac = normalize_mac(after_at.split_whitespace().next()?)?;
    Some(ArpEntry { ip, mac, hostname })
}

/// `192.168.1.50   ether   aa:bb:cc:dd:ee:ff   C   eth0`
fn parse_table_format(line: &str) -> Option<ArpEntry> {
    let mut fields = line.split_whitespace();
    let ip: Ipv4Addr = fields.next()?.parse().ok()?;
    let mac = fields.find_map(normalize_mac)?;
    Some(ArpEntry {
        ip,
        mac,
        hostname: None,
    })
}

/// 规范化 MAC：冒号或横线分隔都接受，八位组补零，输出小写冒号格式。
pub fn normalize_mac(raw: &str) -> Option<String> {
    let separator = if raw.contains(':') {
        ':'
    } else if raw.contains('-') {
        '-'
    } else {
        return None;
    };
    let octets: Vec<&str> = raw.split(separator).collect();
    if octets.len() != 6 {
        return None;
    }
    let mut parts = Vec::with_capacity(6);
    for octet in octets {
        if octet.is_empty() || octet.len() > 2 || !octet.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        parts.push(format!("{:0>2}", octet.to_ascii_lowercase()));
    }
    Some(parts.join(":"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_linux_table_output() {
        let text = "\
Address                  HWtype  HWaddress           Flags Mask            Iface
192.168.1.50             ether   A0:1B:63:11:22:33   C                     eth0
192.168.1.77                     (incomplete)                              eth0
192.168.1.1              ether   00:1c:2d:3e:4f:50   C                     eth0
";
        let entries = parse_arp_output(text);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].ip, Ipv4Addr::new(192, 168, 1, 50));
        assert_eq!(entries[0].mac, "a0:1b:63:11:22:33");
        assert_eq!(entries[0].hostname, None);
    }

    #[test]
    fn parses_macos_paren_output() {
        let text = "\
fronius-gen24 (192.168.1.50) at a0:1b:63:4:5:6 on en0 ifscope [ethernet]
? (192.168.1.1) at 0:1c:2d:3e:4f:50 on en0 ifscope [ethernet]
";
        let entries = parse_arp_output(text);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].hostname.as_deref(), Some("fronius-gen24"));
        // 单位八位组补零
        assert_eq!(entries[0].mac, "a0:1b:63:04:05:06");
        assert_eq!(entries[1].hostname, None);
        assert_eq!(entries[1].mac, "00:1c:2d:3e:4f:50");
    }

    #[test]
    fn normalizes_windows_dash_macs() {
        assert_eq!(
            normalize_mac("A0-1B-63-11-22-33").as_deref(),
            Some("a0:1b:63:11:22:33")
        );
    }

    #[test]
    fn rejects_malformed_macs() {
        assert_eq!(normalize_mac("(incomplete)"), None);
        assert_eq!(normalize_mac("a0:1b:63"), None);
        assert_eq!(normalize_mac("a0:1b:63:11:22:zz"), None);
        assert_eq!(normalize_mac("a01b63112233"), None);
    }
}
