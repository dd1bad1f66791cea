//! 子网枚举与主机探测。
//!
//! 探测用 1 秒超时的 TCP 连接（端口 80）：任何发往目标地址的 IP
//! 报文都会触发内核做 ARP 解析，这正是灌注 ARP 缓存所需要的全部。

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tracing::debug;

/// 单台主机的探测超时。
pub const HOST_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// 枚举本机非回环 IPv4 接口，按部署约定取各自的 /24 网段基址。
pub fn local_subnets() -> Vec<Ipv4Addr> {
    let Ok(interfaces) = if_addrs::get_if_addrs() else {
        return Vec::new();
    };
    let mut subnets = Vec::new();
    for interface in interfaces {
        if interface.is_loopback() {
            continue;
        }
        if let IpAddr::V4(ip) = interface.ip() {
            let base = subnet_base(ip);
            if !subnets.contains(&base) {
                subnets.push(base);
            }
        }
    }
    subnets
}

/// /24 网段基址（a.b.c.0）。
pub fn subnet_base(ip: Ipv4Addr) -> Ipv4Addr {
    let octets = ip.octets();
    Ipv4Addr::new(octets[0], octets[1], octets[2], 0)
}

/// 网段内的可用主机地址 1..=254。
pub fn subnet_hosts(base: Ipv4Addr) -> impl Iterator<Item = Ipv4Addr> {
    let octets = base.octets();
    (1_u8..=254).map(move |host| Ipv4Addr::new(octets[0], octets[1], octets[2], host))
}

/// 并发探测所有网段的全部主机；结果无所谓，目的只是灌注 ARP 缓存。
pub async fn ping_sweep(subnets: &[Ipv4Addr]) {
    let mut probes = JoinSet::new();
    for base in subnets {
        for host in subnet_hosts(*base) {
            probes.spawn(async move {
                let addr = SocketAddr::new(IpAddr::V4(host), 80);
                let _ = tokio::time::timeout(HOST_PROBE_TIMEOUT, TcpStream::connect(addr)).await;
            });
        }
    }
    let total = probes.len();
    while probes.join_next().await.is_some() {}
    debug!(target: "fronius.scan", hosts = total, "host_sweep_done");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subnet_base_masks_host_octet() {
        assert_eq!(
            subnet_base(Ipv4Addr::new(192, 168, 1, 42)),
            Ipv4Addr::new(192, 168, 1, 0)
        );
    }

    #[test]
    fn subnet_hosts_covers_one_to_254() {
        let hosts: Vec<Ipv4Addr> = subnet_hosts(Ipv4Addr::new(10, 0, 0, 0)).collect();
        assert_eq!(hosts.len(), 254);
        assert_eq!(hosts[0], Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(hosts[253], Ipv4Addr::new(10, 0, 0, 254));
    }
}
