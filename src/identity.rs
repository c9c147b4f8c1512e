//! Resolution of the address and hostname a host registers under.

use crate::snapshot::HostIdentity;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use sysinfo::System;
use tracing::{debug, warn};

/// Public address used only to pick the outbound interface; no packet is sent.
const ROUTE_PROBE_ADDR: &str = "8.8.8.8:80";

/// Picks the registration IP: the override if set, else the address of the
/// interface carrying the default route, else loopback.
pub fn resolve_ip(advertise_ip: Option<IpAddr>) -> IpAddr {
    if let Some(ip) = advertise_ip {
        debug!("Using advertised address {}", ip);
        return ip;
    }

    match outbound_ip() {
        Ok(ip) => ip,
        Err(e) => {
            warn!("Could not determine outbound address, using loopback: {}", e);
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

fn outbound_ip() -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect(ROUTE_PROBE_ADDR)?;
    Ok(socket.local_addr()?.ip())
}

/// The OS hostname, or `"localhost"` when it cannot be read.
pub fn resolve_hostname() -> String {
    System::host_name().unwrap_or_else(|| "localhost".to_string())
}

pub fn resolve_identity(advertise_ip: Option<IpAddr>, access_port: u16) -> HostIdentity {
    HostIdentity {
        ip: resolve_ip(advertise_ip).to_string(),
        hostname: resolve_hostname(),
        access_port,
    }
}
