//! Network endpoint handlers.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, error, instrument};

use system_monitor::collectors::netdev::{
    count_inet_sockets, read_interface_flags, read_netdev_stats, InterfaceFlags, NetDevStats,
};
use system_monitor::format::bytes_to_human;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct InterfaceLinkStats {
    pub isup: bool,
    pub mtu: u32,
    pub speed: u32,
}

impl From<InterfaceFlags> for InterfaceLinkStats {
    fn from(flags: InterfaceFlags) -> Self {
        Self {
            isup: flags.is_up,
            mtu: flags.mtu,
            speed: flags.speed_mbps,
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct InterfaceSummary {
    pub nic: String,
    pub bytes_sent: String,
    pub bytes_received: String,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub stats: InterfaceLinkStats,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct NetworkResponse {
    pub bytes_sent: String,
    pub bytes_recv: String,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub num_sockets: usize,
    pub num_interfaces: usize,
    pub errin: u64,
    pub errout: u64,
    pub interfaces: Vec<InterfaceSummary>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct InterfaceDetails {
    pub interface: String,
    pub bytes_sent: String,
    pub bytes_recv: String,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errin: u64,
    pub errout: u64,
    pub dropin: u64,
    pub dropout: u64,
}

/// Builds the summary response; `flags` supplies link state per interface.
pub fn network_response<F>(
    stats: &BTreeMap<String, NetDevStats>,
    num_sockets: usize,
    flags: F,
) -> NetworkResponse
where
    F: Fn(&str) -> InterfaceFlags,
{
    let mut total = NetDevStats::default();
    for s in stats.values() {
        total.accumulate(s);
    }

    let interfaces = stats
        .iter()
        .map(|(nic, s)| InterfaceSummary {
            nic: nic.clone(),
            bytes_sent: bytes_to_human(s.transmit_bytes, 2),
            bytes_received: bytes_to_human(s.receive_bytes, 2),
            packets_sent: s.transmit_packets,
            packets_received: s.receive_packets,
            stats: flags(nic).into(),
        })
        .collect();

    NetworkResponse {
        bytes_sent: bytes_to_human(total.transmit_bytes, 1),
        bytes_recv: bytes_to_human(total.receive_bytes, 1),
        packets_sent: total.transmit_packets,
        packets_recv: total.receive_packets,
        num_sockets,
        num_interfaces: stats.len(),
        errin: total.receive_errs,
        errout: total.transmit_errs,
        interfaces,
    }
}

pub fn network_details(stats: &BTreeMap<String, NetDevStats>) -> Vec<InterfaceDetails> {
    stats
        .iter()
        .map(|(interface, s)| InterfaceDetails {
            interface: interface.clone(),
            bytes_sent: bytes_to_human(s.transmit_bytes, 1),
            bytes_recv: bytes_to_human(s.receive_bytes, 1),
            packets_sent: s.transmit_packets,
            packets_recv: s.receive_packets,
            errin: s.receive_errs,
            errout: s.transmit_errs,
            dropin: s.receive_drop,
            dropout: s.transmit_drop,
        })
        .collect()
}

fn read_stats() -> Result<BTreeMap<String, NetDevStats>, (StatusCode, String)> {
    read_netdev_stats().map_err(|e| {
        error!("{}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e)
    })
}

/// Handler for /api/v1/network.
#[instrument]
pub async fn network_handler() -> Result<Json<NetworkResponse>, (StatusCode, String)> {
    debug!("Processing /api/v1/network request");
    let stats = read_stats()?;
    Ok(Json(network_response(
        &stats,
        count_inet_sockets(),
        read_interface_flags,
    )))
}

/// Handler for /api/v1/network/details.
#[instrument]
pub async fn network_details_handler() -> Result<Json<Vec<InterfaceDetails>>, (StatusCode, String)>
{
    debug!("Processing /api/v1/network/details request");
    let stats = read_stats()?;
    Ok(Json(network_details(&stats)))
}
