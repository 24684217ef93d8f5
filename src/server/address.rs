use std::net::{IpAddr, Ipv4Addr};

use anyhow::Context;

use crate::config::Config;

/// Source of the device's interface addresses.
pub trait Interfaces {
    /// Address of the client (station) interface, if it is up.
    fn station(&self) -> Option<Ipv4Addr>;
    /// Address of the access-point interface, if it is up.
    fn access_point(&self) -> Option<Ipv4Addr>;
}

/// Prefers the station address, falling back to the access point.
pub fn discover(ifaces: &impl Interfaces) -> Option<Ipv4Addr> {
    ifaces.station().or_else(|| ifaces.access_point())
}

/// Snapshot of `(interface name, address)` pairs with the two roles named.
///
/// A role is active when its interface carries a non-loopback IPv4 address.
#[derive(Debug, Clone)]
pub struct InterfaceTable {
    entries: Vec<(String, IpAddr)>,
    station: String,
    access_point: String,
}

impl InterfaceTable {
    pub fn new(entries: Vec<(String, IpAddr)>, cfg: &Config) -> Self {
        Self {
            entries,
            station: cfg.station_interface.clone(),
            access_point: cfg.access_point_interface.clone(),
        }
    }

    /// Reads the host's interfaces once.
    pub fn system(cfg: &Config) -> anyhow::Result<Self> {
        let entries = local_ip_address::list_afinet_netifas()
            .context("listing network interfaces; set portal_address to skip discovery")?;
        Ok(Self::new(entries, cfg))
    }

    fn ipv4_of(&self, name: &str) -> Option<Ipv4Addr> {
        self.entries.iter().find_map(|(ifname, ip)| match ip {
            IpAddr::V4(v4) if ifname == name && !v4.is_loopback() && !v4.is_unspecified() => Some(*v4),
            _ => None,
        })
    }
}

impl Interfaces for InterfaceTable {
    fn station(&self) -> Option<Ipv4Addr> {
        self.ipv4_of(&self.station)
    }

    fn access_point(&self) -> Option<Ipv4Addr> {
        self.ipv4_of(&self.access_point)
    }
}

/// The address every DNS answer points at.
pub fn portal_address(cfg: &Config) -> anyhow::Result<Ipv4Addr> {
    if let Some(addr) = cfg.portal_address {
        return Ok(addr);
    }

    let table = InterfaceTable::system(cfg)?;
    discover(&table).with_context(|| {
        format!(
            "neither {} nor {} has an IPv4 address; set portal_address",
            cfg.station_interface, cfg.access_point_interface
        )
    })
}
