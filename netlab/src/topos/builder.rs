// netlab: Routing Lab Orchestration on Linux Network Namespaces
// Copyright (C) 2021  The netlab developers
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Helpers to compose scenarios.

use crate::topology::{Daemon, LinkOptions, RouterAttrs, TopologyGraph};
use crate::Error;
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// Address `<a.b.c>.<last>/24`, taking the first three octets of `net_addr`.
pub fn host24(net_addr: Ipv4Addr, last: u8) -> Ipv4Net {
    let [a, b, c, _] = net_addr.octets();
    Ipv4Net::new_assert(Ipv4Addr::new(a, b, c, last), 24)
}

/// The /24 network containing `net_addr`.
pub fn net24(net_addr: Ipv4Addr) -> Ipv4Net {
    host24(net_addr, 0)
}

/// Turn a list of string slices into a scripted command sequence.
pub fn script(commands: &[&str]) -> Vec<String> {
    commands.iter().map(|c| c.to_string()).collect()
}

/// Commands enabling OSPF on all interfaces within `network`.
pub fn ospf_setup_commands(network: Ipv4Net, area: u32) -> Vec<String> {
    vec![
        "configure terminal".to_string(),
        "router ospf".to_string(),
        format!("network {} area {}", network, area),
    ]
}

/// Build a router connected to a single host. Within the /24 of `net_addr`, the router receives
/// the `.1` address and the host the `.2` address, with its default route via the router.
///
/// ```text
/// router (.1) ---- (.2) host
/// ```
///
/// Returns the name of the router.
pub fn build_router_and_host(
    graph: &mut TopologyGraph,
    router: &str,
    host: &str,
    net_addr: Ipv4Addr,
    attrs: RouterAttrs,
) -> Result<String, Error> {
    let router_ip = host24(net_addr, 1);
    let host_ip = host24(net_addr, 2);
    let r = graph.add_router(router, attrs, Some(router_ip))?;
    let h = graph.add_host(host, Some(host_ip), Some(router_ip.addr()))?;
    graph.add_link(r.as_str(), h.as_str(), LinkOptions::default())?;
    Ok(r)
}

/// Build an AS consisting of one router (running only `bgpd`) and one host. The router peers with
/// `peer` in `peer_as`, and advertises the local /24.
pub fn build_as(
    graph: &mut TopologyGraph,
    router: &str,
    host: &str,
    net_addr: Ipv4Addr,
    as_number: u32,
    peer: Ipv4Addr,
    peer_as: u32,
) -> Result<String, Error> {
    let commands = vec![
        "configure terminal".to_string(),
        format!("router bgp {}", as_number),
        "no bgp ebgp-requires-policy".to_string(),
        format!("neighbor {} remote-as {}", peer, peer_as),
        format!("network {}", net24(net_addr)),
    ];
    let attrs = RouterAttrs::new(vec![Daemon::Bgpd]).with_commands(commands);
    build_router_and_host(graph, router, host, net_addr, attrs)
}

/// One customer site: an edge router with a single host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerSite {
    /// Name of the customer edge router
    pub ce: String,
    /// Name of the host
    pub host: String,
    /// Network address of the site
    pub net_addr: Ipv4Addr,
}

impl CustomerSite {
    /// Create a new site description
    pub fn new(ce: impl Into<String>, host: impl Into<String>, net_addr: Ipv4Addr) -> Self {
        Self { ce: ce.into(), host: host.into(), net_addr }
    }
}

/// Build two customer sites, whose edge routers run OSPF over `ospf_network` (which must cover
/// both sites). Returns the names of both customer edge routers.
pub fn build_customer_sites(
    graph: &mut TopologyGraph,
    site1: &CustomerSite,
    site2: &CustomerSite,
    ospf_network: Ipv4Net,
    area: u32,
) -> Result<(String, String), Error> {
    let attrs = RouterAttrs::new(vec![Daemon::Ospfd])
        .with_commands(ospf_setup_commands(ospf_network, area));
    let ce1 = build_router_and_host(graph, &site1.ce, &site1.host, site1.net_addr, attrs.clone())?;
    let ce2 = build_router_and_host(graph, &site2.ce, &site2.host, site2.net_addr, attrs)?;
    Ok((ce1, ce2))
}

/// Commands for a provider edge: loopback address, LDP with the loopback as router id and
/// transport address, and an iBGP VPNv4 session to the other provider edge over the loopbacks.
pub fn mpls_bgp_setup_commands(
    local_lo: Ipv4Addr,
    peer_lo: Ipv4Addr,
    as_number: u32,
) -> Vec<String> {
    vec![
        "configure terminal".to_string(),
        "interface lo".to_string(),
        format!("ip address {}/32", local_lo),
        "end".to_string(),
        "configure terminal".to_string(),
        "mpls ldp".to_string(),
        format!("router-id {}", local_lo),
        "address-family ipv4".to_string(),
        format!("discovery transport-address {}", local_lo),
        "end".to_string(),
        "configure terminal".to_string(),
        format!("router bgp {}", as_number),
        format!("bgp router-id {}", local_lo),
        "no bgp ebgp-requires-policy".to_string(),
        format!("neighbor {} remote-as {}", peer_lo, as_number),
        format!("neighbor {} update-source lo", peer_lo),
        "address-family ipv4 vpn".to_string(),
        format!("neighbor {} activate", peer_lo),
        format!("neighbor {} next-hop-self", peer_lo),
        format!("neighbor {} send-community both", peer_lo),
        "end".to_string(),
    ]
}

/// Parameters of a customer VRF on a provider edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VrfParams {
    /// Name of the VRF
    pub name: String,
    /// OSPF network towards the customer edge
    pub ospf_network: Ipv4Net,
    /// OSPF area of the customer
    pub ospf_area: u32,
    /// AS number of the provider
    pub as_number: u32,
    /// Route target, imported and exported
    pub route_target: String,
    /// Route distinguisher of exported routes
    pub route_distinguisher: String,
}

/// Commands creating the VRF in FRRouting, running OSPF towards the customer inside the VRF, and
/// leaking the VRF routes into VPNv4 (and back) with BGP.
pub fn vrf_setup_commands(vrf: &VrfParams) -> Vec<String> {
    vec![
        "configure terminal".to_string(),
        format!("vrf {}", vrf.name),
        "end".to_string(),
        "configure terminal".to_string(),
        format!("router ospf vrf {}", vrf.name),
        format!("network {} area {}", vrf.ospf_network, vrf.ospf_area),
        "redistribute bgp".to_string(),
        "end".to_string(),
        "configure terminal".to_string(),
        format!("router bgp {} vrf {}", vrf.as_number, vrf.name),
        "address-family ipv4".to_string(),
        format!("rt vpn both {}", vrf.route_target),
        format!("rd vpn export {}", vrf.route_distinguisher),
        "label vpn export auto".to_string(),
        "import vpn".to_string(),
        "export vpn".to_string(),
        "redistribute ospf".to_string(),
        "end".to_string(),
    ]
}
