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

//! # MPLS-VPN
//!
//! Two customer sites connected over a provider backbone:
//!
//! ```text
//! h1 --- ce1 --- pe1 --- p --- pe2 --- ce2 --- h2
//!                 |             |
//!                 +-------------+
//! ```
//!
//! The customer edges (ce1, ce2) run OSPF with the customer VRF of their provider edge. Inside the
//! provider network (pe1, p, pe2), OSPF and LDP run in the default VRF. Both provider edges export
//! the routes of the customer VRF as VPNv4 routes, distribute them over iBGP between their
//! loopbacks, and import the received routes back into the customer VRF.

use super::builder::*;
use super::Scenario;
use crate::topology::{
    Daemon, LinkEndpointSpec, LinkOptions, PostAction, RouterAttrs, Topology, TopologyGraph,
};
use crate::Error;
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// Addressing, AS number and VRF parameters of the MPLS-VPN scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MplsVpnParams {
    /// First customer site
    pub site1: CustomerSite,
    /// Second customer site
    pub site2: CustomerSite,
    /// Network between pe1 and ce1
    pub pe1_ce1: Ipv4Addr,
    /// Network between pe2 and ce2
    pub pe2_ce2: Ipv4Addr,
    /// Network between pe1 and p
    pub pe1_p: Ipv4Addr,
    /// Network between p and pe2
    pub p_pe2: Ipv4Addr,
    /// Network between pe1 and pe2
    pub pe1_pe2: Ipv4Addr,
    /// Loopback address of pe1
    pub pe1_lo: Ipv4Addr,
    /// Loopback address of pe2
    pub pe2_lo: Ipv4Addr,
    /// OSPF network of the provider backbone
    pub backbone_network: Ipv4Net,
    /// OSPF area of the provider backbone
    pub backbone_area: u32,
    /// Customer VRF on both provider edges
    pub vrf: VrfParams,
}

impl Default for MplsVpnParams {
    fn default() -> Self {
        Self {
            site1: CustomerSite::new("ce1", "h1", Ipv4Addr::new(192, 168, 0, 0)),
            site2: CustomerSite::new("ce2", "h2", Ipv4Addr::new(192, 168, 3, 0)),
            pe1_ce1: Ipv4Addr::new(192, 168, 1, 0),
            pe2_ce2: Ipv4Addr::new(192, 168, 2, 0),
            pe1_p: Ipv4Addr::new(10, 0, 0, 0),
            p_pe2: Ipv4Addr::new(10, 0, 1, 0),
            pe1_pe2: Ipv4Addr::new(10, 0, 2, 0),
            pe1_lo: Ipv4Addr::new(1, 1, 1, 1),
            pe2_lo: Ipv4Addr::new(2, 2, 2, 2),
            backbone_network: Ipv4Net::new_assert(Ipv4Addr::new(10, 0, 0, 0), 16),
            backbone_area: 2,
            vrf: VrfParams {
                name: "customer".to_string(),
                ospf_network: Ipv4Net::new_assert(Ipv4Addr::new(192, 168, 0, 0), 16),
                ospf_area: 1,
                as_number: 1,
                route_target: "1:1".to_string(),
                route_distinguisher: "1:1".to_string(),
            },
        }
    }
}

/// Customer VPN over an MPLS backbone
pub struct MplsVpnTopo;

impl Scenario for MplsVpnTopo {
    type Params = MplsVpnParams;

    fn build_with(params: &MplsVpnParams) -> Result<Topology, Error> {
        let mut g = TopologyGraph::new();

        let (ce1, ce2) = build_customer_sites(
            &mut g,
            &params.site1,
            &params.site2,
            params.vrf.ospf_network,
            params.vrf.ospf_area,
        )?;

        let backbone_commands = vec![
            "configure terminal".to_string(),
            "router ospf".to_string(),
            format!("network {} area {}", params.backbone_network, params.backbone_area),
            format!("network {}/32 area {}", params.pe1_lo, params.backbone_area),
            format!("network {}/32 area {}", params.pe2_lo, params.backbone_area),
            "mpls ldp-sync".to_string(),
            "end".to_string(),
        ];
        let daemons = vec![Daemon::Ospfd, Daemon::Bgpd, Daemon::Ldpd];
        let pe_commands = |local_lo: Ipv4Addr, peer_lo: Ipv4Addr| {
            let mut commands = backbone_commands.clone();
            commands.extend(mpls_bgp_setup_commands(local_lo, peer_lo, params.vrf.as_number));
            commands.extend(vrf_setup_commands(&params.vrf));
            commands
        };

        // the customer facing interface is always the third one of a provider edge
        let pe1_customer_intf = "pe1-eth2";
        let pe2_customer_intf = "pe2-eth2";

        let pe1 = g.add_router(
            "pe1",
            RouterAttrs::new(daemons.clone())
                .with_vrf(params.vrf.name.as_str(), vec![pe1_customer_intf])
                .with_commands(pe_commands(params.pe1_lo, params.pe2_lo)),
            Some(host24(params.pe1_p, 1)),
        )?;
        let p = g.add_router(
            "p",
            RouterAttrs::new(daemons.clone()).with_commands(backbone_commands.clone()),
            Some(host24(params.p_pe2, 1)),
        )?;
        let pe2 = g.add_router(
            "pe2",
            RouterAttrs::new(daemons)
                .with_vrf(params.vrf.name.as_str(), vec![pe2_customer_intf])
                .with_commands(pe_commands(params.pe2_lo, params.pe1_lo)),
            Some(host24(params.p_pe2, 2)),
        )?;

        g.add_link(p.as_str(), pe2.as_str(), LinkOptions::default())?;
        g.add_link(
            pe1.as_str(),
            LinkEndpointSpec::new(p.as_str()).ip(host24(params.pe1_p, 2)),
            LinkOptions::default(),
        )?;
        g.add_link(
            LinkEndpointSpec::new(pe1.as_str()).ip(host24(params.pe1_pe2, 1)),
            LinkEndpointSpec::new(pe2.as_str()).ip(host24(params.pe1_pe2, 2)),
            LinkOptions::default(),
        )?;
        g.add_link(
            LinkEndpointSpec::new(pe1.as_str())
                .intf(pe1_customer_intf)
                .ip(host24(params.pe1_ce1, 1)),
            LinkEndpointSpec::new(ce1).ip(host24(params.pe1_ce1, 2)),
            LinkOptions::default(),
        )?;
        g.add_link(
            LinkEndpointSpec::new(pe2.as_str())
                .intf(pe2_customer_intf)
                .ip(host24(params.pe2_ce2, 1)),
            LinkEndpointSpec::new(ce2).ip(host24(params.pe2_ce2, 2)),
            LinkOptions::default(),
        )?;

        Ok(Topology::new(g).with_post_action(PostAction::MplsDiscovery))
    }
}
