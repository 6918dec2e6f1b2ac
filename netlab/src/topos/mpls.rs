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

//! # MPLS
//!
//! Three routers in a chain, with a host at each end:
//!
//! ```text
//! h1 --- r1 --- r2 --- r3 --- h2
//! ```
//!
//! The routers run OSPF as IGP and LDP to distribute labels. Packets between the hosts are label
//! switched. The LDP discovery address is set by [`PostAction::MplsDiscovery`], once the address
//! of every default interface is known.

use super::builder::*;
use super::Scenario;
use crate::topology::{
    Daemon, LinkEndpointSpec, LinkOptions, PostAction, RouterAttrs, Topology, TopologyGraph,
};
use crate::Error;
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// Addressing of the MPLS scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MplsParams {
    /// Network of r1 and h1
    pub site1: Ipv4Addr,
    /// Network between r1 and r2
    pub r1_r2: Ipv4Addr,
    /// Network between r2 and r3
    pub r2_r3: Ipv4Addr,
    /// Network of r3 and h2
    pub site2: Ipv4Addr,
    /// OSPF network statement on all routers
    pub ospf_network: Ipv4Net,
    /// OSPF area
    pub area: u32,
}

impl Default for MplsParams {
    fn default() -> Self {
        Self {
            site1: Ipv4Addr::new(192, 168, 0, 0),
            r1_r2: Ipv4Addr::new(192, 168, 1, 0),
            r2_r3: Ipv4Addr::new(192, 168, 2, 0),
            site2: Ipv4Addr::new(192, 168, 3, 0),
            ospf_network: Ipv4Net::new_assert(Ipv4Addr::new(192, 168, 0, 0), 16),
            area: 1,
        }
    }
}

/// Three routers running OSPF and LDP
pub struct MplsTopo;

impl Scenario for MplsTopo {
    type Params = MplsParams;

    fn build_with(params: &MplsParams) -> Result<Topology, Error> {
        let mut g = TopologyGraph::new();
        let mut commands = ospf_setup_commands(params.ospf_network, params.area);
        commands.push("mpls ldp-sync".to_string());
        let attrs = RouterAttrs::new(vec![Daemon::Ospfd, Daemon::Ldpd]).with_commands(commands);

        let r1 = build_router_and_host(&mut g, "r1", "h1", params.site1, attrs.clone())?;
        let r2 = g.add_router("r2", attrs.clone(), Some(host24(params.r2_r3, 1)))?;
        let r3 = build_router_and_host(&mut g, "r3", "h2", params.site2, attrs)?;

        // r2-r3 first, such that the default interface of r2 faces r3
        g.add_link(
            r2.as_str(),
            LinkEndpointSpec::new(r3).ip(host24(params.r2_r3, 2)),
            LinkOptions::default(),
        )?;
        g.add_link(
            LinkEndpointSpec::new(r1).ip(host24(params.r1_r2, 1)),
            LinkEndpointSpec::new(r2).ip(host24(params.r1_r2, 2)),
            LinkOptions::default(),
        )?;

        Ok(Topology::new(g).with_post_action(PostAction::MplsDiscovery))
    }
}
