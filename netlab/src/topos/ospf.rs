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

//! # OSPF
//!
//! Two directly connected routers, each with a host:
//!
//! ```text
//! h1 --192.168.0.0/24-- r1 --192.168.1.0/24-- r2 --192.168.2.0/24-- h2
//! ```
//!
//! Both routers run only `ospfd` and exchange their routes in a single area.

use super::builder::*;
use super::Scenario;
use crate::topology::{
    Daemon, LinkEndpointSpec, LinkOptions, PostAction, RouterAttrs, Topology, TopologyGraph,
};
use crate::Error;
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// Addressing of the OSPF scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OspfParams {
    /// Network of r1 and h1
    pub site1: Ipv4Addr,
    /// Network between r1 and r2
    pub transit: Ipv4Addr,
    /// Network of r2 and h2
    pub site2: Ipv4Addr,
    /// OSPF network statement on both routers
    pub ospf_network: Ipv4Net,
    /// OSPF area
    pub area: u32,
}

impl Default for OspfParams {
    fn default() -> Self {
        Self {
            site1: Ipv4Addr::new(192, 168, 0, 0),
            transit: Ipv4Addr::new(192, 168, 1, 0),
            site2: Ipv4Addr::new(192, 168, 2, 0),
            ospf_network: Ipv4Net::new_assert(Ipv4Addr::new(192, 168, 0, 0), 16),
            area: 1,
        }
    }
}

/// Two routers running OSPF
pub struct OspfTopo;

impl Scenario for OspfTopo {
    type Params = OspfParams;

    fn build_with(params: &OspfParams) -> Result<Topology, Error> {
        let mut g = TopologyGraph::new();
        let attrs = RouterAttrs::new(vec![Daemon::Ospfd])
            .with_commands(ospf_setup_commands(params.ospf_network, params.area));

        let r1 = build_router_and_host(&mut g, "r1", "h1", params.site1, attrs.clone())?;
        let r2 = build_router_and_host(&mut g, "r2", "h2", params.site2, attrs)?;

        g.add_link(
            LinkEndpointSpec::new(r1).ip(host24(params.transit, 1)),
            LinkEndpointSpec::new(r2).ip(host24(params.transit, 2)),
            LinkOptions::default(),
        )?;

        Ok(Topology::new(g).with_post_action(PostAction::MplsDiscovery))
    }
}
