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

//! # BGP
//!
//! Four routers in a chain, with a host at each end:
//!
//! ```text
//! h1 --- r1 --- r2 --- r3 --- r4 --- h2
//!       AS1  |    AS2     |  AS3
//! ```
//!
//! r2 and r3 form AS2 and use OSPF as IGP. r1 and r4 advertise their local network to AS2 over
//! eBGP.

use super::builder::*;
use super::Scenario;
use crate::topology::{
    Daemon, LinkEndpointSpec, LinkOptions, PostAction, RouterAttrs, Topology, TopologyGraph,
};
use crate::Error;
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// Addressing and AS numbers of the BGP scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgpParams {
    /// Network of r1 and h1
    pub site1: Ipv4Addr,
    /// Network between r1 and r2
    pub r1_r2: Ipv4Addr,
    /// Network between r2 and r3
    pub r2_r3: Ipv4Addr,
    /// Network between r3 and r4
    pub r3_r4: Ipv4Addr,
    /// Network of r4 and h2
    pub site2: Ipv4Addr,
    /// AS of r1
    pub as1: u32,
    /// AS of r2 and r3
    pub as2: u32,
    /// AS of r4
    pub as3: u32,
    /// OSPF network statement inside AS2
    pub ospf_network: Ipv4Net,
    /// OSPF area inside AS2
    pub area: u32,
}

impl Default for BgpParams {
    fn default() -> Self {
        Self {
            site1: Ipv4Addr::new(192, 168, 0, 0),
            r1_r2: Ipv4Addr::new(192, 168, 1, 0),
            r2_r3: Ipv4Addr::new(192, 168, 2, 0),
            r3_r4: Ipv4Addr::new(192, 168, 3, 0),
            site2: Ipv4Addr::new(192, 168, 4, 0),
            as1: 1,
            as2: 2,
            as3: 3,
            ospf_network: Ipv4Net::new_assert(Ipv4Addr::new(192, 168, 0, 0), 16),
            area: 1,
        }
    }
}

/// Three ASes connected by eBGP
pub struct BgpTopo;

impl Scenario for BgpTopo {
    type Params = BgpParams;

    fn build_with(params: &BgpParams) -> Result<Topology, Error> {
        let mut g = TopologyGraph::new();

        let r1 = build_as(
            &mut g,
            "r1",
            "h1",
            params.site1,
            params.as1,
            host24(params.r1_r2, 2).addr(),
            params.as2,
        )?;
        let r4 = build_as(
            &mut g,
            "r4",
            "h2",
            params.site2,
            params.as3,
            host24(params.r3_r4, 1).addr(),
            params.as2,
        )?;

        let mut core_commands = ospf_setup_commands(params.ospf_network, params.area);
        core_commands.extend(vec![
            "end".to_string(),
            "configure terminal".to_string(),
            format!("router bgp {}", params.as2),
            "no bgp ebgp-requires-policy".to_string(),
        ]);

        let mut r2_commands = core_commands.clone();
        r2_commands.push(neighbor(host24(params.r1_r2, 1), params.as1));
        r2_commands.push(neighbor(host24(params.r2_r3, 2), params.as2));
        let r2 = g.add_router(
            "r2",
            RouterAttrs::new(vec![Daemon::Ospfd, Daemon::Bgpd]).with_commands(r2_commands),
            Some(host24(params.r2_r3, 1)),
        )?;

        let mut r3_commands = core_commands;
        r3_commands.push(neighbor(host24(params.r3_r4, 2), params.as3));
        r3_commands.push(neighbor(host24(params.r2_r3, 1), params.as2));
        let r3 = g.add_router(
            "r3",
            RouterAttrs::new(vec![Daemon::Ospfd, Daemon::Bgpd]).with_commands(r3_commands),
            Some(host24(params.r3_r4, 1)),
        )?;

        // the order of the links decides which interface receives the address of the router
        g.add_link(
            r3.as_str(),
            LinkEndpointSpec::new(r4).ip(host24(params.r3_r4, 2)),
            LinkOptions::default(),
        )?;
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

fn neighbor(peer: Ipv4Net, as_number: u32) -> String {
    format!("neighbor {} remote-as {}", peer.addr(), as_number)
}
