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

//! # ZeroTier labs
//!
//! Four ZeroTier nodes: a root (`aroot`) generating a moon, a network controller and two leaves
//! (`h1`, `h2`). Every node bind mounts the shared moon directory, such that all of them orbit the
//! moon of the root. The root must be configured first, which is why it is added first.
//!
//! Once the fabric is up, [`PostAction::OverlayBootstrap`] creates a network on the controller and
//! lets both leaves join it.

use super::builder::*;
use super::Scenario;
use crate::topology::{
    Daemon, LinkEndpointSpec, LinkOptions, NodeRole, NodeSpec, OverlayAttrs, PostAction,
    PrivateDir, RouterAttrs, Topology, TopologyGraph,
};
use crate::Error;
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// Parameters shared by both ZeroTier labs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZeroTierParams {
    /// Network address of the /24 overlay network created on the controller
    pub overlay_net: Ipv4Addr,
    /// Directory on the host holding the moon, shared by all overlay nodes
    pub moons_dir: PathBuf,
    /// Where the moon directory is mounted inside the nodes
    pub moons_mount_point: PathBuf,
}

impl Default for ZeroTierParams {
    fn default() -> Self {
        Self {
            overlay_net: Ipv4Addr::new(192, 168, 0, 0),
            moons_dir: PathBuf::from("./moons.d"),
            moons_mount_point: PathBuf::from("/var/lib/zerotier-one/moons.d"),
        }
    }
}

struct OverlayNodes {
    controller: String,
    leaves: Vec<String>,
}

/// Address and default route of one overlay node
type Placement = Option<(Ipv4Net, Ipv4Addr)>;

fn add_overlay_nodes(
    g: &mut TopologyGraph,
    params: &ZeroTierParams,
    placement: [Placement; 4],
) -> Result<OverlayNodes, Error> {
    let moons = PrivateDir::Bind {
        mount_point: params.moons_mount_point.clone(),
        source: params.moons_dir.clone(),
    };
    let roles = [
        ("aroot", NodeRole::OverlayRoot(OverlayAttrs::default())),
        ("controller", NodeRole::OverlayController(OverlayAttrs::default())),
        ("h1", NodeRole::OverlayLeaf(OverlayAttrs::default())),
        ("h2", NodeRole::OverlayLeaf(OverlayAttrs::default())),
    ];
    let mut names = Vec::new();
    for ((name, role), place) in roles.into_iter().zip(placement) {
        let mut spec = NodeSpec::new(name, role).with_private_dir(moons.clone());
        if let Some((ip, via)) = place {
            spec = spec.with_ip(ip).with_default_route(via);
        }
        names.push(g.add_node(spec)?);
    }
    Ok(OverlayNodes { controller: names[1].clone(), leaves: names[2..].to_vec() })
}

fn bootstrap(nodes: OverlayNodes, params: &ZeroTierParams) -> PostAction {
    PostAction::OverlayBootstrap {
        controller: nodes.controller,
        leaves: nodes.leaves,
        net_addr: params.overlay_net,
    }
}

/// ZeroTier nodes attached to a triangle of switches running STP.
///
/// ```text
///        s1 ---- s2
///   h1 -'  \    /  '- h2
///           s3
///          /  \
///      aroot  controller
/// ```
///
/// The nodes have no explicit address and are numbered from the IP base of the fabric.
pub struct ZeroTierSdnTopo;

impl Scenario for ZeroTierSdnTopo {
    type Params = ZeroTierParams;

    fn build_with(params: &ZeroTierParams) -> Result<Topology, Error> {
        let mut g = TopologyGraph::new();
        let nodes = add_overlay_nodes(&mut g, params, [None, None, None, None])?;

        let s1 = g.add_switch("s1", true)?;
        let s2 = g.add_switch("s2", true)?;
        let s3 = g.add_switch("s3", true)?;

        for (a, b) in [(&s1, &s2), (&s2, &s3), (&s3, &s1)] {
            g.add_link(a, b, LinkOptions::default())?;
        }
        for (a, b) in [("aroot", &s3), ("controller", &s3), ("h1", &s1), ("h2", &s2)] {
            g.add_link(a, b, LinkOptions::default())?;
        }

        Ok(Topology::new(g).with_post_action(bootstrap(nodes, params)))
    }
}

/// ZeroTier nodes behind three routers running OSPF.
///
/// ```text
///   h1 --- r1 ------- r2 --- h2
///            \       /
///             '- r3 -'
///               /  \
///           aroot  controller
/// ```
pub struct ZeroTierRouterTopo;

impl Scenario for ZeroTierRouterTopo {
    type Params = ZeroTierParams;

    fn build_with(params: &ZeroTierParams) -> Result<Topology, Error> {
        let mut g = TopologyGraph::new();
        let net = |c: u8| Ipv4Addr::new(10, 0, c, 0);
        let place = |c: u8| Some((host24(net(c), 2), host24(net(c), 1).addr()));

        let nodes = add_overlay_nodes(&mut g, params, [place(5), place(6), place(0), place(4)])?;

        let attrs = RouterAttrs::new(vec![Daemon::Ospfd]).with_commands(ospf_setup_commands(
            Ipv4Net::new_assert(Ipv4Addr::new(10, 0, 0, 0), 16),
            1,
        ));
        let r1 = g.add_router("r1", attrs.clone(), Some(host24(net(0), 1)))?;
        let r2 = g.add_router("r2", attrs.clone(), Some(host24(net(4), 1)))?;
        let r3 = g.add_router("r3", attrs, Some(host24(net(2), 1)))?;

        g.add_link(&r1, "h1", LinkOptions::default())?;
        g.add_link(&r2, "h2", LinkOptions::default())?;
        g.add_link(&r3, LinkEndpointSpec::new(&r2).ip(host24(net(2), 2)), LinkOptions::default())?;
        g.add_link(
            LinkEndpointSpec::new(&r1).ip(host24(net(1), 1)),
            LinkEndpointSpec::new(&r3).ip(host24(net(1), 2)),
            LinkOptions::default(),
        )?;
        g.add_link(
            LinkEndpointSpec::new(&r1).ip(host24(net(3), 1)),
            LinkEndpointSpec::new(&r2).ip(host24(net(3), 2)),
            LinkOptions::default(),
        )?;
        g.add_link(
            LinkEndpointSpec::new(&r3).ip(host24(net(5), 1)),
            "aroot",
            LinkOptions::default(),
        )?;
        g.add_link(
            LinkEndpointSpec::new(&r3).ip(host24(net(6), 1)),
            "controller",
            LinkOptions::default(),
        )?;

        Ok(Topology::new(g).with_post_action(bootstrap(nodes, params)))
    }
}
