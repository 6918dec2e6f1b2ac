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

//! Post actions, executed once the fabric is running.

use super::TopologyGraph;
use std::net::Ipv4Addr;

/// Configuration step which can only be performed after the fabric is up, because it needs the
/// materialized interface names and addresses, or running daemons on several nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostAction {
    /// For every router running `ldpd`, set the LDP discovery transport address to the address of
    /// its default interface, and enable LDP on all of its interfaces.
    MplsDiscovery,
    /// Wait until all nodes can reach each other, restart the agents of the leaves and of the
    /// controller (such that they orbit the moon of the root), create a network on the controller
    /// and join every leaf.
    OverlayBootstrap {
        /// Name of the overlay controller
        controller: String,
        /// Names of the leaves joining the network, in join order
        leaves: Vec<String>,
        /// Network address of the /24 managed by the controller
        net_addr: Ipv4Addr,
    },
}

/// # Topology
/// Graph of the lab, together with the actions to run once it is live.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    /// The topology graph
    pub graph: TopologyGraph,
    /// Post actions, in execution order
    pub post_actions: Vec<PostAction>,
}

impl Topology {
    /// Create a topology without post actions
    pub fn new(graph: TopologyGraph) -> Self {
        Self { graph, post_actions: Vec::new() }
    }

    /// Add a post action
    pub fn with_post_action(mut self, action: PostAction) -> Self {
        self.post_actions.push(action);
        self
    }
}
