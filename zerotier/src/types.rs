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

//! # ZeroTier Types

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Status of the local node (`GET /status`)
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    /// Node id (10 hex digits). For a controller, this is the prefix of every network id.
    pub address: String,
    /// Public identity of the node
    #[serde(default)]
    pub public_identity: String,
    /// Whether the node can reach at least one root
    #[serde(default)]
    pub online: bool,
    /// Version of the agent
    #[serde(default)]
    pub version: String,
}

/// Range of addresses assigned by the controller
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IpAssignmentPool {
    /// First address of the pool
    pub ip_range_start: Ipv4Addr,
    /// Last address of the pool
    pub ip_range_end: Ipv4Addr,
}

/// Route pushed to the members of a network
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Route {
    /// Target network, in CIDR notation
    pub target: String,
    /// Gateway, or `None` for a network which is directly reachable over the overlay
    pub via: Option<Ipv4Addr>,
}

/// Body of the request creating a network on a controller
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Address pools
    pub ip_assignment_pools: Vec<IpAssignmentPool>,
    /// Managed routes
    pub routes: Vec<Route>,
    /// IPv4 assignment mode
    pub v4_assign_mode: String,
    /// Private networks require members to be authorized
    pub private: bool,
}

impl NetworkConfig {
    /// Public network on the /24 of `net_addr`, assigning addresses `.1` to `.254` to its members.
    pub fn for_subnet(net_addr: Ipv4Addr) -> Self {
        let [a, b, c, _] = net_addr.octets();
        Self {
            ip_assignment_pools: vec![IpAssignmentPool {
                ip_range_start: Ipv4Addr::new(a, b, c, 1),
                ip_range_end: Ipv4Addr::new(a, b, c, 254),
            }],
            routes: vec![Route { target: format!("{}.{}.{}.0/24", a, b, c), via: None }],
            v4_assign_mode: "zt".to_string(),
            private: false,
        }
    }
}

/// Network managed by a controller (`/controller/network/<id>`)
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ControllerNetwork {
    /// Network id
    pub id: String,
    /// Name of the network
    #[serde(default)]
    pub name: String,
    /// Private networks require members to be authorized
    #[serde(default)]
    pub private: bool,
    /// Address pools
    #[serde(default)]
    pub ip_assignment_pools: Vec<IpAssignmentPool>,
    /// Managed routes
    #[serde(default)]
    pub routes: Vec<Route>,
}

/// Network joined by the local node (`/network/<id>`)
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    /// Network id
    pub id: String,
    /// Status, e.g. `REQUESTING_CONFIGURATION` or `OK`
    #[serde(default)]
    pub status: String,
    /// Name of the network
    #[serde(default)]
    pub name: String,
    /// Addresses assigned to the node
    #[serde(default)]
    pub assigned_addresses: Vec<String>,
}
