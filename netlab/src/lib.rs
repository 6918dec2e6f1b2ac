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

#![deny(missing_docs)]

//! # netlab: Routing Lab Orchestration
//! This library describes virtual routing labs: small networks of FRRouting routers, hosts, Linux
//! bridges and ZeroTier overlay nodes, wired together by point-to-point links. It contains only
//! the pure part of the system. Materializing a topology on Linux network namespaces is done by
//! `netlab_runtime`.
//!
//! ## Structure
//!
//! - **[`Topology`](topology)**: The topology graph model. See the main structure
//!   [`TopologyGraph`](topology::TopologyGraph). Every node carries a fixed
//!   [`NodeRole`](topology::NodeRole) with role-specific attributes (daemons, scripted `vtysh`
//!   commands, VRFs, overlay trusted paths). Every link is capped at
//!   [`LINK_BANDWIDTH_CEILING_MBIT`](topology::LINK_BANDWIDTH_CEILING_MBIT), whatever the caller
//!   asks for.
//!
//! - **[`PostAction`](topology::PostAction)**: Configuration which can only be computed once the
//!   fabric is live and every interface name and address is known. A
//!   [`Topology`](topology::Topology) carries the list of post actions next to its graph.
//!
//! - **[`Topos`](topos)**: Collection of prepared lab scenarios (OSPF, MPLS, BGP, MPLS-VPN and two
//!   ZeroTier labs) and the helpers to compose them. Scenarios can be looked up by name with
//!   [`TopologyName`](topos::TopologyName).
//!
//! ## Usage
//!
//! ```
//! use netlab::topos::{OspfTopo, Scenario};
//!
//! fn main() -> Result<(), netlab::Error> {
//!     let topo = OspfTopo::build()?;
//!     assert_eq!(topo.graph.routers().len(), 2);
//!     assert_eq!(topo.graph.num_links(), 3);
//!     Ok(())
//! }
//! ```

mod error;
pub mod topology;
pub mod topos;

// test modules
mod test;

pub use error::Error;
pub use topology::{PostAction, Topology, TopologyError, TopologyGraph};
