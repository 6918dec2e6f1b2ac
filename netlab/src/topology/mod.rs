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

//! # Topology Graph Model
//!
//! Nodes are described by a [`NodeSpec`] with a fixed [`NodeRole`], links by a [`LinkSpec`].
//! Ports are numbered per node in the order links are added, starting at 0 (1 for switches),
//! and the resolved interface name is `<node>-eth<port>` unless a link gives an explicit one.
//! The first interface of a node is its *default* interface, which receives the node's address.

mod graph;
mod post_action;
mod types;

pub use graph::TopologyGraph;
pub use post_action::{PostAction, Topology};
pub use types::*;
