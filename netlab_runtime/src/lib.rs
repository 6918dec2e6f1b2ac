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

//! # Runtime System
//!
//! This system materializes a [`Topology`] on the local machine: every node is a shell in its
//! own network namespace, switches are Linux bridges and links are veth pairs. Routers run
//! FRRouting, each instance in its own pathspace, and overlay nodes run a ZeroTier agent. For
//! simplified usage, check the function [`run_lab`].
//!
//! Everything in here requires root privileges.

#![deny(missing_docs, missing_debug_implementations)]

pub mod config;
mod error;
pub mod fabric;
pub mod frrouter;
pub mod netns;
pub mod overlay;
pub mod post_config;
pub mod shell;

pub use config::LabConfig;
pub use error::{Error, Result};
pub use fabric::{Fabric, Node, NodeKind};
pub use frrouter::{RouterState, RoutingInstance};

use netlab::Topology;

use log::*;

/// # Run a lab
///
/// Build the fabric of the topology, start it and run its post actions. Then, call `hold`, and
/// tear everything down once it returns. The fabric is torn down as well if any step fails.
pub fn run_lab<F>(topology: Topology, config: &LabConfig, hold: F) -> Result<()>
where
    F: FnOnce(&mut Fabric),
{
    let mut fabric = Fabric::build(topology, config)?;
    fabric.start()?;
    fabric.post_configure()?;
    info!("*** Lab is running");
    hold(&mut fabric);
    fabric.stop();
    Ok(())
}
