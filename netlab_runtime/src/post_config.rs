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

//! # Post configuration
//!
//! Execution of the [`PostAction`]s of a topology, once the fabric is started.

use crate::fabric::Fabric;
use crate::{Error, Result};
use netlab::topology::{Daemon, PostAction};

use log::*;

use std::net::Ipv4Addr;
use std::thread::sleep;
use std::time::Duration;

/// Execute the post actions in order. Stops at the first failing action.
pub fn run(fabric: &mut Fabric, actions: &[PostAction]) -> Result<()> {
    for action in actions {
        match action {
            PostAction::MplsDiscovery => configure_mpls(fabric)?,
            PostAction::OverlayBootstrap { controller, leaves, net_addr } => {
                bootstrap_overlay(fabric, controller, leaves, *net_addr)?
            }
        }
    }
    Ok(())
}

/// Command sequence enabling LDP on the given interfaces, discovering neighbors with the given
/// transport address.
pub fn mpls_discovery_commands(transport_address: Ipv4Addr, intfs: &[String]) -> Vec<String> {
    let mut commands = vec![
        String::from("configure terminal"),
        String::from("mpls ldp"),
        String::from("address-family ipv4"),
        format!("discovery transport-address {}", transport_address),
    ];
    for intf in intfs {
        commands.push(format!("interface {}", intf));
        commands.push(String::from("exit"));
    }
    commands
}

/// Enable LDP on every router running `ldpd`, using the address of its default interface as
/// transport address.
pub fn configure_mpls(fabric: &mut Fabric) -> Result<()> {
    info!("*** Configuring MPLS for applicable routers");
    let routers: Vec<String> = fabric
        .nodes()
        .iter()
        .filter(|n| n.router().map(|r| r.daemons().contains(&Daemon::Ldpd)).unwrap_or(false))
        .map(|n| n.name().to_string())
        .collect();
    for name in routers {
        let node = fabric.node(&name)?;
        let ip = node.ip().ok_or_else(|| Error::MissingAddress(name.clone()))?;
        let commands = mpls_discovery_commands(ip.addr(), &node.intf_names());
        debug!("LDP transport address of {} is {}", name, ip.addr());
        fabric.vtysh(&name, &commands)?;
    }
    Ok(())
}

/// Poll `ping_all` until no ping fails. After the n-th failed check, wait `step * (n - 1)`.
/// Returns the number of failed checks, or [`Error::Unreachable`] after `max_attempts` checks.
pub fn wait_until_reachable<P, S>(
    mut ping_all: P,
    mut wait: S,
    step: Duration,
    max_attempts: u32,
) -> Result<u32>
where
    P: FnMut() -> Result<usize>,
    S: FnMut(Duration),
{
    let max_attempts = max_attempts.max(1);
    for attempt in 0..max_attempts {
        if ping_all()? == 0 {
            return Ok(attempt);
        }
        if attempt + 1 < max_attempts {
            let duration = step * attempt;
            if attempt > 0 {
                info!("*** Waiting for {} seconds", duration.as_secs());
            }
            wait(duration);
        }
    }
    Err(Error::Unreachable { attempts: max_attempts })
}

/// Wait until all nodes are reachable, restart the agents of the leaves and of the controller,
/// create a network on the controller and let every leaf join it.
pub fn bootstrap_overlay(
    fabric: &mut Fabric,
    controller: &str,
    leaves: &[String],
    net_addr: Ipv4Addr,
) -> Result<()> {
    let step = Duration::from_secs(fabric.config().overlay.backoff_step_secs);
    let max_attempts = fabric.config().overlay.max_ping_attempts;
    info!("*** Waiting until all nodes are reachable");
    wait_until_reachable(|| fabric.ping_all(), sleep, step, max_attempts)?;

    info!("*** Restarting leaf ZeroTier nodes");
    for leaf in leaves {
        fabric.node_mut(leaf)?.restart_overlay()?;
    }
    fabric.node_mut(controller)?.restart_overlay()?;

    info!("*** Creating virtual network");
    let network = fabric.node(controller)?.create_network(net_addr)?;
    info!("Created network {} on {}", network.id, controller);

    let networks = fabric.node(controller)?.get_networks()?;
    let network_id =
        networks.first().cloned().ok_or_else(|| Error::NoOverlayNetwork(controller.to_string()))?;

    info!("*** Making nodes join the network");
    for leaf in leaves {
        let joined = fabric.node_mut(leaf)?.join_network(&network_id)?;
        info!("{} joined {} ({})", leaf, joined.id, joined.status);
    }
    Ok(())
}
