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

//! Scenarios selectable on the command line

use netlab::topos::TopologyName;

use clap::ValueEnum;
use std::fmt;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Two routers running OSPF, each with a host
    Ospf,
    /// Three routers running OSPF and LDP
    Mpls,
    /// Four routers in three ASes connected by eBGP
    Bgp,
    /// Two customer sites connected by an MPLS-VPN backbone
    MplsVpn,
    /// ZeroTier nodes on a triangle of switches
    #[value(name = "zerotier-sdn")]
    ZeroTierSdn,
    /// ZeroTier nodes behind three OSPF routers
    #[value(name = "zerotier-router")]
    ZeroTierRouter,
}

impl From<Topology> for TopologyName {
    fn from(topo: Topology) -> Self {
        match topo {
            Topology::Ospf => TopologyName::Ospf,
            Topology::Mpls => TopologyName::Mpls,
            Topology::Bgp => TopologyName::Bgp,
            Topology::MplsVpn => TopologyName::MplsVpn,
            Topology::ZeroTierSdn => TopologyName::ZeroTierSdn,
            Topology::ZeroTierRouter => TopologyName::ZeroTierRouter,
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", TopologyName::from(*self))
    }
}
