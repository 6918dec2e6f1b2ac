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

//! # Lab Scenarios
//!
//! Prepared topologies, each described by a type implementing [`Scenario`]. The scenario
//! parameters default to the addressing used throughout the documentation. Use
//! [`TopologyName`] to select a scenario by the name used on the command line.

use crate::topology::Topology;
use crate::Error;
use std::fmt;
use std::str::FromStr;

pub mod builder;

mod bgp;
pub use bgp::{BgpParams, BgpTopo};

mod mpls;
pub use mpls::{MplsParams, MplsTopo};

mod mpls_vpn;
pub use mpls_vpn::{MplsVpnParams, MplsVpnTopo};

mod ospf;
pub use ospf::{OspfParams, OspfTopo};

mod zerotier;
pub use zerotier::{ZeroTierParams, ZeroTierRouterTopo, ZeroTierSdnTopo};

/// Trait for easier access to the prepared scenarios.
pub trait Scenario {
    /// Parameters of the scenario
    type Params: Default;

    /// Build the topology with the given parameters
    fn build_with(params: &Self::Params) -> Result<Topology, Error>;

    /// Build the topology with the default parameters
    fn build() -> Result<Topology, Error> {
        Self::build_with(&Self::Params::default())
    }
}

/// Name of a prepared scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopologyName {
    /// [`OspfTopo`]
    Ospf,
    /// [`MplsTopo`]
    Mpls,
    /// [`BgpTopo`]
    Bgp,
    /// [`MplsVpnTopo`]
    MplsVpn,
    /// [`ZeroTierSdnTopo`]
    ZeroTierSdn,
    /// [`ZeroTierRouterTopo`]
    ZeroTierRouter,
}

impl TopologyName {
    /// All scenarios, in the order they are listed
    pub fn all() -> [TopologyName; 6] {
        [
            Self::Ospf,
            Self::Mpls,
            Self::Bgp,
            Self::MplsVpn,
            Self::ZeroTierSdn,
            Self::ZeroTierRouter,
        ]
    }

    /// Name used on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ospf => "ospf",
            Self::Mpls => "mpls",
            Self::Bgp => "bgp",
            Self::MplsVpn => "mpls-vpn",
            Self::ZeroTierSdn => "zerotier-sdn",
            Self::ZeroTierRouter => "zerotier-router",
        }
    }

    /// One line description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Ospf => "two routers running OSPF, each with a host",
            Self::Mpls => "three routers running OSPF and LDP",
            Self::Bgp => "four routers in three ASes connected by eBGP",
            Self::MplsVpn => "two customer sites connected by an MPLS-VPN backbone",
            Self::ZeroTierSdn => "ZeroTier nodes on a triangle of switches",
            Self::ZeroTierRouter => "ZeroTier nodes behind three OSPF routers",
        }
    }

    /// Build the scenario with its default parameters
    pub fn build(&self) -> Result<Topology, Error> {
        match self {
            Self::Ospf => OspfTopo::build(),
            Self::Mpls => MplsTopo::build(),
            Self::Bgp => BgpTopo::build(),
            Self::MplsVpn => MplsVpnTopo::build(),
            Self::ZeroTierSdn => ZeroTierSdnTopo::build(),
            Self::ZeroTierRouter => ZeroTierRouterTopo::build(),
        }
    }
}

impl fmt::Display for TopologyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TopologyName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .find(|t| t.name() == s)
            .copied()
            .ok_or_else(|| Error::UnknownTopology(s.to_string()))
    }
}
