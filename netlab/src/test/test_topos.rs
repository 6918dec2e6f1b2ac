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

//! Test the prepared scenarios.

use crate::topology::*;
use crate::topos::builder::*;
use crate::topos::*;
use crate::Error;
use ipnet::Ipv4Net;
use lazy_static::lazy_static;
use maplit::hashmap;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::net::Ipv4Addr;

lazy_static! {
    static ref ALL_TOPOS: Vec<(TopologyName, Topology)> =
        TopologyName::all().iter().map(|t| (*t, t.build().unwrap())).collect();
}

fn net(s: &str) -> Ipv4Net {
    s.parse().unwrap()
}

fn commands(g: &TopologyGraph, router: &str) -> Vec<String> {
    g.node(router).unwrap().role().router_attrs().unwrap().commands.clone()
}

fn intf_ip(g: &TopologyGraph, node: &str, intf: &str) -> Option<Ipv4Net> {
    g.interfaces(node).unwrap().into_iter().find(|i| i.name == intf).and_then(|i| i.ip)
}

#[test]
fn bandwidth_ceiling_on_all_topos() {
    for (name, topo) in ALL_TOPOS.iter() {
        assert!(topo.graph.num_links() > 0, "{} has no links", name);
        for link in topo.graph.links() {
            assert_eq!(link.bandwidth_mbit(), LINK_BANDWIDTH_CEILING_MBIT);
        }
    }
}

#[test]
fn topology_names() {
    for t in TopologyName::all().iter() {
        assert_eq!(t.name().parse::<TopologyName>().unwrap(), *t);
        assert_eq!(t.to_string(), t.name());
    }
    assert!(matches!("foo".parse::<TopologyName>(), Err(Error::UnknownTopology(_))));
}

#[test]
fn router_and_host() {
    let mut g = TopologyGraph::new();
    for (i, c) in [0u8, 7, 254].iter().enumerate() {
        let r = format!("r{}", i);
        let h = format!("h{}", i);
        let net_addr = Ipv4Addr::new(172, 16, *c, 99);
        build_router_and_host(&mut g, &r, &h, net_addr, RouterAttrs::default()).unwrap();
        let router = g.node(&r).unwrap();
        let host = g.node(&h).unwrap();
        assert_eq!(router.ip(), Some(Ipv4Net::new(Ipv4Addr::new(172, 16, *c, 1), 24).unwrap()));
        assert_eq!(host.ip(), Some(Ipv4Net::new(Ipv4Addr::new(172, 16, *c, 2), 24).unwrap()));
        assert_eq!(host.default_route(), Some(Ipv4Addr::new(172, 16, *c, 1)));
        assert!(host.role().is_host());
        assert_eq!(g.links_of(&r).unwrap().len(), 1);
    }
}

#[test]
fn autonomous_system() {
    let mut g = TopologyGraph::new();
    build_as(&mut g, "r1", "h1", Ipv4Addr::new(192, 168, 4, 0), 3, Ipv4Addr::new(192, 168, 3, 1), 2)
        .unwrap();
    let attrs = g.node("r1").unwrap().role().router_attrs().unwrap().clone();
    assert_eq!(attrs.daemons.iter().copied().collect::<Vec<_>>(), vec![Daemon::Bgpd]);
    assert_eq!(
        attrs.commands,
        script(&[
            "configure terminal",
            "router bgp 3",
            "no bgp ebgp-requires-policy",
            "neighbor 192.168.3.1 remote-as 2",
            "network 192.168.4.0/24",
        ])
    );
}

#[test]
fn ospf_topo() {
    let topo = OspfTopo::build().unwrap();
    let g = &topo.graph;
    assert_eq!(g.routers(), vec!["r1", "r2"]);
    assert_eq!(g.nodes_where(|n| n.role().is_host()), vec!["h1", "h2"]);
    assert_eq!(g.num_links(), 3);

    assert_eq!(intf_ip(g, "r1", "r1-eth0"), Some(net("192.168.0.1/24")));
    assert_eq!(intf_ip(g, "r1", "r1-eth1"), Some(net("192.168.1.1/24")));
    assert_eq!(intf_ip(g, "r2", "r2-eth0"), Some(net("192.168.2.1/24")));
    assert_eq!(intf_ip(g, "r2", "r2-eth1"), Some(net("192.168.1.2/24")));
    assert_eq!(g.node("h2").unwrap().default_route(), Some(Ipv4Addr::new(192, 168, 2, 1)));

    for r in ["r1", "r2"] {
        assert!(commands(g, r).contains(&"network 192.168.0.0/16 area 1".to_string()));
        let attrs = g.node(r).unwrap().role().router_attrs().unwrap().clone();
        assert!(attrs.has_daemon(Daemon::Ospfd));
        assert!(!attrs.has_daemon(Daemon::Ldpd));
    }
    assert_eq!(topo.post_actions, vec![PostAction::MplsDiscovery]);
}

#[test]
fn mpls_topo() {
    let topo = MplsTopo::build().unwrap();
    let g = &topo.graph;
    assert_eq!(g.routers(), vec!["r1", "r2", "r3"]);
    assert_eq!(g.num_links(), 4);
    for r in g.routers() {
        let attrs = g.node(&r).unwrap().role().router_attrs().unwrap().clone();
        assert!(attrs.has_daemon(Daemon::Ldpd));
        assert_eq!(attrs.commands.last().map(|s| s.as_str()), Some("mpls ldp-sync"));
    }
    // the default interface of r2 faces r3
    let r2 = g.node_id("r2").unwrap();
    let default_link = g.links_of("r2").unwrap()[0];
    assert_eq!(default_link.peer_of(r2).unwrap().node_name(), "r3");
    assert_eq!(intf_ip(g, "r2", "r2-eth0"), Some(net("192.168.2.1/24")));
    assert_eq!(intf_ip(g, "r3", "r3-eth1"), Some(net("192.168.2.2/24")));
    assert_eq!(intf_ip(g, "r2", "r2-eth1"), Some(net("192.168.1.2/24")));
}

#[test]
fn bgp_topo() {
    let topo = BgpTopo::build().unwrap();
    let g = &topo.graph;
    assert_eq!(g.routers(), vec!["r1", "r4", "r2", "r3"]);
    assert_eq!(g.num_links(), 5);
    assert_eq!(intf_ip(g, "r3", "r3-eth0"), Some(net("192.168.3.1/24")));
    assert_eq!(intf_ip(g, "r4", "r4-eth1"), Some(net("192.168.3.2/24")));
    assert_eq!(intf_ip(g, "r2", "r2-eth0"), Some(net("192.168.2.1/24")));
    assert_eq!(intf_ip(g, "r1", "r1-eth1"), Some(net("192.168.1.1/24")));
    assert!(commands(g, "r1").contains(&"neighbor 192.168.1.2 remote-as 2".to_string()));
    assert!(commands(g, "r4").contains(&"neighbor 192.168.3.1 remote-as 2".to_string()));
    let r2 = commands(g, "r2");
    assert!(r2.contains(&"router bgp 2".to_string()));
    assert!(r2.contains(&"neighbor 192.168.1.1 remote-as 1".to_string()));
    assert!(r2.contains(&"neighbor 192.168.2.2 remote-as 2".to_string()));
    let r3 = commands(g, "r3");
    assert!(r3.contains(&"neighbor 192.168.3.2 remote-as 3".to_string()));
    assert!(r3.contains(&"neighbor 192.168.2.1 remote-as 2".to_string()));
}

#[test]
fn mpls_vpn_topo() {
    let topo = MplsVpnTopo::build().unwrap();
    let g = &topo.graph;
    let mut routers = g.routers();
    routers.sort();
    assert_eq!(routers, vec!["ce1", "ce2", "p", "pe1", "pe2"]);
    assert_eq!(g.num_links(), 7);

    let vrfs: HashMap<String, Vec<Vrf>> = routers
        .iter()
        .map(|r| (r.clone(), g.node(r).unwrap().role().router_attrs().unwrap().vrfs.clone()))
        .filter(|(_, v)| !v.is_empty())
        .collect();
    let customer =
        |intf: &str| Vrf { name: "customer".to_string(), interfaces: vec![intf.to_string()] };
    assert_eq!(
        vrfs,
        hashmap! {
            "pe1".to_string() => vec![customer("pe1-eth2")],
            "pe2".to_string() => vec![customer("pe2-eth2")],
        }
    );

    // the bound interface is the one facing the customer edge
    for (pe, ce) in [("pe1", "ce1"), ("pe2", "ce2")] {
        let id = g.node_id(pe).unwrap();
        let customer_link = g
            .links_of(pe)
            .unwrap()
            .into_iter()
            .find(|l| l.peer_of(id).unwrap().node_name() == ce)
            .unwrap();
        assert_eq!(customer_link.endpoint_at(id).unwrap().intf_name(), format!("{}-eth2", pe));
        assert_eq!(customer_link.endpoint_at(id).unwrap().port, 2);
    }

    let pe1 = commands(g, "pe1");
    assert!(pe1.contains(&"discovery transport-address 1.1.1.1".to_string()));
    assert!(pe1.contains(&"neighbor 2.2.2.2 update-source lo".to_string()));
    assert!(pe1.contains(&"rd vpn export 1:1".to_string()));
    assert!(commands(g, "pe2").contains(&"neighbor 1.1.1.1 activate".to_string()));
    assert!(!commands(g, "p").contains(&"vrf customer".to_string()));
    assert_eq!(topo.post_actions, vec![PostAction::MplsDiscovery]);
}

#[test]
fn zerotier_sdn_topo() {
    let topo = ZeroTierSdnTopo::build().unwrap();
    let g = &topo.graph;
    assert_eq!(g.nodes_where(|n| n.role().is_overlay()), vec!["aroot", "controller", "h1", "h2"]);
    assert_eq!(g.nodes_where(|n| n.role().is_switch()), vec!["s1", "s2", "s3"]);
    assert_eq!(g.num_links(), 7);
    assert!(matches!(g.node("s1").unwrap().role(), NodeRole::Switch(SwitchAttrs { stp: true })));
    assert!(matches!(g.node("aroot").unwrap().role(), NodeRole::OverlayRoot(_)));
    for n in ["aroot", "controller", "h1", "h2"] {
        let dirs = g.node(n).unwrap().private_dirs();
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].mount_point().to_str(), Some("/var/lib/zerotier-one/moons.d"));
    }
    assert_eq!(
        topo.post_actions,
        vec![PostAction::OverlayBootstrap {
            controller: "controller".to_string(),
            leaves: vec!["h1".to_string(), "h2".to_string()],
            net_addr: Ipv4Addr::new(192, 168, 0, 0),
        }]
    );
}

#[test]
fn zerotier_router_topo() {
    let topo = ZeroTierRouterTopo::build().unwrap();
    let g = &topo.graph;
    assert_eq!(g.routers(), vec!["r1", "r2", "r3"]);
    assert_eq!(g.num_links(), 7);
    assert_eq!(g.node("aroot").unwrap().ip(), Some(net("10.0.5.2/24")));
    assert_eq!(g.node("controller").unwrap().default_route(), Some(Ipv4Addr::new(10, 0, 6, 1)));
    assert_eq!(intf_ip(g, "r3", "r3-eth0"), Some(net("10.0.2.1/24")));
    assert_eq!(intf_ip(g, "r3", "r3-eth2"), Some(net("10.0.5.1/24")));
    assert_eq!(intf_ip(g, "r2", "r2-eth1"), Some(net("10.0.2.2/24")));
    assert_eq!(intf_ip(g, "h2", "h2-eth0"), Some(net("10.0.4.2/24")));
    assert!(commands(g, "r1").contains(&"network 10.0.0.0/16 area 1".to_string()));
    assert_eq!(topo.post_actions.len(), 1);
}
