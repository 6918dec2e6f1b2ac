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

use netlab::topos::TopologyName;
use netlab_runtime::{run_lab, LabConfig};

use clap::Parser;
use ipnet::Ipv4Net;
use log::*;
use std::error::Error;
use std::io;
use std::path::PathBuf;

mod topologies;
use topologies::Topology;

fn main() -> Result<(), Box<dyn Error>> {
    let args = CommandLineArguments::parse();
    init_logger(args.verbose);

    if args.list {
        for topo in TopologyName::all() {
            println!("{:<16} {}", topo, topo.description());
        }
        return Ok(());
    }
    let topology = match args.topology {
        Some(topology) => TopologyName::from(topology),
        None => return Err("No topology given".into()),
    };

    let mut config = match args.config.as_ref() {
        Some(path) => LabConfig::load(path)?,
        None => LabConfig::default(),
    };
    if let Some(ip_base) = args.ip_base {
        config.fabric.ip_base = ip_base;
    }
    if let Some(attempts) = args.max_ping_attempts {
        config.overlay.max_ping_attempts = attempts;
    }
    config.validate()?;

    info!("*** Building the {} lab", topology);
    let topo = topology.build()?;
    let hold = !args.no_hold;
    run_lab(topo, &config, |fabric| {
        if hold {
            info!("*** {} nodes are up. Press enter to stop the lab", fabric.nodes().len());
            let mut line = String::new();
            // EOF stops the lab as well
            if let Err(e) = io::stdin().read_line(&mut line) {
                warn!("Cannot read from stdin: {}", e);
            }
        }
    })?;
    Ok(())
}

/// Log with level `info` by default, `debug` with `-v`. `RUST_LOG` can refine the filter.
fn init_logger(verbose: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

/// Build a routing lab on Linux network namespaces, with FRRouting routers and ZeroTier nodes, and
/// keep it running until enter is pressed. Requires root privileges.
#[derive(Parser, Debug)]
#[clap(name = "netlab", author = "The netlab developers")]
struct CommandLineArguments {
    /// Scenario to build
    #[clap(required_unless_present = "list")]
    topology: Option<Topology>,
    /// Show debug messages
    #[clap(short, long)]
    verbose: bool,
    /// JSON configuration file
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// Network from which nodes without explicit address are numbered
    #[clap(long)]
    ip_base: Option<Ipv4Net>,
    /// Number of reachability checks before giving up on the overlay bootstrap
    #[clap(long)]
    max_ping_attempts: Option<u32>,
    /// Tear the lab down right after it is configured
    #[clap(long)]
    no_hold: bool,
    /// List all scenarios and exit
    #[clap(long)]
    list: bool,
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn arguments() {
        CommandLineArguments::command().debug_assert();

        let args = CommandLineArguments::try_parse_from([
            "netlab",
            "zerotier-sdn",
            "-v",
            "--ip-base",
            "10.10.0.0/16",
            "--max-ping-attempts",
            "3",
        ])
        .unwrap();
        assert_eq!(args.topology, Some(Topology::ZeroTierSdn));
        assert!(args.verbose);
        assert_eq!(args.ip_base.unwrap().to_string(), "10.10.0.0/16");
        assert_eq!(args.max_ping_attempts, Some(3));
        assert!(!args.no_hold);

        assert!(CommandLineArguments::try_parse_from(["netlab", "--list"]).unwrap().list);
        assert!(CommandLineArguments::try_parse_from(["netlab"]).is_err());
        assert!(CommandLineArguments::try_parse_from(["netlab", "rip"]).is_err());
    }
}
