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

//! Module containing all error types of the runtime

use std::io;
use thiserror::Error;

/// Runtime error type
#[derive(Debug, Error)]
pub enum Error {
    /// Error while building the topology
    #[error("Topology Error: {0}")]
    Topology(#[from] netlab::Error),
    /// A setup step of a node failed. The node is left in an undefined state and must be torn down.
    #[error("Provisioning of {node} failed at step `{step}`: {source}")]
    Provisioning {
        /// Name of the node
        node: String,
        /// Step that failed
        step: String,
        /// Cause
        #[source]
        source: Box<Error>,
    },
    /// A shell command returned a non-zero exit code
    #[error("Command `{cmd}` exited with {code}: {output}")]
    Command {
        /// The command
        cmd: String,
        /// Exit code
        code: i32,
        /// Combined stdout and stderr
        output: String,
    },
    /// The shell of a node has terminated
    #[error("The shell of {0} has exited")]
    ShellExited(String),
    /// The operation is not allowed in the current state
    #[error("Cannot {operation} {node} in state {state}")]
    InvalidState {
        /// Name of the node
        node: String,
        /// Current state
        state: String,
        /// Operation that was attempted
        operation: &'static str,
    },
    /// The operation requires a node of a different role
    #[error("{node} is not a {expected}")]
    WrongRole {
        /// Name of the node
        node: String,
        /// Expected role
        expected: &'static str,
    },
    /// Cannot enter the network namespace of a node
    #[error("Cannot switch the network namespace: {0}")]
    ContextSwitch(#[source] io::Error),
    /// No more unique context identifier for a node name
    #[error("No unique context identifier left for {0}")]
    ContextIdExhausted(String),
    /// The ZeroTier API of a node returned an error
    #[error("ZeroTier API of {node}: {source}")]
    OverlayApi {
        /// Name of the node
        node: String,
        /// Cause
        #[source]
        source: zerotier::Error,
    },
    /// The nodes cannot reach each other
    #[error("Nodes are still unreachable after {attempts} attempts")]
    Unreachable {
        /// Number of full mesh checks
        attempts: u32,
    },
    /// The controller does not manage any network
    #[error("Controller {0} does not manage any network")]
    NoOverlayNetwork(String),
    /// A node has no address on its default interface
    #[error("{0} has no address on its default interface")]
    MissingAddress(String),
    /// The node does not exist in the fabric
    #[error("Node {0} does not exist in the fabric")]
    UnknownNode(String),
    /// The fabric is not started yet
    #[error("The fabric is not started")]
    NotStarted,
    /// The post actions were already executed
    #[error("The fabric was already post-configured")]
    AlreadyPostConfigured,
    /// IO Error
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
    /// JSON Error
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<netlab::TopologyError> for Error {
    fn from(cause: netlab::TopologyError) -> Self {
        Self::Topology(netlab::Error::from(cause))
    }
}

impl Error {
    /// Wrap the error as a failed provisioning step.
    pub(crate) fn at_step(self, node: impl Into<String>, step: impl Into<String>) -> Self {
        Self::Provisioning { node: node.into(), step: step.into(), source: Box::new(self) }
    }
}

/// Runtime result type
pub type Result<T> = std::result::Result<T, Error>;
