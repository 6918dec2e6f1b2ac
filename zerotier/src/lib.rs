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

//! # ZeroTier One Service API
//!
//! This is a very simple crate to talk to the local HTTP control API of a ZeroTier One agent
//! (see <https://docs.zerotier.com/service/v1/>): read the node status, create networks on a
//! controller, and join networks.
//!
//! The API only listens on the loopback interface. Every request runs to completion on the
//! calling thread, so the client can be used after switching the thread into the network
//! namespace of the agent.
//!
//! ```no_run
//! use zerotier::{NetworkConfig, ServiceClient};
//! use std::net::Ipv4Addr;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let token = std::fs::read_to_string("/var/lib/zerotier-one/authtoken.secret")?;
//!     let client = ServiceClient::local(9993, token.trim());
//!
//!     // the controller address is the node id
//!     let status = client.status()?;
//!     let config = NetworkConfig::for_subnet(Ipv4Addr::new(192, 168, 0, 0));
//!     let network = client.create_network(&status.address, &config)?;
//!
//!     client.join_network(&network.id)?;
//!     Ok(())
//! }
//! ```
#![deny(missing_docs)]

mod server;
mod types;
pub use server::{ServiceClient, AUTH_HEADER, DEFAULT_PORT};
pub use types::*;

use thiserror::Error;

/// # ZeroTier Error type
#[derive(Debug, Error)]
pub enum Error {
    /// Error during handling of the HTTP request
    #[error("HTTP Error: {0}")]
    HttpError(#[from] reqwest::Error),
    /// Cannot deserialize the response, or serialize the request
    #[error("Cannot parse JSON response: {0}")]
    JsonError(#[from] serde_json::error::Error),
    /// IO Error
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
    /// HTTP Response Error
    #[error("HTTP Response Error: {0}. Message:\n{1}")]
    ResponseError(u16, String),
}

/// ZeroTier Result type
type Result<T> = core::result::Result<T, Error>;
