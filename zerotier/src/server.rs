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

//! # ZeroTier Service Client

use crate::types::*;
use crate::{Error, Result};

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;

/// Header carrying the auth token of the agent
pub const AUTH_HEADER: &str = "X-ZT1-AUTH";
/// Default port of the control API
pub const DEFAULT_PORT: u16 = 9993;

/// # ZeroTier Service Handle
///
/// Each request builds a single threaded runtime on the calling thread, which means that all
/// sockets are opened in the network namespace of the calling thread. Use an IP literal as
/// address: names would be resolved on a different thread.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ServiceClient {
    address: String,
    auth_token: String,
}

impl ServiceClient {
    /// Create a new handle for the agent at `address:port`.
    pub fn new(address: impl AsRef<str>, port: u16, auth_token: impl Into<String>) -> Self {
        Self {
            address: format!("http://{}:{}", address.as_ref(), port),
            auth_token: auth_token.into(),
        }
    }

    /// Create a new handle for the agent listening on the loopback interface.
    pub fn local(port: u16, auth_token: impl Into<String>) -> Self {
        Self::new("127.0.0.1", port, auth_token)
    }

    /// Base URL of the API
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the status of the node, including its id
    pub fn status(&self) -> Result<NodeStatus> {
        Ok(serde_json::from_str(&self.request_get("status")?)?)
    }

    /// Create a network on the controller with the node id `controller_id`. The network id is
    /// chosen by the controller.
    pub fn create_network(
        &self,
        controller_id: impl AsRef<str>,
        config: &NetworkConfig,
    ) -> Result<ControllerNetwork> {
        Ok(serde_json::from_str(&self.request_post(
            format!("controller/network/{}______", controller_id.as_ref()),
            serde_json::to_string(config)?,
        )?)?)
    }

    /// Returns the ids of all networks managed by the controller
    pub fn get_networks(&self) -> Result<Vec<String>> {
        Ok(serde_json::from_str(&self.request_get("controller/network")?)?)
    }

    /// Join a network
    pub fn join_network(&self, network_id: impl AsRef<str>) -> Result<Network> {
        Ok(serde_json::from_str(
            &self.request_post(format!("network/{}", network_id.as_ref()), String::from("{}"))?,
        )?)
    }

    /// Returns all networks joined by the node
    pub fn networks(&self) -> Result<Vec<Network>> {
        Ok(serde_json::from_str(&self.request_get("network")?)?)
    }

    fn request_get(&self, key: impl AsRef<str>) -> Result<String> {
        self.request(Method::GET, key.as_ref(), None)
    }

    fn request_post(&self, key: impl AsRef<str>, data: String) -> Result<String> {
        self.request(Method::POST, key.as_ref(), Some(data))
    }

    fn request(&self, method: Method, key: &str, data: Option<String>) -> Result<String> {
        let addr = format!("{}/{}", self.address, key);
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        runtime.block_on(async {
            let client = reqwest::Client::builder().no_proxy().build()?;
            let mut request = client.request(method, &addr).header(AUTH_HEADER, &self.auth_token);
            if let Some(data) = data {
                request = request.header(CONTENT_TYPE, "application/json").body(data);
            }
            let response = request.send().await?;
            let status = response.status();
            let text = response.text().await?;
            if !status.is_success() {
                return Err(Error::ResponseError(status.as_u16(), text));
            }
            Ok::<String, Error>(text)
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{Ipv4Addr, TcpListener};
    use std::thread::{spawn, JoinHandle};

    const TOKEN: &str = "0123456789abcdefghijklmn";

    /// Serve a single request with the given status and body, and return the raw request.
    fn respond_once(status: u16, body: &'static str) -> (u16, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request: Vec<u8> = Vec::new();
            let mut buf = [0u8; 1024];
            let header_end = loop {
                let n = stream.read(&mut buf).unwrap();
                assert!(n > 0, "connection closed before the end of the headers");
                request.extend_from_slice(&buf[..n]);
                if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let head = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
            let content_length: usize = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .map(|v| v.trim().parse().unwrap())
                .unwrap_or(0);
            while request.len() < header_end + content_length {
                let n = stream.read(&mut buf).unwrap();
                assert!(n > 0, "connection closed before the end of the body");
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {} Status\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8(request).unwrap()
        });
        (port, handle)
    }

    #[test]
    fn node_status() {
        let (port, handle) = respond_once(
            200,
            concat!(
                r#"{"address":"abcdef0123","publicIdentity":"abcdef0123:0:ff","#,
                r#""online":true,"version":"1.10.2","clock":1}"#
            ),
        );
        let client = ServiceClient::local(port, TOKEN);
        let status = client.status().unwrap();
        assert_eq!(status.address, "abcdef0123");
        assert!(status.online);
        let request = handle.join().unwrap();
        assert!(request.starts_with("GET /status HTTP/1.1\r\n"));
        assert!(request.to_lowercase().contains(&format!("x-zt1-auth: {}", TOKEN).to_lowercase()));
    }

    #[test]
    fn create_network() {
        let (port, handle) = respond_once(
            200,
            concat!(
                r#"{"id":"abcdef0123456789","name":"","private":false,"#,
                r#""routes":[{"target":"192.168.0.0/24","via":null}]}"#
            ),
        );
        let client = ServiceClient::local(port, TOKEN);
        let config = NetworkConfig::for_subnet(Ipv4Addr::new(192, 168, 0, 0));
        let network = client.create_network("abcdef0123", &config).unwrap();
        assert_eq!(network.id, "abcdef0123456789");
        assert_eq!(network.routes[0].via, None);

        let request = handle.join().unwrap();
        assert!(request.starts_with("POST /controller/network/abcdef0123______ HTTP/1.1\r\n"));
        let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(body["ipAssignmentPools"][0]["ipRangeStart"], "192.168.0.1");
        assert_eq!(body["ipAssignmentPools"][0]["ipRangeEnd"], "192.168.0.254");
        assert_eq!(body["routes"][0]["target"], "192.168.0.0/24");
        assert!(body["routes"][0]["via"].is_null());
        assert_eq!(body["v4AssignMode"], "zt");
        assert_eq!(body["private"], false);
    }

    #[test]
    fn list_and_join() {
        let (port, handle) = respond_once(200, r#"["abcdef0123456789","abcdef0123000001"]"#);
        let client = ServiceClient::local(port, TOKEN);
        let networks = client.get_networks().unwrap();
        assert_eq!(networks, vec!["abcdef0123456789", "abcdef0123000001"]);
        assert!(handle.join().unwrap().starts_with("GET /controller/network HTTP/1.1\r\n"));

        let (port, handle) = respond_once(
            200,
            concat!(
                r#"{"id":"abcdef0123456789","status":"REQUESTING_CONFIGURATION","#,
                r#""assignedAddresses":[]}"#
            ),
        );
        let client = ServiceClient::local(port, TOKEN);
        let network = client.join_network(&networks[0]).unwrap();
        assert_eq!(network.status, "REQUESTING_CONFIGURATION");
        assert!(handle.join().unwrap().starts_with("POST /network/abcdef0123456789 HTTP/1.1\r\n"));

        let (port, handle) = respond_once(
            200,
            r#"[{"id":"abcdef0123456789","status":"OK","assignedAddresses":["192.168.0.17/24"]}]"#,
        );
        let joined = ServiceClient::local(port, TOKEN).networks().unwrap();
        assert_eq!(joined[0].assigned_addresses, vec!["192.168.0.17/24"]);
        assert!(handle.join().unwrap().starts_with("GET /network HTTP/1.1\r\n"));
    }

    #[test]
    fn response_error() {
        let (port, handle) = respond_once(401, r#"{"error":"unauthorized"}"#);
        let client = ServiceClient::local(port, "wrong");
        match client.status() {
            Err(Error::ResponseError(401, body)) => assert!(body.contains("unauthorized")),
            r => panic!("unexpected result: {:?}", r),
        }
        handle.join().unwrap();
    }

    #[test]
    fn malformed_response() {
        let (port, handle) = respond_once(200, r#"{"online":true}"#);
        let client = ServiceClient::local(port, TOKEN);
        assert!(matches!(client.status(), Err(Error::JsonError(_))));
        handle.join().unwrap();
    }

    #[test]
    fn no_agent() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = ServiceClient::local(port, TOKEN);
        assert!(matches!(client.get_networks(), Err(Error::HttpError(_))));
    }
}
