// Blocking nREPL client
//
// One TCP connection per REPL session. Requests are written as bencoded
// dictionaries; replies are read until a fragment for the same request id
// reports `done`.

use std::io::{BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use super::bencode::{self, Value};
use super::response::Response;
use crate::config::constants::{DEFAULT_CONNECT_TIMEOUT_MS, NREPL_SCHEME};
use crate::errors::{BridgeError, Result};

/// Knobs for [`NreplClient::connect_with`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub connect_timeout: Duration,
    /// `None` blocks until the server answers.
    pub read_timeout: Option<Duration>,
    /// Send a `describe` op after connecting to make sure the peer speaks nREPL.
    pub handshake: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            read_timeout: None,
            handshake: true,
        }
    }
}

pub struct NreplClient {
    url: String,
    writer: TcpStream,
    reader: BufReader<TcpStream>,
    closed: bool,
}

impl NreplClient {
    /// Connect with default options.
    pub fn connect(url: &str) -> Result<Self> {
        Self::connect_with(url, &ConnectOptions::default())
    }

    pub fn connect_with(url: &str, options: &ConnectOptions) -> Result<Self> {
        let authority = parse_url(url)?;

        let addrs: Vec<SocketAddr> = authority
            .to_socket_addrs()
            .map_err(|e| BridgeError::connect(url, format!("cannot resolve '{}': {}", authority, e)))?
            .collect();
        if addrs.is_empty() {
            return Err(BridgeError::connect(url, "no addresses resolved"));
        }

        let mut last_err = None;
        let mut stream = None;
        for addr in &addrs {
            match TcpStream::connect_timeout(addr, options.connect_timeout) {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => {
                    debug!(%addr, error = %e, "nREPL connect attempt failed");
                    last_err = Some(e);
                }
            }
        }
        let writer = match stream {
            Some(s) => s,
            None => {
                let reason = last_err
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "connection failed".to_string());
                return Err(BridgeError::connect(url, reason));
            }
        };

        writer
            .set_read_timeout(options.read_timeout)
            .map_err(|e| BridgeError::connect(url, e))?;
        // Requests are small and latency matters more than throughput
        let _ = writer.set_nodelay(true);
        let reader = BufReader::new(writer.try_clone().map_err(|e| BridgeError::connect(url, e))?);

        let mut client = Self {
            url: url.to_string(),
            writer,
            reader,
            closed: false,
        };

        if options.handshake {
            client.describe().map_err(|e| {
                BridgeError::connect(url, format!("handshake mismatch: {}", e))
            })?;
        }

        info!(url = %client.url, "Connected to nREPL server");
        Ok(client)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Submit one request and block until the server declares end-of-reply.
    ///
    /// `fields` are the request's key/value pairs; an `id` is added.
    pub fn send(&mut self, fields: &[(&str, &str)]) -> Result<Response> {
        if self.closed {
            return Err(BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "nREPL connection is closed",
            )));
        }

        let id = Uuid::new_v4().to_string();
        let mut pairs: Vec<(&str, Value)> = fields
            .iter()
            .map(|(k, v)| (*k, Value::from(*v)))
            .collect();
        pairs.push(("id", Value::from(id.as_str())));
        let request = Value::dict(pairs);

        self.writer.write_all(&request.to_bytes())?;
        self.writer.flush()?;
        debug!(id = %id, "nREPL request sent");

        let mut fragments = Vec::new();
        loop {
            let fragment = bencode::read_value(&mut self.reader)?.ok_or_else(|| {
                BridgeError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "server closed the connection mid-reply",
                ))
            })?;

            if fragment.as_dict().is_none() {
                return Err(BridgeError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "reply fragment is not a dictionary",
                )));
            }

            // Replies to other requests (e.g. late output) are not ours
            if let Some(reply_id) = fragment.get("id").and_then(Value::as_str) {
                if reply_id != id {
                    debug!(expected = %id, got = %reply_id, "Skipping foreign reply fragment");
                    continue;
                }
            }

            let done = is_done(&fragment);
            fragments.push(fragment);
            if done {
                break;
            }
        }

        Ok(Response::new(fragments))
    }

    /// `op=eval` shorthand.
    pub fn eval(&mut self, code: &str) -> Result<Response> {
        self.send(&[("op", "eval"), ("code", code)])
    }

    /// `op=describe`; used as the connection handshake.
    pub fn describe(&mut self) -> Result<Response> {
        self.send(&[("op", "describe")])
    }

    /// Shut the socket down. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        // NotConnected just means the peer beat us to it
        let _ = self.writer.shutdown(Shutdown::Both);
        info!(url = %self.url, "nREPL connection closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for NreplClient {
    fn drop(&mut self) {
        self.close();
    }
}

fn is_done(fragment: &Value) -> bool {
    fragment
        .get("status")
        .and_then(Value::as_list)
        .map(|items| items.iter().any(|s| s.as_str() == Some("done")))
        .unwrap_or(false)
}

/// Reduce `nrepl://host:port` (or bare `host:port`) to `host:port`.
fn parse_url(url: &str) -> Result<String> {
    let rest = match url.split_once("://") {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case(NREPL_SCHEME) => rest,
        Some((scheme, _)) => {
            return Err(BridgeError::connect(
                url,
                format!("unsupported scheme '{}'", scheme),
            ))
        }
        None => url,
    };
    let authority = rest.trim_end_matches('/');

    match authority.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
            Ok(authority.to_string())
        }
        _ => Err(BridgeError::connect(url, "expected host:port")),
    }
}
