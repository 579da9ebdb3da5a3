use std::{
    fmt::Debug,
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use tokio::runtime::{Handle, RuntimeFlavor};

use crate::config::ReachabilityConfig;

/// Synchronous network reachability check. Answers are never cached.
pub trait Reachability: Send + Sync + Debug {
    fn is_network_available(&self) -> bool;
}

/// Reachable when a TCP connection to `host:port` opens within the timeout.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    pub fn from_config(config: &ReachabilityConfig) -> Self {
        Self::new(
            config.host.clone(),
            config.port,
            Duration::from_millis(config.timeout_ms),
        )
    }

    fn probe(&self) -> bool {
        let addrs = match (self.host.as_str(), self.port).to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                tracing::debug!(host = %self.host, "reachability lookup failed: {e}");
                return false;
            }
        };

        let reachable = addrs
            .into_iter()
            .any(|addr| TcpStream::connect_timeout(&addr, self.timeout).is_ok());
        tracing::debug!(host = %self.host, port = self.port, reachable, "reachability probe");
        reachable
    }
}

impl Reachability for TcpProbe {
    fn is_network_available(&self) -> bool {
        off_runtime(|| self.probe())
    }
}

/// Run blocking work without stalling the other tasks of a multi-thread
/// runtime. A current-thread runtime cannot hand its core off, so there the
/// work runs inline.
fn off_runtime<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Fixed answer, for offline runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct Always(pub bool);

impl Reachability for Always {
    fn is_network_available(&self) -> bool {
        self.0
    }
}
