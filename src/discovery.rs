//! Stand-in for the zero-configuration LAN advertisement collaborator. Real
//! advertisement (mDNS/Bonjour) is out of scope for this core; this module
//! only carries the trait boundary a production build would hook a real
//! publisher into.

use crate::logger::Logger;

pub trait DiscoveryPublisher: Send + Sync {
    fn publish(&self, host: &str, port: u16);
}

/// Logs what it would advertise and does nothing further.
pub struct NoopDiscoveryPublisher<'a> {
    log: &'a Logger,
}

impl<'a> NoopDiscoveryPublisher<'a> {
    pub fn new(log: &'a Logger) -> Self {
        Self { log }
    }
}

impl DiscoveryPublisher for NoopDiscoveryPublisher<'_> {
    fn publish(&self, host: &str, port: u16) {
        self.log.info(format!(
            "would advertise service-type=_checkers._tcp host={host}.local port={port} (no publisher installed)"
        ));
    }
}
