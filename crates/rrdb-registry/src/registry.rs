//! The top-level registry: the global hosts lock, outermost of the
//! three-tier locking discipline (§5). Acquired only to find-or-create a
//! host or to walk the full host list; every chart and dimension operation
//! afterward only ever touches its own host's locks.

use crate::error::RegistryError;
use crate::host::Host;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

#[derive(Default)]
pub struct Registry {
    hosts: RwLock<HashMap<String, Arc<Host>>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds a host by `machine_guid`, creating it if absent.
    pub fn find_or_create_host(&self, hostname: &str, machine_guid: &str) -> Arc<Host> {
        if let Some(host) = self.hosts.read().get(machine_guid) {
            return Arc::clone(host);
        }
        let mut hosts = self.hosts.write();
        if let Some(host) = hosts.get(machine_guid) {
            return Arc::clone(host);
        }
        let host = Arc::new(Host::new(hostname, machine_guid));
        hosts.insert(machine_guid.to_string(), Arc::clone(&host));
        info!(hostname, machine_guid, "host registered");
        host
    }

    #[must_use]
    pub fn find_host(&self, machine_guid: &str) -> Option<Arc<Host>> {
        self.hosts.read().get(machine_guid).cloned()
    }

    /// Like [`Registry::find_host`], but an absent host is a typed error
    /// rather than `None` — for callers that treat a missing host as a
    /// failure rather than something to fall back from.
    pub fn get_host(&self, machine_guid: &str) -> Result<Arc<Host>, RegistryError> {
        self.find_host(machine_guid)
            .ok_or_else(|| RegistryError::HostNotFound(machine_guid.to_string()))
    }

    #[must_use]
    pub fn host_guids(&self) -> Vec<String> {
        self.hosts.read().keys().cloned().collect()
    }

    /// Frees a host marked `ORPHAN` once its sender has been disconnected
    /// for at least `rrdhost_free_orphan_time_usec` as of `now_usec` (§4.4).
    /// A host that isn't orphaned, or whose grace period hasn't elapsed
    /// yet, is left alone.
    pub fn cleanup_orphan(&self, machine_guid: &str, now_usec: i64, rrdhost_free_orphan_time_usec: i64) -> bool {
        let mut hosts = self.hosts.write();
        let Some(host) = hosts.get(machine_guid) else {
            return false;
        };
        if !host.is_orphan() {
            return false;
        }
        let disconnected_for = now_usec - host.senders_disconnected_time_usec();
        if disconnected_for >= rrdhost_free_orphan_time_usec {
            hosts.remove(machine_guid);
            info!(machine_guid, "orphan host freed");
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_host_is_a_typed_error() {
        let r = Registry::new();
        assert!(matches!(r.get_host("nope"), Err(RegistryError::HostNotFound(_))));
    }

    #[test]
    fn non_orphan_host_is_never_cleaned_up() {
        let r = Registry::new();
        r.find_or_create_host("web01", "guid-1");
        assert!(!r.cleanup_orphan("guid-1", 1_000_000_000, 3_600_000_000));
        assert!(r.find_host("guid-1").is_some());
    }

    #[test]
    fn orphan_host_survives_until_grace_period_elapses() {
        let r = Registry::new();
        let host = r.find_or_create_host("web01", "guid-1");
        host.mark_orphan(0);

        assert!(!r.cleanup_orphan("guid-1", 1_000_000, 3_600_000_000));
        assert!(r.find_host("guid-1").is_some());

        assert!(r.cleanup_orphan("guid-1", 3_600_000_000, 3_600_000_000));
        assert!(r.find_host("guid-1").is_none());
    }

    #[test]
    fn reconnecting_clears_orphan_flag() {
        let r = Registry::new();
        let host = r.find_or_create_host("web01", "guid-1");
        host.mark_orphan(0);
        host.clear_orphan();

        assert!(!r.cleanup_orphan("guid-1", 3_600_000_000, 3_600_000_000));
        assert!(r.find_host("guid-1").is_some());
    }
}
