// =============================================================================
// CLAIM LEDGER — config.rs
// =============================================================================
//
// Node configuration from environment variables:
//   LEDGER_NODE_ID         node identifier            (claim-ledger-01)
//   LEDGER_LISTEN_ADDR     HTTP bind address          (0.0.0.0:8080)
//   LEDGER_JOURNAL         journal file path          (unset = in-memory)
//   LEDGER_ADMINS          comma-separated admins     (none)
//   LEDGER_EVENT_CAPACITY  event broadcast buffer     (256)
// =============================================================================

use crate::constants::{DEFAULT_EVENT_CAPACITY, DEFAULT_LISTEN_ADDR, DEFAULT_NODE_ID};
use crate::model::Principal;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub node_id: String,
    pub listen_addr: SocketAddr,
    pub journal_path: Option<PathBuf>,
    pub admins: Vec<Principal>,
    pub event_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            node_id: DEFAULT_NODE_ID.to_string(),
            listen_addr: default_listen_addr(),
            journal_path: None,
            admins: Vec::new(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

impl LedgerConfig {
    /// In-memory node with no admins; what tests and the demo use.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_admin(mut self, admin: Principal) -> Self {
        if !self.admins.contains(&admin) {
            self.admins.push(admin);
        }
        self
    }

    pub fn with_journal(mut self, path: impl Into<PathBuf>) -> Self {
        self.journal_path = Some(path.into());
        self
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; malformed values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(id) = lookup("LEDGER_NODE_ID").filter(|s| !s.trim().is_empty()) {
            config.node_id = id.trim().to_string();
        }

        if let Some(raw) = lookup("LEDGER_LISTEN_ADDR") {
            match raw.trim().parse::<SocketAddr>() {
                Ok(addr) => config.listen_addr = addr,
                Err(e) => log::warn!(
                    "LEDGER_LISTEN_ADDR '{}' ignored ({}), using {}",
                    raw, e, DEFAULT_LISTEN_ADDR
                ),
            }
        }

        config.journal_path = lookup("LEDGER_JOURNAL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        if let Some(raw) = lookup("LEDGER_ADMINS") {
            for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                match Principal::new(item) {
                    Ok(admin) => config = config.with_admin(admin),
                    Err(e) => log::warn!("LEDGER_ADMINS entry ignored: {}", e),
                }
            }
        }

        if let Some(raw) = lookup("LEDGER_EVENT_CAPACITY") {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.event_capacity = n,
                _ => log::warn!(
                    "LEDGER_EVENT_CAPACITY '{}' ignored, using {}",
                    raw, DEFAULT_EVENT_CAPACITY
                ),
            }
        }

        config
    }
}
