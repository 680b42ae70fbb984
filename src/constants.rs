//! Naming and protocol constants for the Claim Ledger node.

/// Product name shown in the banner and status endpoint
pub const NETWORK_NAME: &str = "Claim Ledger";

/// Node version
pub const VERSION: &str = "0.1.0-alpha";

/// Project tagline
pub const TAGLINE: &str = "Role-gated insurance registry with a tamper-evident audit chain";

/// Message committed by the genesis block
pub const GENESIS_MESSAGE: &str = "Insurance Fraud Detection System Initialized";

/// `previous_hash` of the genesis block (all-zero SHA-256 digest)
pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

// ═══════════════════════════════════════════════════════════════
// Value ranges
// ═══════════════════════════════════════════════════════════════

/// Upper bound for percentage-style fields (fraud score, ML confidence, accuracy)
pub const MAX_PERCENT: u8 = 100;

/// First id handed out by the policy and claim sequences (0 means "not found")
pub const FIRST_SEQUENCE_ID: u64 = 1;

/// Prefixes of identifiers produced by the prepare step
pub const POLICY_NUMBER_PREFIX: &str = "POL";
pub const CLAIM_NUMBER_PREFIX: &str = "CLM";
pub const DID_PREFIX: &str = "did:insure:user:";

// ═══════════════════════════════════════════════════════════════
// Transport
// ═══════════════════════════════════════════════════════════════

/// Header carrying the authenticated principal from the session layer
pub const CALLER_HEADER: &str = "x-caller";

/// Default bind address of the HTTP API
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Default node identifier
pub const DEFAULT_NODE_ID: &str = "claim-ledger-01";

/// Default capacity of the event broadcast buffer
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Print the node banner
pub fn print_banner() {
    println!();
    println!("╔═══════════════════════════════════════════════════════════════╗");
    println!("║                        CLAIM LEDGER                           ║");
    println!("║                                                               ║");
    println!("║  {:<61}║", TAGLINE);
    println!("║  Version {:<53}║", VERSION);
    println!("╚═══════════════════════════════════════════════════════════════╝");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_sentinel_is_a_sha256_width() {
        assert_eq!(GENESIS_PREVIOUS_HASH.len(), 64);
        assert!(GENESIS_PREVIOUS_HASH.chars().all(|c| c == '0'));
    }

    #[test]
    fn test_sequences_start_after_sentinel() {
        assert!(FIRST_SEQUENCE_ID > 0);
    }
}
