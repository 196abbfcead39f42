//! System-wide constants for the ambassador transition workflow.

/// Nanoseconds per second (10^9).
pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Default lifetime of an off-ledger signing session (1 hour).
pub const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60;

/// Upper bound for a signing session lifetime (7 days).
///
/// Sessions stay resumable until their inputs are consumed; the bound only
/// keeps abandoned records from piling up in the session store.
pub const MAX_SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Schnorr public key size in bytes (x-only).
pub const SCHNORR_PUBKEY_SIZE: usize = 32;

/// Upper bound for free-form metadata entries on intents.
pub const MAX_METADATA_ENTRIES: usize = 64;

/// Maximum length of any metadata string value.
pub const MAX_METADATA_VALUE_LENGTH: usize = 1024;

/// Environment variable overriding `now_nanos()` in tests.
pub const TEST_NOW_NANOS_ENV_VAR: &str = "AMBASSADOR_TEST_NOW_NANOS";
