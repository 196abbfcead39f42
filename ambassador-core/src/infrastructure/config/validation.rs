use crate::foundation::MAX_SESSION_TTL_SECS;
use crate::infrastructure::config::types::AppConfig;
use crate::infrastructure::logging::parse_filters;

impl AppConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let instance = self.protocol.instance.trim();
        if instance.is_empty() {
            errors.push("protocol.instance must not be empty".to_string());
        } else if instance != self.protocol.instance {
            errors.push("protocol.instance must not carry surrounding whitespace".to_string());
        }

        if self.fees.min_state_value == 0 {
            errors.push("fees.min_state_value must be > 0".to_string());
        }
        if self.fees.base_fee == 0 && self.fees.fee_per_input == 0 {
            errors.push("fees.base_fee and fees.fee_per_input must not both be zero".to_string());
        }

        if self.signing.session_ttl_secs == 0 {
            errors.push("signing.session_ttl_secs must be > 0".to_string());
        }
        if self.signing.session_ttl_secs > MAX_SESSION_TTL_SECS {
            errors.push(format!("signing.session_ttl_secs should not exceed {}", MAX_SESSION_TTL_SECS));
        }

        if self.indexer.poll_interval_ms == 0 {
            errors.push("indexer.poll_interval_ms must be > 0".to_string());
        }
        if self.indexer.max_sync_attempts == 0 {
            errors.push("indexer.max_sync_attempts must be > 0".to_string());
        }

        if let Err(err) = parse_filters(&self.logging.filters) {
            errors.push(format!("invalid logging.filters: {err}"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
