use serde::Deserialize;

/// Business rules for the reservation core. Deserialized from the layered
/// configuration; every field has a default so sparse config files work.
#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    /// How long an advisory seat hold lives without confirmation.
    #[serde(default = "default_seat_hold_seconds")]
    pub seat_hold_seconds: u64,
    /// Percentage of the total price retained as a service fee.
    #[serde(default = "default_service_fee_percent")]
    pub service_fee_percent: u32,
    #[serde(default = "default_reference_prefix")]
    pub reference_prefix: String,
    #[serde(default = "default_reference_attempts")]
    pub reference_max_attempts: u32,
    /// TTL on the per-day reference counter; garbage-collects stale counters
    /// without a cron job.
    #[serde(default = "default_counter_ttl_seconds")]
    pub counter_ttl_seconds: u64,
    #[serde(default = "default_ticket_retry_attempts")]
    pub ticket_retry_attempts: u32,
    #[serde(default = "default_ticket_retry_delay_ms")]
    pub ticket_retry_delay_ms: u64,
}

fn default_seat_hold_seconds() -> u64 {
    600
}

fn default_service_fee_percent() -> u32 {
    5
}

fn default_reference_prefix() -> String {
    "BK".to_string()
}

fn default_reference_attempts() -> u32 {
    10
}

fn default_counter_ttl_seconds() -> u64 {
    48 * 3600
}

fn default_ticket_retry_attempts() -> u32 {
    3
}

fn default_ticket_retry_delay_ms() -> u64 {
    500
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            seat_hold_seconds: default_seat_hold_seconds(),
            service_fee_percent: default_service_fee_percent(),
            reference_prefix: default_reference_prefix(),
            reference_max_attempts: default_reference_attempts(),
            counter_ttl_seconds: default_counter_ttl_seconds(),
            ticket_retry_attempts: default_ticket_retry_attempts(),
            ticket_retry_delay_ms: default_ticket_retry_delay_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_production_settings() {
        let rules = BookingRules::default();
        assert_eq!(rules.seat_hold_seconds, 600);
        assert_eq!(rules.service_fee_percent, 5);
        assert_eq!(rules.reference_prefix, "BK");
        assert_eq!(rules.reference_max_attempts, 10);
        assert_eq!(rules.counter_ttl_seconds, 172_800);
    }

    #[test]
    fn sparse_config_fills_in_defaults() {
        let rules: BookingRules = serde_json::from_str(r#"{"seat_hold_seconds": 120}"#).unwrap();
        assert_eq!(rules.seat_hold_seconds, 120);
        assert_eq!(rules.reference_prefix, "BK");
    }
}
