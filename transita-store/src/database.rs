use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;
use transita_core::rules::BookingRules;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Operational overrides for the booking rules, read from the
    /// `business_rules` table. Rows are `{"value": <number/string>}` keyed by
    /// rule name; unknown keys are ignored.
    pub async fn fetch_rule_overrides(
        &self,
        defaults: BookingRules,
    ) -> Result<BookingRules, sqlx::Error> {
        #[derive(sqlx::FromRow)]
        struct RuleRow {
            rule_key: String,
            rule_value: Value,
        }

        let rows = sqlx::query_as::<_, RuleRow>("SELECT rule_key, rule_value FROM business_rules")
            .fetch_all(&self.pool)
            .await?;

        let mut rules = defaults;

        for row in rows {
            let Some(v) = row.rule_value.get("value") else {
                continue;
            };
            match row.rule_key.as_str() {
                "seat_hold_seconds" => {
                    if let Some(u) = v.as_u64() {
                        rules.seat_hold_seconds = u;
                    }
                }
                "service_fee_percent" => {
                    if let Some(u) = v.as_u64() {
                        rules.service_fee_percent = u as u32;
                    }
                }
                "reference_prefix" => {
                    if let Some(s) = v.as_str() {
                        rules.reference_prefix = s.to_string();
                    }
                }
                "reference_max_attempts" => {
                    if let Some(u) = v.as_u64() {
                        rules.reference_max_attempts = u as u32;
                    }
                }
                "ticket_retry_attempts" => {
                    if let Some(u) = v.as_u64() {
                        rules.ticket_retry_attempts = u as u32;
                    }
                }
                _ => {}
            }
        }

        Ok(rules)
    }
}
