use async_trait::async_trait;
use redis::{AsyncCommands, RedisResult};
use tracing::info;
use transita_core::repository::{SeatLockStore, SequenceStore, StoreError};
use uuid::Uuid;

/// Expiring key-value client. Seat holds and the daily reference counter both
/// live here; nothing in this store is durable.
#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

fn seat_key(trip_id: Uuid, seat_code: &str) -> String {
    format!("seat:{}:{}", trip_id, seat_code)
}

fn counter_key(date_key: &str) -> String {
    format!("bookref:{}", date_key)
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// SET NX EX: the atomic set-if-absent is the only serialization point
    /// for a seat. Returns true when this call took the hold.
    pub async fn acquire_seat_lock(
        &self,
        trip_id: Uuid,
        seat_code: &str,
        holder: &str,
        ttl_seconds: u64,
    ) -> Result<bool, redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = seat_key(trip_id, seat_code);

        let result: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(holder)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await?;

        if result.is_some() {
            info!("Seat hold set: {} -> {} ({}s)", key, holder, ttl_seconds);
        }
        Ok(result.is_some())
    }

    pub async fn get_seat_lock_holder(
        &self,
        trip_id: Uuid,
        seat_code: &str,
    ) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let holder: Option<String> = conn.get(seat_key(trip_id, seat_code)).await?;
        Ok(holder)
    }

    pub async fn seat_lock_exists(
        &self,
        trip_id: Uuid,
        seat_code: &str,
    ) -> Result<bool, redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let exists: bool = conn.exists(seat_key(trip_id, seat_code)).await?;
        Ok(exists)
    }

    pub async fn release_seat_locks(
        &self,
        trip_id: Uuid,
        seat_codes: &[String],
    ) -> RedisResult<()> {
        if seat_codes.is_empty() {
            return Ok(());
        }
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let keys: Vec<String> = seat_codes
            .iter()
            .map(|seat| seat_key(trip_id, seat))
            .collect();
        conn.del(keys).await
    }

    /// INCR plus EXPIRE-on-first-increment, done server-side so a counter
    /// never ends up without a TTL when two allocators race on a fresh day.
    pub async fn next_daily_sequence(
        &self,
        date_key: &str,
        ttl_seconds: u64,
    ) -> RedisResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let script = redis::Script::new(
            r#"
            local seq = redis.call("INCR", KEYS[1])
            if seq == 1 then
                redis.call("EXPIRE", KEYS[1], ARGV[1])
            end
            return seq
        "#,
        );

        script
            .key(counter_key(date_key))
            .arg(ttl_seconds)
            .invoke_async(&mut conn)
            .await
    }
}

#[async_trait]
impl SeatLockStore for RedisClient {
    async fn try_lock_seat(
        &self,
        trip_id: Uuid,
        seat_code: &str,
        holder: &str,
        ttl_seconds: u64,
    ) -> Result<bool, StoreError> {
        self.acquire_seat_lock(trip_id, seat_code, holder, ttl_seconds)
            .await
            .map_err(Into::into)
    }

    async fn seat_lock_holder(
        &self,
        trip_id: Uuid,
        seat_code: &str,
    ) -> Result<Option<String>, StoreError> {
        self.get_seat_lock_holder(trip_id, seat_code)
            .await
            .map_err(Into::into)
    }

    async fn is_seat_locked(&self, trip_id: Uuid, seat_code: &str) -> Result<bool, StoreError> {
        self.seat_lock_exists(trip_id, seat_code)
            .await
            .map_err(Into::into)
    }

    async fn release_seats(&self, trip_id: Uuid, seat_codes: &[String]) -> Result<(), StoreError> {
        self.release_seat_locks(trip_id, seat_codes)
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl SequenceStore for RedisClient {
    async fn next_in_sequence(
        &self,
        date_key: &str,
        ttl_seconds: u64,
    ) -> Result<u64, StoreError> {
        self.next_daily_sequence(date_key, ttl_seconds)
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_keys_are_scoped_per_trip() {
        let trip_a = Uuid::new_v4();
        let trip_b = Uuid::new_v4();
        assert_ne!(seat_key(trip_a, "A1"), seat_key(trip_b, "A1"));
        assert_eq!(seat_key(trip_a, "A1"), format!("seat:{}:A1", trip_a));
    }

    #[test]
    fn counter_keys_are_scoped_per_day() {
        assert_eq!(counter_key("20260806"), "bookref:20260806");
        assert_ne!(counter_key("20260806"), counter_key("20260807"));
    }
}
