use deadpool_redis::Pool;
use deadpool_redis::redis::{self, RedisError};

use crate::domain::repository::Throttle;
use crate::error::AuthServiceError;

/// Fixed-window counters in Redis. The window starts on the first hit.
#[derive(Clone)]
pub struct RedisThrottle {
    pub pool: Pool,
}

fn throttle_key(key: &str) -> String {
    format!("throttle:{key}")
}

/// `SET NX EX` then `INCR` in one `MULTI`: a new key is created with its TTL
/// before it is ever counted, so a counter can never outlive its window.
fn hit_pipeline(key: &str, window_secs: u64) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .cmd("SET")
        .arg(key)
        .arg(0)
        .arg("EX")
        .arg(window_secs)
        .arg("NX")
        .ignore()
        .cmd("INCR")
        .arg(key);
    pipe
}

impl Throttle for RedisThrottle {
    async fn hit(&self, key: &str, limit: u32, window_secs: u64) -> Result<bool, AuthServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AuthServiceError::Internal(e.into()))?;
        let (count,): (u64,) = hit_pipeline(&throttle_key(key), window_secs.max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e: RedisError| AuthServiceError::Internal(e.into()))?;
        Ok(count <= u64::from(limit))
    }
}
