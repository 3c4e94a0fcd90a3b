// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis implementation of the [`KvStore`] trait.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use handover_config::model::StorageConfig;
use handover_core::{Adapter, AdapterType, HandoverError, HealthStatus, KvStore, KvWrite};
use redis::AsyncCommands;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use tracing::{error, info, warn};

const INITIAL_RETRY_DELAY_MS: u64 = 250;
const MAX_RETRY_DELAY_MS: u64 = 5_000;
const SCAN_BATCH: usize = 100;

/// Redis-backed store shared by every relay process.
///
/// Uses a [`ConnectionManager`], which multiplexes one connection and
/// reconnects transparently; clones of the manager are cheap handles.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Connects using `config.redis_url`, retrying with exponential backoff.
    pub async fn connect(config: &StorageConfig) -> Result<Self, HandoverError> {
        let url = config
            .redis_url
            .as_deref()
            .ok_or_else(|| HandoverError::Config("storage.redis_url is required".into()))?;

        info!(
            connection_timeout_secs = config.connection_timeout_secs,
            response_timeout_secs = config.response_timeout_secs,
            retries = config.connection_retries,
            "connecting to redis"
        );

        let client = redis::Client::open(url)
            .map_err(|e| HandoverError::Config(format!("invalid redis url: {e}")))?;
        let manager = Self::connect_with_retry(&client, config).await?;

        info!("connected to redis");
        Ok(Self { manager })
    }

    async fn connect_with_retry(
        client: &redis::Client,
        config: &StorageConfig,
    ) -> Result<ConnectionManager, HandoverError> {
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(Duration::from_secs(config.connection_timeout_secs))
            .set_response_timeout(Duration::from_secs(config.response_timeout_secs))
            .set_number_of_retries(config.connection_retries as usize)
            .set_max_delay(MAX_RETRY_DELAY_MS);

        let max_retries = config.connection_retries;
        let mut delay_ms = INITIAL_RETRY_DELAY_MS;
        let mut attempt = 0;

        loop {
            match ConnectionManager::new_with_config(client.clone(), manager_config.clone()).await
            {
                Ok(manager) => {
                    if attempt > 0 {
                        info!(attempt, "redis connection established after retries");
                    }
                    return Ok(manager);
                }
                Err(e) if attempt < max_retries => {
                    warn!(
                        attempt = attempt + 1,
                        max = max_retries + 1,
                        delay_ms,
                        error = %e,
                        "redis connection attempt failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms = (delay_ms * 2).min(MAX_RETRY_DELAY_MS);
                    attempt += 1;
                }
                Err(e) => {
                    error!(attempts = max_retries + 1, error = %e, "giving up on redis");
                    return Err(HandoverError::storage(e));
                }
            }
        }
    }

    fn conn(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

/// Escapes glob metacharacters so a key prefix matches literally in `SCAN MATCH`.
fn glob_escape(prefix: &str) -> String {
    let mut out = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn command_failed(op: &'static str) -> impl FnOnce(redis::RedisError) -> HandoverError {
    move |e| {
        error!(op, error = %e, "redis command failed");
        HandoverError::storage(e)
    }
}

#[async_trait]
impl Adapter for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, HandoverError> {
        let mut conn = self.conn();
        let pong: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        Ok(match pong {
            Ok(reply) if reply == "PONG" => HealthStatus::Healthy,
            Ok(reply) => HealthStatus::Degraded(format!("unexpected PING reply `{reply}`")),
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, HandoverError> {
        let mut conn = self.conn();
        conn.get(key).await.map_err(command_failed("GET"))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), HandoverError> {
        let mut conn = self.conn();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(command_failed("SET"))
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, HandoverError> {
        let mut conn = self.conn();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis().max(1) as u64)
            .query_async(&mut conn)
            .await
            .map_err(command_failed("SET NX"))?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> Result<(), HandoverError> {
        let mut conn = self.conn();
        conn.del::<_, ()>(key).await.map_err(command_failed("DEL"))
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, HandoverError> {
        let pattern = format!("{}*", glob_escape(prefix));
        let mut conn = self.conn();
        let mut found = Vec::new();
        let mut cursor = 0u64;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(command_failed("SCAN"))?;
            found.extend(keys);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        // SCAN may return a key more than once across iterations.
        found.sort();
        found.dedup();
        Ok(found)
    }

    async fn set_add(&self, key: &str, members: &[String]) -> Result<(), HandoverError> {
        if members.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn();
        conn.sadd::<_, _, ()>(key, members)
            .await
            .map_err(command_failed("SADD"))
    }

    async fn set_remove(&self, key: &str, members: &[String]) -> Result<(), HandoverError> {
        if members.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn();
        conn.srem::<_, _, ()>(key, members)
            .await
            .map_err(command_failed("SREM"))
    }

    async fn set_members(&self, key: &str) -> Result<BTreeSet<String>, HandoverError> {
        let mut conn = self.conn();
        conn.smembers(key).await.map_err(command_failed("SMEMBERS"))
    }

    async fn write_batch(&self, writes: Vec<KvWrite>) -> Result<(), HandoverError> {
        if writes.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        pipe.atomic();
        for write in &writes {
            match write {
                KvWrite::Set { key, value } => {
                    pipe.set(key, value).ignore();
                }
                KvWrite::Delete { key } => {
                    pipe.del(key).ignore();
                }
            }
        }
        let mut conn = self.conn();
        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(command_failed("MULTI"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_escape_quotes_metacharacters() {
        assert_eq!(glob_escape("session:"), "session:");
        assert_eq!(glob_escape("a*b?[c]\\"), "a\\*b\\?\\[c\\]\\\\");
    }

    #[tokio::test]
    async fn connect_requires_url() {
        let err = RedisStore::connect(&StorageConfig::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, HandoverError::Config(_)));
    }

    #[tokio::test]
    async fn malformed_url_is_a_config_error() {
        let config = StorageConfig {
            redis_url: Some("not a url".into()),
            ..StorageConfig::default()
        };
        let err = RedisStore::connect(&config).await.err().unwrap();
        assert!(matches!(err, HandoverError::Config(_)));
    }
}
