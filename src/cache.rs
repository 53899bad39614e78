//! In-memory lookup caches shared across requests.
//!
//! Writes are idempotent re-sets of the same value, so concurrent misses
//! only cost a redundant upstream call.

use std::time::Duration;

use moka::future::Cache;
use moka::policy::EvictionPolicy;
use serde_json::Value;

use crate::config::Config;

#[derive(Clone)]
pub struct CacheService {
    workspace_ids: Cache<String, String>,
    team_ids: Cache<String, String>,
    permissions: Cache<String, Value>,
}

impl CacheService {
    pub fn new(id_capacity: u64, permission_capacity: u64, permission_ttl: Duration) -> Self {
        Self {
            workspace_ids: lru(id_capacity).build(),
            team_ids: lru(id_capacity).build(),
            permissions: lru(permission_capacity)
                .time_to_live(permission_ttl)
                .build(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.id_cache_capacity,
            config.permission_cache_capacity,
            config.permission_cache_ttl,
        )
    }

    pub async fn workspace_id(&self, path: &str) -> Option<String> {
        self.workspace_ids.get(path).await
    }

    pub async fn remember_workspace_id(&self, path: &str, id: &str) {
        self.workspace_ids.insert(path.to_string(), id.to_string()).await;
    }

    pub async fn team_id(&self, workspace_id: &str, identifier: &str) -> Option<String> {
        self.team_ids.get(&team_key(workspace_id, identifier)).await
    }

    pub async fn remember_team_id(&self, workspace_id: &str, identifier: &str, id: &str) {
        self.team_ids
            .insert(team_key(workspace_id, identifier), id.to_string())
            .await;
    }

    pub async fn permissions(&self, resource_id: &str, user_id: &str) -> Option<Value> {
        self.permissions
            .get(&permission_key(resource_id, user_id))
            .await
    }

    pub async fn remember_permissions(&self, resource_id: &str, user_id: &str, value: Value) {
        self.permissions
            .insert(permission_key(resource_id, user_id), value)
            .await;
    }
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("workspace_ids", &self.workspace_ids.entry_count())
            .field("team_ids", &self.team_ids.entry_count())
            .field("permissions", &self.permissions.entry_count())
            .finish()
    }
}

fn lru<V>(capacity: u64) -> moka::future::CacheBuilder<String, V, Cache<String, V>>
where
    V: Clone + Send + Sync + 'static,
{
    Cache::builder()
        .max_capacity(capacity)
        .eviction_policy(EvictionPolicy::lru())
}

fn team_key(workspace_id: &str, identifier: &str) -> String {
    format!("{workspace_id}:{identifier}")
}

fn permission_key(resource_id: &str, user_id: &str) -> String {
    format!("{resource_id}:{user_id}")
}
