// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Optional short-lived cache of vault-issued credentials, keyed by stage.
//!
//! Disabled unless `credential_cache` is set in the settings file. A cached
//! triple is only handed out while `now + CREDENTIAL_REFRESH_BUFFER` is before
//! the vault-granted expiry; credentials without a known expiry are never
//! stored.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, SystemTime};

use tokio::sync::RwLock;

use crate::constants;
use crate::errors::Result;
use crate::models::{ScopedCredentials, Stage};

pub struct CredentialCache {
    buffer: Duration,
    cached: RwLock<HashMap<Stage, ScopedCredentials>>,
}

impl Default for CredentialCache {
    fn default() -> Self {
        Self {
            buffer: constants::CREDENTIAL_REFRESH_BUFFER,
            cached: RwLock::new(HashMap::new()),
        }
    }
}

impl CredentialCache {

    /// Returns cached credentials for `stage` if still valid, otherwise runs
    /// `fetch` and caches its result when it carries an expiry.
    pub async fn get_or_fetch<F, Fut>(&self, stage: Stage, fetch: F) -> Result<ScopedCredentials>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ScopedCredentials>>,
    {
        // Fast path: check if cached credentials are still valid
        {
            let cache = self.cached.read().await;
            if let Some(cached) = cache.get(&stage)
                && self.is_valid(cached)
            {
                return Ok(cached.clone());
            }
        }

        // Slow path: refresh credentials
        let mut cache = self.cached.write().await;

        // Double-check after acquiring write lock (another task may have refreshed)
        if let Some(cached) = cache.get(&stage)
            && self.is_valid(cached)
        {
            return Ok(cached.clone());
        }

        let credential = fetch().await?;

        if self.is_valid(&credential) {
            tracing::debug!(
                "[broker] caching {} credentials, expires_at: {:?}",
                stage,
                credential.expires_at
            );
            cache.insert(stage, credential.clone());
        } else {
            cache.remove(&stage);
        }

        Ok(credential)
    }

    fn is_valid(&self, credential: &ScopedCredentials) -> bool {
        match credential.expires_at {
            Some(expires_at) => SystemTime::now()
                .checked_add(self.buffer)
                .map(|threshold| threshold < expires_at)
                .unwrap_or(false),
            None => false, // unknown lifetime is never reused
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn credential(expires_in: Option<Duration>) -> ScopedCredentials {
        ScopedCredentials {
            access_key_id: "AKIA".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: Some("token".to_string()),
            expires_at: expires_in.map(|d| SystemTime::now() + d),
        }
    }

    async fn fetch_counted(
        cache: &CredentialCache,
        calls: &AtomicUsize,
        expires_in: Option<Duration>,
    ) -> ScopedCredentials {
        cache
            .get_or_fetch(Stage::Dev, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(credential(expires_in))
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_reuses_credentials_before_expiry() {
        let cache = CredentialCache::default();
        let calls = AtomicUsize::new(0);

        fetch_counted(&cache, &calls, Some(Duration::from_secs(3600))).await;
        fetch_counted(&cache, &calls, Some(Duration::from_secs(3600))).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_never_caches_inside_refresh_buffer() {
        let cache = CredentialCache::default();
        let calls = AtomicUsize::new(0);

        // expires within the 60s buffer
        fetch_counted(&cache, &calls, Some(Duration::from_secs(30))).await;
        fetch_counted(&cache, &calls, Some(Duration::from_secs(30))).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_never_caches_without_expiry() {
        let cache = CredentialCache::default();
        let calls = AtomicUsize::new(0);

        fetch_counted(&cache, &calls, None).await;
        fetch_counted(&cache, &calls, None).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stages_are_cached_independently() {
        let cache = CredentialCache::default();
        let calls = AtomicUsize::new(0);

        fetch_counted(&cache, &calls, Some(Duration::from_secs(3600))).await;
        let counter = &calls;
        cache
            .get_or_fetch(Stage::Prd, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(credential(Some(Duration::from_secs(3600))))
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_error_is_propagated_and_not_cached() {
        let cache = CredentialCache::default();
        let result = cache
            .get_or_fetch(Stage::Tst, || async {
                Err(crate::errors::AdminError::credential_generation("denied"))
            })
            .await;
        assert!(result.is_err());
        assert!(cache.cached.read().await.is_empty());
    }
}
