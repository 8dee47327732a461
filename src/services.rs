//! One bundle of the core services sharing a store, a cache and a config.

use std::sync::Arc;

use tracing::info;

use crate::analysis::{AnalysisClient, AnalysisGateway};
use crate::audit::AuditRecorder;
use crate::cache::QueryCache;
use crate::config::CoreConfig;
use crate::error::CoreResult;
use crate::identity::{Principal, RoleResolver, SessionContext};
use crate::notifications::{unread_badge, NotificationCenter};
use crate::store::{AuditStore, MemoryStore, NotificationStore, RoleStore};

pub struct CoreServices {
    pub config: CoreConfig,
    pub cache: Arc<QueryCache>,
    pub session: SessionContext,
    pub roles: Arc<RoleResolver>,
    pub audit: Arc<AuditRecorder>,
    pub notifications: NotificationCenter,
    pub analysis: AnalysisGateway,
}

impl CoreServices {
    pub fn new<S>(store: Arc<S>, client: Arc<dyn AnalysisClient>, config: CoreConfig) -> CoreResult<Self>
    where
        S: RoleStore + AuditStore + NotificationStore + 'static,
    {
        config.validate()?;
        let cache = Arc::new(QueryCache::new(config.cache_ttl_ms));
        let role_store: Arc<dyn RoleStore> = store.clone();
        let audit_store: Arc<dyn AuditStore> = store.clone();
        let notification_store: Arc<dyn NotificationStore> = store;

        let roles = Arc::new(RoleResolver::new(role_store, cache.clone()));
        let audit = Arc::new(
            AuditRecorder::new(audit_store, roles.clone())
                .with_limits(config.audit_default_limit, config.audit_max_limit),
        );
        let notifications = NotificationCenter::new(notification_store, cache.clone());
        let analysis = AnalysisGateway::new(client)
            .with_confidence_range(config.analysis.confidence_min, config.analysis.confidence_max);
        info!(
            target: "stratum::services",
            "core services ready: cache_ttl_ms={} audit_limit={}/{}",
            config.cache_ttl_ms, config.audit_default_limit, config.audit_max_limit
        );

        Ok(Self {
            session: SessionContext::new(cache.clone()),
            config,
            cache,
            roles,
            audit,
            notifications,
            analysis,
        })
    }

    /// Services over a fresh `MemoryStore`; the store is returned for seeding and inspection.
    pub fn in_memory(client: Arc<dyn AnalysisClient>, config: CoreConfig) -> CoreResult<(Self, Arc<MemoryStore>)> {
        let store = Arc::new(MemoryStore::new());
        let services = Self::new(store.clone(), client, config)?;
        Ok((services, store))
    }

    /// Badge text for the principal's unread count, capped per config.
    pub async fn unread_badge(&self, principal: Option<&Principal>) -> CoreResult<Option<String>> {
        let count = self.notifications.unread_count(principal).await?;
        Ok(unread_badge(count, self.config.badge_cap))
    }
}
