//! Process-wide directory of live matches.
//!
//! The registry is the only structure shared by every connection. It maps
//! match ids to their coordinators and is the single place matches are
//! created and discarded. Coordinators are fully constructed (bot seats
//! initialized) before insertion, so a successful lookup always yields a
//! usable match - there is no partially-created state to observe.

use crate::config::ServerConfig;
use crate::coordinator::{CreateError, MatchCoordinator};
use crate::protocol::MatchConfig;
use bot_sandbox::BotCatalog;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Lookup failure: stale or unknown match id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("match '{0}' not found")]
pub struct MatchNotFound(pub String);

/// Concurrency-safe map of match id to coordinator.
pub struct MatchRegistry {
    catalog: Arc<BotCatalog>,
    config: ServerConfig,
    matches: RwLock<HashMap<String, Arc<MatchCoordinator>>>,
}

impl MatchRegistry {
    /// Creates an empty registry over the shared bot catalog.
    pub fn new(catalog: Arc<BotCatalog>, config: ServerConfig) -> Self {
        MatchRegistry {
            catalog,
            config,
            matches: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a match and registers it under its fresh id.
    ///
    /// The coordinator is built (including bot initialization) before the
    /// map is touched; uuid ids keep concurrent creations collision-free.
    ///
    /// # Errors
    ///
    /// Returns [`CreateError`] when the config fails validation.
    pub async fn create(&self, config: MatchConfig) -> Result<Arc<MatchCoordinator>, CreateError> {
        let coordinator =
            Arc::new(MatchCoordinator::create(config, &self.catalog, &self.config).await?);

        let mut matches = self.matches.write().unwrap_or_else(|e| e.into_inner());
        matches.insert(coordinator.id().to_string(), coordinator.clone());
        tracing::info!(match_id = %coordinator.id(), live = matches.len(), "match registered");
        Ok(coordinator)
    }

    /// Looks up a live match.
    ///
    /// # Errors
    ///
    /// Returns [`MatchNotFound`] for unknown or discarded ids.
    pub fn get(&self, id: &str) -> Result<Arc<MatchCoordinator>, MatchNotFound> {
        let matches = self.matches.read().unwrap_or_else(|e| e.into_inner());
        matches
            .get(id)
            .cloned()
            .ok_or_else(|| MatchNotFound(id.to_string()))
    }

    /// Discards a match. In-flight handles keep working until dropped;
    /// new lookups fail.
    ///
    /// # Errors
    ///
    /// Returns [`MatchNotFound`] if the id is not registered.
    pub fn remove(&self, id: &str) -> Result<(), MatchNotFound> {
        let mut matches = self.matches.write().unwrap_or_else(|e| e.into_inner());
        matches
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| MatchNotFound(id.to_string()))
    }

    /// Number of live matches.
    pub fn len(&self) -> usize {
        self.matches
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// True when no matches are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
