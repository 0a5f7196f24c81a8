// SPDX-License-Identifier: MIT OR Apache-2.0
//! Audit trail for progression changes made through the API.
//!
//! Entries are kept in memory and capped at `max_entries`, oldest first out.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Configuration for audit logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditConfig {
    /// Enable audit logging.
    pub enabled: bool,
    /// Log plain XP grants. Level-ups are always logged.
    pub log_xp_grants: bool,
    /// Maximum entries to retain (0 = unlimited).
    pub max_entries: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_xp_grants: true,
            max_entries: 100_000,
        }
    }
}

impl AuditConfig {
    /// Create a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip entries for XP grants that did not level the user up.
    #[must_use]
    pub const fn without_xp_grants(mut self) -> Self {
        self.log_xp_grants = false;
        self
    }

    /// Set maximum entries to retain.
    #[must_use]
    pub const fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Disable audit logging.
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Audit event types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Progression record created.
    UserCreated {
        /// The user.
        user_id: String,
    },
    /// XP granted or deducted.
    XpGranted {
        /// The user.
        user_id: String,
        /// Applied amount after multipliers.
        amount: i64,
        /// Ledger reason.
        reason: String,
    },
    /// User crossed one or more level boundaries.
    LevelUp {
        /// The user.
        user_id: String,
        /// Level before the change.
        from: u32,
        /// Level after the change.
        to: u32,
    },
    /// Quest reward claimed.
    QuestClaimed {
        /// The user.
        user_id: String,
        /// The quest.
        quest_id: String,
        /// XP awarded.
        xp: u32,
    },
    /// Achievement unlocked.
    AchievementUnlocked {
        /// The user.
        user_id: String,
        /// The achievement.
        achievement_id: String,
    },
    /// Karma changed directly.
    KarmaAdjusted {
        /// The user.
        user_id: String,
        /// Signed change.
        delta: i64,
    },
    /// Stored total was repaired from the ledger.
    LedgerReconciled {
        /// The user.
        user_id: String,
        /// Total before the repair.
        stored_total: u64,
        /// Ledger sum.
        ledger_total: i64,
    },
}

impl AuditEvent {
    /// The user the event concerns.
    #[must_use]
    pub fn user_id(&self) -> &str {
        match self {
            Self::UserCreated { user_id }
            | Self::XpGranted { user_id, .. }
            | Self::LevelUp { user_id, .. }
            | Self::QuestClaimed { user_id, .. }
            | Self::AchievementUnlocked { user_id, .. }
            | Self::KarmaAdjusted { user_id, .. }
            | Self::LedgerReconciled { user_id, .. } => user_id,
        }
    }
}

/// Audit entry with timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique, increasing entry ID.
    pub id: u64,
    /// The audit event.
    pub event: AuditEvent,
    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,
}

/// In-memory audit logger.
#[derive(Debug)]
pub struct AuditLogger {
    entries: DashMap<u64, AuditEntry>,
    counter: AtomicU64,
    config: AuditConfig,
}

impl AuditLogger {
    /// Create a new audit logger with the given configuration.
    #[must_use]
    pub fn new(config: AuditConfig) -> Self {
        Self {
            entries: DashMap::new(),
            counter: AtomicU64::new(0),
            config,
        }
    }

    fn should_log(&self, event: &AuditEvent) -> bool {
        if !self.config.enabled {
            return false;
        }
        match event {
            AuditEvent::XpGranted { .. } => self.config.log_xp_grants,
            _ => true,
        }
    }

    fn enforce_max_entries(&self) {
        if self.config.max_entries == 0 {
            return;
        }

        let current_count = self.entries.len();
        if current_count <= self.config.max_entries {
            return;
        }

        // Remove oldest entries (lowest IDs)
        let to_remove = current_count - self.config.max_entries;
        let mut ids: Vec<u64> = self.entries.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();

        for id in ids.into_iter().take(to_remove) {
            self.entries.remove(&id);
        }
    }

    /// Record an audit event (best-effort, never fails).
    pub fn record(&self, event: AuditEvent) {
        if !self.should_log(&event) {
            return;
        }

        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        self.entries.insert(
            id,
            AuditEntry {
                id,
                event,
                timestamp: Utc::now(),
            },
        );
        self.enforce_max_entries();
    }

    /// Events for one user, oldest first.
    #[must_use]
    pub fn by_user(&self, user_id: &str) -> Vec<AuditEntry> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .filter(|e| e.event.user_id() == user_id)
            .map(|e| e.clone())
            .collect();
        entries.sort_by_key(|e| e.id);
        entries
    }

    /// Events recorded at or after `since`.
    #[must_use]
    pub fn since(&self, since: DateTime<Utc>) -> Vec<AuditEntry> {
        self.entries
            .iter()
            .filter(|e| e.timestamp >= since)
            .map(|e| e.clone())
            .collect()
    }

    /// Most recent events, newest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        let mut entries: Vec<_> = self.entries.iter().map(|e| e.clone()).collect();
        entries.sort_by(|a, b| b.id.cmp(&a.id));
        entries.truncate(limit);
        entries
    }

    /// Get total event count.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Check if audit logging is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &AuditConfig {
        &self.config
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new(AuditConfig::default())
    }
}
