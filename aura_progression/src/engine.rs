// SPDX-License-Identifier: MIT OR Apache-2.0
//! Progression engine façade.
//!
//! [`ProgressionEngine`] composes the level curve, XP ledger, quest tracker,
//! achievement unlocker and streak counter into the caller-facing
//! operations. Mutations of one user are serialized with an async mutex
//! keyed by user id; quest claims and achievement unlocks additionally rely
//! on atomic store writes so rewards are applied exactly once even when
//! several engines share a store.
//!
//! # Ledger consistency
//!
//! Every XP change appends an event before the snapshot is written. If the
//! snapshot write fails after the append, the engine rewrites `total_xp`
//! from the ledger sum and reports [`ProgressionError::InconsistentLedger`].
//! Snapshot reads always verify the stored total against the ledger.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::achievement::{
    AchievementCatalogue, AchievementEntry, AchievementTemplate, AchievementTrigger,
    AchievementUnlock, AchievementUnlocker, UnlockedAchievement,
};
use crate::clock::{Clock, SystemClock};
use crate::config::ProgressionConfig;
use crate::curve::{level_title, LevelCurve, LevelProgress};
use crate::error::{ProgressionError, Result};
use crate::ledger::{XpEvent, XpLedger, XpReason};
use crate::model::{UserId, UserProgression};
use crate::quest::{Quest, QuestAssignment, QuestId, QuestProgress, QuestTracker};
use crate::store::{ProgressionStore, StoreError};
use crate::streak::{StreakChange, StreakCounter, StreakState};

/// Result of an XP grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantOutcome {
    /// Ledger event of the grant itself.
    pub event_id: Uuid,
    /// Amount requested by the caller.
    pub requested: i64,
    /// Amount recorded after the streak multiplier.
    pub applied: i64,
    /// Streak multiplier used.
    pub multiplier: f64,
    /// Level before the grant.
    pub previous_level: u32,
    /// Level after the grant and any achievement rewards.
    pub level: u32,
    /// Total XP after the grant and any achievement rewards.
    pub total_xp: u64,
    /// Whether the final level is above the previous one.
    pub leveled_up: bool,
    /// Progress breakdown after the grant.
    pub progress: LevelProgress,
    /// Achievements unlocked as a consequence.
    pub unlocked: Vec<UnlockedAchievement>,
}

/// Result of claiming a quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimOutcome {
    /// The quest, now claimed.
    pub quest: Quest,
    /// XP granted by the quest.
    pub xp_awarded: u64,
    /// Karma granted by the quest.
    pub karma_awarded: i64,
    /// Level before the claim.
    pub previous_level: u32,
    /// Level after the claim.
    pub level: u32,
    /// Total XP after the claim.
    pub total_xp: u64,
    /// Karma after the claim.
    pub karma: i64,
    /// Whether the final level is above the previous one.
    pub leveled_up: bool,
    /// Achievements unlocked as a consequence.
    pub unlocked: Vec<UnlockedAchievement>,
}

/// Result of recording daily activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityOutcome {
    /// What happened to the streak.
    pub change: StreakChange,
    /// Streak after the activity.
    pub streak: StreakState,
    /// Multiplier now in effect.
    pub multiplier: f64,
    /// Daily login XP granted (0 unless this opened a new day).
    pub xp_awarded: u64,
    /// Level after the activity.
    pub level: u32,
    /// Total XP after the activity.
    pub total_xp: u64,
    /// Whether the level increased.
    pub leveled_up: bool,
    /// Achievements unlocked as a consequence.
    pub unlocked: Vec<UnlockedAchievement>,
}

/// Result of a karma adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KarmaOutcome {
    /// Applied delta.
    pub delta: i64,
    /// Karma after the adjustment.
    pub karma: i64,
}

/// Result of checking a snapshot against the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Sum of all XP events.
    pub ledger_total: i64,
    /// Total recorded before reconciliation.
    pub stored_total: u64,
    /// Whether the snapshot had to be rewritten.
    pub corrected: bool,
    /// Level after reconciliation.
    pub level: u32,
}

/// Authoritative view of a user's progression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionSnapshot {
    /// Reconciled record.
    pub progression: UserProgression,
    /// Progress breakdown from the level curve.
    pub progress: LevelProgress,
    /// Title for the current level.
    pub title: String,
    /// Streak multiplier in effect.
    pub streak_multiplier: f64,
    /// Number of achievements held.
    pub achievements_unlocked: usize,
}

struct GrantApplied {
    event: XpEvent,
    applied: i64,
    multiplier: f64,
}

/// Caller-facing progression operations.
///
/// Mutations for one user are serialized by a lock held in this engine
/// only. Engines in separate processes sharing a store still reward quests
/// and achievements exactly once, through the store's conditional writes,
/// and XP is never lost because the ledger is authoritative and every
/// snapshot read reconciles against it. Snapshot fields with no ledger
/// behind them (karma, streak, activity counters) are last-writer-wins
/// across engines: a concurrent update from another engine can be
/// overwritten. Route each user to a single engine when those must be
/// exact.
pub struct ProgressionEngine {
    store: Arc<dyn ProgressionStore>,
    config: ProgressionConfig,
    curve: LevelCurve,
    streaks: StreakCounter,
    ledger: XpLedger,
    quests: QuestTracker,
    unlocker: AchievementUnlocker,
    catalogue: AchievementCatalogue,
    clock: Arc<dyn Clock>,
    user_locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for ProgressionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressionEngine")
            .field("level_ceiling", &self.curve.ceiling())
            .field("achievements", &self.catalogue.len())
            .field("locked_users", &self.user_locks.len())
            .finish_non_exhaustive()
    }
}

impl ProgressionEngine {
    /// Creates an engine on the system clock.
    pub fn new(store: Arc<dyn ProgressionStore>, config: ProgressionConfig) -> Result<Self> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Creates an engine with an explicit clock.
    pub fn with_clock(
        store: Arc<dyn ProgressionStore>,
        config: ProgressionConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let curve = LevelCurve::new(&config.curve)?;
        let streaks = StreakCounter::new(&config.streak);
        let catalogue = AchievementCatalogue::new(config.achievements.clone());
        tracing::info!(
            level_ceiling = curve.ceiling(),
            achievements = catalogue.len(),
            daily_login_xp = config.daily_login_xp,
            "progression engine initialized"
        );
        Ok(Self {
            ledger: XpLedger::new(Arc::clone(&store)),
            quests: QuestTracker::new(Arc::clone(&store)),
            unlocker: AchievementUnlocker::new(Arc::clone(&store)),
            store,
            config,
            curve,
            streaks,
            catalogue,
            clock,
            user_locks: DashMap::new(),
        })
    }

    /// The level curve in use.
    #[must_use]
    pub const fn curve(&self) -> &LevelCurve {
        &self.curve
    }

    /// The validated configuration.
    #[must_use]
    pub const fn config(&self) -> &ProgressionConfig {
        &self.config
    }

    /// The achievement catalogue.
    #[must_use]
    pub const fn catalogue(&self) -> &AchievementCatalogue {
        &self.catalogue
    }

    /// Progress breakdown for an arbitrary XP total.
    #[must_use]
    pub fn level_progress(&self, total_xp: u64) -> LevelProgress {
        self.curve.progress(total_xp)
    }

    async fn lock_user(&self, user_id: &UserId) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(self.user_locks.entry(user_id.clone()).or_default().value());
        lock.lock_owned().await
    }

    async fn load(&self, user_id: &UserId) -> Result<UserProgression> {
        self.store
            .read_progression(user_id)
            .await?
            .ok_or_else(|| ProgressionError::UserNotFound(user_id.clone()))
    }

    /// Creates the progression record for a new account.
    pub async fn create_progression(&self, user_id: &UserId) -> Result<UserProgression> {
        let progression = UserProgression::new(user_id.clone(), self.clock.now());
        if !self.store.insert_progression(&progression).await? {
            return Err(ProgressionError::UserExists(user_id.clone()));
        }
        tracing::info!(user_id = %user_id, "progression created");
        Ok(progression)
    }

    /// Grants XP for an action.
    ///
    /// Streak-eligible reasons are scaled by the current streak multiplier
    /// (floored). Achievement rewards triggered by the grant are applied
    /// before returning, and count toward `leveled_up`.
    pub async fn grant_xp(
        &self,
        user_id: &UserId,
        amount: i64,
        reason: XpReason,
    ) -> Result<GrantOutcome> {
        let _guard = self.lock_user(user_id).await;
        let now = self.clock.now();
        let mut progression = self.load(user_id).await?;
        let previous_level = self.curve.level_for(progression.total_xp);

        // Counters ride along with the snapshot write of the grant.
        let counted = progression.stats.record(reason);
        let granted = self
            .grant_locked(&mut progression, amount, reason, true, now)
            .await?;

        let mut triggers: Vec<_> = counted.into_iter().collect();
        if progression.level != previous_level {
            triggers.push(AchievementTrigger::LevelReached);
        }
        let unlocked = self.cascade(&mut progression, triggers, now).await?;

        if progression.level > previous_level {
            tracing::info!(
                user_id = %user_id,
                from = previous_level,
                to = progression.level,
                "level up"
            );
        }

        Ok(GrantOutcome {
            event_id: granted.event.id,
            requested: amount,
            applied: granted.applied,
            multiplier: granted.multiplier,
            previous_level,
            level: progression.level,
            total_xp: progression.total_xp,
            leveled_up: progression.level > previous_level,
            progress: self.curve.progress(progression.total_xp),
            unlocked,
        })
    }

    /// Appends a ledger event and persists the updated snapshot.
    async fn grant_locked(
        &self,
        progression: &mut UserProgression,
        amount: i64,
        reason: XpReason,
        apply_streak: bool,
        now: DateTime<Utc>,
    ) -> Result<GrantApplied> {
        let multiplier = if apply_streak && amount > 0 && reason.is_streak_eligible() {
            self.streaks.multiplier_for(progression.streak.streak_days)
        } else {
            1.0
        };
        let applied = scale_amount(amount, multiplier);

        let (event, new_total) = self
            .ledger
            .grant(&progression.user_id, progression.total_xp, applied, reason, now)
            .await?;

        progression.total_xp = new_total;
        progression.level = self.curve.level_for(new_total);
        progression.updated_at = now;
        self.commit(progression, &event).await?;

        Ok(GrantApplied {
            event,
            applied,
            multiplier,
        })
    }

    /// Writes the snapshot for a grant whose ledger event is already appended.
    async fn commit(&self, progression: &UserProgression, event: &XpEvent) -> Result<()> {
        let Err(err) = self.store.write_progression(progression).await else {
            return Ok(());
        };
        tracing::error!(
            user_id = %progression.user_id,
            error = %err,
            "snapshot write failed after ledger append"
        );
        Err(self.recover(progression, event, &err).await)
    }

    /// Handles a failed snapshot write for `event`.
    ///
    /// First rewrites the snapshot with `total_xp` taken from the ledger and
    /// reports `InconsistentLedger`: the grant stands. If that write fails
    /// too, a compensating adjustment cancels the event and the original
    /// storage error is returned, so the caller can roll back and retry.
    async fn recover(
        &self,
        progression: &UserProgression,
        event: &XpEvent,
        cause: &StoreError,
    ) -> ProgressionError {
        let user_id = &progression.user_id;
        let stored_total = match self.store.read_progression(user_id).await {
            Ok(Some(stored)) => stored.total_xp,
            Ok(None) | Err(_) => progression.total_xp,
        };

        match self.repair_snapshot(progression).await {
            Ok(ledger_total) => {
                tracing::warn!(
                    user_id = %user_id,
                    ledger_total,
                    stored_total,
                    "snapshot reconciled from ledger"
                );
                return ProgressionError::InconsistentLedger {
                    user_id: user_id.clone(),
                    ledger_total,
                    stored_total,
                };
            },
            Err(err) => tracing::error!(
                user_id = %user_id,
                error = %err,
                "snapshot repair failed"
            ),
        }

        match self.ledger.compensate(user_id, event.amount, self.clock.now()).await {
            Ok(_) => ProgressionError::Storage(cause.clone()),
            Err(err) => {
                tracing::error!(
                    user_id = %user_id,
                    event_id = %event.id,
                    error = %err,
                    "compensation failed; snapshot stays stale until next reconcile"
                );
                ProgressionError::InconsistentLedger {
                    user_id: user_id.clone(),
                    ledger_total: i64::try_from(progression.total_xp).unwrap_or(i64::MAX),
                    stored_total,
                }
            },
        }
    }

    /// Writes `progression` with its total replaced by the ledger sum.
    async fn repair_snapshot(&self, progression: &UserProgression) -> Result<i64> {
        let ledger_total = self.ledger.total_for(&progression.user_id).await?;
        let mut repaired = progression.clone();
        repaired.total_xp = non_negative(ledger_total);
        repaired.level = self.curve.level_for(repaired.total_xp);
        self.store.write_progression(&repaired).await?;
        Ok(ledger_total)
    }

    /// Evaluates templates for pending triggers until no new unlock occurs.
    async fn cascade(
        &self,
        progression: &mut UserProgression,
        triggers: Vec<AchievementTrigger>,
        now: DateTime<Utc>,
    ) -> Result<Vec<UnlockedAchievement>> {
        let mut pending: VecDeque<AchievementTrigger> = triggers.into();
        let mut unlocked = Vec::new();

        while let Some(trigger) = pending.pop_front() {
            if trigger == AchievementTrigger::Manual {
                continue;
            }
            let value = progression.counter_for(trigger);
            for template in self.catalogue.by_trigger(trigger) {
                let Some(unlock) = self
                    .unlocker
                    .try_unlock(&progression.user_id, template, value, now)
                    .await?
                else {
                    continue;
                };
                let level_before = progression.level;
                unlocked.push(self.reward_unlock(progression, template, &unlock, now).await?);
                if progression.level > level_before
                    && !pending.contains(&AchievementTrigger::LevelReached)
                {
                    pending.push_back(AchievementTrigger::LevelReached);
                }
            }
        }
        Ok(unlocked)
    }

    /// Applies the rewards of a freshly written unlock.
    async fn reward_unlock(
        &self,
        progression: &mut UserProgression,
        template: &AchievementTemplate,
        unlock: &AchievementUnlock,
        now: DateTime<Utc>,
    ) -> Result<UnlockedAchievement> {
        progression.karma = progression.karma.saturating_add(template.karma_reward);
        progression.stats.achievements_unlocked += 1;
        progression.updated_at = now;

        let xp = i64::try_from(template.xp_reward).unwrap_or(i64::MAX);
        let applied = if xp > 0 {
            self.grant_locked(progression, xp, XpReason::AchievementReward, false, now)
                .await
                .map(|_| ())
        } else {
            self.store
                .write_progression(progression)
                .await
                .map_err(ProgressionError::from)
        };

        if let Err(err) = applied {
            // Same rule as quest claims: only a landed ledger event keeps the unlock.
            if !matches!(err, ProgressionError::InconsistentLedger { .. }) {
                if let Err(revoke_err) = self.unlocker.revoke(&unlock.user_id, &template.id).await {
                    tracing::error!(
                        achievement_id = %template.id,
                        error = %revoke_err,
                        "unlock revoke failed"
                    );
                }
            }
            return Err(err);
        }
        Ok(UnlockedAchievement::new(template, unlock))
    }

    /// Adds progress to a quest. Completion does not claim it.
    pub async fn complete_quest_action(
        &self,
        user_id: &UserId,
        quest_id: QuestId,
        delta: u32,
    ) -> Result<QuestProgress> {
        let _guard = self.lock_user(user_id).await;
        self.quests
            .record_progress(user_id, quest_id, delta, self.clock.now())
            .await
    }

    /// Claims a completed quest and applies its rewards once.
    pub async fn claim_quest(&self, user_id: &UserId, quest_id: QuestId) -> Result<ClaimOutcome> {
        let _guard = self.lock_user(user_id).await;
        let now = self.clock.now();
        let mut progression = self.load(user_id).await?;
        let previous_level = self.curve.level_for(progression.total_xp);

        let claimed = self.quests.claim(user_id, quest_id, now).await?;
        let rewards = claimed.rewards;

        progression.karma = progression.karma.saturating_add(rewards.karma);
        progression.stats.quests_claimed += 1;
        progression.updated_at = now;

        let applied = if rewards.xp > 0 {
            self.grant_locked(
                &mut progression,
                i64::from(rewards.xp),
                XpReason::QuestReward,
                false,
                now,
            )
            .await
            .map(|_| ())
        } else {
            self.store
                .write_progression(&progression)
                .await
                .map_err(ProgressionError::from)
        };

        if let Err(err) = applied {
            // A ledger event that made it in keeps the claim; anything else rolls it back.
            if !matches!(err, ProgressionError::InconsistentLedger { .. }) {
                match self.quests.revert_claim(&claimed).await {
                    Ok(true) => tracing::warn!(quest_id = %quest_id, "claim reverted after reward failure"),
                    Ok(false) => tracing::error!(quest_id = %quest_id, "claim revert lost a race"),
                    Err(revert_err) => {
                        tracing::error!(quest_id = %quest_id, error = %revert_err, "claim revert failed");
                    },
                }
            }
            return Err(err);
        }

        tracing::info!(
            user_id = %user_id,
            quest_id = %quest_id,
            xp = rewards.xp,
            karma = rewards.karma,
            "quest claimed"
        );

        let mut triggers = vec![AchievementTrigger::QuestsClaimed];
        if progression.level != previous_level {
            triggers.push(AchievementTrigger::LevelReached);
        }
        let unlocked = self.cascade(&mut progression, triggers, now).await?;

        Ok(ClaimOutcome {
            quest: claimed,
            xp_awarded: u64::from(rewards.xp),
            karma_awarded: rewards.karma,
            previous_level,
            level: progression.level,
            total_xp: progression.total_xp,
            karma: progression.karma,
            leveled_up: progression.level > previous_level,
            unlocked,
        })
    }

    /// Records qualifying activity for today.
    ///
    /// The first activity of a day extends or resets the streak, grants the
    /// daily login XP (scaled by the new streak's multiplier) and evaluates
    /// streak achievements. Repeats on the same day change nothing.
    pub async fn record_daily_activity(&self, user_id: &UserId) -> Result<ActivityOutcome> {
        let _guard = self.lock_user(user_id).await;
        let now = self.clock.now();
        let today = self.clock.today();
        let mut progression = self.load(user_id).await?;
        let previous_level = self.curve.level_for(progression.total_xp);

        let change = self
            .streaks
            .record_activity(&mut progression.streak, today);

        let mut xp_awarded = 0;
        let mut unlocked = Vec::new();
        if change.is_new_day() {
            progression.updated_at = now;
            if self.config.daily_login_xp > 0 {
                let granted = self
                    .grant_locked(
                        &mut progression,
                        self.config.daily_login_xp,
                        XpReason::DailyLogin,
                        true,
                        now,
                    )
                    .await?;
                xp_awarded = granted.applied.unsigned_abs();
            } else {
                self.store.write_progression(&progression).await?;
            }

            tracing::debug!(
                user_id = %user_id,
                streak_days = progression.streak.streak_days,
                ?change,
                "daily activity recorded"
            );

            let mut triggers = vec![AchievementTrigger::StreakDays];
            if progression.level != previous_level {
                triggers.push(AchievementTrigger::LevelReached);
            }
            unlocked = self.cascade(&mut progression, triggers, now).await?;
        } else if change == StreakChange::Stale {
            tracing::warn!(user_id = %user_id, %today, "activity dated before last streak day ignored");
        }

        Ok(ActivityOutcome {
            change,
            streak: progression.streak,
            multiplier: self.streaks.multiplier_for(progression.streak.streak_days),
            xp_awarded,
            level: progression.level,
            total_xp: progression.total_xp,
            leveled_up: progression.level > previous_level,
            unlocked,
        })
    }

    /// Verifies the stored total against the ledger, correcting it if needed.
    pub async fn reconcile(&self, user_id: &UserId) -> Result<ReconcileReport> {
        let _guard = self.lock_user(user_id).await;
        self.reconcile_locked(user_id).await.map(|(_, report)| report)
    }

    async fn reconcile_locked(&self, user_id: &UserId) -> Result<(UserProgression, ReconcileReport)> {
        let mut progression = self.load(user_id).await?;
        let ledger_total = self.ledger.total_for(user_id).await?;
        let stored_total = progression.total_xp;
        let authoritative = non_negative(ledger_total);
        let level = self.curve.level_for(authoritative);

        let corrected = authoritative != stored_total || level != progression.level;
        if corrected {
            if authoritative != stored_total {
                tracing::warn!(
                    user_id = %user_id,
                    ledger_total,
                    stored_total,
                    "stored XP disagrees with ledger; ledger wins"
                );
            }
            progression.total_xp = authoritative;
            progression.level = level;
            self.store.write_progression(&progression).await?;
        }

        Ok((
            progression,
            ReconcileReport {
                ledger_total,
                stored_total,
                corrected,
                level,
            },
        ))
    }

    /// Authoritative snapshot with the level recomputed and the ledger reconciled.
    pub async fn get_progression_snapshot(&self, user_id: &UserId) -> Result<ProgressionSnapshot> {
        let _guard = self.lock_user(user_id).await;
        let (progression, _) = self.reconcile_locked(user_id).await?;
        let achievements_unlocked = self.unlocker.unlocks_for(user_id).await?.len();
        Ok(ProgressionSnapshot {
            progress: self.curve.progress(progression.total_xp),
            title: level_title(progression.level).to_string(),
            streak_multiplier: self.streaks.multiplier_for(progression.streak.streak_days),
            achievements_unlocked,
            progression,
        })
    }

    /// Adjusts karma by a signed, non-zero delta.
    pub async fn adjust_karma(&self, user_id: &UserId, delta: i64) -> Result<KarmaOutcome> {
        if delta == 0 {
            return Err(ProgressionError::InvalidAmount("zero karma adjustment".into()));
        }
        let _guard = self.lock_user(user_id).await;
        let mut progression = self.load(user_id).await?;
        progression.karma = progression.karma.saturating_add(delta);
        progression.updated_at = self.clock.now();
        self.store.write_progression(&progression).await?;
        tracing::debug!(user_id = %user_id, delta, karma = progression.karma, "karma adjusted");
        Ok(KarmaOutcome {
            delta,
            karma: progression.karma,
        })
    }

    /// Assigns a quest with rewards from the configured table.
    pub async fn assign_quest(
        &self,
        user_id: &UserId,
        assignment: &QuestAssignment,
    ) -> Result<Quest> {
        self.load(user_id).await?;
        self.quests
            .assign(user_id, assignment, &self.config.quest_rewards, self.clock.now())
            .await
    }

    /// Quests of a user with lazy expiry applied.
    pub async fn list_quests(&self, user_id: &UserId) -> Result<Vec<Quest>> {
        self.load(user_id).await?;
        self.quests.list(user_id, self.clock.now()).await
    }

    /// Evaluates one achievement against a caller-supplied progress value.
    ///
    /// Returns the achievements unlocked by this call, including any
    /// level achievements reached through the reward XP. An existing
    /// unlock or progress below the threshold yields an empty list.
    pub async fn evaluate_achievement(
        &self,
        user_id: &UserId,
        achievement_id: &str,
        current_progress: u64,
    ) -> Result<Vec<UnlockedAchievement>> {
        let template = self.template(achievement_id)?;
        let _guard = self.lock_user(user_id).await;
        let now = self.clock.now();
        let mut progression = self.load(user_id).await?;

        let Some(unlock) = self
            .unlocker
            .try_unlock(user_id, template, current_progress, now)
            .await?
        else {
            return Ok(Vec::new());
        };
        self.finish_unlock(&mut progression, template, &unlock, now).await
    }

    /// Unlocks an achievement unconditionally.
    ///
    /// Intended for manual-trigger badges; an existing unlock is an error.
    pub async fn unlock_achievement(
        &self,
        user_id: &UserId,
        achievement_id: &str,
    ) -> Result<Vec<UnlockedAchievement>> {
        let template = self.template(achievement_id)?;
        let _guard = self.lock_user(user_id).await;
        let now = self.clock.now();
        let mut progression = self.load(user_id).await?;

        let unlock = self
            .unlocker
            .try_unlock(user_id, template, template.max_progress, now)
            .await?
            .ok_or_else(|| ProgressionError::AchievementAlreadyUnlocked {
                user_id: user_id.clone(),
                achievement_id: achievement_id.to_string(),
            })?;
        self.finish_unlock(&mut progression, template, &unlock, now).await
    }

    async fn finish_unlock(
        &self,
        progression: &mut UserProgression,
        template: &AchievementTemplate,
        unlock: &AchievementUnlock,
        now: DateTime<Utc>,
    ) -> Result<Vec<UnlockedAchievement>> {
        let level_before = progression.level;
        let mut unlocked = vec![self.reward_unlock(progression, template, unlock, now).await?];
        if progression.level > level_before {
            unlocked.extend(
                self.cascade(progression, vec![AchievementTrigger::LevelReached], now)
                    .await?,
            );
        }
        Ok(unlocked)
    }

    fn template(&self, achievement_id: &str) -> Result<&AchievementTemplate> {
        self.catalogue
            .get(achievement_id)
            .ok_or_else(|| ProgressionError::AchievementNotFound(achievement_id.to_string()))
    }

    /// XP events of a user in append order.
    pub async fn xp_history(&self, user_id: &UserId) -> Result<Vec<XpEvent>> {
        self.load(user_id).await?;
        self.ledger.history(user_id).await
    }

    /// Catalogue listing for a user with progress and unlock times.
    pub async fn achievements_for(&self, user_id: &UserId) -> Result<Vec<AchievementEntry>> {
        let progression = self.load(user_id).await?;
        let unlocks = self.unlocker.unlocks_for(user_id).await?;
        Ok(self.catalogue.entries_for(&progression, &unlocks))
    }
}

/// Applies a multiplier to a positive amount, flooring the result.
fn scale_amount(amount: i64, multiplier: f64) -> i64 {
    if amount <= 0 || (multiplier - 1.0).abs() < f64::EPSILON {
        return amount;
    }
    let scaled = (amount as f64 * multiplier).floor();
    if scaled >= i64::MAX as f64 {
        i64::MAX
    } else {
        (scaled as i64).max(1)
    }
}

fn non_negative(total: i64) -> u64 {
    u64::try_from(total).unwrap_or(0)
}
