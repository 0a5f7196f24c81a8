// SPDX-License-Identifier: MIT OR Apache-2.0
//! Achievement catalogue and unlocking.
//!
//! Templates are global and configured once. An unlock is recorded at most
//! once per user and template; the store write is insert-if-absent, so a
//! repeated evaluation never grants the reward twice.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{UserId, UserProgression};
use crate::store::ProgressionStore;

/// Achievement tier determining rarity and default rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementTier {
    /// Common achievements, easy to unlock.
    Bronze,
    /// Uncommon achievements requiring some effort.
    Silver,
    /// Rare achievements for dedicated users.
    Gold,
    /// Very rare achievements.
    Platinum,
    /// Reserved for the rarest milestones.
    Diamond,
}

impl AchievementTier {
    /// Default XP reward for this tier.
    #[must_use]
    pub const fn xp_reward(&self) -> u64 {
        match self {
            Self::Bronze => 50,
            Self::Silver => 100,
            Self::Gold => 250,
            Self::Platinum => 500,
            Self::Diamond => 1000,
        }
    }

    /// Default karma reward for this tier.
    #[must_use]
    pub const fn karma_reward(&self) -> i64 {
        match self {
            Self::Bronze => 1,
            Self::Silver => 2,
            Self::Gold => 5,
            Self::Platinum => 10,
            Self::Diamond => 25,
        }
    }

    /// Returns the display name.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Platinum => "Platinum",
            Self::Diamond => "Diamond",
        }
    }
}

/// Achievement category for grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
    /// First-time discoveries.
    Discovery,
    /// Ethics scanning.
    Analysis,
    /// Feed and guild participation.
    Social,
    /// Consistency over time.
    Dedication,
    /// Long-term progression.
    Mastery,
}

impl AchievementCategory {
    /// Returns the display name.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Discovery => "Discovery",
            Self::Analysis => "Analysis",
            Self::Social => "Social",
            Self::Dedication => "Dedication",
            Self::Mastery => "Mastery",
        }
    }
}

/// Which counter drives automatic evaluation of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementTrigger {
    /// Number of completed scans.
    ScansCompleted,
    /// Number of feed posts.
    PostsCreated,
    /// Number of guilds joined.
    GuildsJoined,
    /// Number of claimed quests.
    QuestsClaimed,
    /// Current level.
    LevelReached,
    /// Current streak length.
    StreakDays,
    /// Only unlocked explicitly.
    Manual,
}

/// An achievement definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementTemplate {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description of how to unlock.
    pub description: String,
    /// Achievement tier.
    pub tier: AchievementTier,
    /// Achievement category.
    pub category: AchievementCategory,
    /// Counter that feeds evaluation.
    pub trigger: AchievementTrigger,
    /// Progress needed to unlock (> 0).
    pub max_progress: u64,
    /// XP granted on unlock.
    pub xp_reward: u64,
    /// Karma granted on unlock.
    pub karma_reward: i64,
    /// Hidden from listings until unlocked.
    #[serde(default)]
    pub is_secret: bool,
}

impl AchievementTemplate {
    /// Creates a template with the tier's default rewards.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        tier: AchievementTier,
        category: AchievementCategory,
        trigger: AchievementTrigger,
        max_progress: u64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            tier,
            category,
            trigger,
            max_progress,
            xp_reward: tier.xp_reward(),
            karma_reward: tier.karma_reward(),
            is_secret: false,
        }
    }

    /// Overrides the rewards.
    #[must_use]
    pub const fn with_rewards(mut self, xp_reward: u64, karma_reward: i64) -> Self {
        self.xp_reward = xp_reward;
        self.karma_reward = karma_reward;
        self
    }

    /// Marks as a secret achievement.
    #[must_use]
    pub const fn secret(mut self) -> Self {
        self.is_secret = true;
        self
    }
}

/// Built-in achievement catalogue.
#[must_use]
pub fn default_catalogue() -> Vec<AchievementTemplate> {
    use AchievementCategory as C;
    use AchievementTier as T;
    use AchievementTrigger as G;

    vec![
        // Analysis
        AchievementTemplate::new(
            "first_scan",
            "First Light",
            "Complete your first ethics scan",
            T::Bronze,
            C::Analysis,
            G::ScansCompleted,
            1,
        ),
        AchievementTemplate::new(
            "scan_apprentice",
            "Apprentice Analyst",
            "Complete 10 ethics scans",
            T::Silver,
            C::Analysis,
            G::ScansCompleted,
            10,
        ),
        AchievementTemplate::new(
            "scan_master",
            "Master Analyst",
            "Complete 100 ethics scans",
            T::Gold,
            C::Analysis,
            G::ScansCompleted,
            100,
        ),
        // Social
        AchievementTemplate::new(
            "first_post",
            "Speaking Up",
            "Publish your first post",
            T::Bronze,
            C::Social,
            G::PostsCreated,
            1,
        ),
        AchievementTemplate::new(
            "voice_of_reason",
            "Voice of Reason",
            "Publish 50 posts",
            T::Silver,
            C::Social,
            G::PostsCreated,
            50,
        ),
        AchievementTemplate::new(
            "guild_member",
            "Fellowship",
            "Join a guild",
            T::Bronze,
            C::Social,
            G::GuildsJoined,
            1,
        ),
        // Dedication
        AchievementTemplate::new(
            "quest_starter",
            "Questing Begins",
            "Claim your first quest reward",
            T::Bronze,
            C::Dedication,
            G::QuestsClaimed,
            1,
        ),
        AchievementTemplate::new(
            "quest_veteran",
            "Quest Veteran",
            "Claim 25 quest rewards",
            T::Gold,
            C::Dedication,
            G::QuestsClaimed,
            25,
        ),
        AchievementTemplate::new(
            "week_streak",
            "Week Warrior",
            "Stay active 7 days in a row",
            T::Silver,
            C::Dedication,
            G::StreakDays,
            7,
        ),
        AchievementTemplate::new(
            "month_streak",
            "Unwavering",
            "Stay active 30 days in a row",
            T::Gold,
            C::Dedication,
            G::StreakDays,
            30,
        ),
        AchievementTemplate::new(
            "century_streak",
            "Eternal Flame",
            "Stay active 100 days in a row",
            T::Platinum,
            C::Dedication,
            G::StreakDays,
            100,
        )
        .secret(),
        // Mastery
        AchievementTemplate::new(
            "level_10",
            "Rising Analyst",
            "Reach level 10",
            T::Silver,
            C::Mastery,
            G::LevelReached,
            10,
        ),
        AchievementTemplate::new(
            "level_25",
            "Seasoned Ethicist",
            "Reach level 25",
            T::Gold,
            C::Mastery,
            G::LevelReached,
            25,
        ),
        AchievementTemplate::new(
            "level_50",
            "Sage of Aura",
            "Reach level 50",
            T::Platinum,
            C::Mastery,
            G::LevelReached,
            50,
        ),
        AchievementTemplate::new(
            "level_100",
            "Ascended",
            "Reach the maximum level",
            T::Diamond,
            C::Mastery,
            G::LevelReached,
            100,
        )
        .secret(),
        // Discovery
        AchievementTemplate::new(
            "early_adopter",
            "Early Adopter",
            "Joined AuraScan during the beta",
            T::Bronze,
            C::Discovery,
            G::Manual,
            1,
        ),
        AchievementTemplate::new(
            "bug_hunter",
            "Bug Hunter",
            "Reported a confirmed issue",
            T::Gold,
            C::Discovery,
            G::Manual,
            1,
        )
        .secret(),
    ]
}

/// Record of a user holding an achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementUnlock {
    /// Owner.
    pub user_id: UserId,
    /// Template id.
    pub achievement_id: String,
    /// Unlock time.
    pub unlocked_at: DateTime<Utc>,
}

/// A newly unlocked achievement, reported to callers for notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockedAchievement {
    /// Template id.
    pub achievement_id: String,
    /// Display name.
    pub name: String,
    /// Tier.
    pub tier: AchievementTier,
    /// XP granted.
    pub xp_reward: u64,
    /// Karma granted.
    pub karma_reward: i64,
    /// Unlock time.
    pub unlocked_at: DateTime<Utc>,
}

impl UnlockedAchievement {
    /// Combines a template with its unlock record.
    #[must_use]
    pub fn new(template: &AchievementTemplate, unlock: &AchievementUnlock) -> Self {
        Self {
            achievement_id: template.id.clone(),
            name: template.name.clone(),
            tier: template.tier,
            xp_reward: template.xp_reward,
            karma_reward: template.karma_reward,
            unlocked_at: unlock.unlocked_at,
        }
    }
}

/// Catalogue listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementEntry {
    /// Template id.
    pub id: String,
    /// Display name, masked for locked secrets.
    pub name: String,
    /// Description, masked for locked secrets.
    pub description: String,
    /// Tier.
    pub tier: AchievementTier,
    /// Category.
    pub category: AchievementCategory,
    /// Progress toward unlocking, capped at `max_progress`.
    pub progress: u64,
    /// Progress needed to unlock.
    pub max_progress: u64,
    /// Whether this is a secret achievement.
    pub is_secret: bool,
    /// Unlock time, if unlocked.
    pub unlocked_at: Option<DateTime<Utc>>,
}

const SECRET_NAME: &str = "???";
const SECRET_DESCRIPTION: &str = "A secret achievement";

impl AchievementEntry {
    fn new(template: &AchievementTemplate, progress: u64, unlocked_at: Option<DateTime<Utc>>) -> Self {
        let masked = template.is_secret && unlocked_at.is_none();
        Self {
            id: template.id.clone(),
            name: if masked {
                SECRET_NAME.to_string()
            } else {
                template.name.clone()
            },
            description: if masked {
                SECRET_DESCRIPTION.to_string()
            } else {
                template.description.clone()
            },
            tier: template.tier,
            category: template.category,
            progress: if unlocked_at.is_some() {
                template.max_progress
            } else {
                progress.min(template.max_progress)
            },
            max_progress: template.max_progress,
            is_secret: template.is_secret,
            unlocked_at,
        }
    }
}

/// Indexed, read-only set of templates.
#[derive(Debug, Clone, Default)]
pub struct AchievementCatalogue {
    templates: Vec<AchievementTemplate>,
    index: HashMap<String, usize>,
}

impl AchievementCatalogue {
    /// Indexes templates by id. Later duplicates are ignored.
    #[must_use]
    pub fn new(templates: Vec<AchievementTemplate>) -> Self {
        let mut index = HashMap::with_capacity(templates.len());
        for (i, template) in templates.iter().enumerate() {
            index.entry(template.id.clone()).or_insert(i);
        }
        Self { templates, index }
    }

    /// Looks up a template.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&AchievementTemplate> {
        self.index.get(id).map(|&i| &self.templates[i])
    }

    /// All templates in catalogue order.
    #[must_use]
    pub fn templates(&self) -> &[AchievementTemplate] {
        &self.templates
    }

    /// Number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the catalogue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Templates fed by a trigger.
    pub fn by_trigger(
        &self,
        trigger: AchievementTrigger,
    ) -> impl Iterator<Item = &AchievementTemplate> + '_ {
        self.templates.iter().filter(move |t| t.trigger == trigger)
    }

    /// Public listing with secrets masked.
    #[must_use]
    pub fn public_entries(&self) -> Vec<AchievementEntry> {
        self.templates
            .iter()
            .map(|t| AchievementEntry::new(t, 0, None))
            .collect()
    }

    /// Listing for one user, with progress and unlock times.
    #[must_use]
    pub fn entries_for(
        &self,
        progression: &UserProgression,
        unlocks: &[AchievementUnlock],
    ) -> Vec<AchievementEntry> {
        let unlocked: HashMap<&str, DateTime<Utc>> = unlocks
            .iter()
            .map(|u| (u.achievement_id.as_str(), u.unlocked_at))
            .collect();
        self.templates
            .iter()
            .map(|t| {
                AchievementEntry::new(
                    t,
                    progression.counter_for(t.trigger),
                    unlocked.get(t.id.as_str()).copied(),
                )
            })
            .collect()
    }
}

/// Writes unlock records through the storage collaborator.
#[derive(Clone)]
pub struct AchievementUnlocker {
    store: Arc<dyn ProgressionStore>,
}

impl AchievementUnlocker {
    /// Creates an unlocker over a store.
    #[must_use]
    pub fn new(store: Arc<dyn ProgressionStore>) -> Self {
        Self { store }
    }

    /// Unlocks `template` if `progress` meets its threshold.
    ///
    /// Returns `None` when the threshold is not met or the user already holds
    /// the achievement. Only a `Some` result entitles the caller to grant
    /// the rewards.
    pub async fn try_unlock(
        &self,
        user_id: &UserId,
        template: &AchievementTemplate,
        progress: u64,
        now: DateTime<Utc>,
    ) -> Result<Option<AchievementUnlock>> {
        if progress < template.max_progress {
            return Ok(None);
        }
        if self
            .store
            .read_achievement_unlock(user_id, &template.id)
            .await?
            .is_some()
        {
            return Ok(None);
        }

        let unlock = AchievementUnlock {
            user_id: user_id.clone(),
            achievement_id: template.id.clone(),
            unlocked_at: now,
        };
        if !self.store.write_achievement_unlock(&unlock).await? {
            return Ok(None);
        }
        tracing::info!(
            user_id = %user_id,
            achievement_id = %template.id,
            tier = template.tier.display_name(),
            "achievement unlocked"
        );
        Ok(Some(unlock))
    }

    /// Removes an unlock whose rewards could not be granted, so a later
    /// evaluation can unlock it again.
    pub async fn revoke(&self, user_id: &UserId, achievement_id: &str) -> Result<bool> {
        let removed = self
            .store
            .delete_achievement_unlock(user_id, achievement_id)
            .await?;
        if removed {
            tracing::warn!(
                user_id = %user_id,
                achievement_id,
                "achievement unlock revoked"
            );
        }
        Ok(removed)
    }

    /// Whether a user holds an achievement.
    pub async fn is_unlocked(&self, user_id: &UserId, achievement_id: &str) -> Result<bool> {
        Ok(self
            .store
            .read_achievement_unlock(user_id, achievement_id)
            .await?
            .is_some())
    }

    /// All unlocks of a user.
    pub async fn unlocks_for(&self, user_id: &UserId) -> Result<Vec<AchievementUnlock>> {
        Ok(self.store.list_achievement_unlocks(user_id).await?)
    }
}
