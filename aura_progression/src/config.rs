// SPDX-License-Identifier: MIT OR Apache-2.0
//! Progression configuration.
//!
//! Every tunable number of the engine lives here: the level curve, the
//! streak multiplier table, the daily login reward, quest reward tables
//! and the achievement catalogue. Configuration is loaded once at start,
//! validated, and treated as read-only afterwards.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::achievement::{default_catalogue, AchievementTemplate};
use crate::error::{ProgressionError, Result};
use crate::quest::{QuestDifficulty, QuestRewards};

/// Default XP needed to go from level 1 to level 2.
pub const DEFAULT_BASE_XP: u64 = 100;
/// Default growth factor of each level's requirement.
pub const DEFAULT_MULTIPLIER: f64 = 1.15;
/// Default maximum level.
pub const DEFAULT_LEVEL_CEILING: u32 = 100;
/// Default XP for the first activity of a day.
pub const DEFAULT_DAILY_LOGIN_XP: i64 = 10;

/// Largest requirement the curve may produce.
const MAX_REQUIREMENT: f64 = 4_503_599_627_370_496.0;

/// How progress is reported once the level ceiling is reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CeilingPolicy {
    /// XP past the last level boundary keeps counting into `xp_into_level`.
    #[default]
    Absorb,
    /// The progress bar is reported full at the ceiling.
    Pin,
}

/// Level curve parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    /// XP required to advance from level 1.
    pub base_xp: u64,
    /// Growth factor applied per level.
    pub multiplier: f64,
    /// Highest reachable level.
    pub level_ceiling: u32,
    /// Reporting policy at the ceiling.
    pub ceiling_policy: CeilingPolicy,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            base_xp: DEFAULT_BASE_XP,
            multiplier: DEFAULT_MULTIPLIER,
            level_ceiling: DEFAULT_LEVEL_CEILING,
            ceiling_policy: CeilingPolicy::Absorb,
        }
    }
}

impl CurveConfig {
    /// Validates the curve parameters.
    pub fn validate(&self) -> Result<()> {
        if self.base_xp == 0 {
            return Err(ProgressionError::Config("base_xp must be positive".into()));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ProgressionError::Config(format!(
                "multiplier must be a finite number >= 1.0, got {}",
                self.multiplier
            )));
        }
        if self.level_ceiling == 0 {
            return Err(ProgressionError::Config(
                "level_ceiling must be at least 1".into(),
            ));
        }
        let exponent = i32::try_from(self.level_ceiling - 1)
            .map_err(|_| ProgressionError::Config("level_ceiling too large".into()))?;
        let top = self.base_xp as f64 * self.multiplier.powi(exponent);
        if !top.is_finite() || top > MAX_REQUIREMENT {
            return Err(ProgressionError::Config(format!(
                "requirement at level {} overflows",
                self.level_ceiling
            )));
        }
        Ok(())
    }
}

/// One step of the streak multiplier table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreakTier {
    /// Streak length at which this multiplier starts applying.
    pub min_days: u32,
    /// XP multiplier for streak-eligible grants.
    pub multiplier: f64,
}

/// Streak multiplier table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreakConfig {
    /// Steps in ascending `min_days` order.
    pub tiers: Vec<StreakTier>,
}

impl Default for StreakConfig {
    fn default() -> Self {
        let tiers = [
            (7, 1.25),
            (14, 1.5),
            (30, 1.75),
            (60, 2.0),
            (100, 2.5),
        ]
        .into_iter()
        .map(|(min_days, multiplier)| StreakTier {
            min_days,
            multiplier,
        })
        .collect();
        Self { tiers }
    }
}

impl StreakConfig {
    /// Validates the multiplier table.
    pub fn validate(&self) -> Result<()> {
        for tier in &self.tiers {
            if !tier.multiplier.is_finite() || tier.multiplier < 1.0 {
                return Err(ProgressionError::Config(format!(
                    "streak multiplier at {} days must be >= 1.0",
                    tier.min_days
                )));
            }
        }
        let ascending = self.tiers.windows(2).all(|w| {
            w[0].min_days < w[1].min_days && w[0].multiplier <= w[1].multiplier
        });
        if !ascending {
            return Err(ProgressionError::Config(
                "streak tiers must be strictly ascending by min_days and non-decreasing".into(),
            ));
        }
        Ok(())
    }
}

/// Base quest rewards per difficulty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestRewardTable {
    /// Easy quests.
    pub easy: QuestRewards,
    /// Medium quests.
    pub medium: QuestRewards,
    /// Hard quests.
    pub hard: QuestRewards,
    /// Legendary quests.
    pub legendary: QuestRewards,
}

impl Default for QuestRewardTable {
    fn default() -> Self {
        Self {
            easy: QuestRewards::new(25, 1),
            medium: QuestRewards::new(50, 3),
            hard: QuestRewards::new(100, 5),
            legendary: QuestRewards::new(250, 15),
        }
    }
}

impl QuestRewardTable {
    /// Base rewards for a difficulty.
    #[must_use]
    pub const fn for_difficulty(&self, difficulty: QuestDifficulty) -> QuestRewards {
        match difficulty {
            QuestDifficulty::Easy => self.easy,
            QuestDifficulty::Medium => self.medium,
            QuestDifficulty::Hard => self.hard,
            QuestDifficulty::Legendary => self.legendary,
        }
    }
}

/// Complete progression configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Level curve.
    pub curve: CurveConfig,
    /// Streak multipliers.
    pub streak: StreakConfig,
    /// XP granted for the first activity of each day (0 disables).
    pub daily_login_xp: i64,
    /// Quest rewards by difficulty.
    pub quest_rewards: QuestRewardTable,
    /// Achievement catalogue.
    pub achievements: Vec<AchievementTemplate>,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            curve: CurveConfig::default(),
            streak: StreakConfig::default(),
            daily_login_xp: DEFAULT_DAILY_LOGIN_XP,
            quest_rewards: QuestRewardTable::default(),
            achievements: default_catalogue(),
        }
    }
}

impl ProgressionConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a TOML document. Missing sections use defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| ProgressionError::Config(format!("invalid progression config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            ProgressionError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Replace the curve parameters.
    #[must_use]
    pub fn with_curve(mut self, curve: CurveConfig) -> Self {
        self.curve = curve;
        self
    }

    /// Replace the achievement catalogue.
    #[must_use]
    pub fn with_achievements(mut self, achievements: Vec<AchievementTemplate>) -> Self {
        self.achievements = achievements;
        self
    }

    /// Set the daily login XP.
    #[must_use]
    pub const fn with_daily_login_xp(mut self, xp: i64) -> Self {
        self.daily_login_xp = xp;
        self
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<()> {
        self.curve.validate()?;
        self.streak.validate()?;

        if self.daily_login_xp < 0 {
            return Err(ProgressionError::Config(
                "daily_login_xp must not be negative".into(),
            ));
        }

        let mut seen = HashSet::new();
        for template in &self.achievements {
            if template.id.is_empty() {
                return Err(ProgressionError::Config("achievement id is empty".into()));
            }
            if template.max_progress == 0 {
                return Err(ProgressionError::Config(format!(
                    "achievement {} has zero max_progress",
                    template.id
                )));
            }
            if !seen.insert(template.id.as_str()) {
                return Err(ProgressionError::Config(format!(
                    "duplicate achievement id: {}",
                    template.id
                )));
            }
        }
        Ok(())
    }
}
