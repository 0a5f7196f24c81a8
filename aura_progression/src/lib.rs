// SPDX-License-Identifier: MIT OR Apache-2.0
//! AuraScan progression engine.
//!
//! Turns user activity into XP, levels, quest rewards, achievements and
//! streaks. All durable state lives behind [`ProgressionStore`]; the
//! [`ProgressionEngine`] is the only component that mutates it.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use aura_progression::{MemoryStore, ProgressionConfig, ProgressionEngine, UserId, XpReason};
//!
//! # async fn demo() -> aura_progression::Result<()> {
//! let engine = ProgressionEngine::new(Arc::new(MemoryStore::new()), ProgressionConfig::default())?;
//! let user = UserId::new("user-1");
//! engine.create_progression(&user).await?;
//! let outcome = engine.grant_xp(&user, 100, XpReason::ScanCompleted).await?;
//! assert!(outcome.leveled_up);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

pub mod achievement;
pub mod clock;
pub mod config;
pub mod curve;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod model;
pub mod quest;
pub mod store;
pub mod streak;
pub mod view;

pub use achievement::{
    default_catalogue, AchievementCatalogue, AchievementCategory, AchievementEntry,
    AchievementTemplate, AchievementTier, AchievementTrigger, AchievementUnlock,
    AchievementUnlocker, UnlockedAchievement,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CeilingPolicy, CurveConfig, ProgressionConfig, QuestRewardTable, StreakConfig};
pub use curve::{level_title, LevelCurve, LevelProgress};
pub use engine::{
    ActivityOutcome, ClaimOutcome, GrantOutcome, KarmaOutcome, ProgressionEngine,
    ProgressionSnapshot, ReconcileReport,
};
pub use error::{ProgressionError, Result};
pub use ledger::{XpEvent, XpLedger, XpReason};
pub use memory::MemoryStore;
pub use model::{ActivityStats, UserId, UserProgression};
pub use quest::{
    Quest, QuestAssignment, QuestCadence, QuestCategory, QuestDifficulty, QuestId, QuestProgress,
    QuestRewards, QuestStatus, QuestTracker,
};
pub use store::{ProgressionStore, StoreError, StoreResult};
pub use streak::{StreakChange, StreakCounter, StreakState};
pub use view::ProgressionView;
