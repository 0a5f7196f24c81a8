// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for the progression engine.

use thiserror::Error;

use crate::model::UserId;
use crate::quest::QuestId;
use crate::store::StoreError;

/// Progression engine error type.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProgressionError {
    /// XP grant or karma adjustment with an unusable amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The quest reward was already claimed.
    #[error("quest already claimed: {0}")]
    AlreadyClaimed(QuestId),

    /// No such quest for this user.
    #[error("quest not found: {0}")]
    QuestNotFound(QuestId),

    /// Claim attempted on a quest that is not completed.
    #[error("quest not completed: {0}")]
    QuestNotCompleted(QuestId),

    /// Quest assignment parameters were rejected.
    #[error("invalid quest: {0}")]
    InvalidQuest(String),

    /// Manual unlock of an achievement the user already holds.
    #[error("achievement {achievement_id} already unlocked for {user_id}")]
    AchievementAlreadyUnlocked {
        /// Owner of the unlock.
        user_id: UserId,
        /// Achievement template id.
        achievement_id: String,
    },

    /// No achievement template with this id.
    #[error("achievement not found: {0}")]
    AchievementNotFound(String),

    /// No progression record for this user.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// A progression record already exists for this user.
    #[error("user already exists: {0}")]
    UserExists(UserId),

    /// The stored XP total disagrees with the ledger sum.
    #[error(
        "inconsistent ledger for {user_id}: ledger total {ledger_total}, stored total {stored_total}"
    )]
    InconsistentLedger {
        /// Affected user.
        user_id: UserId,
        /// Sum of all XP events.
        ledger_total: i64,
        /// Total recorded on the progression snapshot.
        stored_total: u64,
    },

    /// Storage collaborator failure.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ProgressionError {
    /// Returns true for errors caused by the request rather than the system.
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount(_)
                | Self::AlreadyClaimed(_)
                | Self::QuestNotFound(_)
                | Self::QuestNotCompleted(_)
                | Self::InvalidQuest(_)
                | Self::AchievementAlreadyUnlocked { .. }
                | Self::AchievementNotFound(_)
                | Self::UserNotFound(_)
                | Self::UserExists(_)
        )
    }
}

/// Result type alias for progression operations.
pub type Result<T> = std::result::Result<T, ProgressionError>;
