// SPDX-License-Identifier: MIT OR Apache-2.0
//! Level curve.
//!
//! The XP needed to advance from level `n` to `n + 1` is
//! `floor(base_xp * multiplier^(n - 1))`. Requirements and the cumulative
//! thresholds are computed once from [`CurveConfig`]; every level lookup in
//! the workspace goes through [`LevelCurve`].

use serde::{Deserialize, Serialize};

use crate::config::{CeilingPolicy, CurveConfig};
use crate::error::Result;

/// Relative nudge applied before flooring.
///
/// Decimal multipliers are not exact in binary: `100.0 * 1.15` evaluates to
/// `114.999...`, which must still floor to 115.
const FLOOR_TOLERANCE: f64 = 1e-9;

/// Progress within the current level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelProgress {
    /// Current level (1..=ceiling).
    pub level: u32,
    /// Total XP accumulated.
    pub total_xp: u64,
    /// Cumulative XP at which the current level starts.
    pub cumulative_xp_for_level: u64,
    /// XP earned within the current level.
    pub xp_into_level: u64,
    /// XP required to complete the current level.
    pub xp_required_for_next_level: u64,
    /// Percentage progress to the next level (0..=100).
    pub percentage: f64,
    /// Whether the level ceiling has been reached.
    pub is_max_level: bool,
}

/// Deterministic mapping from total XP to level.
#[derive(Debug, Clone)]
pub struct LevelCurve {
    policy: CeilingPolicy,
    /// `requirements[i]` is the XP needed to leave level `i + 1`.
    requirements: Vec<u64>,
    /// `thresholds[i]` is the cumulative XP at which level `i + 1` starts.
    thresholds: Vec<u64>,
}

impl Default for LevelCurve {
    fn default() -> Self {
        Self::build(&CurveConfig::default())
    }
}

impl LevelCurve {
    /// Builds a curve after validating its configuration.
    pub fn new(config: &CurveConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: &CurveConfig) -> Self {
        let ceiling = config.level_ceiling.max(1);
        let mut requirements = Vec::with_capacity(ceiling as usize);
        let mut thresholds = Vec::with_capacity(ceiling as usize);
        let mut cumulative = 0u64;

        for level in 1..=ceiling {
            let requirement = compute_requirement(config.base_xp, config.multiplier, level);
            thresholds.push(cumulative);
            requirements.push(requirement);
            cumulative = cumulative.saturating_add(requirement);
        }

        Self {
            policy: config.ceiling_policy,
            requirements,
            thresholds,
        }
    }

    /// Highest reachable level.
    #[must_use]
    pub fn ceiling(&self) -> u32 {
        self.requirements.len() as u32
    }

    /// Reporting policy at the ceiling.
    #[must_use]
    pub const fn policy(&self) -> CeilingPolicy {
        self.policy
    }

    fn index(&self, level: u32) -> usize {
        (level.clamp(1, self.ceiling()) - 1) as usize
    }

    /// XP required to advance from `level` to `level + 1`.
    ///
    /// Levels outside `1..=ceiling` are clamped.
    #[must_use]
    pub fn requirement(&self, level: u32) -> u64 {
        self.requirements[self.index(level)]
    }

    /// Cumulative XP needed to reach `level`.
    ///
    /// Levels outside `1..=ceiling` are clamped.
    #[must_use]
    pub fn cumulative_xp_for(&self, level: u32) -> u64 {
        self.thresholds[self.index(level)]
    }

    /// Level for a total XP value.
    #[must_use]
    pub fn level_for(&self, total_xp: u64) -> u32 {
        // thresholds[0] == 0, so at least one entry always qualifies.
        self.thresholds.partition_point(|&t| t <= total_xp) as u32
    }

    /// Full progress breakdown for a total XP value.
    #[must_use]
    pub fn progress(&self, total_xp: u64) -> LevelProgress {
        let level = self.level_for(total_xp);
        let idx = self.index(level);
        let cumulative = self.thresholds[idx];
        let required = self.requirements[idx];
        let is_max_level = level == self.ceiling();

        let mut xp_into_level = total_xp - cumulative;
        if is_max_level && self.policy == CeilingPolicy::Pin {
            xp_into_level = required;
        }

        let percentage = if required == 0 {
            100.0
        } else {
            ((xp_into_level as f64 / required as f64) * 100.0).min(100.0)
        };

        LevelProgress {
            level,
            total_xp,
            cumulative_xp_for_level: cumulative,
            xp_into_level,
            xp_required_for_next_level: required,
            percentage,
            is_max_level,
        }
    }
}

fn compute_requirement(base_xp: u64, multiplier: f64, level: u32) -> u64 {
    let exponent = level.saturating_sub(1).min(i32::MAX as u32) as i32;
    let raw = base_xp as f64 * multiplier.powi(exponent);
    (raw + raw * FLOOR_TOLERANCE).floor() as u64
}

/// Title earned at each level band.
#[must_use]
pub const fn level_title(level: u32) -> &'static str {
    match level {
        0 => "Unknown",
        1..=4 => "Initiate",
        5..=9 => "Seeker",
        10..=19 => "Analyst",
        20..=34 => "Ethicist",
        35..=49 => "Guardian",
        50..=74 => "Sage",
        75..=99 => "Luminary",
        _ => "Ascendant",
    }
}
