// SPDX-License-Identifier: MIT OR Apache-2.0
//! REST API handlers for progression records, XP and karma.

use std::sync::Arc;

use aura_progression::{
    level_title, ActivityOutcome, GrantOutcome, KarmaOutcome, ProgressionSnapshot,
    ReconcileReport, UnlockedAchievement, UserId, UserProgression, XpReason,
};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::audit::AuditEvent;
use crate::rest::error::{ApiError, ApiResult};
use crate::rest::types::{
    GrantXpRequest, HealthResponse, KarmaRequest, LevelLookupResponse, XpHistoryResponse,
};
use crate::rest::ProgressionApiContext;

pub(crate) fn audit_level_change(ctx: &ProgressionApiContext, user_id: &UserId, from: u32, to: u32) {
    if to > from {
        ctx.audit(AuditEvent::LevelUp {
            user_id: user_id.to_string(),
            from,
            to,
        });
    }
}

pub(crate) fn audit_unlocks(
    ctx: &ProgressionApiContext,
    user_id: &UserId,
    unlocked: &[UnlockedAchievement],
) {
    for achievement in unlocked {
        ctx.audit(AuditEvent::AchievementUnlocked {
            user_id: user_id.to_string(),
            achievement_id: achievement.achievement_id.clone(),
        });
    }
}

/// Create a progression record.
pub async fn create(
    State(ctx): State<Arc<ProgressionApiContext>>,
    Path(user_id): Path<String>,
) -> Result<(StatusCode, Json<UserProgression>), ApiError> {
    let user_id = UserId::new(user_id);
    let progression = ctx.engine.create_progression(&user_id).await?;

    ctx.audit(AuditEvent::UserCreated {
        user_id: user_id.to_string(),
    });

    Ok((StatusCode::CREATED, Json(progression)))
}

/// Get a progression snapshot.
pub async fn get(
    State(ctx): State<Arc<ProgressionApiContext>>,
    Path(user_id): Path<String>,
) -> ApiResult<ProgressionSnapshot> {
    let snapshot = ctx
        .engine
        .get_progression_snapshot(&UserId::new(user_id))
        .await?;
    Ok(Json(snapshot))
}

/// Grant XP.
pub async fn grant(
    State(ctx): State<Arc<ProgressionApiContext>>,
    Path(user_id): Path<String>,
    Json(request): Json<GrantXpRequest>,
) -> ApiResult<GrantOutcome> {
    let user_id = UserId::new(user_id);
    let outcome = ctx
        .engine
        .grant_xp(&user_id, request.amount, request.reason)
        .await?;

    ctx.audit(AuditEvent::XpGranted {
        user_id: user_id.to_string(),
        amount: outcome.applied,
        reason: request.reason.to_string(),
    });
    audit_level_change(&ctx, &user_id, outcome.previous_level, outcome.level);
    audit_unlocks(&ctx, &user_id, &outcome.unlocked);

    Ok(Json(outcome))
}

/// List the XP ledger.
pub async fn history(
    State(ctx): State<Arc<ProgressionApiContext>>,
    Path(user_id): Path<String>,
) -> ApiResult<XpHistoryResponse> {
    let events = ctx.engine.xp_history(&UserId::new(user_id)).await?;
    let ledger_total = aura_progression::ledger::ledger_sum(&events);
    Ok(Json(XpHistoryResponse {
        events,
        ledger_total,
    }))
}

/// Adjust karma.
pub async fn adjust_karma(
    State(ctx): State<Arc<ProgressionApiContext>>,
    Path(user_id): Path<String>,
    Json(request): Json<KarmaRequest>,
) -> ApiResult<KarmaOutcome> {
    let user_id = UserId::new(user_id);
    let outcome = ctx.engine.adjust_karma(&user_id, request.delta).await?;

    ctx.audit(AuditEvent::KarmaAdjusted {
        user_id: user_id.to_string(),
        delta: outcome.delta,
    });

    Ok(Json(outcome))
}

/// Record today's activity for streak tracking.
pub async fn record_activity(
    State(ctx): State<Arc<ProgressionApiContext>>,
    Path(user_id): Path<String>,
) -> ApiResult<ActivityOutcome> {
    let user_id = UserId::new(user_id);
    let outcome = ctx.engine.record_daily_activity(&user_id).await?;

    if outcome.xp_awarded > 0 {
        ctx.audit(AuditEvent::XpGranted {
            user_id: user_id.to_string(),
            amount: i64::try_from(outcome.xp_awarded).unwrap_or(i64::MAX),
            reason: XpReason::DailyLogin.to_string(),
        });
    }
    audit_unlocks(&ctx, &user_id, &outcome.unlocked);

    Ok(Json(outcome))
}

/// Compare the stored total with the ledger and repair drift.
pub async fn reconcile(
    State(ctx): State<Arc<ProgressionApiContext>>,
    Path(user_id): Path<String>,
) -> ApiResult<ReconcileReport> {
    let user_id = UserId::new(user_id);
    let report = ctx.engine.reconcile(&user_id).await?;

    if report.corrected {
        ctx.audit(AuditEvent::LedgerReconciled {
            user_id: user_id.to_string(),
            stored_total: report.stored_total,
            ledger_total: report.ledger_total,
        });
    }

    Ok(Json(report))
}

/// Level breakdown for an arbitrary XP total.
pub async fn level_lookup(
    State(ctx): State<Arc<ProgressionApiContext>>,
    Path(total_xp): Path<u64>,
) -> ApiResult<LevelLookupResponse> {
    let progress = ctx.engine.level_progress(total_xp);
    Ok(Json(LevelLookupResponse {
        title: level_title(progress.level).to_string(),
        progress,
    }))
}

/// Health check.
pub async fn health(State(ctx): State<Arc<ProgressionApiContext>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        level_ceiling: ctx.engine.curve().ceiling(),
        achievements: ctx.engine.catalogue().len(),
    })
}
