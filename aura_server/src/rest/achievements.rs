// SPDX-License-Identifier: MIT OR Apache-2.0
//! REST API handlers for achievements.

use std::sync::Arc;

use aura_progression::UserId;
use axum::extract::{Path, State};
use axum::Json;

use crate::rest::error::ApiResult;
use crate::rest::progression::audit_unlocks;
use crate::rest::types::{AchievementListResponse, EvaluateRequest, UnlockResponse};
use crate::rest::ProgressionApiContext;

/// Public catalogue; secret entries are masked.
pub async fn catalogue(
    State(ctx): State<Arc<ProgressionApiContext>>,
) -> ApiResult<AchievementListResponse> {
    Ok(Json(AchievementListResponse {
        achievements: ctx.engine.catalogue().public_entries(),
        unlocked: 0,
    }))
}

/// Catalogue with a user's progress and unlocks.
pub async fn list(
    State(ctx): State<Arc<ProgressionApiContext>>,
    Path(user_id): Path<String>,
) -> ApiResult<AchievementListResponse> {
    let achievements = ctx.engine.achievements_for(&UserId::new(user_id)).await?;
    let unlocked = achievements.iter().filter(|a| a.unlocked_at.is_some()).count();
    Ok(Json(AchievementListResponse {
        achievements,
        unlocked,
    }))
}

/// Evaluate an achievement against caller-measured progress.
pub async fn evaluate(
    State(ctx): State<Arc<ProgressionApiContext>>,
    Path((user_id, achievement_id)): Path<(String, String)>,
    Json(request): Json<EvaluateRequest>,
) -> ApiResult<UnlockResponse> {
    let user_id = UserId::new(user_id);
    let unlocked = ctx
        .engine
        .evaluate_achievement(&user_id, &achievement_id, request.progress)
        .await?;
    audit_unlocks(&ctx, &user_id, &unlocked);
    Ok(Json(UnlockResponse { unlocked }))
}

/// Grant an achievement directly.
pub async fn unlock(
    State(ctx): State<Arc<ProgressionApiContext>>,
    Path((user_id, achievement_id)): Path<(String, String)>,
) -> ApiResult<UnlockResponse> {
    let user_id = UserId::new(user_id);
    let unlocked = ctx
        .engine
        .unlock_achievement(&user_id, &achievement_id)
        .await?;
    audit_unlocks(&ctx, &user_id, &unlocked);
    Ok(Json(UnlockResponse { unlocked }))
}
