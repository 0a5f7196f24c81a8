// SPDX-License-Identifier: MIT OR Apache-2.0
//! REST API handlers for quests.

use std::str::FromStr;
use std::sync::Arc;

use aura_progression::{ClaimOutcome, Quest, QuestAssignment, QuestId, QuestProgress, UserId};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::audit::AuditEvent;
use crate::rest::error::{ApiError, ApiResult};
use crate::rest::progression::{audit_level_change, audit_unlocks};
use crate::rest::types::{AssignQuestRequest, QuestListResponse, QuestProgressRequest};
use crate::rest::ProgressionApiContext;

fn parse_quest_id(raw: &str) -> Result<QuestId, ApiError> {
    QuestId::from_str(raw).map_err(|e| ApiError::bad_request(format!("invalid quest id {raw}: {e}")))
}

/// List a user's quests.
pub async fn list(
    State(ctx): State<Arc<ProgressionApiContext>>,
    Path(user_id): Path<String>,
) -> ApiResult<QuestListResponse> {
    let quests = ctx.engine.list_quests(&UserId::new(user_id)).await?;
    Ok(Json(QuestListResponse { quests }))
}

/// Assign a quest.
pub async fn assign(
    State(ctx): State<Arc<ProgressionApiContext>>,
    Path(user_id): Path<String>,
    Json(request): Json<AssignQuestRequest>,
) -> Result<(StatusCode, Json<Quest>), ApiError> {
    let assignment = QuestAssignment {
        cadence: request.cadence,
        category: request.category,
        difficulty: request.difficulty,
        target: request.target,
        ends_at: request.ends_at,
    };
    let quest = ctx
        .engine
        .assign_quest(&UserId::new(user_id), &assignment)
        .await?;
    Ok((StatusCode::CREATED, Json(quest)))
}

/// Record quest actions.
pub async fn progress(
    State(ctx): State<Arc<ProgressionApiContext>>,
    Path((user_id, quest_id)): Path<(String, String)>,
    Json(request): Json<QuestProgressRequest>,
) -> ApiResult<QuestProgress> {
    let quest_id = parse_quest_id(&quest_id)?;
    let progress = ctx
        .engine
        .complete_quest_action(&UserId::new(user_id), quest_id, request.delta)
        .await?;
    Ok(Json(progress))
}

/// Claim a completed quest.
pub async fn claim(
    State(ctx): State<Arc<ProgressionApiContext>>,
    Path((user_id, quest_id)): Path<(String, String)>,
) -> ApiResult<ClaimOutcome> {
    let quest_id = parse_quest_id(&quest_id)?;
    let user_id = UserId::new(user_id);
    let outcome = ctx.engine.claim_quest(&user_id, quest_id).await?;

    ctx.audit(AuditEvent::QuestClaimed {
        user_id: user_id.to_string(),
        quest_id: quest_id.to_string(),
        xp: outcome.quest.rewards.xp,
    });
    audit_level_change(&ctx, &user_id, outcome.previous_level, outcome.level);
    audit_unlocks(&ctx, &user_id, &outcome.unlocked);

    Ok(Json(outcome))
}
