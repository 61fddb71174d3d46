//! Coach chat and action planner routes.
//!
//! Both endpoints are rate limited per user and globally before the LLM is
//! called, and charge the tokens a completion used afterwards.

use axum::extract::State;
use axum::response::Json;
use contract::{ChatHistoryEntry, ChatReply, ChatRequest, PlanRequest, PlanResponse};
use tracing::{info, warn};

use super::auth::AuthUser;
use super::extract::ApiJson;
use crate::error::ApiError;
use crate::services::{actions, chat, conversations, planner};
use crate::state::AppState;

pub(crate) fn required_message(raw: &str) -> Result<&str, ApiError> {
    let message = raw.trim();
    if message.is_empty() {
        return Err(ApiError::bad_request("Message is required"));
    }
    Ok(message)
}

/// `POST /api/chat`. Generation or storage failures still answer 200 with a
/// localized apology.
pub async fn chat(State(state): State<AppState>, auth: AuthUser, ApiJson(req): ApiJson<ChatRequest>) -> Result<Json<ChatReply>, ApiError> {
    let message = required_message(&req.message)?;
    let user = &auth.user;
    state.rate_limiter.admit(user.id)?;

    let answered = match chat::reply(
        state.llm.as_deref(),
        &state.pool,
        user,
        message,
        req.local_time.as_deref(),
        state.config.chat_max_tokens,
    )
    .await
    {
        Ok(completion) => {
            state.rate_limiter.charge_tokens(user.id, completion.total_tokens());
            chat::save(&state.pool, user.id, message, &completion.text)
                .await
                .map(|timestamp| (completion.text, timestamp))
                .map_err(chat::ChatError::from)
        }
        Err(e) => Err(e),
    };

    let (response, timestamp) = answered.unwrap_or_else(|e| {
        warn!(user_id = user.id, error = %e, "chat: answering with apology");
        (chat::apology(&user.language).to_owned(), chat::now_timestamp())
    });
    Ok(Json(ChatReply { response: Some(response), message: None, timestamp: Some(timestamp) }))
}

/// `GET /api/chat/history`
pub async fn history(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<ChatHistoryEntry>>, ApiError> {
    Ok(Json(chat::history(&state.pool, auth.user.id).await?))
}

/// `POST /api/ai/plan`
pub async fn plan(State(state): State<AppState>, auth: AuthUser, ApiJson(req): ApiJson<PlanRequest>) -> Result<Json<PlanResponse>, ApiError> {
    let message = required_message(&req.message)?;
    let user = &auth.user;
    state.rate_limiter.admit(user.id)?;

    let session_id = conversations::open(&state.pool, user.id, req.session_id.as_deref()).await?;
    let history = conversations::recent(&state.pool, session_id, conversations::HISTORY_TURNS).await?;
    let (plan, tokens) = planner::plan(
        state.llm.as_deref(),
        state.config.ai_max_tokens,
        message,
        &user.language,
        user.role,
        &conversations::to_llm_messages(&history),
    )
    .await;
    state.rate_limiter.charge_tokens(user.id, tokens);

    let results = actions::execute_all(&state.pool, user, &user.language, &plan.actions).await;
    if let Err(e) = conversations::append_exchange(&state.pool, session_id, message, &plan.assistant_response).await {
        warn!(user_id = user.id, %session_id, error = %e, "plan: exchange not recorded");
    }
    info!(
        user_id = user.id,
        %session_id,
        actions = plan.actions.len(),
        errors = plan.errors.len(),
        tokens,
        "plan: answered"
    );

    Ok(Json(PlanResponse {
        assistant_response: plan.assistant_response,
        actions: plan.actions,
        results,
        errors: plan.errors,
        session_id: Some(session_id.to_string()),
    }))
}
