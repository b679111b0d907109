use super::*;

const DEFAULT_EVENT_LIMIT: usize = 100;

fn reply<T: Serialize>(result: Result<T, String>) -> Json<ApiResponse<T>> {
    match result {
        Ok(data) => Json(ApiResponse::success(data)),
        Err(e) => Json(ApiResponse {
            ok: false,
            data: None,
            error: Some(e),
        }),
    }
}

pub(super) async fn health() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

pub(super) async fn get_session(State(state): State<AppState>) -> Json<ApiResponse<SessionSnapshot>> {
    reply(state.ask(ApiCommand::GetSession).await)
}

pub(super) async fn get_hud(State(state): State<AppState>) -> Json<ApiResponse<HudView>> {
    reply(state.ask(ApiCommand::GetHud).await)
}

pub(super) async fn get_telemetry(
    State(state): State<AppState>,
) -> Json<ApiResponse<SessionTelemetry>> {
    reply(state.ask(ApiCommand::GetTelemetry).await)
}

pub(super) async fn get_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Json<ApiResponse<Vec<GameEvent>>> {
    let limit = query.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    reply(state.ask(|tx| ApiCommand::GetEvents(limit, tx)).await)
}

pub(super) async fn get_narration(
    State(state): State<AppState>,
) -> Json<ApiResponse<NarrationState>> {
    reply(state.ask(ApiCommand::GetNarration).await)
}

pub(super) async fn stop_narration(State(state): State<AppState>) -> Json<ApiResponse<StopResult>> {
    let result = state.ask(ApiCommand::StopNarration).await;
    reply(result.map(|stopped| StopResult { stopped }))
}

pub(super) async fn set_level(
    State(state): State<AppState>,
    Json(req): Json<SetLevelRequest>,
) -> (StatusCode, Json<ApiResponse<LevelId>>) {
    match state.ask(|tx| ApiCommand::StartLevel(req.level, tx)).await {
        Ok(Ok(level)) => (StatusCode::OK, Json(ApiResponse::success(level))),
        Ok(Err(e)) => (StatusCode::BAD_REQUEST, reply(Err(e))),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, reply(Err(e))),
    }
}

pub(super) async fn apply_input(
    State(state): State<AppState>,
    Json(req): Json<InputRequest>,
) -> (StatusCode, Json<ApiResponse<String>>) {
    match state.ask(|tx| ApiCommand::ApplyInput(req, tx)).await {
        Ok(Ok(())) => (StatusCode::OK, Json(ApiResponse::ok())),
        Ok(Err(e)) => (StatusCode::BAD_REQUEST, Json(ApiResponse::err(e))),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, Json(ApiResponse::err(e))),
    }
}
