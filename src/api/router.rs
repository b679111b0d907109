use super::*;

pub(super) fn build_router(state: AppState, security: ApiSecurity) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/session", get(get_session))
        .route("/hud", get(get_hud))
        .route("/telemetry", get(get_telemetry))
        .route("/events", get(get_events))
        .route("/level", post(set_level))
        .route("/input", post(apply_input))
        .route("/narration", get(get_narration))
        .route("/narration/stop", post(stop_narration))
        .layer(middleware::from_fn_with_state(security, api_guard))
        .with_state(state)
}
