use super::*;

pub type Reply<T> = tokio::sync::oneshot::Sender<T>;

/// Commands sent from API -> Bevy
pub enum ApiCommand {
    GetSession(Reply<SessionSnapshot>),
    GetHud(Reply<HudView>),
    GetTelemetry(Reply<SessionTelemetry>),
    GetEvents(usize, Reply<Vec<GameEvent>>),
    GetNarration(Reply<NarrationState>),
    StartLevel(String, Reply<Result<LevelId, String>>),
    StopNarration(Reply<bool>),
    ApplyInput(InputRequest, Reply<Result<(), String>>),
}

#[derive(Resource)]
pub struct ApiChannels {
    pub receiver: Receiver<ApiCommand>,
}
