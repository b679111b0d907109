use super::*;

#[derive(Clone)]
pub(super) struct AppState {
    pub(super) sender: Sender<ApiCommand>,
}

impl AppState {
    /// Send `command` to the game loop and wait for its reply.
    pub(super) async fn ask<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> ApiCommand,
    ) -> Result<T, String> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.sender
            .send(command(tx))
            .map_err(|_| "Game loop is not running".to_string())?;
        rx.await.map_err(|_| "Channel closed".to_string())
    }
}
