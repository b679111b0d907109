use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bevy::prelude::*;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("narration request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("narration request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("narration payload was empty")]
    EmptyPayload,
    #[error("narration payload is not a playable audio format")]
    UnsupportedFormat,
    #[error("audio output is unavailable")]
    OutputUnavailable,
}

/// Why a `play` call did not end with audible narration. Callers log these
/// and carry on; none of them should affect gameplay.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NarrationError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error("superseded by a newer narration request")]
    Superseded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClipId(u64);

impl ClipId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// The clip that is currently audible.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClipHandle {
    pub id: ClipId,
    pub source: String,
}

/// Outcome of a completion or error report from the playback side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipEnd {
    /// The report was for the active clip, which is now cleared.
    Cleared,
    /// The clip had already been superseded or stopped; nothing changed.
    Stale,
}

pub type FetchFuture = Pin<Box<dyn Future<Output = Result<Vec<u8>, FetchError>> + Send>>;

/// Retrieves raw audio bytes for a narration URL.
pub trait NarrationFetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> FetchFuture;
}

/// The audible side of narration. Both calls happen while the coordinator
/// holds its lock, so implementations must not call back into it.
pub trait PlaybackBackend: Send + Sync + 'static {
    /// Decode `payload` and start playing it as `clip`.
    fn start(&self, clip: ClipId, payload: Vec<u8>) -> Result<(), PlaybackError>;

    /// Silence `clip` and release everything held for it. Unknown or
    /// already-finished clips are ignored.
    fn stop(&self, clip: ClipId);
}

enum Slot {
    Idle,
    Fetching { ticket: ClipId, source: String },
    Playing(ClipHandle),
}

struct CoordinatorState {
    slot: Slot,
    next_id: u64,
}

impl CoordinatorState {
    fn is_fetching(&self, clip: ClipId) -> bool {
        matches!(&self.slot, Slot::Fetching { ticket, .. } if *ticket == clip)
    }

    fn is_playing(&self, clip: ClipId) -> bool {
        matches!(&self.slot, Slot::Playing(handle) if handle.id == clip)
    }
}

/// Single-flight narration player. Every `play` supersedes whatever came
/// before it, whether that is still downloading or already audible.
#[derive(Resource, Clone)]
pub struct AudioCoordinator {
    state: Arc<Mutex<CoordinatorState>>,
    fetcher: Arc<dyn NarrationFetcher>,
    backend: Arc<dyn PlaybackBackend>,
}

impl AudioCoordinator {
    pub fn new(fetcher: Arc<dyn NarrationFetcher>, backend: Arc<dyn PlaybackBackend>) -> Self {
        Self {
            state: Arc::new(Mutex::new(CoordinatorState {
                slot: Slot::Idle,
                next_id: 0,
            })),
            fetcher,
            backend,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stop the current clip, then fetch and play `url`.
    ///
    /// The stop happens before this function returns, before any network
    /// I/O. The returned future performs the fetch and resolves once
    /// playback has started or the attempt has been abandoned. Dropping it
    /// early abandons the attempt.
    pub fn play(
        &self,
        url: impl Into<String>,
    ) -> impl Future<Output = Result<ClipHandle, NarrationError>> + Send + 'static {
        let url = url.into();
        let ticket = {
            let mut state = self.lock();
            self.release(&mut state);
            state.next_id += 1;
            let ticket = ClipId(state.next_id);
            state.slot = Slot::Fetching {
                ticket,
                source: url.clone(),
            };
            ticket
        };
        debug!("[Onboard audio] Requesting {} as clip {}", url, ticket.0);

        let guard = ClipGuard {
            coordinator: self.clone(),
            ticket,
            armed: true,
        };
        let fetch = self.fetcher.fetch(&url);
        async move {
            let mut guard = guard;
            let payload = fetch.await?;
            let handle = guard.coordinator.commit(guard.ticket, url, payload)?;
            guard.armed = false;
            Ok(handle)
        }
    }

    /// Stop whatever is active. Returns false when there was nothing to stop.
    pub fn stop_current(&self) -> bool {
        let mut state = self.lock();
        let stopped = self.release(&mut state);
        if stopped {
            debug!("[Onboard audio] Narration stopped");
        }
        stopped
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.lock().slot, Slot::Playing(_))
    }

    /// True while a fetch is outstanding for the newest request.
    pub fn is_pending(&self) -> bool {
        matches!(self.lock().slot, Slot::Fetching { .. })
    }

    pub fn active(&self) -> Option<ClipHandle> {
        match &self.lock().slot {
            Slot::Playing(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    /// Source of the newest request, pending or playing.
    pub fn current_source(&self) -> Option<String> {
        match &self.lock().slot {
            Slot::Idle => None,
            Slot::Fetching { source, .. } => Some(source.clone()),
            Slot::Playing(handle) => Some(handle.source.clone()),
        }
    }

    /// Playback of `clip` reached its natural end.
    pub fn clip_finished(&self, clip: ClipId) -> ClipEnd {
        let mut state = self.lock();
        if !state.is_playing(clip) {
            return ClipEnd::Stale;
        }
        state.slot = Slot::Idle;
        debug!("[Onboard audio] Clip {} finished", clip.0);
        ClipEnd::Cleared
    }

    /// Playback of `clip` failed after it started.
    pub fn clip_failed(&self, clip: ClipId, reason: &str) -> ClipEnd {
        let mut state = self.lock();
        if !state.is_playing(clip) {
            return ClipEnd::Stale;
        }
        warn!("[Onboard audio] Clip {} failed: {}", clip.0, reason);
        state.slot = Slot::Idle;
        self.backend.stop(clip);
        ClipEnd::Cleared
    }

    fn release(&self, state: &mut CoordinatorState) -> bool {
        match std::mem::replace(&mut state.slot, Slot::Idle) {
            Slot::Idle => false,
            Slot::Fetching { .. } => true,
            Slot::Playing(handle) => {
                self.backend.stop(handle.id);
                true
            }
        }
    }

    fn commit(
        &self,
        ticket: ClipId,
        source: String,
        payload: Vec<u8>,
    ) -> Result<ClipHandle, NarrationError> {
        let mut state = self.lock();
        if !state.is_fetching(ticket) {
            debug!(
                "[Onboard audio] Discarding {} bytes for superseded clip {}",
                payload.len(),
                ticket.0
            );
            return Err(NarrationError::Superseded);
        }
        if payload.is_empty() {
            return Err(PlaybackError::EmptyPayload.into());
        }
        self.backend.start(ticket, payload)?;
        let handle = ClipHandle { id: ticket, source };
        info!("[Onboard audio] Playing {}", handle.source);
        state.slot = Slot::Playing(handle.clone());
        Ok(handle)
    }

    /// Clear a pending request that will never commit.
    fn abandon(&self, ticket: ClipId) {
        let mut state = self.lock();
        if state.is_fetching(ticket) {
            state.slot = Slot::Idle;
        }
    }
}

/// Owns a pending request until it commits. Any other exit (fetch error,
/// playback error, supersede, or the future being dropped) clears the slot.
struct ClipGuard {
    coordinator: AudioCoordinator,
    ticket: ClipId,
    armed: bool,
}

impl Drop for ClipGuard {
    fn drop(&mut self) {
        if self.armed {
            self.coordinator.abandon(self.ticket);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::oneshot;

    type Reply = Result<Vec<u8>, FetchError>;

    /// Fetcher whose responses are released by the test.
    #[derive(Default)]
    struct GatedFetcher {
        gates: Mutex<HashMap<String, oneshot::Receiver<Reply>>>,
    }

    impl GatedFetcher {
        fn gate(&self, url: &str) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().insert(url.to_string(), rx);
            tx
        }
    }

    impl NarrationFetcher for GatedFetcher {
        fn fetch(&self, url: &str) -> FetchFuture {
            let gate = self.gates.lock().unwrap().remove(url);
            let url = url.to_string();
            Box::pin(async move {
                match gate {
                    Some(rx) => rx.await.unwrap_or_else(|_| {
                        Err(FetchError::Transport {
                            url,
                            reason: "gate dropped".into(),
                        })
                    }),
                    None => Err(FetchError::Transport {
                        url,
                        reason: "no gate".into(),
                    }),
                }
            })
        }
    }

    #[derive(Default)]
    struct RecordingBackend {
        reject: bool,
        started: Mutex<Vec<ClipId>>,
        stopped: Mutex<Vec<ClipId>>,
    }

    impl PlaybackBackend for RecordingBackend {
        fn start(&self, clip: ClipId, _payload: Vec<u8>) -> Result<(), PlaybackError> {
            if self.reject {
                return Err(PlaybackError::UnsupportedFormat);
            }
            self.started.lock().unwrap().push(clip);
            Ok(())
        }

        fn stop(&self, clip: ClipId) {
            self.stopped.lock().unwrap().push(clip);
        }
    }

    fn setup(reject: bool) -> (AudioCoordinator, Arc<GatedFetcher>, Arc<RecordingBackend>) {
        let fetcher = Arc::new(GatedFetcher::default());
        let backend = Arc::new(RecordingBackend {
            reject,
            ..Default::default()
        });
        let coordinator = AudioCoordinator::new(fetcher.clone(), backend.clone());
        (coordinator, fetcher, backend)
    }

    fn audio() -> Vec<u8> {
        b"ID3\x04\x00\x00\x00\x00\x00\x00".to_vec()
    }

    #[tokio::test]
    async fn later_request_wins_when_earlier_resolves_last() {
        let (coordinator, fetcher, backend) = setup(false);
        let gate_a = fetcher.gate("a");
        let gate_b = fetcher.gate("b");

        let a = tokio::spawn(coordinator.play("a"));
        let b = tokio::spawn(coordinator.play("b"));

        gate_b.send(Ok(audio())).unwrap();
        let playing = b.await.unwrap().unwrap();
        assert_eq!(playing.source, "b");

        gate_a.send(Ok(audio())).unwrap();
        assert_eq!(a.await.unwrap(), Err(NarrationError::Superseded));

        assert_eq!(*backend.started.lock().unwrap(), vec![playing.id]);
        assert_eq!(coordinator.active(), Some(playing));
    }

    #[tokio::test]
    async fn later_request_wins_when_earlier_resolves_first() {
        let (coordinator, fetcher, backend) = setup(false);
        let gate_a = fetcher.gate("a");
        let gate_b = fetcher.gate("b");

        let a = tokio::spawn(coordinator.play("a"));
        let b = tokio::spawn(coordinator.play("b"));

        gate_a.send(Ok(audio())).unwrap();
        assert_eq!(a.await.unwrap(), Err(NarrationError::Superseded));
        assert!(backend.started.lock().unwrap().is_empty());
        assert!(coordinator.is_pending());

        gate_b.send(Ok(audio())).unwrap();
        b.await.unwrap().unwrap();
        assert_eq!(backend.started.lock().unwrap().len(), 1);
        assert_eq!(coordinator.current_source().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn new_request_stops_the_audible_clip_first() {
        let (coordinator, fetcher, backend) = setup(false);
        fetcher.gate("a").send(Ok(audio())).unwrap();
        let first = coordinator.play("a").await.unwrap();

        let _gate_b = fetcher.gate("b");
        let _pending = coordinator.play("b");
        assert_eq!(*backend.stopped.lock().unwrap(), vec![first.id]);
        assert!(!coordinator.is_playing());
        assert!(coordinator.is_pending());
    }

    #[tokio::test]
    async fn stop_during_fetch_discards_late_payload() {
        let (coordinator, fetcher, backend) = setup(false);
        let gate = fetcher.gate("a");
        let pending = tokio::spawn(coordinator.play("a"));

        assert!(coordinator.stop_current());
        gate.send(Ok(audio())).unwrap();

        assert_eq!(pending.await.unwrap(), Err(NarrationError::Superseded));
        assert!(backend.started.lock().unwrap().is_empty());
        assert!(!coordinator.is_playing());
        assert!(!coordinator.is_pending());
    }

    #[test]
    fn stop_with_nothing_active_is_a_no_op() {
        let (coordinator, _, backend) = setup(false);
        assert!(!coordinator.stop_current());
        assert!(!coordinator.stop_current());
        assert!(backend.stopped.lock().unwrap().is_empty());
        assert_eq!(coordinator.current_source(), None);
    }

    #[tokio::test]
    async fn stale_completion_does_not_clear_newer_clip() {
        let (coordinator, fetcher, _) = setup(false);
        fetcher.gate("a").send(Ok(audio())).unwrap();
        let first = coordinator.play("a").await.unwrap();
        fetcher.gate("b").send(Ok(audio())).unwrap();
        let second = coordinator.play("b").await.unwrap();

        assert_eq!(coordinator.clip_finished(first.id), ClipEnd::Stale);
        assert_eq!(coordinator.clip_failed(first.id, "late"), ClipEnd::Stale);
        assert_eq!(coordinator.active(), Some(second.clone()));

        assert_eq!(coordinator.clip_finished(second.id), ClipEnd::Cleared);
        assert!(!coordinator.is_playing());
    }

    #[tokio::test]
    async fn fetch_failure_leaves_coordinator_idle() {
        let (coordinator, fetcher, _) = setup(false);
        fetcher
            .gate("missing")
            .send(Err(FetchError::Status {
                url: "missing".into(),
                status: 404,
            }))
            .unwrap();
        let err = coordinator.play("missing").await.unwrap_err();
        assert!(matches!(
            err,
            NarrationError::Fetch(FetchError::Status { status: 404, .. })
        ));
        assert!(!coordinator.is_pending());
        assert!(!coordinator.is_playing());
    }

    #[tokio::test]
    async fn playback_failure_releases_the_request() {
        let (coordinator, fetcher, _) = setup(true);
        fetcher.gate("a").send(Ok(audio())).unwrap();
        assert_eq!(
            coordinator.play("a").await,
            Err(NarrationError::Playback(PlaybackError::UnsupportedFormat))
        );
        assert_eq!(coordinator.current_source(), None);

        fetcher.gate("empty").send(Ok(Vec::new())).unwrap();
        assert_eq!(
            coordinator.play("empty").await,
            Err(NarrationError::Playback(PlaybackError::EmptyPayload))
        );
    }

    #[test]
    fn dropping_an_unpolled_request_clears_it() {
        let (coordinator, _, _) = setup(false);
        let pending = coordinator.play("a");
        assert!(coordinator.is_pending());
        drop(pending);
        assert!(!coordinator.is_pending());
    }
}
