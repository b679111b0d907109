use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bevy::audio::{AudioPlayer, AudioSource, PlaybackSettings};
use bevy::prelude::*;
use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;

use crate::audio::{
    AudioCoordinator, ClipId, FetchError, FetchFuture, NarrationError, NarrationFetcher,
    PlaybackBackend, PlaybackError,
};
use crate::components::HeadlessMode;
use crate::config::GameConfig;
use crate::levels::{NarrationCue, NarrationRequest};

/// Coach endpoint for `cue` under `base`.
pub fn narration_url(base: &str, cue: NarrationCue) -> String {
    let base = base.trim_end_matches('/');
    match cue {
        NarrationCue::Intro => format!("{base}/coach_blaze"),
        NarrationCue::Section(step) => format!("{base}/coach_blaze?step={step}"),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Ogg,
    Wav,
    Flac,
}

/// Identify a payload by its magic bytes. The decoder behind the audio sink
/// cannot recover from bytes it does not understand, so anything unknown is
/// rejected here.
pub fn sniff_format(bytes: &[u8]) -> Option<AudioFormat> {
    match bytes {
        [b'I', b'D', b'3', ..] => Some(AudioFormat::Mp3),
        [0xFF, second, ..] if second & 0xE0 == 0xE0 => Some(AudioFormat::Mp3),
        [b'O', b'g', b'g', b'S', ..] => Some(AudioFormat::Ogg),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => Some(AudioFormat::Wav),
        [b'f', b'L', b'a', b'C', ..] => Some(AudioFormat::Flac),
        _ => None,
    }
}

/// True when the decoder used by the audio sink accepts `bytes`. A header
/// match alone is not enough: truncated bodies still carry valid magic.
fn decodes(bytes: &[u8]) -> bool {
    rodio::Decoder::new(Cursor::new(bytes.to_vec())).is_ok()
}

/// Fetches coach audio over HTTP.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl NarrationFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> FetchFuture {
        let client = self.client.clone();
        let url = url.to_string();
        Box::pin(async move {
            let transport = |url: &str, e: reqwest::Error| FetchError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            };
            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|e| transport(&url, e))?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url,
                    status: status.as_u16(),
                });
            }
            let body = response.bytes().await.map_err(|e| transport(&url, e))?;
            Ok(body.to_vec())
        })
    }
}

/// Used when no HTTP client could be built: every fetch fails.
struct OfflineFetcher;

impl NarrationFetcher for OfflineFetcher {
    fn fetch(&self, url: &str) -> FetchFuture {
        let url = url.to_string();
        Box::pin(async move {
            Err(FetchError::Transport {
                url,
                reason: "narration client unavailable".to_string(),
            })
        })
    }
}

pub enum PlaybackCommand {
    Start { clip: ClipId, bytes: Vec<u8> },
    Stop { clip: ClipId },
}

/// Hands validated payloads to the Bevy world, which owns the audio sink.
pub struct ChannelPlayback {
    tx: Sender<PlaybackCommand>,
}

impl ChannelPlayback {
    pub fn new(tx: Sender<PlaybackCommand>) -> Self {
        Self { tx }
    }
}

impl PlaybackBackend for ChannelPlayback {
    fn start(&self, clip: ClipId, payload: Vec<u8>) -> Result<(), PlaybackError> {
        if payload.is_empty() {
            return Err(PlaybackError::EmptyPayload);
        }
        if sniff_format(&payload).is_none() || !decodes(&payload) {
            return Err(PlaybackError::UnsupportedFormat);
        }
        self.tx
            .send(PlaybackCommand::Start {
                clip,
                bytes: payload,
            })
            .map_err(|_| PlaybackError::OutputUnavailable)
    }

    fn stop(&self, clip: ClipId) {
        let _ = self.tx.send(PlaybackCommand::Stop { clip });
    }
}

/// Requests produced by gameplay this frame, drained by [`dispatch_narration`].
#[derive(Resource, Default)]
pub struct NarrationQueue(pub Vec<NarrationRequest>);

#[derive(Default)]
pub struct NarrationCounters {
    requested: AtomicU64,
    played: AtomicU64,
    failed: AtomicU64,
    superseded: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NarrationStats {
    pub requested: u64,
    pub played: u64,
    pub failed: u64,
    pub superseded: u64,
}

impl NarrationCounters {
    pub fn snapshot(&self) -> NarrationStats {
        NarrationStats {
            requested: self.requested.load(Ordering::Relaxed),
            played: self.played.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
        }
    }

    fn record(&self, outcome: &Result<crate::audio::ClipHandle, NarrationError>) {
        let counter = match outcome {
            Ok(_) => &self.played,
            Err(NarrationError::Superseded) => &self.superseded,
            Err(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Async side of narration. Without a runtime, narration is silently skipped.
#[derive(Resource)]
pub struct NarrationRuntime {
    runtime: Option<tokio::runtime::Runtime>,
    pub counters: Arc<NarrationCounters>,
}

#[derive(Resource)]
struct PlaybackReceiver(Receiver<PlaybackCommand>);

#[derive(Component, Clone, Copy)]
pub struct NarrationClip(pub ClipId);

#[derive(Resource, Default)]
struct ClipEntities(HashMap<Entity, ClipId>);

pub struct NarrationPlugin;

impl Plugin for NarrationPlugin {
    fn build(&self, app: &mut App) {
        let config = app
            .world()
            .get_resource::<GameConfig>()
            .cloned()
            .unwrap_or_default();
        let (tx, rx) = crossbeam_channel::unbounded::<PlaybackCommand>();

        let fetcher: Arc<dyn NarrationFetcher> = match HttpFetcher::new(config.narration.timeout) {
            Ok(fetcher) => Arc::new(fetcher),
            Err(e) => {
                error!("[Onboard narration] HTTP client unavailable: {}", e);
                Arc::new(OfflineFetcher)
            }
        };
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("onboard-narration")
            .enable_all()
            .build()
            .map_err(|e| warn!("[Onboard narration] Async runtime unavailable, narration disabled: {}", e))
            .ok();

        app.insert_resource(AudioCoordinator::new(
            fetcher,
            Arc::new(ChannelPlayback::new(tx)),
        ))
        .insert_resource(NarrationRuntime {
            runtime,
            counters: Arc::new(NarrationCounters::default()),
        })
        .insert_resource(PlaybackReceiver(rx))
        .init_resource::<NarrationQueue>()
        .init_resource::<ClipEntities>()
        .add_systems(
            PostUpdate,
            (dispatch_narration, apply_playback_commands, reap_finished_clips).chain(),
        );
    }
}

/// Start or stop narration for every queued request. Never blocks the frame.
fn dispatch_narration(
    mut queue: ResMut<NarrationQueue>,
    coordinator: Res<AudioCoordinator>,
    narration: Res<NarrationRuntime>,
    config: Res<GameConfig>,
) {
    for request in queue.0.drain(..) {
        match request {
            NarrationRequest::Stop => {
                coordinator.stop_current();
            }
            NarrationRequest::Play(cue) => {
                let Some(runtime) = narration.runtime.as_ref() else {
                    coordinator.stop_current();
                    continue;
                };
                let url = narration_url(&config.narration.base_url, cue);
                narration.counters.requested.fetch_add(1, Ordering::Relaxed);
                let attempt = coordinator.play(url.clone());
                let counters = narration.counters.clone();
                runtime.spawn(async move {
                    let outcome = attempt.await;
                    counters.record(&outcome);
                    match outcome {
                        Ok(_) | Err(NarrationError::Superseded) => {}
                        Err(e) => warn!("[Onboard narration] {} skipped: {}", url, e),
                    }
                });
            }
        }
    }
}

fn apply_playback_commands(
    mut commands: Commands,
    receiver: Res<PlaybackReceiver>,
    headless: Res<HeadlessMode>,
    coordinator: Res<AudioCoordinator>,
    mut sources: Option<ResMut<Assets<AudioSource>>>,
    mut entities: ResMut<ClipEntities>,
) {
    while let Ok(command) = receiver.0.try_recv() {
        match command {
            PlaybackCommand::Start { clip, bytes } => {
                if headless.0 {
                    // Nothing can be heard, so the clip ends as soon as it starts.
                    coordinator.clip_finished(clip);
                    continue;
                }
                let Some(sources) = sources.as_mut() else {
                    coordinator.clip_failed(clip, &PlaybackError::OutputUnavailable.to_string());
                    continue;
                };
                let handle = sources.add(AudioSource {
                    bytes: bytes.into(),
                });
                let entity = commands
                    .spawn((
                        Name::new(format!("narration-{}", clip.raw())),
                        AudioPlayer::new(handle),
                        PlaybackSettings::DESPAWN,
                        NarrationClip(clip),
                    ))
                    .id();
                entities.0.insert(entity, clip);
            }
            PlaybackCommand::Stop { clip } => {
                let stale: Vec<Entity> = entities
                    .0
                    .iter()
                    .filter(|(_, c)| **c == clip)
                    .map(|(e, _)| *e)
                    .collect();
                for entity in stale {
                    entities.0.remove(&entity);
                    if let Some(mut e) = commands.get_entity(entity) {
                        e.despawn();
                    }
                }
            }
        }
    }
}

/// Report clips whose player entity went away on its own (end of playback).
fn reap_finished_clips(
    mut removed: RemovedComponents<NarrationClip>,
    mut entities: ResMut<ClipEntities>,
    coordinator: Res<AudioCoordinator>,
) {
    for entity in removed.read() {
        if let Some(clip) = entities.0.remove(&entity) {
            coordinator.clip_finished(clip);
        }
    }
}
