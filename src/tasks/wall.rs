use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use futures::StreamExt;
use rand::rngs::StdRng;
use tokio::select;
use tokio::sync::mpsc::Receiver;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval, interval_at, timeout};
use tokio_util::sync::CancellationToken;
use tokio_util::time::{DelayQueue, delay_queue};
use tracing::{debug, info, warn};

use crate::config::GalleryConfig;
use crate::events::WallCommand;
use crate::gallery::{AnimationSlot, Frame, GalleryState, PhotoSource};
use crate::platform::FullscreenController;
use crate::platform::fullscreen::{is_toggle_key, toggle};
use crate::proxy::PhotoDescriptor;

type ExpiryEntry = (AnimationSlot, String);

/// Pending tag removals, one timer per `(map, photo id)`.
///
/// Scheduling an id that already has a pending removal restarts its timer
/// rather than leaving the older one to clear the fresh tag early.
struct Expirations {
    queue: DelayQueue<ExpiryEntry>,
    keys: HashMap<ExpiryEntry, delay_queue::Key>,
}

impl Expirations {
    fn new() -> Self {
        Self {
            queue: DelayQueue::new(),
            keys: HashMap::new(),
        }
    }

    fn schedule(&mut self, slot: AnimationSlot, id: String, after: Duration) {
        let entry = (slot, id);
        if let Some(key) = self.keys.get(&entry) {
            self.queue.reset(key, after);
        } else {
            let key = self.queue.insert(entry.clone(), after);
            self.keys.insert(entry, key);
        }
    }

    fn fired(&mut self, entry: &ExpiryEntry) {
        self.keys.remove(entry);
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

fn ticker(period: Duration, immediate: bool) -> Interval {
    let mut tick = if immediate {
        interval(period)
    } else {
        interval_at(Instant::now() + period, period)
    };
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tick
}

/// Owns the wall state and drives it from timers, fetch completions, and page
/// commands, publishing a fresh [`Frame`] after every transition.
///
/// Rules:
/// - A listing is requested immediately, then every `poll-interval`; a slow
///   request may overlap the next one and results apply in arrival order.
///   One still pending after `fetch-timeout` is dropped and counts as a failure.
/// - A failed listing shows the error state; polling continues and the next
///   success clears it.
/// - Float, highlight, and rotation ticks run on their own timers.
/// - Cancelling `cancel` drops every timer and in-flight request.
pub async fn run<S, F>(
    source: Arc<S>,
    settings: GalleryConfig,
    mut fullscreen: F,
    mut commands: Receiver<WallCommand>,
    frames: watch::Sender<Frame>,
    cancel: CancellationToken,
    mut rng: StdRng,
) -> Result<()>
where
    S: PhotoSource,
    F: FullscreenController,
{
    let mut state = GalleryState::from_config(&settings, &mut rng);
    let mut expirations = Expirations::new();
    let mut fetches: JoinSet<Result<Vec<PhotoDescriptor>>> = JoinSet::new();

    let mut poll_tick = ticker(settings.poll_interval, true);
    let mut float_tick = ticker(settings.float_interval, false);
    let mut highlight_tick = ticker(settings.highlight_interval, false);
    let mut rotate_tick = ticker(settings.rotate_interval, false);

    let publish = |state: &GalleryState, fullscreen: &F| {
        frames.send_replace(Frame::from_state(
            state,
            settings.thumbnail_count,
            fullscreen.is_active(),
        ));
    };
    publish(&state, &fullscreen);
    info!(
        poll_ms = settings.poll_interval.as_millis() as u64,
        "wall session started"
    );

    loop {
        select! {
            _ = cancel.cancelled() => {
                info!(in_flight = fetches.len(), "cancel received; stopping wall session");
                break;
            }

            _ = poll_tick.tick() => {
                let source = Arc::clone(&source);
                let limit = settings.fetch_timeout;
                fetches.spawn(async move {
                    timeout(limit, source.fetch())
                        .await
                        .unwrap_or_else(|_| Err(anyhow!("listing timed out after {limit:?}")))
                });
                debug!(in_flight = fetches.len(), "listing requested");
                continue;
            }

            Some(joined) = fetches.join_next() => {
                match joined {
                    Ok(Ok(photos)) => {
                        let arrivals = state.apply_listing(photos, &mut rng);
                        for id in arrivals.ids {
                            expirations.schedule(AnimationSlot::Arrival, id, settings.arrival_dwell);
                        }
                    }
                    Ok(Err(err)) => {
                        warn!(error = ?err, "listing failed");
                        state.record_failure(format!("{err:#}"));
                    }
                    Err(err) => {
                        warn!(error = %err, "listing task aborted");
                        continue;
                    }
                }
            }

            Some(expired) = expirations.queue.next(), if !expirations.is_empty() => {
                let entry = expired.into_inner();
                expirations.fired(&entry);
                let (slot, id) = entry;
                state.expire(slot, &id);
            }

            _ = float_tick.tick() => {
                if !state.maybe_float(settings.float_chance, &mut rng) {
                    continue;
                }
            }

            _ = highlight_tick.tick() => {
                let Some(id) = state.maybe_highlight(settings.highlight_chance, &mut rng) else {
                    continue;
                };
                expirations.schedule(AnimationSlot::Highlight, id, settings.highlight_dwell);
            }

            _ = rotate_tick.tick() => {
                state.advance();
            }

            Some(command) = commands.recv() => {
                match command {
                    WallCommand::Select(index) => {
                        if !state.select(index) {
                            debug!(index, "ignoring out-of-range selection");
                        }
                    }
                    WallCommand::Advance => state.advance(),
                    WallCommand::Key { key, reply } => {
                        if is_toggle_key(&key) {
                            let active = toggle(&mut fullscreen);
                            debug!(active, "fullscreen toggled");
                        }
                        let _ = reply.send(fullscreen.is_active());
                    }
                }
            }
        }
        publish(&state, &fullscreen);
    }

    Ok(())
}
