//! Async dispatcher service wrapping the pipeline.
//!
//! The pipeline itself is synchronous; this wrapper gives it the §5 runtime
//! shape: a single task owns the pipeline (and therefore the environment),
//! drains one command at a time from a bounded channel, and sleeps until the
//! earliest timer deadline between commands. Timer callbacks re-enter the
//! pipeline on the same task, so no callback ever observes another entry's
//! partial state.

use crate::pipeline::Pipeline;
use core_config::CoreConfiguration;
use core_events::{AbsoluteMs, DeviceId, Event, EventEntry, EventType};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, sleep_until};
use tracing::{debug, warn};

/// Bounded command channel: the producing grabber blocks rather than drop
/// input events.
pub const COMMAND_CHANNEL_CAP: usize = 8192;
pub const OUTPUT_CHANNEL_CAP: usize = 8192;

#[derive(Debug)]
pub enum Command {
    /// A captured input event. The service stamps the monotonic time; the
    /// capture side does not share a clock with the pipeline.
    Input {
        device_id: DeviceId,
        event: Event,
        event_type: EventType,
    },
    /// Serialized configuration reload: invalidate, then rebuild, with no
    /// event routed in between.
    Reload(Box<CoreConfiguration>),
    Shutdown,
}

pub struct DispatcherService {
    commands: mpsc::Sender<Command>,
    handle: JoinHandle<()>,
}

impl DispatcherService {
    /// Spawn the dispatcher task. Emitted entries arrive on the returned
    /// receiver in emission order.
    pub fn spawn(pipeline: Pipeline) -> (Self, mpsc::Receiver<EventEntry>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAP);
        let (output_tx, output_rx) = mpsc::channel(OUTPUT_CHANNEL_CAP);
        let handle = tokio::spawn(run(pipeline, command_rx, output_tx));
        (
            Self {
                commands: command_tx,
                handle,
            },
            output_rx,
        )
    }

    pub fn commands(&self) -> mpsc::Sender<Command> {
        self.commands.clone()
    }

    pub async fn post_input(
        &self,
        device_id: DeviceId,
        event: Event,
        event_type: EventType,
    ) -> Result<(), mpsc::error::SendError<Command>> {
        self.commands
            .send(Command::Input {
                device_id,
                event,
                event_type,
            })
            .await
    }

    pub async fn reload(
        &self,
        configuration: CoreConfiguration,
    ) -> Result<(), mpsc::error::SendError<Command>> {
        self.commands.send(Command::Reload(Box::new(configuration))).await
    }

    /// Request shutdown and wait for the task to drain.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown).await;
        let _ = self.handle.await;
    }
}

async fn run(
    mut pipeline: Pipeline,
    mut commands: mpsc::Receiver<Command>,
    output: mpsc::Sender<EventEntry>,
) {
    // Monotonic origin for AbsoluteMs. Under a paused tokio clock the tests
    // drive this deterministically.
    let origin = Instant::now();
    let now_ms = |at: Instant| AbsoluteMs(at.duration_since(origin).as_millis() as u64);

    debug!(target: "pipeline.service", "dispatcher started");
    loop {
        // Far-future fallback keeps the select arm uniform when no timer is
        // pending.
        let deadline = pipeline
            .next_timer_deadline()
            .map(|deadline| origin + Duration::from_millis(deadline.0))
            .unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

        tokio::select! {
            command = commands.recv() => {
                let now = now_ms(Instant::now());
                match command {
                    Some(Command::Input { device_id, event, event_type }) => {
                        let entry = EventEntry::input(device_id, now, event, event_type);
                        for emitted in pipeline.manipulate(entry) {
                            if output.send(emitted).await.is_err() {
                                warn!(target: "pipeline.service", "output receiver dropped");
                                return;
                            }
                        }
                    }
                    Some(Command::Reload(configuration)) => {
                        for emitted in pipeline.reload(&configuration, now) {
                            if output.send(emitted).await.is_err() {
                                return;
                            }
                        }
                    }
                    Some(Command::Shutdown) | None => {
                        debug!(target: "pipeline.service", "dispatcher stopping");
                        for emitted in pipeline.invalidate(now) {
                            let _ = output.send(emitted).await;
                        }
                        return;
                    }
                }
            }
            _ = sleep_until(deadline) => {
                let now = now_ms(deadline);
                for emitted in pipeline.fire_due_timers(now) {
                    if output.send(emitted).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}
