#![forbid(unsafe_code)]

//! Out-of-thread diff computation.
//!
//! A [`DiffEngine`] runs on a dedicated worker thread and reports progress
//! plus exactly one terminal message through an mpsc channel. The viewer
//! polls the [`EngineHandle`] from its event loop and only rebuilds once the
//! complete payload has arrived.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;

use netdiff_model::{Payload, PayloadError};
use tracing::{debug, info, warn};

/// Errors surfaced by the engine handoff.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("diff engine failed: {0}")]
    Failed(String),

    #[error("invalid payload: {0}")]
    Payload(#[from] PayloadError),

    #[error("engine worker stopped before delivering a payload")]
    Disconnected,

    #[error("engine cancelled")]
    Cancelled,

    #[error("failed to spawn engine worker: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Message from the worker.
#[derive(Debug)]
pub enum EngineMessage {
    /// Fraction complete in `[0, 1]` with a short stage name.
    Progress { fraction: f32, stage: String },
    /// The complete payload.
    Done(Payload),
    /// The engine gave up.
    Failed(EngineError),
}

/// Cooperative cancellation flag shared with the worker.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }
}

/// Progress reporter handed to the engine.
#[derive(Debug, Clone)]
pub struct Progress {
    sender: mpsc::Sender<EngineMessage>,
}

impl Progress {
    /// Report progress. Lost updates (receiver gone) are ignored.
    pub fn report(&self, fraction: f32, stage: impl Into<String>) {
        let _ = self.sender.send(EngineMessage::Progress {
            fraction: fraction.clamp(0.0, 1.0),
            stage: stage.into(),
        });
    }
}

/// Produces a comparison payload.
///
/// Implementations should check `stop` between stages and return
/// [`EngineError::Cancelled`] once it is set.
pub trait DiffEngine: Send + 'static {
    fn name(&self) -> &str;

    fn run(&mut self, progress: &Progress, stop: &StopSignal) -> Result<Payload, EngineError>;
}

/// Engine that loads a precomputed payload from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileEngine {
    path: PathBuf,
}

impl JsonFileEngine {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DiffEngine for JsonFileEngine {
    fn name(&self) -> &str {
        "json-file"
    }

    fn run(&mut self, progress: &Progress, stop: &StopSignal) -> Result<Payload, EngineError> {
        progress.report(0.0, "open");
        let file = File::open(&self.path).map_err(PayloadError::from)?;
        if stop.is_stopped() {
            return Err(EngineError::Cancelled);
        }
        progress.report(0.5, "parse");
        let payload = Payload::from_reader(BufReader::new(file))?;
        progress.report(1.0, "done");
        Ok(payload)
    }
}

/// Engine that hands over an in-memory payload.
#[derive(Debug, Clone)]
pub struct ReadyEngine(pub Payload);

impl DiffEngine for ReadyEngine {
    fn name(&self) -> &str {
        "ready"
    }

    fn run(&mut self, progress: &Progress, _stop: &StopSignal) -> Result<Payload, EngineError> {
        progress.report(1.0, "done");
        Ok(std::mem::take(&mut self.0))
    }
}

/// Poll result.
#[derive(Debug)]
pub enum EnginePoll {
    /// Nothing new.
    Pending,
    Progress { fraction: f32, stage: String },
    Done(Payload),
    Failed(EngineError),
}

/// Viewer-side end of a running engine.
#[derive(Debug)]
pub struct EngineHandle {
    receiver: mpsc::Receiver<EngineMessage>,
    stop: StopSignal,
    thread: Option<thread::JoinHandle<()>>,
    finished: bool,
}

impl EngineHandle {
    /// Start `engine` on a worker thread.
    pub fn spawn(mut engine: impl DiffEngine) -> Result<Self, EngineError> {
        let (sender, receiver) = mpsc::channel();
        let stop = StopSignal::default();
        let worker_stop = stop.clone();
        let name = engine.name().to_string();
        info!(engine = %name, "starting diff engine");

        let thread = thread::Builder::new()
            .name(format!("netdiff-engine-{name}"))
            .spawn(move || {
                let progress = Progress {
                    sender: sender.clone(),
                };
                let message = match engine.run(&progress, &worker_stop) {
                    Ok(payload) => EngineMessage::Done(payload),
                    Err(err) => EngineMessage::Failed(err),
                };
                let _ = sender.send(message);
            })
            .map_err(EngineError::Spawn)?;

        Ok(Self {
            receiver,
            stop,
            thread: Some(thread),
            finished: false,
        })
    }

    /// Non-blocking check for the next message.
    pub fn poll(&mut self) -> EnginePoll {
        if self.finished {
            return EnginePoll::Pending;
        }
        match self.receiver.try_recv() {
            Ok(message) => self.accept(message),
            Err(mpsc::TryRecvError::Empty) => EnginePoll::Pending,
            Err(mpsc::TryRecvError::Disconnected) => {
                self.finish();
                warn!("engine worker disconnected without a result");
                EnginePoll::Failed(EngineError::Disconnected)
            }
        }
    }

    /// Block until the engine delivers its terminal message.
    pub fn wait(mut self) -> Result<Payload, EngineError> {
        loop {
            let message = self
                .receiver
                .recv()
                .map_err(|_| EngineError::Disconnected)?;
            match self.accept(message) {
                EnginePoll::Done(payload) => return Ok(payload),
                EnginePoll::Failed(err) => return Err(err),
                EnginePoll::Pending | EnginePoll::Progress { .. } => {}
            }
        }
    }

    /// Ask the worker to stop. The handle stays pollable.
    pub fn cancel(&self) {
        self.stop.stop();
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn accept(&mut self, message: EngineMessage) -> EnginePoll {
        match message {
            EngineMessage::Progress { fraction, stage } => {
                debug!(fraction, stage = %stage, "engine progress");
                EnginePoll::Progress { fraction, stage }
            }
            EngineMessage::Done(payload) => {
                self.finish();
                info!("engine delivered payload");
                EnginePoll::Done(payload)
            }
            EngineMessage::Failed(err) => {
                self.finish();
                warn!(error = %err, "engine failed");
                EnginePoll::Failed(err)
            }
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.stop.stop();
        // Don't join in drop to avoid blocking.
    }
}
