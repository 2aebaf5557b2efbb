use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Local;
use crossbeam_channel::{Receiver, Sender, TryRecvError};

use super::{FrameSource, apply_device_params};
use crate::annotation::{InspectionOverlay, annotate};
use crate::errors::{CaptureError, InspectionError};
use crate::events::{EventBus, InspectionEvent};
use crate::inspection::session::{EXPECTED_RANGE, TIMEOUT_RANGE_SECS};
use crate::inspection::{InspectionOutcome, InspectionStateMachine, RecentDetections};
use crate::models::{DetectedCode, Frame};
use crate::params::{ParameterStore, PipelineParams};
use crate::pipeline::DetectionPipeline;
use crate::settings;
use crate::utils::enhance::software_boost;

/// Frame-skip divisor used by fast mode
pub const FAST_MODE_SKIP: u32 = 3;
/// Largest frame-skip divisor
pub const MAX_FRAME_SKIP: u32 = 30;

/// Which region variant is attached to code-detected events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThumbnailMode {
    /// Thresholded region
    Binary,
    /// CLAHE-enhanced region
    #[default]
    Enhanced,
    /// Sharpened (refined) or plain (fallback) grayscale
    Gray,
}

impl ThumbnailMode {
    /// Display image for `code`; the unprocessed region if the variant is empty
    pub fn select(&self, code: &DetectedCode) -> Frame {
        let images = code.images();
        let variant = match self {
            ThumbnailMode::Binary => &images.binary,
            ThumbnailMode::Enhanced => &images.enhanced,
            ThumbnailMode::Gray => &images.gray,
        };
        if variant.width() == 0 || variant.height() == 0 {
            images.original.clone()
        } else {
            Frame::Gray(variant.clone())
        }
    }
}

/// Capture loop timing and presentation settings
#[derive(Debug, Clone, PartialEq)]
pub struct LoopConfig {
    /// Process every Nth captured frame
    pub frame_skip: u32,
    /// Pause after each processed frame
    pub loop_sleep: Duration,
    /// Iterations between device parameter re-applications
    pub param_apply_interval: u32,
    /// Pause between device open and the first cycle
    pub warmup: Duration,
    /// Variant attached to code-detected events
    pub thumbnail_mode: ThumbnailMode,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            frame_skip: settings::frame_skip(),
            loop_sleep: Duration::from_millis(settings::loop_sleep_ms()),
            param_apply_interval: settings::param_apply_interval(),
            warmup: Duration::from_millis(settings::warmup_ms()),
            thumbnail_mode: ThumbnailMode::default(),
        }
    }
}

#[derive(Debug)]
enum Command {
    StartInspection { expected: u32, timeout_secs: u64 },
    StopInspection,
    SetFrameSkip(u32),
    SetThumbnailMode(ThumbnailMode),
}

/// Handle to the capture worker thread.
///
/// The worker owns the frame source, the detection pipeline and the
/// inspection state; callers talk to it through commands and observe it
/// through [`subscribe`](Self::subscribe).
pub struct CaptureLoop {
    params: Arc<ParameterStore>,
    events: Arc<EventBus>,
    running: Arc<AtomicBool>,
    commands: Option<Sender<Command>>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureLoop {
    /// Loop with its own event bus
    pub fn new(params: Arc<ParameterStore>) -> Self {
        Self::with_events(params, Arc::new(EventBus::default()))
    }

    /// Loop publishing to a shared bus
    pub fn with_events(params: Arc<ParameterStore>, events: Arc<EventBus>) -> Self {
        Self {
            params,
            events,
            running: Arc::new(AtomicBool::new(false)),
            commands: None,
            handle: None,
        }
    }

    /// Store the worker reads its settings from
    pub fn params(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    /// Register an event observer
    pub fn subscribe(&self) -> Receiver<InspectionEvent> {
        self.events.subscribe()
    }

    /// `true` while the worker thread is alive and has not been told to stop
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished()) && self.running.load(Ordering::SeqCst)
    }

    /// Spawn the worker. It opens `source` itself and this call waits for the
    /// outcome, so an open failure is returned here and no thread is left
    /// behind.
    pub fn start<S>(
        &mut self,
        source: S,
        pipeline: DetectionPipeline,
        config: LoopConfig,
    ) -> Result<(), CaptureError>
    where
        S: FrameSource + 'static,
    {
        if self.handle.is_some() {
            return Err(CaptureError::AlreadyRunning);
        }

        let (open_tx, open_rx) = crossbeam_channel::bounded::<Result<(), CaptureError>>(1);
        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded::<Command>();
        self.running.store(true, Ordering::SeqCst);

        let worker = Worker {
            source,
            pipeline,
            params: Arc::clone(&self.params),
            events: Arc::clone(&self.events),
            running: Arc::clone(&self.running),
            commands: cmd_rx,
            config,
            inspection: InspectionStateMachine::new(),
            recent: RecentDetections::default(),
            frame_count: 0,
            apply_counter: 0,
            read_failures: 0,
        };

        let handle = thread::Builder::new()
            .name("capture-loop".to_string())
            .spawn(move || worker.run(open_tx))
            .inspect_err(|_| self.running.store(false, Ordering::SeqCst))?;

        match open_rx.recv() {
            Ok(Ok(())) => {
                self.commands = Some(cmd_tx);
                self.handle = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(CaptureError::WorkerGone)
            }
        }
    }

    /// Signal the worker and wait for it to release the source and exit
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.commands = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("capture worker panicked");
            }
        }
    }

    /// Start (or restart) an inspection session
    pub fn start_inspection(&self, expected: u32, timeout_secs: u64) -> Result<(), CaptureError> {
        if !EXPECTED_RANGE.contains(&expected) {
            return Err(InspectionError::ExpectedOutOfRange(expected).into());
        }
        if !TIMEOUT_RANGE_SECS.contains(&timeout_secs) {
            return Err(InspectionError::TimeoutOutOfRange(timeout_secs).into());
        }
        self.send(Command::StartInspection {
            expected,
            timeout_secs,
        })
    }

    /// Stop the running session without a verdict
    pub fn stop_inspection(&self) -> Result<(), CaptureError> {
        self.send(Command::StopInspection)
    }

    /// Process only every `skip`-th frame (clamped to 1..=30)
    pub fn set_frame_skip(&self, skip: u32) -> Result<(), CaptureError> {
        self.send(Command::SetFrameSkip(skip.clamp(1, MAX_FRAME_SKIP)))
    }

    /// Fast mode processes every third frame
    pub fn set_fast_mode(&self, fast: bool) -> Result<(), CaptureError> {
        self.set_frame_skip(if fast { FAST_MODE_SKIP } else { 1 })
    }

    /// Change the variant attached to code-detected events
    pub fn set_thumbnail_mode(&self, mode: ThumbnailMode) -> Result<(), CaptureError> {
        self.send(Command::SetThumbnailMode(mode))
    }

    fn send(&self, command: Command) -> Result<(), CaptureError> {
        let tx = self.commands.as_ref().ok_or(CaptureError::WorkerGone)?;
        tx.send(command).map_err(|_| CaptureError::WorkerGone)
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker<S> {
    source: S,
    pipeline: DetectionPipeline,
    params: Arc<ParameterStore>,
    events: Arc<EventBus>,
    running: Arc<AtomicBool>,
    commands: Receiver<Command>,
    config: LoopConfig,
    inspection: InspectionStateMachine,
    recent: RecentDetections,
    frame_count: u64,
    apply_counter: u32,
    read_failures: u32,
}

impl<S: FrameSource> Worker<S> {
    fn run(mut self, opened: Sender<Result<(), CaptureError>>) {
        let name = self.source.describe();
        if let Err(e) = self.source.open() {
            log::error!("{}: {}", name, e);
            let _ = opened.send(Err(e));
            return;
        }
        log::info!("{} opened", name);
        let initial = self.params.snapshot();
        self.apply_device(&initial);
        let _ = opened.send(Ok(()));

        self.pause(self.config.warmup);

        while self.running.load(Ordering::SeqCst) {
            if self.cycle() {
                self.pause(self.config.loop_sleep);
            }
        }

        self.source.release();
        log::info!("{} released", name);
    }

    /// One iteration. Returns `false` when the cadence sleep should be skipped.
    fn cycle(&mut self) -> bool {
        self.drain_commands();

        self.apply_counter = self.apply_counter.saturating_add(1);
        if self.apply_counter >= self.config.param_apply_interval {
            if let Some(params) = self.params.take_dirty() {
                self.apply_device(&params);
                self.apply_counter = 0;
            }
        }

        // Timeouts run on wall-clock time, even with no frame to process
        self.poll_inspection(Instant::now());

        let frame = match self.source.read() {
            Ok(frame) => {
                self.read_failures = 0;
                frame
            }
            Err(e) => {
                if self.read_failures == 0 {
                    log::warn!("frame read failed: {}", e);
                } else {
                    log::debug!("frame read failed again: {}", e);
                }
                self.read_failures = self.read_failures.saturating_add(1);
                return true;
            }
        };

        self.frame_count += 1;
        if self.frame_count % self.config.frame_skip.max(1) as u64 != 0 {
            return false;
        }

        let params = self.params.snapshot();
        let frame = if params.boost {
            software_boost(&frame, params.alpha, params.beta as f32)
        } else {
            frame
        };

        let pipeline = &self.pipeline;
        let codes = match panic::catch_unwind(AssertUnwindSafe(|| pipeline.detect(&frame))) {
            Ok(codes) => codes,
            Err(_) => {
                log::error!("detection panicked, frame skipped");
                Vec::new()
            }
        };
        for code in &codes {
            if self.inspection.is_running() {
                self.inspection.record(code.text());
            }
            if self.recent.check_and_insert(&code.key()) {
                log::info!(
                    "{} {:?} ({}, confidence {})",
                    code.symbology(),
                    code.text(),
                    code.stage(),
                    code.confidence()
                );
                let display = self.display_image(code, &params);
                self.events.publish(InspectionEvent::CodeDetected {
                    code: code.clone(),
                    display,
                    timestamp: Local::now(),
                });
            }
        }

        let now = Instant::now();
        let overlay = self.inspection.session().map(|s| InspectionOverlay {
            detected: s.detected_count(),
            expected: s.expected(),
            elapsed: s.elapsed(now),
            timeout: s.timeout(),
        });

        let annotated = annotate(&frame, &codes, overlay.as_ref());
        self.events.publish(InspectionEvent::FrameReady(annotated));
        true
    }

    fn poll_inspection(&mut self, now: Instant) {
        if let Some(InspectionOutcome::Completed {
            success,
            detected,
            expected,
        }) = self.inspection.poll(now)
        {
            self.events.publish(InspectionEvent::InspectionComplete {
                success,
                detected,
                expected,
            });
        }
    }

    fn drain_commands(&mut self) {
        loop {
            match self.commands.try_recv() {
                Ok(command) => self.handle(command),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::StartInspection {
                expected,
                timeout_secs,
            } => match self.inspection.start(expected, timeout_secs, Instant::now()) {
                Ok(()) => self.recent.clear(),
                Err(e) => log::warn!("inspection not started: {}", e),
            },
            Command::StopInspection => {
                if let Some(outcome) = self.inspection.stop() {
                    self.events.publish(InspectionEvent::InspectionStopped {
                        detected: outcome.detected(),
                    });
                }
            }
            Command::SetFrameSkip(skip) => {
                log::info!("frame skip set to {}", skip);
                self.config.frame_skip = skip;
            }
            Command::SetThumbnailMode(mode) => {
                self.config.thumbnail_mode = mode;
            }
        }
    }

    fn display_image(&self, code: &DetectedCode, params: &PipelineParams) -> Frame {
        let mode = self.config.thumbnail_mode;
        let display = mode.select(code);
        if params.boost && mode != ThumbnailMode::Binary {
            software_boost(&display, params.alpha, params.beta as f32)
        } else {
            display
        }
    }

    fn apply_device(&mut self, params: &PipelineParams) {
        if let Some(controls) = self.source.controls() {
            let applied = apply_device_params(controls, params);
            log::debug!("applied {} device control(s)", applied);
        }
    }

    /// Sleep in short slices so a stop request is seen promptly
    fn pause(&self, total: Duration) {
        let slice = Duration::from_millis(10);
        let deadline = Instant::now() + total;
        while self.running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(slice.min(deadline - now));
        }
    }
}
