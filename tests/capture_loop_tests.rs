mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use code_inspect::capture::{DeviceControl, DeviceControls, MemoryFrameSource};
use code_inspect::{
    CaptureError, CaptureLoop, DetectionPipeline, DeviceError, EventBus, Frame, FrameSource,
    InspectionError, InspectionEvent, LoopConfig, ParamUpdate, ParameterStore, PipelineParams,
    ThumbnailMode,
};
use crossbeam_channel::Receiver;

use common::{ScriptedDecoder, blank_frame};

fn quick_config() -> LoopConfig {
    LoopConfig {
        frame_skip: 1,
        loop_sleep: Duration::from_millis(5),
        param_apply_interval: 15,
        warmup: Duration::from_millis(200),
        thumbnail_mode: ThumbnailMode::Enhanced,
    }
}

fn capture_loop() -> CaptureLoop {
    let params = Arc::new(ParameterStore::new(PipelineParams::default()));
    CaptureLoop::with_events(params, Arc::new(EventBus::new(1024)))
}

fn pipeline(decoder: ScriptedDecoder) -> DetectionPipeline {
    DetectionPipeline::new(Box::new(decoder))
}

fn two_codes() -> ScriptedDecoder {
    ScriptedDecoder::new()
        .with_code("CODE128", "BOX-0001", (20, 20, 120, 60))
        .with_code("QRCODE", "LID-0002", (180, 100, 110, 110))
}

fn wait_for<F>(rx: &Receiver<InspectionEvent>, timeout: Duration, mut pred: F) -> Vec<InspectionEvent>
where
    F: FnMut(&InspectionEvent) -> bool,
{
    let deadline = Instant::now() + timeout;
    let mut seen = Vec::new();
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(left) {
            Ok(event) => {
                let done = pred(&event);
                seen.push(event);
                if done {
                    break;
                }
            }
            Err(_) => break,
        }
    }
    seen
}

#[derive(Clone, Default)]
struct Counters {
    reads: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
    writes: Arc<Mutex<Vec<(DeviceControl, f64)>>>,
}

struct RecordingControls {
    writes: Arc<Mutex<Vec<(DeviceControl, f64)>>>,
}

impl DeviceControls for RecordingControls {
    fn set(&mut self, control: DeviceControl, value: f64) -> Result<(), DeviceError> {
        if control == DeviceControl::Gamma {
            return Err(DeviceError::Unsupported("gamma"));
        }
        if let Ok(mut writes) = self.writes.lock() {
            writes.push((control, value));
        }
        Ok(())
    }

    fn get(&self, control: DeviceControl) -> Option<f64> {
        let writes = self.writes.lock().ok()?;
        writes.iter().rev().find(|(c, _)| *c == control).map(|(_, v)| *v)
    }
}

struct CountingSource {
    frame: Frame,
    counters: Counters,
    controls: RecordingControls,
}

impl CountingSource {
    fn new(frame: Frame, counters: Counters) -> Self {
        let controls = RecordingControls {
            writes: Arc::clone(&counters.writes),
        };
        Self {
            frame,
            counters,
            controls,
        }
    }
}

impl FrameSource for CountingSource {
    fn open(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn read(&mut self) -> Result<Frame, CaptureError> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.frame.clone())
    }

    fn release(&mut self) {
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn controls(&mut self) -> Option<&mut dyn DeviceControls> {
        Some(&mut self.controls)
    }
}

#[test]
fn inspection_succeeds_when_expected_codes_are_seen() {
    let mut cap = capture_loop();
    let rx = cap.subscribe();
    let source = MemoryFrameSource::new(vec![blank_frame()]).looping(true);
    cap.start(source, pipeline(two_codes()), quick_config()).unwrap();
    cap.start_inspection(2, 1).unwrap();

    let events = wait_for(&rx, Duration::from_secs(10), |e| {
        matches!(e, InspectionEvent::InspectionComplete { .. })
    });
    cap.stop();

    let detected: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            InspectionEvent::CodeDetected { code, .. } => Some(code.text()),
            _ => None,
        })
        .collect();
    assert_eq!(detected.len(), 2, "each code is announced once: {:?}", detected);
    assert!(detected.contains(&"BOX-0001"));
    assert!(detected.contains(&"LID-0002"));

    match events.last() {
        Some(InspectionEvent::InspectionComplete {
            success,
            detected,
            expected,
        }) => {
            assert!(*success);
            assert_eq!(*detected, 2);
            assert_eq!(*expected, 2);
        }
        other => panic!("no completion event, last was {:?}", other.map(|e| e.kind())),
    }
}

#[test]
fn inspection_fails_on_shortfall() {
    let mut cap = capture_loop();
    let rx = cap.subscribe();
    let decoder = ScriptedDecoder::new().with_code("CODE128", "ONLY-ONE", (20, 20, 120, 60));
    let source = MemoryFrameSource::new(vec![blank_frame()]).looping(true);
    cap.start(source, pipeline(decoder), quick_config()).unwrap();
    cap.start_inspection(3, 1).unwrap();

    let events = wait_for(&rx, Duration::from_secs(10), |e| {
        matches!(e, InspectionEvent::InspectionComplete { .. })
    });
    cap.stop();

    assert!(matches!(
        events.last(),
        Some(InspectionEvent::InspectionComplete {
            success: false,
            detected: 1,
            expected: 3
        })
    ));
}

#[test]
fn manual_stop_reports_partial_count() {
    let mut cap = capture_loop();
    let rx = cap.subscribe();
    let decoder = ScriptedDecoder::new().with_code("CODE39", "PALLET-9", (20, 20, 120, 60));
    let source = MemoryFrameSource::new(vec![blank_frame()]).looping(true);
    cap.start(source, pipeline(decoder), quick_config()).unwrap();
    cap.start_inspection(3, 60).unwrap();

    let seen = wait_for(&rx, Duration::from_secs(10), |e| {
        matches!(e, InspectionEvent::CodeDetected { .. })
    });
    assert!(matches!(seen.last(), Some(InspectionEvent::CodeDetected { .. })));

    cap.stop_inspection().unwrap();
    let events = wait_for(&rx, Duration::from_secs(5), |e| {
        matches!(e, InspectionEvent::InspectionStopped { .. })
    });
    cap.stop();

    assert!(matches!(
        events.last(),
        Some(InspectionEvent::InspectionStopped { detected: 1 })
    ));
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, InspectionEvent::InspectionComplete { .. }))
    );
}

#[test]
fn open_failure_is_reported_by_start() {
    let mut cap = capture_loop();
    let source = MemoryFrameSource::new(vec![blank_frame()]).failing_open();
    let err = cap
        .start(source, pipeline(ScriptedDecoder::new()), quick_config())
        .unwrap_err();
    assert!(matches!(err, CaptureError::OpenFailed(_)));
    assert!(!cap.is_running());
}

#[test]
fn second_start_is_rejected() {
    let mut cap = capture_loop();
    let first = MemoryFrameSource::new(vec![blank_frame()]).looping(true);
    cap.start(first, pipeline(ScriptedDecoder::new()), quick_config()).unwrap();
    assert!(cap.is_running());

    let second = MemoryFrameSource::new(vec![blank_frame()]).looping(true);
    let err = cap
        .start(second, pipeline(ScriptedDecoder::new()), quick_config())
        .unwrap_err();
    assert!(matches!(err, CaptureError::AlreadyRunning));
    cap.stop();
    assert!(!cap.is_running());
}

#[test]
fn inspection_arguments_are_validated() {
    let mut cap = capture_loop();
    let source = MemoryFrameSource::new(vec![blank_frame()]).looping(true);
    cap.start(source, pipeline(ScriptedDecoder::new()), quick_config()).unwrap();

    assert!(matches!(
        cap.start_inspection(0, 10),
        Err(CaptureError::Inspection(InspectionError::ExpectedOutOfRange(0)))
    ));
    assert!(matches!(
        cap.start_inspection(2, 301),
        Err(CaptureError::Inspection(InspectionError::TimeoutOutOfRange(301)))
    ));
    cap.stop();
}

#[test]
fn commands_without_worker_fail() {
    let cap = capture_loop();
    assert!(matches!(cap.stop_inspection(), Err(CaptureError::WorkerGone)));
}

#[test]
fn parameter_changes_are_debounced_and_released_once() {
    let counters = Counters::default();
    let params = Arc::new(ParameterStore::new(PipelineParams::default()));
    let mut cap = CaptureLoop::with_events(Arc::clone(&params), Arc::new(EventBus::new(1024)));
    let source = CountingSource::new(blank_frame(), counters.clone());
    let config = LoopConfig {
        warmup: Duration::from_millis(20),
        ..quick_config()
    };
    cap.start(source, pipeline(ScriptedDecoder::new()), config).unwrap();

    params.set(ParamUpdate::Gain(42)).unwrap();
    let gain_writes = |value: f64| {
        counters
            .writes
            .lock()
            .map(|w| w.iter().filter(|(c, v)| *c == DeviceControl::Gain && *v == value).count())
            .unwrap_or(0)
    };

    let deadline = Instant::now() + Duration::from_secs(10);
    while gain_writes(42.0) == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    assert!(counters.reads.load(Ordering::SeqCst) >= 15);
    thread::sleep(Duration::from_millis(200));
    cap.stop();

    assert_eq!(gain_writes(0.0), 1, "initial settings applied once");
    assert_eq!(gain_writes(42.0), 1, "pending change applied once");
    assert!(!params.is_dirty());
    assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
}

#[test]
fn fast_mode_processes_every_third_frame() {
    let counters = Counters::default();
    let mut cap = capture_loop();
    let rx = cap.subscribe();
    let source = CountingSource::new(blank_frame(), counters.clone());
    cap.start(source, pipeline(ScriptedDecoder::new()), quick_config()).unwrap();
    cap.set_fast_mode(true).unwrap();

    thread::sleep(Duration::from_millis(600));
    cap.stop();

    let reads = counters.reads.load(Ordering::SeqCst);
    let frames = rx
        .try_iter()
        .filter(|e| matches!(e, InspectionEvent::FrameReady(_)))
        .count();
    assert!(reads >= 3);
    assert_eq!(frames, reads / 3);
}

/// Fails every other read, or every read when `every` is 1
struct FlakySource {
    frame: Frame,
    every: usize,
    reads: usize,
}

impl FlakySource {
    fn new(frame: Frame, every: usize) -> Self {
        Self {
            frame,
            every,
            reads: 0,
        }
    }
}

impl FrameSource for FlakySource {
    fn open(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn read(&mut self) -> Result<Frame, CaptureError> {
        self.reads += 1;
        if self.reads % self.every == 0 {
            return Err(CaptureError::ReadFailed("usb hiccup".to_string()));
        }
        Ok(self.frame.clone())
    }

    fn release(&mut self) {}
}

struct CrashingSource;

impl FrameSource for CrashingSource {
    fn open(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn read(&mut self) -> Result<Frame, CaptureError> {
        panic!("driver fault")
    }

    fn release(&mut self) {}
}

#[test]
fn restarting_inspection_announces_codes_again() {
    let mut cap = capture_loop();
    let rx = cap.subscribe();
    let decoder = ScriptedDecoder::new().with_code("CODE128", "REPEAT-1", (20, 20, 120, 60));
    let source = MemoryFrameSource::new(vec![blank_frame()]).looping(true);
    cap.start(source, pipeline(decoder), quick_config()).unwrap();
    cap.start_inspection(1, 60).unwrap();

    let is_code = |e: &InspectionEvent| matches!(e, InspectionEvent::CodeDetected { .. });
    let first = wait_for(&rx, Duration::from_secs(10), is_code);
    assert!(first.last().is_some_and(is_code));

    // Same code in view: the recency window keeps it quiet until a new session
    let quiet = wait_for(&rx, Duration::from_millis(300), is_code);
    assert!(!quiet.iter().any(is_code));

    cap.start_inspection(1, 60).unwrap();
    let second = wait_for(&rx, Duration::from_secs(10), is_code);
    cap.stop();
    assert!(second.last().is_some_and(is_code));
}

#[test]
fn failed_reads_are_skipped_and_retried() {
    let mut cap = capture_loop();
    let rx = cap.subscribe();
    let decoder = ScriptedDecoder::new().with_code("CODE128", "FLAKY-1", (20, 20, 120, 60));
    cap.start(FlakySource::new(blank_frame(), 2), pipeline(decoder), quick_config())
        .unwrap();
    cap.start_inspection(1, 1).unwrap();

    let events = wait_for(&rx, Duration::from_secs(10), |e| {
        matches!(e, InspectionEvent::InspectionComplete { .. })
    });
    assert!(cap.is_running());
    cap.stop();

    assert!(events.iter().any(|e| matches!(e, InspectionEvent::FrameReady(_))));
    assert!(matches!(
        events.last(),
        Some(InspectionEvent::InspectionComplete {
            success: true,
            detected: 1,
            expected: 1
        })
    ));
}

#[test]
fn session_times_out_without_any_frame() {
    let mut cap = capture_loop();
    let rx = cap.subscribe();
    cap.start(FlakySource::new(blank_frame(), 1), pipeline(ScriptedDecoder::new()), quick_config())
        .unwrap();
    cap.start_inspection(2, 1).unwrap();

    let events = wait_for(&rx, Duration::from_secs(10), |e| {
        matches!(e, InspectionEvent::InspectionComplete { .. })
    });
    cap.stop();

    assert!(!events.iter().any(|e| matches!(e, InspectionEvent::FrameReady(_))));
    assert!(matches!(
        events.last(),
        Some(InspectionEvent::InspectionComplete {
            success: false,
            detected: 0,
            expected: 2
        })
    ));
}

#[test]
fn dead_worker_is_not_reported_running() {
    let mut cap = capture_loop();
    let config = LoopConfig {
        warmup: Duration::ZERO,
        ..quick_config()
    };
    cap.start(CrashingSource, pipeline(ScriptedDecoder::new()), config).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while cap.is_running() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert!(!cap.is_running());
    cap.stop();
}
