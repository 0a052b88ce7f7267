//! The hover pipeline: five long-lived worker threads connected by
//! latest-value channels.
//!
//! input monitor -> screen capturer -> OCR worker -> hit scanner -> lookup
//!
//! Each stage blocks on exactly one channel and produces for the next;
//! channels overwrite unread values, so bursts collapse to the newest
//! request. Shutdown is cooperative: a shared running flag plus closing
//! every channel.

pub mod slot;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::capture::{Frame, PixelRect, RegionSelection, ScreenSource};
use crate::config::ConfigHandle;
use crate::hit_scan::{Hit, hit_scan};
use crate::lookup::{LookupEngine, LookupEntry};
use crate::ocr::{OcrProvider, Paragraph};
use slot::LatestSlot;

/// What the input monitor saw on one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSnapshot {
    /// Cursor position in physical screen pixels.
    pub cursor: (i32, i32),
    /// Whether the configured hotkey is currently held.
    pub hotkey_down: bool,
}

/// OS input backend, injected into the pipeline. Implementations are
/// expected to pace their own polling (the reference cadence is ~10 ms).
/// Returning `None` ends the input monitor.
pub trait InputSource: Send {
    fn poll(&mut self) -> Option<InputSnapshot>;
}

/// Input to the hit scanner: either a fresh OCR result, or a request to
/// re-scan the cursor against the cached one.
#[derive(Debug, Clone)]
pub struct ScanUpdate {
    updated: bool,
    paragraphs: Option<Vec<Paragraph>>,
}

impl ScanUpdate {
    /// A fresh OCR result (`None` when the provider failed).
    pub fn fresh(paragraphs: Option<Vec<Paragraph>>) -> Self {
        Self {
            updated: true,
            paragraphs,
        }
    }

    /// Cursor moved; re-scan against the cached OCR result.
    pub fn rescan() -> Self {
        Self {
            updated: false,
            paragraphs: None,
        }
    }
}

/// State shared across stages.
struct Shared {
    running: AtomicBool,
    cursor: Mutex<(i32, i32)>,
    /// Geometry of the last captured region, for cursor normalization.
    geometry: Mutex<Option<PixelRect>>,
    region: Mutex<RegionSelection>,
}

impl Shared {
    fn running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything needed to assemble the pipeline.
pub struct Pipeline {
    pub config: ConfigHandle,
    pub input: Box<dyn InputSource>,
    pub screen: Box<dyn ScreenSource>,
    pub ocr: Box<dyn OcrProvider>,
    /// `None` when the dictionary failed to load; the pipeline still runs
    /// and serves empty result sets.
    pub lookup: Option<LookupEngine>,
}

impl Pipeline {
    /// Start all five worker threads. In auto mode the first screenshot
    /// trigger is enqueued immediately.
    pub fn spawn(self) -> std::io::Result<PipelineHandle> {
        let shared = Arc::new(Shared {
            running: AtomicBool::new(true),
            cursor: Mutex::new((0, 0)),
            geometry: Mutex::new(None),
            region: Mutex::new(self.config.snapshot().scan.initial_region()),
        });
        let screen_lock = Arc::new(Mutex::new(()));

        let shots: Arc<LatestSlot<()>> = Arc::new(LatestSlot::new());
        let frames: Arc<LatestSlot<Frame>> = Arc::new(LatestSlot::new());
        let scans: Arc<LatestSlot<ScanUpdate>> = Arc::new(LatestSlot::new());
        let hits: Arc<LatestSlot<Option<Hit>>> = Arc::new(LatestSlot::new());
        let results: Arc<LatestSlot<Vec<LookupEntry>>> = Arc::new(LatestSlot::new());

        if self.lookup.is_none() {
            error!("no dictionary available; lookups will return nothing");
        }
        if self.config.snapshot().scan.auto {
            shots.send(());
        }

        let mut threads = Vec::new();

        {
            let (shared, config) = (Arc::clone(&shared), self.config.clone());
            let (shots, scans) = (Arc::clone(&shots), Arc::clone(&scans));
            let mut source = self.input;
            threads.push(thread::Builder::new().name("input".into()).spawn(move || {
                run_input(&shared, &config, &mut *source, &shots, &scans);
                debug!("input monitor stopped");
            })?);
        }

        {
            let (shared, config) = (Arc::clone(&shared), self.config.clone());
            let (shots, frames, scans) =
                (Arc::clone(&shots), Arc::clone(&frames), Arc::clone(&scans));
            let lock = Arc::clone(&screen_lock);
            let mut screen = self.screen;
            threads.push(thread::Builder::new().name("capture".into()).spawn(move || {
                run_capture(&shared, &config, &mut *screen, &lock, &shots, &frames, &scans);
                debug!("capturer stopped");
            })?);
        }

        {
            let (shared, config) = (Arc::clone(&shared), self.config.clone());
            let (shots, frames, scans) =
                (Arc::clone(&shots), Arc::clone(&frames), Arc::clone(&scans));
            let ocr = self.ocr;
            threads.push(thread::Builder::new().name("ocr".into()).spawn(move || {
                run_ocr(&shared, &config, &*ocr, &shots, &frames, &scans);
                debug!("ocr worker stopped");
            })?);
        }

        {
            let shared = Arc::clone(&shared);
            let (scans, hits) = (Arc::clone(&scans), Arc::clone(&hits));
            threads.push(thread::Builder::new().name("hitscan".into()).spawn(move || {
                run_hit_scan(&shared, &scans, &hits);
                debug!("hit scanner stopped");
            })?);
        }

        {
            let shared = Arc::clone(&shared);
            let (hits, results) = (Arc::clone(&hits), Arc::clone(&results));
            let mut engine = self.lookup;
            threads.push(thread::Builder::new().name("lookup".into()).spawn(move || {
                run_lookup(&shared, engine.as_mut(), &hits, &results);
                debug!("lookup worker stopped");
            })?);
        }

        info!("pipeline started");
        Ok(PipelineHandle {
            shared,
            screen_lock,
            config: self.config,
            shots,
            frames,
            scans,
            hits,
            results,
            threads,
        })
    }
}

/// Control surface for a running pipeline.
pub struct PipelineHandle {
    shared: Arc<Shared>,
    screen_lock: Arc<Mutex<()>>,
    config: ConfigHandle,
    shots: Arc<LatestSlot<()>>,
    frames: Arc<LatestSlot<Frame>>,
    scans: Arc<LatestSlot<ScanUpdate>>,
    hits: Arc<LatestSlot<Option<Hit>>>,
    results: Arc<LatestSlot<Vec<LookupEntry>>>,
    threads: Vec<JoinHandle<()>>,
}

impl PipelineHandle {
    /// Request a capture/OCR cycle (manual trigger).
    pub fn trigger_scan(&self) {
        self.shots.send(());
    }

    /// The ranked-entry output slot. The popup consumes this passively;
    /// it never back-pressures the pipeline.
    pub fn results(&self) -> Arc<LatestSlot<Vec<LookupEntry>>> {
        Arc::clone(&self.results)
    }

    /// Switch capturing to a user-selected rectangle. Takes effect on the
    /// next trigger.
    pub fn set_scan_region(&self, rect: PixelRect) {
        *lock(&self.shared.region) = RegionSelection::Rect(rect);
        info!("scan area set to region {:?}", rect);
    }

    /// Switch capturing to a whole screen. Takes effect on the next
    /// trigger.
    pub fn set_scan_screen(&self, index: usize) {
        *lock(&self.shared.region) = RegionSelection::Screen(index);
        info!("scan area set to screen {}", index);
    }

    /// The lock the popup holds while visible so the capturer cannot grab
    /// a frame containing the popup itself.
    pub fn screen_lock(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.screen_lock)
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    /// Cooperative shutdown: clear the running flag, close every channel,
    /// join all workers.
    pub fn shutdown(self) {
        self.shared.running.store(false, Ordering::Relaxed);
        self.shots.close();
        self.frames.close();
        self.scans.close();
        self.hits.close();
        self.results.close();
        for handle in self.threads {
            if handle.join().is_err() {
                warn!("pipeline worker panicked during shutdown");
            }
        }
        info!("pipeline stopped");
    }
}

/// Input monitor: watches cursor and hotkey state, fires triggers.
fn run_input(
    shared: &Shared,
    config: &ConfigHandle,
    source: &mut dyn InputSource,
    shots: &LatestSlot<()>,
    scans: &LatestSlot<ScanUpdate>,
) {
    let mut last_cursor: Option<(i32, i32)> = None;
    let mut hotkey_was_down = false;

    while shared.running() {
        let Some(snapshot) = source.poll() else {
            break;
        };
        *lock(&shared.cursor) = snapshot.cursor;

        let auto = config.snapshot().scan.auto;
        let moved = last_cursor != Some(snapshot.cursor);

        if auto {
            // continuous mode: the capturer re-arms itself, cursor moves
            // only need a re-scan
            if moved {
                scans.send(ScanUpdate::rescan());
            }
        } else if snapshot.hotkey_down && !hotkey_was_down {
            debug!("hotkey pressed, triggering screenshot");
            shots.send(());
        } else if snapshot.hotkey_down && moved {
            scans.send(ScanUpdate::rescan());
        } else if hotkey_was_down && !snapshot.hotkey_down {
            debug!("hotkey released");
        }

        last_cursor = Some(snapshot.cursor);
        hotkey_was_down = snapshot.hotkey_down;
    }
}

/// Screen capturer: one frame per trigger, identical frames skipped.
fn run_capture(
    shared: &Shared,
    config: &ConfigHandle,
    screen: &mut dyn ScreenSource,
    screen_lock: &Mutex<()>,
    shots: &LatestSlot<()>,
    frames: &LatestSlot<Frame>,
    scans: &LatestSlot<ScanUpdate>,
) {
    let mut last_frame: Option<Frame> = None;
    let mut last_submit: Option<Instant> = None;

    while shots.recv().is_some() {
        if !shared.running() {
            break;
        }
        let cfg = config.snapshot();
        let auto = cfg.scan.auto;

        let region = *lock(&shared.region);
        let rect = match region.resolve(screen) {
            Ok(rect) => rect,
            Err(e) => {
                warn!("cannot resolve capture region: {e}");
                thread::sleep(Duration::from_millis(500));
                rearm(auto, shots, scans);
                continue;
            }
        };

        let start = Instant::now();
        let frame = {
            // the popup holds this lock while visible
            let _guard = lock(screen_lock);
            screen.capture(rect)
        };
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                error!("screen capture failed: {e}");
                thread::sleep(Duration::from_millis(500));
                rearm(auto, shots, scans);
                continue;
            }
        };
        debug!(
            "captured {}x{} in {:.3}s",
            frame.width,
            frame.height,
            start.elapsed().as_secs_f64()
        );
        *lock(&shared.geometry) = Some(rect);

        if last_frame.as_ref() == Some(&frame) {
            debug!("screen content unchanged, skipping ocr");
            if auto {
                thread::sleep(Duration::from_millis(100));
                shots.send(());
            } else {
                // still re-evaluate the cursor against the cached OCR
                scans.send(ScanUpdate::rescan());
            }
            continue;
        }

        if auto {
            let interval = Duration::from_secs_f64(cfg.scan.auto_interval_seconds);
            if let Some(previous) = last_submit {
                let elapsed = previous.elapsed();
                if elapsed < interval {
                    thread::sleep(interval - elapsed);
                }
            }
        }

        last_submit = Some(Instant::now());
        last_frame = Some(frame.clone());
        frames.send(frame);
    }
}

fn rearm(auto: bool, shots: &LatestSlot<()>, scans: &LatestSlot<ScanUpdate>) {
    if auto {
        shots.send(());
    } else {
        scans.send(ScanUpdate::rescan());
    }
}

/// OCR worker: runs the provider, pushes the fresh result to the hit
/// scanner, and in auto mode re-arms the capturer for the next cycle.
fn run_ocr(
    shared: &Shared,
    config: &ConfigHandle,
    provider: &dyn OcrProvider,
    shots: &LatestSlot<()>,
    frames: &LatestSlot<Frame>,
    scans: &LatestSlot<ScanUpdate>,
) {
    while let Some(frame) = frames.recv() {
        if !shared.running() {
            break;
        }
        let start = Instant::now();
        let paragraphs = provider.scan(&frame);
        debug!(
            "{} scan finished in {:.2}s ({})",
            provider.name(),
            start.elapsed().as_secs_f64(),
            match &paragraphs {
                Some(p) => format!("{} paragraphs", p.len()),
                None => "failed".to_string(),
            }
        );
        scans.send(ScanUpdate::fresh(paragraphs));

        if config.snapshot().scan.auto {
            shots.send(());
        }
    }
}

/// Hit scanner: keeps the last OCR result so cursor moves can be scanned
/// without re-running OCR.
fn run_hit_scan(shared: &Shared, scans: &LatestSlot<ScanUpdate>, hits: &LatestSlot<Option<Hit>>) {
    let mut cached: Option<Vec<Paragraph>> = None;

    while let Some(update) = scans.recv() {
        if !shared.running() {
            break;
        }
        if update.updated {
            cached = update.paragraphs;
        }

        let geometry = *lock(&shared.geometry);
        let hit = match (&cached, geometry) {
            (Some(paragraphs), Some(rect)) => {
                let cursor = *lock(&shared.cursor);
                hit_scan(paragraphs, cursor, &rect)
            }
            _ => None,
        };
        hits.send(hit);
    }
}

/// Lookup worker: short-circuits identical consecutive inputs, serves
/// empty results when no dictionary is loaded.
fn run_lookup(
    shared: &Shared,
    mut engine: Option<&mut LookupEngine>,
    hits: &LatestSlot<Option<Hit>>,
    results: &LatestSlot<Vec<LookupEntry>>,
) {
    let mut last_hit: Option<Option<Hit>> = None;

    while let Some(hit) = hits.recv() {
        if !shared.running() {
            break;
        }
        if last_hit.as_ref() == Some(&hit) {
            continue;
        }

        let entries = match (&mut engine, &hit) {
            (Some(engine), Some(hit)) => engine.lookup(&hit.lookup),
            _ => Vec::new(),
        };
        last_hit = Some(hit);
        results.send(entries);
    }
}
