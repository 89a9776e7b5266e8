//! Polling driver: keeps the SVG schematic in step with the clock.
//!
//! Lifecycle: `Booting → AwaitingSvg → Polling`. Starting the driver moves
//! it to `AwaitingSvg` and kicks off two things at once:
//! - the artwork load, retried every interval until it succeeds
//! - the tick timer, whose first tick fires immediately
//!
//! Each tick fetches `GET {clock}/getsegmentcolors`, parses up to 28 colors
//! and applies them to the artwork in one locked pass. Ticks run as
//! independent tasks: a slow response never holds up the timer, and
//! overlapping responses are applied in arrival order (last writer wins).
//! Failed ticks are logged and otherwise dropped; the next tick retries.
//!
//! ## Rust concepts
//! - `OnceLock` for a value that is written exactly once
//! - `tokio::time::interval` (first tick completes immediately, missed ticks delayed)
//! - `self: Arc<Self>` methods that spawn tasks holding a clone of the driver
//! - `Arc<Mutex<T>>` status shared with the HTTP handlers

use crate::binder::apply_style;
use crate::color::DisplayStyle;
use crate::svg::{SvgDocument, SvgHandle};
use crate::{SegmentAddress, SegmentColor, SimError, VECTOR_LEN};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};

/// Default polling cadence.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

// ── Configuration ────────────────────────────────────────────────────

/// Where the SVG artwork comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SvgSource {
    /// Local file.
    File(PathBuf),
    /// Fetched over HTTP (the clock serves its own copy at `/simulation.svg`).
    Url(String),
}

#[derive(Clone, Debug)]
pub struct DriverConfig {
    /// Base URL of the clock, e.g. `http://rgb-clock.local`.
    pub clock_url: String,
    pub svg: SvgSource,
    pub interval: Duration,
    /// Write the styled SVG here after every pass.
    pub output: Option<PathBuf>,
}

impl DriverConfig {
    /// Config that also loads the artwork from the clock itself.
    pub fn for_clock(clock_url: impl Into<String>) -> Self {
        let clock_url = clock_url.into();
        let svg = SvgSource::Url(endpoint(&clock_url, "simulation.svg"));
        Self {
            clock_url,
            svg,
            interval: DEFAULT_INTERVAL,
            output: None,
        }
    }

    pub fn segment_colors_url(&self) -> String {
        endpoint(&self.clock_url, "getsegmentcolors")
    }
}

fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

// ── Status ───────────────────────────────────────────────────────────

/// Where the driver is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    Booting,
    AwaitingSvg,
    Polling,
}

/// Outcome of one rendering pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct PassReport {
    /// Segment updates attempted (`min(28, lines received)`)
    pub updates: usize,
    /// SVG elements whose style was written
    pub styled_elements: usize,
    /// Lines that were not a valid color
    pub skipped_colors: usize,
    /// Segments with no element in the artwork
    pub missing_elements: usize,
}

/// Driver status, readable by the HTTP server.
#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct DriverStatus {
    /// Current lifecycle state
    pub state: DriverState,
    /// Whether the SVG artwork has been captured
    pub svg_loaded: bool,
    /// Ticks scheduled so far
    pub ticks_started: u64,
    /// Ticks whose vector was applied
    pub ticks_applied: u64,
    /// Ticks dropped (network error or unusable body)
    pub ticks_failed: u64,
    /// Most recent tick or load error
    pub last_error: Option<String>,
    /// Report of the most recent applied pass
    pub last_pass: Option<PassReport>,
    /// Viewer version
    pub version: String,
}

impl DriverStatus {
    pub fn new() -> Self {
        Self {
            state: DriverState::Booting,
            svg_loaded: false,
            ticks_started: 0,
            ticks_applied: 0,
            ticks_failed: 0,
            last_error: None,
            last_pass: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Booting → AwaitingSvg.
    pub fn document_ready(&mut self) {
        if self.state == DriverState::Booting {
            self.state = DriverState::AwaitingSvg;
        }
    }

    /// AwaitingSvg → Polling once the artwork is in and a fetch is scheduled.
    /// Polling is terminal.
    pub fn advance(&mut self) {
        if self.state == DriverState::AwaitingSvg && self.svg_loaded && self.ticks_started > 0 {
            self.state = DriverState::Polling;
        }
    }
}

impl Default for DriverStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Last applied color of one segment.
#[derive(Clone, Debug, PartialEq, Serialize, utoipa::ToSchema)]
pub struct SegmentView {
    /// Digit position, 0-based
    pub digit: u8,
    /// Segment letter (a-g)
    pub segment: String,
    /// Raw color as reported by the clock
    #[schema(example = "ff0000")]
    pub color: String,
    /// CSS fill written to the element
    #[schema(example = "rgb(255,0,0)")]
    pub fill: String,
    /// Opacity written to the element
    #[schema(example = 0.5)]
    pub opacity: f64,
}

impl SegmentView {
    fn new(address: SegmentAddress, color: SegmentColor, style: &DisplayStyle) -> Self {
        Self {
            digit: address.digit(),
            segment: address.letter().to_string(),
            color: color.to_string(),
            fill: style.fill(),
            opacity: style.opacity,
        }
    }
}

// ── Rendering pass ───────────────────────────────────────────────────

/// Split a `/getsegmentcolors` body into at most 28 per-segment results.
///
/// Lines are `\n`-separated; one trailing newline is tolerated. Short
/// bodies yield fewer entries (the remaining segments keep their colors);
/// extra lines are ignored. A body with no content at all is rejected.
pub fn parse_segment_vector(body: &str) -> Result<Vec<Result<SegmentColor, SimError>>, SimError> {
    let mut lines: Vec<&str> = body.split('\n').collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    if lines.iter().all(|line| line.trim().is_empty()) {
        return Err(SimError::MalformedVector("response body is empty".into()));
    }

    Ok(lines
        .into_iter()
        .take(VECTOR_LEN)
        .map(str::parse::<SegmentColor>)
        .collect())
}

/// Apply parsed entries to the artwork, in (digit, segment) order.
///
/// The document stays locked for the whole pass, so anyone serializing it
/// sees either the previous pass or this one, never a mix. Without a
/// handle every update is a no-op.
pub fn render_pass(
    handle: Option<&SvgHandle>,
    entries: &[Result<SegmentColor, SimError>],
) -> PassReport {
    let mut document = handle.map(SvgHandle::lock);
    let mut report = PassReport::default();

    for (index, entry) in entries.iter().take(VECTOR_LEN).enumerate() {
        let Some(address) = SegmentAddress::from_index(index) else {
            break;
        };
        report.updates += 1;

        let color = match entry {
            Ok(color) => *color,
            Err(e) => {
                tracing::debug!("Skipping segment {}: {}", address, e);
                report.skipped_colors += 1;
                continue;
            }
        };

        let style = DisplayStyle::from_segment_color(color);
        match apply_style(document.as_deref_mut(), address, &style) {
            Ok(styled) => report.styled_elements += styled,
            Err(SimError::MissingElement(_)) => {
                tracing::trace!("No element for segment {}", address);
                report.missing_elements += 1;
            }
            Err(e) => {
                tracing::warn!("Failed to style segment {}: {}", address, e);
            }
        }
    }

    report
}

// ── Driver ───────────────────────────────────────────────────────────

/// Owns the HTTP client, the write-once SVG handle, and the status shared
/// with the server.
pub struct PollingDriver {
    config: DriverConfig,
    client: reqwest::Client,
    svg: OnceLock<SvgHandle>,
    status: Mutex<DriverStatus>,
    segments: Mutex<Vec<Option<SegmentView>>>,
    /// Serializes output file writes.
    output_lock: tokio::sync::Mutex<()>,
}

impl PollingDriver {
    pub fn new(config: DriverConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: DriverConfig, client: reqwest::Client) -> Self {
        Self {
            config,
            client,
            svg: OnceLock::new(),
            status: Mutex::new(DriverStatus::new()),
            segments: Mutex::new(vec![None; VECTOR_LEN]),
            output_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// The captured artwork, once loaded.
    pub fn svg(&self) -> Option<&SvgHandle> {
        self.svg.get()
    }

    pub fn status(&self) -> DriverStatus {
        self.lock_status().clone()
    }

    /// Segments in (digit, segment) order that have received a color.
    pub fn segments(&self) -> Vec<SegmentView> {
        lock(&self.segments).iter().flatten().cloned().collect()
    }

    /// Run forever: capture the artwork in the background and tick at the
    /// configured interval, starting immediately.
    pub async fn run(self: Arc<Self>) {
        self.lock_status().document_ready();
        tracing::info!(
            "Polling {} every {}s",
            self.config.segment_colors_url(),
            self.config.interval.as_secs_f64()
        );

        let loader = self.clone();
        tokio::spawn(async move { loader.capture_svg_with_retry().await });

        let mut ticker = ticker(self.config.interval);
        loop {
            ticker.tick().await;

            {
                let mut status = self.lock_status();
                status.ticks_started += 1;
                status.advance();
            }

            let driver = self.clone();
            tokio::spawn(async move { driver.run_tick().await });
        }
    }

    async fn capture_svg_with_retry(&self) {
        loop {
            match self.capture_svg().await {
                Ok(()) => return,
                Err(e) => {
                    tracing::warn!("Failed to load SVG artwork: {}", e);
                    self.lock_status().last_error = Some(e.to_string());
                    tokio::time::sleep(self.config.interval).await;
                }
            }
        }
    }

    /// Load and parse the artwork, then store it. The handle is write-once:
    /// a second capture is ignored.
    pub async fn capture_svg(&self) -> Result<(), SimError> {
        let source = match &self.config.svg {
            SvgSource::File(path) => tokio::fs::read_to_string(path).await?,
            SvgSource::Url(url) => self.get_text(url).await?,
        };
        let document = SvgDocument::parse(&source)?;
        let elements = document.element_count();

        if self.svg.set(SvgHandle::new(document)).is_err() {
            tracing::warn!("SVG artwork already captured, ignoring reload");
            return Ok(());
        }
        tracing::info!("SVG artwork loaded ({} elements)", elements);

        let mut status = self.lock_status();
        status.svg_loaded = true;
        status.last_error = None;
        status.advance();
        Ok(())
    }

    async fn run_tick(&self) {
        match self.tick().await {
            Ok(report) => {
                tracing::debug!(
                    "Applied {} segment updates ({} elements, {} skipped, {} missing)",
                    report.updates,
                    report.styled_elements,
                    report.skipped_colors,
                    report.missing_elements
                );
                let mut status = self.lock_status();
                status.ticks_applied += 1;
                status.last_pass = Some(report);
                status.last_error = None;
            }
            Err(e) => {
                tracing::warn!("Segment fetch dropped: {}", e);
                let mut status = self.lock_status();
                status.ticks_failed += 1;
                status.last_error = Some(e.to_string());
            }
        }
    }

    /// One fetch-and-render cycle.
    pub async fn tick(&self) -> Result<PassReport, SimError> {
        let body = self.get_text(&self.config.segment_colors_url()).await?;
        let entries = parse_segment_vector(&body)?;
        let report = render_pass(self.svg(), &entries);
        self.record_segments(&entries);

        if let Some(path) = &self.config.output {
            if let Err(e) = self.write_output(path).await {
                tracing::warn!("Failed to write {}: {}", path.display(), e);
            }
        }

        Ok(report)
    }

    fn record_segments(&self, entries: &[Result<SegmentColor, SimError>]) {
        let mut segments = lock(&self.segments);
        for (index, entry) in entries.iter().enumerate() {
            if let (Some(address), Ok(color)) = (SegmentAddress::from_index(index), entry) {
                let style = DisplayStyle::from_segment_color(*color);
                segments[index] = Some(SegmentView::new(address, *color, &style));
            }
        }
    }

    /// Replace `path` with the current document.
    ///
    /// The snapshot is taken while holding `output_lock`, so the write that
    /// finishes last always carries the newest pass. Readers of `path` see
    /// either the old file or the new one, never a partial write.
    async fn write_output(&self, path: &Path) -> Result<(), SimError> {
        let Some(handle) = self.svg() else {
            return Ok(());
        };

        let _guard = self.output_lock.lock().await;
        let rendered = handle.lock().to_svg_string()?;

        let mut staging = path.as_os_str().to_owned();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);
        tokio::fs::write(&staging, rendered).await?;
        tokio::fs::rename(&staging, path).await?;
        Ok(())
    }

    async fn get_text(&self, url: &str) -> Result<String, SimError> {
        let text = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(text)
    }

    fn lock_status(&self) -> MutexGuard<'_, DriverStatus> {
        lock(&self.status)
    }
}

/// Tick timer. Missed ticks are delayed rather than fired in a burst.
fn ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Tests ────────────────────────────────────────────────────────────
