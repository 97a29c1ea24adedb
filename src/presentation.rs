//! Presentation navigation and talk timer
//!
//! The Content window always shows the current page. The Presenter window
//! may browse ahead ("preview") without moving the audience's view until the
//! preview is committed. Prerendering follows the preview position.

use std::time::{Duration, Instant};

use crate::render::SurfaceRole;

/// Current and previewed page of a running presentation
#[derive(Debug)]
pub struct Presentation {
    page_count: usize,
    current: usize,
    preview: usize,
    timer: TalkTimer,
}

impl Presentation {
    #[must_use]
    pub fn new(page_count: usize) -> Self {
        Self {
            page_count,
            current: 0,
            preview: 0,
            timer: TalkTimer::default(),
        }
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    #[must_use]
    pub fn current(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn preview(&self) -> usize {
        self.preview
    }

    /// Whether the presenter is browsing away from the current page
    #[must_use]
    pub fn is_previewing(&self) -> bool {
        self.preview != self.current
    }

    #[must_use]
    pub fn timer(&self) -> &TalkTimer {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut TalkTimer {
        &mut self.timer
    }

    fn clamp(&self, page: usize) -> usize {
        page.min(self.page_count.saturating_sub(1))
    }

    /// Move both windows to `page`. Starts the timer.
    ///
    /// Returns the page prerendering should centre on.
    pub fn go_to(&mut self, page: usize) -> usize {
        self.current = self.clamp(page);
        self.preview = self.current;
        self.timer.start();
        self.preview
    }

    pub fn next(&mut self) -> usize {
        self.go_to(self.current.saturating_add(1))
    }

    pub fn prev(&mut self) -> usize {
        self.go_to(self.current.saturating_sub(1))
    }

    pub fn first(&mut self) -> usize {
        self.go_to(0)
    }

    pub fn last(&mut self) -> usize {
        self.go_to(self.page_count.saturating_sub(1))
    }

    /// Browse the presenter view only
    pub fn preview_to(&mut self, page: usize) -> usize {
        self.preview = self.clamp(page);
        self.preview
    }

    /// Show the previewed page to the audience
    pub fn commit_preview(&mut self) -> usize {
        self.go_to(self.preview)
    }

    /// Return the presenter view to the current page
    pub fn cancel_preview(&mut self) -> usize {
        self.preview = self.current;
        self.preview
    }

    /// Page a role surface should display, `None` if it should be hidden
    #[must_use]
    pub fn page_for(&self, role: SurfaceRole) -> Option<usize> {
        if self.page_count == 0 {
            return None;
        }
        match role {
            SurfaceRole::Content => Some(self.current),
            SurfaceRole::PresenterCurrent => Some(self.preview),
            SurfaceRole::PresenterNext => {
                Some(self.preview + 1).filter(|&page| page < self.page_count)
            }
        }
    }

    /// "3/12" style position label (1-based)
    #[must_use]
    pub fn position_label(&self) -> String {
        format!("{}/{}", self.preview + 1, self.page_count)
    }
}

/// Elapsed talk time with pause support
#[derive(Debug, Default)]
pub struct TalkTimer {
    running_since: Option<Instant>,
    accumulated: Duration,
    started: bool,
}

impl TalkTimer {
    /// Start or resume counting. No-op while running.
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    fn start_at(&mut self, now: Instant) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
            self.started = true;
        }
    }

    pub fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    fn pause_at(&mut self, now: Instant) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += now.saturating_duration_since(since);
        }
    }

    /// Pause a running timer, resume a paused one
    pub fn toggle_pause(&mut self) {
        if self.running_since.is_some() {
            self.pause();
        } else {
            self.start();
        }
    }

    /// Zero the elapsed time, keeping the running state
    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    fn reset_at(&mut self, now: Instant) {
        self.accumulated = Duration::ZERO;
        if self.running_since.is_some() {
            self.running_since = Some(now);
        }
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.started && self.running_since.is_none()
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Instant::now())
    }

    fn elapsed_at(&self, now: Instant) -> Duration {
        let running = self
            .running_since
            .map_or(Duration::ZERO, |since| now.saturating_duration_since(since));
        self.accumulated + running
    }

    /// "MM:SS", with " (pause)" appended while paused
    #[must_use]
    pub fn elapsed_label(&self) -> String {
        self.label_at(Instant::now())
    }

    fn label_at(&self, now: Instant) -> String {
        let secs = self.elapsed_at(now).as_secs();
        let mut label = format!("{:02}:{:02}", secs / 60, secs % 60);
        if self.is_paused() {
            label.push_str(" (pause)");
        }
        label
    }
}

/// Wall clock as "HH:MM:SS"
#[must_use]
pub fn clock_label() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
