//! Prerender scheduling
//!
//! Decides which pages around the current position get rendered ahead of
//! need. A sweep is handed out one page at a time so the host can run it
//! from idle callbacks and stop between pages.

use log::debug;

/// Pages to prerender around the current position
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrerenderWindow {
    /// Pages after the current one
    pub forward: usize,
    /// Pages before the current one
    pub backward: usize,
}

impl Default for PrerenderWindow {
    fn default() -> Self {
        Self {
            forward: super::DEFAULT_PRERENDER_FORWARD,
            backward: super::DEFAULT_PRERENDER_BACKWARD,
        }
    }
}

impl PrerenderWindow {
    #[must_use]
    pub const fn new(forward: usize, backward: usize) -> Self {
        Self { forward, backward }
    }

    /// Pages to visit for a sweep centred on `current`, in visiting order.
    ///
    /// The current page comes first, then forward pages nearest-first, then
    /// backward pages nearest-first. Indices outside the document are
    /// dropped.
    #[must_use]
    pub fn pages(&self, current: usize, page_count: usize) -> Vec<usize> {
        if current >= page_count {
            return vec![];
        }

        let mut pages = Vec::with_capacity(1 + self.forward + self.backward);
        pages.push(current);
        pages.extend(
            (1..=self.forward)
                .map_while(|offset| current.checked_add(offset))
                .take_while(|&page| page < page_count),
        );
        pages.extend((1..=self.backward).map_while(|offset| current.checked_sub(offset)));
        pages
    }
}

/// Scheduler state for one cycle
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SweepState {
    Idle,
    Sweeping {
        /// Page the sweep is centred on
        center: usize,
        /// Pages to visit, in order
        pages: Vec<usize>,
        /// Index of the next page to hand out
        cursor: usize,
    },
}

/// Hands out prerender work one page at a time
#[derive(Clone, Debug)]
pub struct PrerenderScheduler {
    window: PrerenderWindow,
    state: SweepState,
    sweeps_started: u64,
    sweeps_abandoned: u64,
}

impl PrerenderScheduler {
    #[must_use]
    pub fn new(window: PrerenderWindow) -> Self {
        Self {
            window,
            state: SweepState::Idle,
            sweeps_started: 0,
            sweeps_abandoned: 0,
        }
    }

    #[must_use]
    pub fn window(&self) -> PrerenderWindow {
        self.window
    }

    #[must_use]
    pub fn state(&self) -> &SweepState {
        &self.state
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self.state, SweepState::Idle)
    }

    /// Start a sweep around `current`, replacing any sweep in flight.
    ///
    /// Returns true if an unfinished sweep was abandoned.
    pub fn schedule(&mut self, current: usize, page_count: usize) -> bool {
        let abandoned = self.cancel();

        let pages = self.window.pages(current, page_count);
        if pages.is_empty() {
            return abandoned;
        }

        debug!("Prerender sweep around page {current}: {pages:?}");
        self.sweeps_started += 1;
        self.state = SweepState::Sweeping {
            center: current,
            pages,
            cursor: 0,
        };
        abandoned
    }

    /// Next page of the running sweep. Goes idle once the list is exhausted.
    pub fn next_page(&mut self) -> Option<usize> {
        let SweepState::Sweeping {
            center,
            pages,
            cursor,
        } = &mut self.state
        else {
            return None;
        };

        match pages.get(*cursor).copied() {
            Some(page) => {
                *cursor += 1;
                if *cursor == pages.len() {
                    debug!("Prerender sweep around page {center} handed out");
                    self.state = SweepState::Idle;
                }
                Some(page)
            }
            None => {
                self.state = SweepState::Idle;
                None
            }
        }
    }

    /// Drop the running sweep. Returns true if one was in flight.
    pub fn cancel(&mut self) -> bool {
        match std::mem::replace(&mut self.state, SweepState::Idle) {
            SweepState::Idle => false,
            SweepState::Sweeping { center, pages, cursor } => {
                debug!(
                    "Abandoned prerender sweep around page {center} ({} of {} pages left)",
                    pages.len() - cursor,
                    pages.len()
                );
                self.sweeps_abandoned += 1;
                true
            }
        }
    }

    /// Pages left in the running sweep
    #[must_use]
    pub fn remaining(&self) -> usize {
        match &self.state {
            SweepState::Idle => 0,
            SweepState::Sweeping { pages, cursor, .. } => pages.len() - cursor,
        }
    }

    #[must_use]
    pub fn sweeps_started(&self) -> u64 {
        self.sweeps_started
    }

    #[must_use]
    pub fn sweeps_abandoned(&self) -> u64 {
        self.sweeps_abandoned
    }
}
