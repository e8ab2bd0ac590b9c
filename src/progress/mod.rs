//! Watches a freshly rendered page until its expected sections show up.
//!
//! The backend gives no signal about which sections it produced, so the
//! tracker polls the live tree with a fixed list of matchers. It is read-only
//! on the tree and owns its state exclusively; observers get `watch`
//! receivers.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::config::ProgressConfig;
use crate::editor::{ElementLike, LiveEditor, RenderHandle};

/// One way of recognizing a section. `name` is the lowercased section name.
pub struct SectionMatcher {
    pub label: &'static str,
    pub matches: fn(el: &dyn ElementLike, name: &str) -> bool,
}

fn is_heading(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Tried in order; the first matcher that finds an element wins.
pub const SECTION_MATCHERS: &[SectionMatcher] = &[
    SectionMatcher { label: "id", matches: |el, name| el.id() == Some(name) },
    SectionMatcher { label: "class", matches: |el, name| el.has_class(name) },
    SectionMatcher { label: "data-section", matches: |el, name| el.attr("data-section") == Some(name) },
    SectionMatcher { label: "section-class", matches: |el, name| el.has_class(&format!("{name}-section")) },
    SectionMatcher {
        label: "heading",
        matches: |el, name| is_heading(el.tag()) && el.text_content().to_lowercase().contains(name),
    },
];

/// Label of the first matcher that finds `section` in the live tree.
pub fn find_section(editor: &dyn LiveEditor, section: &str) -> Option<&'static str> {
    let name = section.to_lowercase();
    SECTION_MATCHERS
        .iter()
        .find(|m| editor.query(&|el| (m.matches)(el, &name)).is_some())
        .map(|m| m.label)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSpec {
    pub name: String,
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressState {
    pub sections: Vec<SectionSpec>,
    pub all_complete: bool,
    pub polling_active: bool,
}

impl ProgressState {
    fn new(names: &[String]) -> Self {
        Self {
            sections: names.iter().map(|n| SectionSpec { name: n.clone(), matched: false }).collect(),
            all_complete: false,
            polling_active: false,
        }
    }

    pub fn matched(&self) -> usize {
        self.sections.iter().filter(|s| s.matched).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerPhase {
    Idle,
    Polling,
    Complete,
    TimedOut,
    Cancelled,
}

impl TrackerPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::TimedOut | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerOutcome {
    Complete,
    TimedOut,
    Cancelled,
}

impl From<TrackerOutcome> for TrackerPhase {
    fn from(o: TrackerOutcome) -> Self {
        match o {
            TrackerOutcome::Complete => Self::Complete,
            TrackerOutcome::TimedOut => Self::TimedOut,
            TrackerOutcome::Cancelled => Self::Cancelled,
        }
    }
}

/// Polling interval once `elapsed` has passed since the tracker started.
pub fn cadence(cfg: &ProgressConfig, elapsed: Duration) -> Duration {
    if elapsed < cfg.warmup() {
        cfg.fast_interval()
    } else {
        cfg.steady_interval()
    }
}

pub struct ProgressTracker {
    editor: Arc<dyn LiveEditor>,
    cfg: ProgressConfig,
}

impl ProgressTracker {
    pub fn new(editor: Arc<dyn LiveEditor>, cfg: ProgressConfig) -> Self {
        Self { editor, cfg }
    }

    /// Spawns the polling task for the document behind `render`.
    pub fn start(self, render: RenderHandle) -> TrackerHandle {
        let (state_tx, state_rx) = watch::channel(ProgressState::new(&self.cfg.sections));
        let (phase_tx, phase_rx) = watch::channel(TrackerPhase::Idle);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let outcome = self.run(render, &state_tx, &phase_tx, cancel_rx).await;
            state_tx.send_modify(|s| s.polling_active = false);
            phase_tx.send_replace(outcome.into());
            info!(?outcome, "section tracking finished");
            outcome
        });

        TrackerHandle { state: state_rx, phase: phase_rx, cancel: cancel_tx, task: Some(task) }
    }

    async fn run(
        &self,
        render: RenderHandle,
        state: &watch::Sender<ProgressState>,
        phase: &watch::Sender<TrackerPhase>,
        mut cancel: watch::Receiver<bool>,
    ) -> TrackerOutcome {
        let started = Instant::now();
        let deadline = started + self.cfg.hard_timeout();
        let mut next = started;

        state.send_modify(|s| s.polling_active = true);
        phase.send_replace(TrackerPhase::Polling);
        info!(sections = self.cfg.sections.len(), "section tracking started");

        loop {
            next += cadence(&self.cfg, next - started);
            tokio::select! {
                _ = sleep_until(next.min(deadline)) => {}
                _ = cancel.changed() => return TrackerOutcome::Cancelled,
            }

            if !self.editor.is_live(render) {
                debug!("document no longer live");
                return TrackerOutcome::Cancelled;
            }

            if self.poll(state) {
                state.send_modify(|s| {
                    s.all_complete = true;
                    s.polling_active = false;
                });
                phase.send_replace(TrackerPhase::Complete);
                info!(elapsed_ms = started.elapsed().as_millis() as u64, "all sections present");
                // Grace only delays dismissal; a cancel here cuts it short.
                tokio::select! {
                    _ = tokio::time::sleep(self.cfg.grace()) => {}
                    _ = cancel.changed() => {}
                }
                return TrackerOutcome::Complete;
            }

            if Instant::now() >= deadline {
                let s = state.borrow();
                warn!(matched = s.matched(), total = s.sections.len(), "section tracking timed out");
                return TrackerOutcome::TimedOut;
            }
        }
    }

    /// One pass over the unmatched sections. True once every section matched.
    fn poll(&self, state: &watch::Sender<ProgressState>) -> bool {
        let pending: Vec<(usize, String)> = state
            .borrow()
            .sections
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.matched)
            .map(|(i, s)| (i, s.name.clone()))
            .collect();

        let hits: Vec<usize> = pending
            .into_iter()
            .filter_map(|(i, name)| {
                let label = find_section(self.editor.as_ref(), &name)?;
                debug!(section = %name, matcher = label, "section matched");
                Some(i)
            })
            .collect();

        if !hits.is_empty() {
            state.send_modify(|s| {
                for i in hits {
                    s.sections[i].matched = true;
                }
            });
        }
        state.borrow().sections.iter().all(|s| s.matched)
    }
}

/// Owns the polling task; dropping it aborts the task.
pub struct TrackerHandle {
    state: watch::Receiver<ProgressState>,
    phase: watch::Receiver<TrackerPhase>,
    cancel: watch::Sender<bool>,
    task: Option<JoinHandle<TrackerOutcome>>,
}

impl TrackerHandle {
    pub fn state(&self) -> ProgressState {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> TrackerPhase {
        *self.phase.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ProgressState> {
        self.state.clone()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<TrackerPhase> {
        self.phase.clone()
    }

    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Waits for the task to reach a terminal phase.
    pub async fn wait(mut self) -> TrackerOutcome {
        match self.task.take() {
            Some(task) => task.await.unwrap_or(TrackerOutcome::Cancelled),
            None => TrackerOutcome::Cancelled,
        }
    }
}

impl Drop for TrackerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
