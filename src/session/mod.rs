use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use crate::config::ProgressConfig;
use crate::editor::{LiveEditor, RenderHandle};
use crate::progress::{ProgressState, ProgressTracker, TrackerHandle, TrackerOutcome, TrackerPhase};
use crate::prompt::EDITOR_ROOT_ID;
use crate::wire::GeneratedDocument;

/// Wraps markup in the editor root container unless it already has one.
pub fn ensure_editor_root(markup: &str) -> String {
    let marker = format!("id=\"{EDITOR_ROOT_ID}\"");
    if markup.contains(&marker) || markup.contains(&format!("id='{EDITOR_ROOT_ID}'")) {
        markup.to_string()
    } else {
        format!("<div {marker}>{markup}</div>")
    }
}

/// One generated document shown in the editor, plus its section tracker.
///
/// Dropping the session stops the tracker and tears the document down.
pub struct PageSession {
    editor: Arc<dyn LiveEditor>,
    render: RenderHandle,
    document: GeneratedDocument,
    tracker: Option<TrackerHandle>,
    progress: watch::Receiver<ProgressState>,
    phase: watch::Receiver<TrackerPhase>,
}

impl PageSession {
    /// Renders `document` and starts tracking its sections.
    pub fn open(editor: Arc<dyn LiveEditor>, document: GeneratedDocument, progress: ProgressConfig) -> Self {
        let markup = ensure_editor_root(document.markup());
        let render = editor.render(&markup, document.styles());
        info!(markup = markup.len(), styles = document.styles().len(), "page rendered");
        let tracker = ProgressTracker::new(editor.clone(), progress).start(render);
        Self {
            editor,
            render,
            document,
            progress: tracker.subscribe_state(),
            phase: tracker.subscribe_phase(),
            tracker: Some(tracker),
        }
    }

    pub fn document(&self) -> &GeneratedDocument {
        &self.document
    }

    pub fn render_handle(&self) -> RenderHandle {
        self.render
    }

    pub fn is_live(&self) -> bool {
        self.editor.is_live(self.render)
    }

    /// Last state published by the tracker, also after it finished.
    pub fn progress(&self) -> ProgressState {
        self.progress.borrow().clone()
    }

    pub fn phase(&self) -> TrackerPhase {
        *self.phase.borrow()
    }

    /// Waits for the tracker; a second call reports `Cancelled`.
    pub async fn wait_for_sections(&mut self) -> TrackerOutcome {
        match self.tracker.take() {
            Some(t) => t.wait().await,
            None => TrackerOutcome::Cancelled,
        }
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        if let Some(t) = self.tracker.take() {
            t.cancel();
        }
        self.editor.teardown(self.render);
    }
}
