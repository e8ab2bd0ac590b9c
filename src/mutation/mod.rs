//! Regenerates one component of the live page in place.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::editor::{LiveEditor, NodeRef, Subscription};
use crate::errors::{Result, WebmindError};
use crate::generate::GenerationClient;

pub struct SectionEditor {
    editor: Arc<dyn LiveEditor>,
    client: Arc<GenerationClient>,
    busy: watch::Sender<bool>,
}

/// Clears the busy flag when dropped, whatever path the edit took.
struct BusyGuard<'a> {
    busy: &'a watch::Sender<bool>,
}

impl<'a> BusyGuard<'a> {
    fn acquire(busy: &'a watch::Sender<bool>) -> Option<Self> {
        let mut acquired = false;
        busy.send_if_modified(|b| {
            if *b {
                false
            } else {
                *b = true;
                acquired = true;
                true
            }
        });
        acquired.then_some(Self { busy })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy.send_replace(false);
    }
}

impl SectionEditor {
    pub fn new(editor: Arc<dyn LiveEditor>, client: Arc<GenerationClient>) -> Self {
        let (busy, _) = watch::channel(false);
        Self { editor, client, busy }
    }

    pub fn is_busy(&self) -> bool {
        *self.busy.borrow()
    }

    /// Follows the busy flag, e.g. to disable an "apply" button.
    pub fn subscribe_busy(&self) -> watch::Receiver<bool> {
        self.busy.subscribe()
    }

    /// Rewrites `target` from `instructions` and returns the new content.
    ///
    /// The node is re-checked after the backend answers; if it was removed in
    /// the meantime the answer is dropped and `TargetLost` returned.
    pub async fn regenerate(
        &self,
        target: Option<NodeRef>,
        instructions: &str,
        category: Option<&str>,
    ) -> Result<String> {
        let target = target.ok_or_else(|| WebmindError::validation("select a component first"))?;
        if instructions.trim().is_empty() {
            return Err(WebmindError::validation("instructions are required"));
        }
        let _guard = BusyGuard::acquire(&self.busy)
            .ok_or_else(|| WebmindError::validation("an edit is already in progress"))?;

        let existing = self
            .editor
            .serialize(target)
            .ok_or_else(|| WebmindError::TargetLost(format!("{target} was removed before the edit")))?;

        let updated = self.client.edit_section(&existing, instructions, category).await?;

        if !self.editor.is_attached(target) {
            warn!(%target, bytes = updated.len(), "component removed during edit, result discarded");
            return Err(WebmindError::TargetLost(format!("{target} was removed during the edit")));
        }
        self.editor.replace_content(target, &updated)?;
        info!(%target, bytes = updated.len(), "component updated");
        Ok(updated)
    }

    pub async fn regenerate_selected(&self, instructions: &str, category: Option<&str>) -> Result<String> {
        self.regenerate(self.editor.selected(), instructions, category).await
    }
}

/// Keeps a "Selected: <component>" label in sync with the editor selection.
pub struct SelectionLabel {
    current: Arc<Mutex<Option<String>>>,
    _subscription: Subscription,
}

impl SelectionLabel {
    pub fn track<F>(editor: &dyn LiveEditor, describe: F) -> Self
    where
        F: Fn(NodeRef) -> Option<String> + Send + Sync + 'static,
    {
        let current = Arc::new(Mutex::new(editor.selected().and_then(&describe)));
        let sink = current.clone();
        let subscription = editor.on_selection_change(Box::new(move |node| {
            *sink.lock() = node.and_then(&describe);
        }));
        Self { current, _subscription: subscription }
    }

    pub fn text(&self) -> String {
        match self.current.lock().as_deref() {
            Some(name) => format!("Selected: {name}"),
            None => "No component selected".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenLimits;
    use crate::editor::{Canvas, Selector};
    use crate::provider::{CompletionBackend, ProviderError};
    use crate::wire::{Completion, CompletionRequest};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Answers with fixed text; optionally parks until released.
    struct Gate {
        answer: String,
        calls: AtomicUsize,
        entered: Notify,
        release: Option<Notify>,
    }

    impl Gate {
        fn open(answer: &str) -> Arc<Self> {
            Arc::new(Self { answer: answer.into(), calls: AtomicUsize::new(0), entered: Notify::new(), release: None })
        }

        fn held(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: answer.into(),
                calls: AtomicUsize::new(0),
                entered: Notify::new(),
                release: Some(Notify::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for Gate {
        fn name(&self) -> &'static str {
            "gate"
        }

        async fn complete(&self, _req: &CompletionRequest) -> std::result::Result<Completion, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            if let Some(release) = &self.release {
                release.notified().await;
            }
            Ok(Completion { text: self.answer.clone() })
        }
    }

    fn setup(backend: Arc<Gate>) -> (Arc<Canvas>, SectionEditor) {
        let canvas = Arc::new(Canvas::new());
        canvas.render(
            r#"<div id="gjs"><section id="hero"><h1>Welcome</h1></section><footer id="footer">old</footer></div>"#,
            "",
        );
        let client = Arc::new(GenerationClient::new(backend, TokenLimits::default(), 0.7));
        let editor = SectionEditor::new(canvas.clone(), client);
        (canvas, editor)
    }

    fn hero(canvas: &Canvas) -> NodeRef {
        canvas.find(&Selector::Id("hero".into())).unwrap()
    }

    #[tokio::test]
    async fn replaces_selected_content() {
        let backend = Gate::open("Breathe deeply, move freely");
        let (canvas, editor) = setup(backend.clone());
        canvas.select(Some(hero(&canvas))).unwrap();

        let out = editor.regenerate_selected("Make it about calm", Some("Yoga")).await.unwrap();
        assert_eq!(out, "Breathe deeply, move freely");
        assert_eq!(
            canvas.serialize(hero(&canvas)).unwrap(),
            r#"<section id="hero">Breathe deeply, move freely</section>"#
        );
        assert!(!editor.is_busy());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejects_without_target_or_instructions() {
        let backend = Gate::open("x");
        let (canvas, editor) = setup(backend.clone());

        let err = editor.regenerate_selected("anything", None).await.unwrap_err();
        assert_eq!(err.code(), "validation_error");

        let err = editor.regenerate(Some(hero(&canvas)), "   ", None).await.unwrap_err();
        assert_eq!(err.code(), "validation_error");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn removed_target_is_lost_before_call() {
        let backend = Gate::open("x");
        let (canvas, editor) = setup(backend.clone());
        let target = hero(&canvas);
        canvas.remove(target).unwrap();

        let err = editor.regenerate(Some(target), "shorter", None).await.unwrap_err();
        assert!(matches!(err, WebmindError::TargetLost(_)));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn removal_during_call_discards_result() {
        let backend = Gate::held("new words");
        let (canvas, editor) = setup(backend.clone());
        let editor = Arc::new(editor);
        let target = hero(&canvas);
        let busy = editor.subscribe_busy();
        assert!(!*busy.borrow());

        let task = {
            let editor = editor.clone();
            tokio::spawn(async move { editor.regenerate(Some(target), "shorter", None).await })
        };
        backend.entered.notified().await;
        assert!(editor.is_busy());
        assert!(*busy.borrow());

        let err = editor.regenerate(Some(target), "again", None).await.unwrap_err();
        assert_eq!(err.code(), "validation_error");

        canvas.remove(target).unwrap();
        backend.release.as_ref().unwrap().notify_one();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, WebmindError::TargetLost(_)));
        assert!(!editor.is_busy());
        assert!(!*busy.borrow());
        let footer = canvas.find(&Selector::Id("footer".into())).unwrap();
        assert_eq!(canvas.serialize(footer).unwrap(), r#"<footer id="footer">old</footer>"#);
    }

    #[tokio::test]
    async fn selection_label_follows_selection() {
        let backend = Gate::open("x");
        let (canvas, _editor) = setup(backend);
        let describe = {
            let canvas = canvas.clone();
            move |node| canvas.label(node)
        };
        let label = SelectionLabel::track(canvas.as_ref(), describe);
        assert_eq!(label.text(), "No component selected");

        canvas.select(Some(hero(&canvas))).unwrap();
        assert_eq!(label.text(), "Selected: section#hero");
        canvas.select(None).unwrap();
        assert_eq!(label.text(), "No component selected");
    }
}
