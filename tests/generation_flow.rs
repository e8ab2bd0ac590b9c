mod common;

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

use common::{client, Scripted, YOGA_MARKUP};
use webmind::config::ProgressConfig;
use webmind::editor::canvas::Selector;
use webmind::editor::{Canvas, LiveEditor};
use webmind::mutation::SectionEditor;
use webmind::progress::{TrackerOutcome, TrackerPhase};
use webmind::provider::ProviderError;
use webmind::session::PageSession;
use webmind::WebmindError;

fn yoga_backend() -> Arc<Scripted> {
    Scripted::new(vec![
        Ok(YOGA_MARKUP.into()),
        Ok("<think>palette</think>body { background: #e6f4ea; }".into()),
        Ok("document.querySelector('nav');".into()),
    ])
}

#[tokio::test(start_paused = true)]
async fn yoga_page_is_generated_rendered_and_tracked() {
    let backend = yoga_backend();
    let doc = client(backend.clone())
        .generate_page("landing page for a yoga studio", None, Some("green"))
        .await
        .unwrap();

    assert_eq!(backend.calls(), 3);
    assert!(doc.markup().starts_with("<!DOCTYPE html>"));
    assert!(!doc.markup().contains("think"));
    assert_eq!(doc.styles(), "body { background: #e6f4ea; }");
    assert_eq!(doc.script(), "document.querySelector('nav');");

    let canvas = Arc::new(Canvas::new());
    let mut session = PageSession::open(canvas.clone(), doc, ProgressConfig::default());
    assert!(canvas.find(&Selector::Id("gjs".into())).is_some());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(session.phase(), TrackerPhase::Polling);
    let initial = session.progress();
    assert_eq!(initial.sections.len(), 7);
    assert!(initial.sections.iter().all(|s| !s.matched));
    assert!(initial.polling_active);

    // Only the hero carries a recognizable marker; bare <header>/<footer> tags do not count.
    assert_eq!(session.wait_for_sections().await, TrackerOutcome::TimedOut);
    let done = session.progress();
    let matched: Vec<&str> = done.sections.iter().filter(|s| s.matched).map(|s| s.name.as_str()).collect();
    assert_eq!(matched, vec!["Hero"]);
    assert!(!done.all_complete);
    assert_eq!(session.phase(), TrackerPhase::TimedOut);
}

#[tokio::test]
async fn section_edit_lands_in_live_tree() {
    let backend = Scripted::new(vec![
        Ok(YOGA_MARKUP.into()),
        Ok("body {}".into()),
        Ok(";".into()),
        Ok("<think>short</think>Find Your Calm".into()),
    ]);
    let client = client(backend.clone());
    let doc = client.generate_page("yoga studio", None, None).await.unwrap();

    let canvas = Arc::new(Canvas::new());
    let _session = PageSession::open(canvas.clone(), doc, ProgressConfig::default());
    let heading = canvas.find(&Selector::Tag("h1".into())).unwrap();
    canvas.select(Some(heading)).unwrap();

    let editor = SectionEditor::new(canvas.clone(), client);
    let text = editor.regenerate_selected("turn this into a heading about calm", Some("yoga")).await.unwrap();

    assert_eq!(text, "Find Your Calm");
    assert_eq!(canvas.serialize(heading).unwrap(), "<h1>Find Your Calm</h1>");
    let last = backend.seen.lock().last().cloned().unwrap();
    assert_eq!(last.user, "<h1>Breathe. Stretch. Grow.</h1>");
    assert_eq!(last.max_tokens, 50);
}

#[tokio::test]
async fn failed_edit_leaves_node_untouched() {
    let backend = Scripted::new(vec![Err(ProviderError::Status {
        provider: "together",
        status: 503,
        body: "overloaded".into(),
    })]);
    let canvas = Arc::new(Canvas::new());
    canvas.render(r#"<div id="gjs"><p class="pricing">$20 / month</p></div>"#, "");
    let target = canvas.find(&Selector::Class("pricing".into())).unwrap();

    let editor = SectionEditor::new(canvas.clone(), client(backend));
    let err = editor.regenerate(Some(target), "mention the yearly plan", None).await.unwrap_err();

    assert!(matches!(err, WebmindError::Generation { .. }));
    assert_eq!(canvas.serialize(target).unwrap(), r#"<p class="pricing">$20 / month</p>"#);
    assert!(!editor.is_busy());
}
