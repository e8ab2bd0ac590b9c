use anyhow::{anyhow, Context};
use chrono::Utc;
use clap::Parser;
use fs_err as fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use webmind::cli::{Args, Command};
use webmind::config::Config;
use webmind::editor::canvas::Selector;
use webmind::editor::{Canvas, LiveEditor};
use webmind::generate::GenerationClient;
use webmind::log::{self, RunMeta, SectionsMeta};
use webmind::mutation::{SectionEditor, SelectionLabel};
use webmind::session::PageSession;
use webmind::{provider, server, ux};

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("webmind=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("webmind=info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut cfg = Config::load(args.config.as_deref().map(Path::new))
        .with_context(|| format!("loading config {}", args.config.as_deref().unwrap_or("(defaults)")))?;
    if let Some(p) = args.provider {
        cfg.provider = p;
    }
    if let Some(m) = &args.model {
        cfg.model = m.clone();
    }
    if let Some(t) = args.timeout_secs {
        cfg.timeout_secs = t;
    }
    if let Command::Serve { bind: Some(b) } = &args.command {
        cfg.bind = b.clone();
    }
    Ok(cfg)
}

fn make_client(cfg: &Config) -> anyhow::Result<Arc<GenerationClient>> {
    let backend = provider::make_backend(cfg).context("building completion backend")?;
    Ok(Arc::new(GenerationClient::from_config(backend, cfg)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    init_tracing(args.debug);

    let cfg = load_config(&args)?;
    tracing::debug!(provider = ?cfg.provider, model = %cfg.model, "config loaded");
    let client = make_client(&cfg)?;

    match args.command {
        Command::Serve { .. } => {
            server::serve(&cfg.bind, server::AppState::new(client))
                .await
                .with_context(|| format!("serving on {}", cfg.bind))?;
        }
        Command::Generate { prompt, category, theme, out, no_track } => {
            let out = PathBuf::from(out.unwrap_or_else(|| cfg.out_dir.clone()));
            run_generate(&cfg, client, &prompt, category.as_deref(), theme.as_deref(), &out, !no_track).await?;
        }
        Command::Edit { file, select, instructions, category, yes } => {
            run_edit(client, Path::new(&file), &select, &instructions, category.as_deref(), yes).await?;
        }
        Command::Improve { text, category } => {
            let improved = client.improve_text(&text, category.as_deref()).await?;
            println!("{improved}");
        }
    }
    Ok(())
}

async fn run_generate(
    cfg: &Config,
    client: Arc<GenerationClient>,
    prompt: &str,
    category: Option<&str>,
    theme: Option<&str>,
    out: &Path,
    track: bool,
) -> anyhow::Result<()> {
    let tx = Uuid::new_v4();
    let pb = ux::stage_spinner();
    let doc = client.generate_page_observed(prompt, category, theme, |e| ux::on_stage(&pb, e)).await;
    pb.finish_and_clear();
    let doc = doc?;

    let mut sections = None;
    if track {
        let canvas: Arc<dyn LiveEditor> = Arc::new(Canvas::new());
        let mut session = PageSession::open(canvas, doc.clone(), cfg.progress.clone());
        let outcome = session.wait_for_sections().await;
        let state = session.progress();
        ux::show_sections(&state, outcome);
        sections = Some(SectionsMeta::new(outcome, &state));
    }

    let meta = RunMeta {
        tx,
        created_at: Utc::now(),
        backend: client.backend_name(),
        model: &cfg.model,
        prompt,
        category,
        theme_color: theme,
        sections,
    };
    let saved = log::save_document(out, &doc, &meta)?;
    ux::show_saved(&saved);
    Ok(())
}

async fn run_edit(
    client: Arc<GenerationClient>,
    file: &Path,
    select: &str,
    instructions: &str,
    category: Option<&str>,
    yes: bool,
) -> anyhow::Result<()> {
    let html = fs::read_to_string(file)?;
    let selector = Selector::parse(select).ok_or_else(|| anyhow!("unsupported selector '{select}'"))?;

    let canvas = Arc::new(Canvas::new());
    let render = canvas.render(&html, "");
    let target = canvas
        .find(&selector)
        .ok_or_else(|| anyhow!("no element matches '{select}' in {}", file.display()))?;

    let label = {
        let weak = Arc::downgrade(&canvas);
        SelectionLabel::track(canvas.as_ref(), move |node| weak.upgrade().and_then(|c| c.label(node)))
    };
    canvas.select(Some(target))?;
    let before = canvas.serialize(target).unwrap_or_default();

    let editor = SectionEditor::new(canvas.clone(), client);
    let pb = ux::stage_spinner();
    pb.set_message(label.text());
    let result = editor.regenerate_selected(instructions, category).await;
    pb.finish_and_clear();
    result?;

    let after = canvas.serialize(target).unwrap_or_default();
    ux::show_edit(&label.text(), &before, &after);
    if !yes && !ux::confirm(&format!("Write changes to {}?", file.display())) {
        println!("Aborted by user.");
        return Ok(());
    }
    let updated = canvas
        .document_html(render)
        .ok_or_else(|| anyhow!("document is no longer rendered"))?;
    log::write_atomic(file, &updated)?;
    println!("Updated {}", file.display());
    Ok(())
}
