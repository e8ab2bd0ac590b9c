use chrono::{DateTime, Utc};
use fs_err as fs;
use serde::Serialize;
use serde_json::to_string_pretty;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::progress::{ProgressState, TrackerOutcome};
use crate::wire::{ArtifactKind, GeneratedDocument};

pub struct SavedArtifacts {
    pub dir: PathBuf,
    pub files: Vec<(ArtifactKind, PathBuf, u64)>,
    pub meta: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct RunMeta<'a> {
    pub tx: Uuid,
    pub created_at: DateTime<Utc>,
    pub backend: &'a str,
    pub model: &'a str,
    pub prompt: &'a str,
    pub category: Option<&'a str>,
    pub theme_color: Option<&'a str>,
    pub sections: Option<SectionsMeta>,
}

#[derive(Debug, Serialize)]
pub struct SectionsMeta {
    pub outcome: String,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
}

impl SectionsMeta {
    pub fn new(outcome: TrackerOutcome, state: &ProgressState) -> Self {
        let (hit, miss): (Vec<_>, Vec<_>) = state.sections.iter().partition(|s| s.matched);
        Self {
            outcome: format!("{outcome:?}").to_lowercase(),
            matched: hit.into_iter().map(|s| s.name.clone()).collect(),
            missing: miss.into_iter().map(|s| s.name.clone()).collect(),
        }
    }
}

pub fn tx_dir(out: &Path, tx: Uuid) -> PathBuf {
    out.join("tx").join(tx.to_string())
}

/// Writes through a temp file in the same directory, then renames over `path`.
pub fn write_atomic(path: &Path, data: &str) -> anyhow::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data.as_bytes())?;
    tmp.persist(path)?;
    Ok(())
}

/// Saves the three artifacts as a standalone page plus `meta.json`.
pub fn save_document(out: &Path, doc: &GeneratedDocument, meta: &RunMeta<'_>) -> anyhow::Result<SavedArtifacts> {
    let dir = tx_dir(out, meta.tx);
    fs::create_dir_all(&dir)?;

    let mut files = Vec::new();
    for kind in [ArtifactKind::Markup, ArtifactKind::Stylesheet, ArtifactKind::Script] {
        let body = match kind {
            ArtifactKind::Markup => standalone_page(doc.markup()),
            _ => doc.artifact(kind).unwrap_or_default().to_string(),
        };
        let path = dir.join(kind.file_name());
        write_atomic(&path, &body)?;
        files.push((kind, path, body.len() as u64));
    }

    let meta_path = dir.join("meta.json");
    write_atomic(&meta_path, &to_string_pretty(meta)?)?;
    tracing::debug!(dir = %dir.display(), "artifacts saved");

    Ok(SavedArtifacts { dir, files, meta: meta_path })
}

/// Links the sibling stylesheet and script into the markup.
pub fn standalone_page(markup: &str) -> String {
    let link = r#"<link rel="stylesheet" href="styles.css">"#;
    let script = r#"<script src="script.js"></script>"#;
    let mut page = markup.to_string();

    match page.to_ascii_lowercase().find("</head>") {
        Some(i) => page.insert_str(i, link),
        None => page.insert_str(0, link),
    }
    match page.to_ascii_lowercase().rfind("</body>") {
        Some(i) => page.insert_str(i, script),
        None => page.push_str(script),
    }
    page
}
