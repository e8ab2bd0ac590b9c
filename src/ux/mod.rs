use colored::Colorize;
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;

use crate::generate::StageEvent;
use crate::log::SavedArtifacts;
use crate::progress::{ProgressState, TrackerOutcome};

pub fn stage_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

pub fn on_stage(pb: &ProgressBar, event: StageEvent) {
    match event {
        StageEvent::Started(stage) => pb.set_message(format!("generating {stage}")),
        StageEvent::Finished { stage, bytes } => {
            pb.println(format!("{} {stage} ({})", "✓".green(), format_size(bytes as u64, DECIMAL)));
        }
    }
}

pub fn show_sections(state: &ProgressState, outcome: TrackerOutcome) {
    println!("\n{}", "=== SECTIONS ===".bold());
    for s in &state.sections {
        if s.matched {
            println!("  {} {}", "[x]".green().bold(), s.name);
        } else {
            println!("  {} {}", "[ ]".red().bold(), s.name.dimmed());
        }
    }
    let summary = format!("{}/{} present", state.matched(), state.sections.len());
    match outcome {
        TrackerOutcome::Complete => println!("{} {}", "complete:".green().bold(), summary),
        TrackerOutcome::TimedOut => println!("{} {}", "timed out:".yellow().bold(), summary),
        TrackerOutcome::Cancelled => println!("{} {}", "cancelled:".red().bold(), summary),
    }
}

pub fn show_saved(saved: &SavedArtifacts) {
    println!("\n{} {}", "Saved to".bold(), saved.dir.display());
    for (kind, path, bytes) in &saved.files {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        println!("  {:<11} {:<11} {}", kind.to_string().cyan(), name, format_size(*bytes, DECIMAL));
    }
}

pub fn show_edit(label: &str, before: &str, after: &str) {
    println!("\n{} {}", "Selected:".bold(), label);
    println!("{}", "--- before".red());
    println!("{}", indent(before, 2));
    println!("{}", "+++ after".green());
    println!("{}", indent(after, 2));
    println!();
}

pub fn confirm(prompt: &str) -> bool {
    print!("{} [y/N]: ", prompt);
    let _ = io::stdout().flush();
    let mut s = String::new();
    if io::stdin().read_line(&mut s).is_ok() {
        let ans = s.trim().to_lowercase();
        ans == "y" || ans == "yes"
    } else {
        false
    }
}

fn indent(s: &str, n: usize) -> String {
    let pad = " ".repeat(n);
    s.lines().map(|l| format!("{}{}", pad, l)).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indent_prefixes_each_line() {
        assert_eq!(indent("a\nb", 2), "  a\n  b");
    }
}
