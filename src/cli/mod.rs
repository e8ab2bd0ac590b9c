use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[value(alias = "together-ai")]
    Together,
    #[value(name = "openai", alias = "open-ai")]
    OpenAI,
    Anthropic,
    Ollama,
}

impl ProviderKind {
    pub fn parse(s: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(s.trim(), true).ok()
    }
}

#[derive(Parser, Debug)]
#[command(name = "webmind", version, about = "Generate editable web pages from a prompt and refine them section by section")]
pub struct Args {
    /// TOML file layered over the built-in defaults.
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[arg(long, value_enum, global = true)]
    pub provider: Option<ProviderKind>,

    #[arg(long, global = true)]
    pub model: Option<String>,

    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    #[arg(long, default_value_t = false, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP API used by the editor UI.
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
    /// Generate a full page, track its sections and save the artifacts.
    Generate {
        prompt: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        theme: Option<String>,
        /// Directory receiving tx/<id>/ artifact folders.
        #[arg(long)]
        out: Option<String>,
        #[arg(long, default_value_t = false)]
        no_track: bool,
    },
    /// Regenerate one component of an HTML file in place.
    Edit {
        file: String,
        /// `#id`, `.class` or a tag name; the first match is edited.
        #[arg(long)]
        select: String,
        #[arg(long)]
        instructions: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Print an improved version of a piece of copy.
    Improve {
        text: String,
        #[arg(long)]
        category: Option<String>,
    },
}
