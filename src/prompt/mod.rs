//! System prompts for every backend call the generation client makes.

pub const DEFAULT_CATEGORY: &str = "website";

/// Id of the container element the visual editor mounts the page into.
pub const EDITOR_ROOT_ID: &str = "gjs";

fn no_commentary() -> &'static str {
    "Do not include any extra commentary, explanations, or <think> tags."
}

fn theme_sentence(theme_color: Option<&str>) -> String {
    match theme_color.map(str::trim).filter(|t| !t.is_empty()) {
        Some(theme) => format!(" The website should have a primary color theme based on {theme}."),
        None => String::new(),
    }
}

fn category_or_default(category: Option<&str>) -> &str {
    category.map(str::trim).filter(|c| !c.is_empty()).unwrap_or(DEFAULT_CATEGORY)
}

pub fn system_prompt_markup(prompt: &str, theme_color: Option<&str>) -> String {
    format!(
        r#"You are an expert web developer. Generate ONLY the complete HTML code for a website based on the following prompt: "{prompt}". The HTML must be compatible with a drag-and-drop visual page editor and include a container with id="{root}".{theme} {rules} Output ONLY the HTML code starting with <!DOCTYPE html>."#,
        root = EDITOR_ROOT_ID,
        theme = theme_sentence(theme_color),
        rules = no_commentary(),
    )
}

/// The markup is not part of this request; the phrasing only asks the model
/// to stay consistent with what it produced for the same prompt.
pub fn system_prompt_stylesheet(prompt: &str, theme_color: Option<&str>) -> String {
    format!(
        r#"You are an expert web developer. Generate ONLY the complete CSS code for styling the website described by the following prompt: "{prompt}".{theme} The CSS must be compatible with the previously generated HTML. {rules} Output ONLY the CSS code."#,
        theme = theme_sentence(theme_color),
        rules = no_commentary(),
    )
}

pub fn system_prompt_script(prompt: &str, theme_color: Option<&str>) -> String {
    format!(
        r#"You are an expert web developer. Generate ONLY the complete JavaScript code for a website based on the following prompt: "{prompt}".{theme} The JavaScript should be minimal, enable basic interactivity and work with the previously generated HTML. {rules} Output ONLY the JavaScript code."#,
        theme = theme_sentence(theme_color),
        rules = no_commentary(),
    )
}

pub fn system_prompt_improve_text(category: Option<&str>) -> String {
    format!(
        "You are a professional web content writer specializing in {category} pages. Improve the given text to be more engaging, professional, and structured for a web page. Do not include any commentary or <think> tags. Output ONLY the improved text.",
        category = category_or_default(category),
    )
}

/// The four edit templates, picked by category and instruction wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTemplate {
    Css,
    Js,
    Heading,
    Text,
}

pub fn system_prompt_section_edit(
    template: EditTemplate,
    category: Option<&str>,
    existing: &str,
    instructions: &str,
) -> String {
    match template {
        EditTemplate::Css => code_edit("CSS", "CSS code", existing, instructions),
        EditTemplate::Js => code_edit("JavaScript", "JavaScript code", existing, instructions),
        EditTemplate::Heading => text_edit(
            category,
            existing,
            instructions,
            "Since the instructions mention a heading, output ONLY a concise heading (no more than 10 words) and nothing else.",
        ),
        EditTemplate::Text => text_edit(
            category,
            existing,
            instructions,
            "Rewrite the existing text to incorporate the user's instructions in a more engaging, professional, and structured way for a web page.",
        ),
    }
}

fn code_edit(language: &str, what: &str, existing: &str, instructions: &str) -> String {
    format!(
        r#"You are an expert web developer specializing in {language}.
The user wants to update an existing {what} to reflect specific instructions.
The existing {what} is:
"""{existing}"""

The user's instructions are:
"""{instructions}"""

Output ONLY the updated {what} without any extra commentary."#
    )
}

fn text_edit(category: Option<&str>, existing: &str, instructions: &str, directive: &str) -> String {
    format!(
        r#"You are a professional web content writer specializing in {category} pages.
The user wants to update an existing text to reflect specific instructions.
The existing text is:
"""{existing}"""

The user's instructions are:
"""{instructions}"""

{directive}
Do not add any commentary or extra tags. Output ONLY the final improved text."#,
        category = category_or_default(category),
    )
}
