//! Tolerant HTML scanner for generated markup.
//!
//! Model output is rarely well formed, so nothing here fails: unknown close
//! tags are ignored, unclosed elements are closed at the end of input, and a
//! stray `<` is kept as text. Entities are not decoded; text and attribute
//! values round-trip as written.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Element { tag: String, attrs: Vec<Attr>, children: Vec<Fragment> },
    Text(String),
}

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

const RAW_TEXT_TAGS: &[&str] = &["script", "style", "textarea"];

pub fn is_void(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

/// Whether the input opens with a doctype declaration.
pub fn has_doctype(input: &str) -> bool {
    input.trim_start().get(..9).map(|s| s.eq_ignore_ascii_case("<!doctype")).unwrap_or(false)
}

struct Open {
    tag: String,
    attrs: Vec<Attr>,
    children: Vec<Fragment>,
}

struct Builder {
    roots: Vec<Fragment>,
    stack: Vec<Open>,
}

impl Builder {
    fn push(&mut self, node: Fragment) {
        match self.stack.last_mut() {
            Some(open) => open.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn text(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        let target = match self.stack.last_mut() {
            Some(open) => &mut open.children,
            None => &mut self.roots,
        };
        if let Some(Fragment::Text(prev)) = target.last_mut() {
            prev.push_str(s);
        } else {
            target.push(Fragment::Text(s.to_string()));
        }
    }

    fn close(&mut self, tag: &str) {
        if !self.stack.iter().any(|o| o.tag == tag) {
            return;
        }
        while let Some(open) = self.stack.pop() {
            let done = open.tag == tag;
            self.push(Fragment::Element { tag: open.tag, attrs: open.attrs, children: open.children });
            if done {
                break;
            }
        }
    }

    fn finish(mut self) -> Vec<Fragment> {
        while let Some(open) = self.stack.pop() {
            self.push(Fragment::Element { tag: open.tag, attrs: open.attrs, children: open.children });
        }
        self.roots
    }
}

pub fn parse_fragment(input: &str) -> Vec<Fragment> {
    let mut b = Builder { roots: Vec::new(), stack: Vec::new() };
    let mut i = 0usize;

    while i < input.len() {
        let Some(rel_lt) = input[i..].find('<') else {
            b.text(&input[i..]);
            break;
        };
        let lt = i + rel_lt;
        b.text(&input[i..lt]);
        let rest = &input[lt..];

        if rest.starts_with("<!--") {
            match rest.find("-->") {
                Some(rel_end) => {
                    i = lt + rel_end + 3;
                    continue;
                }
                None => break,
            }
        }

        if rest.starts_with("<!") || rest.starts_with("<?") {
            match find_tag_end(input, lt) {
                Some(end) => {
                    i = end + 1;
                    continue;
                }
                None => break,
            }
        }

        if let Some(after) = rest.strip_prefix("</") {
            if after.starts_with(|c: char| c.is_ascii_alphabetic()) {
                let Some(end) = find_tag_end(input, lt) else {
                    break;
                };
                let name = input[lt + 2..end].trim().to_ascii_lowercase();
                b.close(&name);
                i = end + 1;
                continue;
            }
        }

        if !rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            b.text("<");
            i = lt + 1;
            continue;
        }

        let Some(end) = find_tag_end(input, lt) else {
            b.text(rest);
            break;
        };
        let (name, attrs_text, self_closing) = split_start_tag(&input[lt + 1..end]);
        let tag = name.to_ascii_lowercase();
        let attrs = parse_attributes(attrs_text);
        i = end + 1;

        if RAW_TEXT_TAGS.contains(&tag.as_str()) && !self_closing {
            let (body, next) = match find_close_tag(input, i, &tag) {
                Some((close_start, close_end)) => (&input[i..close_start], close_end),
                None => (&input[i..], input.len()),
            };
            let children = if body.is_empty() { Vec::new() } else { vec![Fragment::Text(body.to_string())] };
            b.push(Fragment::Element { tag, attrs, children });
            i = next;
            continue;
        }

        if self_closing || is_void(&tag) {
            b.push(Fragment::Element { tag, attrs, children: Vec::new() });
        } else {
            b.stack.push(Open { tag, attrs, children: Vec::new() });
        }
    }

    b.finish()
}

fn split_start_tag(inside: &str) -> (&str, &str, bool) {
    let trimmed = inside.trim();
    let self_closing = trimmed.ends_with('/');
    let core = if self_closing { trimmed[..trimmed.len() - 1].trim_end() } else { trimmed };

    let name_end = core.find(|c: char| c.is_whitespace()).unwrap_or(core.len());
    (&core[..name_end], core[name_end..].trim_start(), self_closing)
}

fn parse_attributes(input: &str) -> Vec<Attr> {
    let mut out = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }

        let name_start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'=' && bytes[i] != b'/' {
            i += 1;
        }
        if i == name_start {
            i += 1;
            continue;
        }
        let name = input[name_start..i].to_ascii_lowercase();

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            out.push(Attr { name, value: None });
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let value = if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
            let quote = bytes[i];
            i += 1;
            let start = i;
            while i < bytes.len() && bytes[i] != quote {
                i += 1;
            }
            let v = input[start..i].to_string();
            if i < bytes.len() {
                i += 1;
            }
            v
        } else {
            let start = i;
            while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            input[start..i].to_string()
        };
        out.push(Attr { name, value: Some(value) });
    }

    out
}

fn find_tag_end(input: &str, lt: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate().skip(lt + 1) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(i),
            None => {}
        }
    }
    None
}

/// Start and end (exclusive) of `</tag ...>` at or after `from`.
fn find_close_tag(input: &str, from: usize, tag: &str) -> Option<(usize, usize)> {
    let needle = format!("</{tag}");
    let lower = input[from..].to_ascii_lowercase();
    let start = from + lower.find(&needle)?;
    let end = find_tag_end(input, start)?;
    Some((start, end + 1))
}

pub fn escape_attr(value: &str) -> String {
    value.replace('"', "&quot;")
}

pub fn write_open_tag(out: &mut String, tag: &str, attrs: &[Attr]) {
    out.push('<');
    out.push_str(tag);
    for attr in attrs {
        out.push(' ');
        out.push_str(&attr.name);
        if let Some(v) = &attr.value {
            out.push_str("=\"");
            out.push_str(&escape_attr(v));
            out.push('"');
        }
    }
    out.push('>');
}

pub fn write_close_tag(out: &mut String, tag: &str) {
    if !is_void(tag) {
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }
}
