//! Minimal tag scanning for the InfoMoney pages and the listing XML.
//!
//! Only what the scrapers need: locate elements by name, read attributes,
//! and flatten an element's inner markup to text. Tag and attribute names
//! match without regard to ASCII case.

/// An element located in a document: its opening tag and the markup inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<'a> {
    pub open_tag: &'a str,
    pub inner: &'a str,
}

impl<'a> Element<'a> {
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        attr(self.open_tag, name)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn text(&self) -> String {
        text_content(self.inner)
    }
}

/// All elements named `tag`, in document order. Nested elements of the same
/// name are reported after their parent.
pub fn find_elements<'a>(doc: &'a str, tag: &str) -> Vec<Element<'a>> {
    let mut found = Vec::new();
    let mut pos = 0usize;

    while let Some(start) = find_open_tag(doc, tag, pos) {
        let Some(open_end) = tag_end(doc, start) else {
            break;
        };
        let open_tag = &doc[start..=open_end];

        if open_tag.ends_with("/>") {
            found.push(Element { open_tag, inner: "" });
            pos = open_end + 1;
            continue;
        }

        let inner_start = open_end + 1;
        let inner_end = find_matching_close(doc, tag, inner_start).unwrap_or(doc.len());
        found.push(Element {
            open_tag,
            inner: &doc[inner_start..inner_end],
        });
        pos = inner_start;
    }
    found
}

pub fn find_first<'a>(doc: &'a str, tag: &str) -> Option<Element<'a>> {
    find_elements(doc, tag).into_iter().next()
}

/// Elements named `tag` whose attribute `name` equals `value`.
pub fn find_by_attr<'a>(doc: &'a str, tag: &str, name: &str, value: &str) -> Vec<Element<'a>> {
    find_elements(doc, tag)
        .into_iter()
        .filter(|el| el.attr(name) == Some(value))
        .collect()
}

fn find_ignore_case(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .get(from..)?
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
        .map(|i| from + i)
}

fn find_open_tag(doc: &str, tag: &str, from: usize) -> Option<usize> {
    let needle = format!("<{tag}");
    let mut pos = from;
    while let Some(start) = find_ignore_case(doc, &needle, pos) {
        let after = start + needle.len();
        match doc[after..].chars().next() {
            Some(c) if c == '>' || c == '/' || c.is_whitespace() => return Some(start),
            None => return None,
            _ => pos = after,
        }
    }
    None
}

/// Position of the `>` ending the tag opened at `start`. A `>` inside a
/// quoted attribute value does not count.
fn tag_end(doc: &str, start: usize) -> Option<usize> {
    let mut quote = None;
    let mut after_eq = false;

    for (i, c) in doc[start..].char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '>' => return Some(start + i),
            None if after_eq && (c == '"' || c == '\'') => quote = Some(c),
            None => {}
        }
        if !c.is_whitespace() {
            after_eq = quote.is_none() && c == '=';
        }
    }
    None
}

fn find_matching_close(doc: &str, tag: &str, from: usize) -> Option<usize> {
    let close = format!("</{tag}");
    let mut depth = 1usize;
    let mut pos = from;

    loop {
        let next_close = find_ignore_case(doc, &close, pos)?;
        match find_open_tag(doc, tag, pos) {
            Some(open) if open < next_close => {
                let open_end = tag_end(doc, open)?;
                if !doc[open..=open_end].ends_with("/>") {
                    depth += 1;
                }
                pos = open_end + 1;
            }
            _ => {
                depth -= 1;
                if depth == 0 {
                    return Some(next_close);
                }
                pos = next_close + close.len();
            }
        }
    }
}

/// The attributes of an opening tag as `(name, raw value)` pairs, in order.
/// Attributes written without a value get an empty one.
pub fn attributes(open_tag: &str) -> Vec<(&str, &str)> {
    let body = open_tag
        .strip_suffix("/>")
        .or_else(|| open_tag.strip_suffix('>'))
        .unwrap_or(open_tag);
    let mut rest = body
        .trim_start_matches('<')
        .trim_start_matches(|c: char| !c.is_whitespace() && c != '/');
    let mut found = Vec::new();

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '/');
        if rest.is_empty() {
            return found;
        }

        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        let name = &rest[..name_end];
        rest = rest[name_end..].trim_start();

        let Some(after_eq) = rest.strip_prefix('=') else {
            found.push((name, ""));
            continue;
        };
        let after_eq = after_eq.trim_start();
        let (value, remaining) = match after_eq.chars().next() {
            Some(q @ ('"' | '\'')) => {
                let quoted = &after_eq[1..];
                match quoted.find(q) {
                    Some(close) => (&quoted[..close], &quoted[close + 1..]),
                    None => (quoted, ""),
                }
            }
            _ => {
                let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
                (&after_eq[..end], &after_eq[end..])
            }
        };
        found.push((name, value));
        rest = remaining;
    }
}

/// Raw value of attribute `name` inside an opening tag.
pub fn attr<'a>(open_tag: &'a str, name: &str) -> Option<&'a str> {
    attributes(open_tag)
        .into_iter()
        .find(|(attr_name, _)| attr_name.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

/// Visible text of a markup fragment: tags dropped, `script`/`style` bodies
/// skipped, entities decoded and whitespace collapsed.
pub fn text_content(markup: &str) -> String {
    let mut raw = String::with_capacity(markup.len());
    let mut pos = 0usize;

    while let Some(i) = markup[pos..].find('<') {
        let lt = pos + i;
        raw.push_str(&markup[pos..lt]);
        raw.push(' ');

        let Some(gt) = markup[lt..].find('>').map(|j| lt + j) else {
            pos = markup.len();
            break;
        };
        let tag = markup[lt + 1..gt].trim_start().to_ascii_lowercase();
        pos = gt + 1;

        for skipped in ["script", "style"] {
            let is_open = tag.starts_with(skipped)
                && tag[skipped.len()..]
                    .chars()
                    .next()
                    .map_or(true, |c| c.is_whitespace() || c == '>');
            if is_open && !tag.ends_with('/') {
                let close = format!("</{skipped}");
                pos = match markup[pos..].to_ascii_lowercase().find(&close) {
                    Some(j) => markup[pos + j..]
                        .find('>')
                        .map_or(markup.len(), |k| pos + j + k + 1),
                    None => markup.len(),
                };
            }
        }
    }
    raw.push_str(&markup[pos..]);

    decode_entities(&raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse::<u32>().ok()?,
            };
            char::from_u32(value)
        }
    }
}
