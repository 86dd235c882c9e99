// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Minimal scanning of server-rendered report fragments: the edit form's
//! action and field values, and a plain-text projection for display.

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScannedForm {
    pub action: Option<String>,
    /// Named values in document order; repeated names (`flight_time[]`)
    /// appear once per occurrence.
    pub fields: Vec<(String, String)>,
}

impl ScannedForm {
    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Tag {
    name: String,
    closing: bool,
    attrs: Vec<(String, Option<String>)>,
    /// Byte offset just past `>`.
    end: usize,
}

impl Tag {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.as_deref().unwrap_or(""))
    }

    fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(attr, _)| attr == name)
    }
}

/// Scans the first `<form>` in `html` (or the whole fragment when there is
/// none) for `input`, `textarea`, and `select` values.
pub fn scan_form(html: &str) -> ScannedForm {
    let mut scanned = ScannedForm::default();
    let mut cursor = 0;
    let mut in_form = false;
    let mut saw_form = false;
    let mut select: Option<SelectState> = None;

    while let Some((_, tag)) = next_tag(html, cursor) {
        cursor = tag.end;
        match (tag.name.as_str(), tag.closing) {
            ("form", false) if !saw_form => {
                saw_form = true;
                in_form = true;
                scanned.action = tag
                    .attr("action")
                    .map(decode_entities)
                    .filter(|action| !action.trim().is_empty());
            }
            ("form", true) if in_form => break,
            _ if saw_form && !in_form => {}
            ("input", false) => {
                let Some(name) = tag.attr("name") else {
                    continue;
                };
                let kind = tag.attr("type").unwrap_or("text").to_ascii_lowercase();
                if matches!(kind.as_str(), "submit" | "button" | "reset" | "file" | "image") {
                    continue;
                }
                if matches!(kind.as_str(), "checkbox" | "radio") && !tag.has_attr("checked") {
                    continue;
                }
                let value = tag.attr("value").map(decode_entities).unwrap_or_default();
                scanned.fields.push((name.to_owned(), value));
            }
            ("textarea", false) => {
                let Some(name) = tag.attr("name") else {
                    continue;
                };
                let body_end = find_closing(html, tag.end, "textarea").unwrap_or(html.len());
                let value = decode_entities(&html[tag.end..body_end]);
                scanned.fields.push((name.to_owned(), value));
                cursor = body_end;
            }
            ("select", false) => {
                select = tag.attr("name").map(|name| SelectState {
                    name: name.to_owned(),
                    first: None,
                    selected: None,
                });
            }
            ("option", false) => {
                if let Some(state) = select.as_mut() {
                    let value = match tag.attr("value") {
                        Some(value) => decode_entities(value),
                        None => {
                            let text_end = html[tag.end..]
                                .find('<')
                                .map_or(html.len(), |offset| tag.end + offset);
                            decode_entities(html[tag.end..text_end].trim())
                        }
                    };
                    if state.first.is_none() {
                        state.first = Some(value.clone());
                    }
                    if tag.has_attr("selected") {
                        state.selected = Some(value);
                    }
                }
            }
            ("select", true) => {
                if let Some(state) = select.take() {
                    let value = state.selected.or(state.first).unwrap_or_default();
                    scanned.fields.push((state.name, value));
                }
            }
            _ => {}
        }
    }

    scanned
}

struct SelectState {
    name: String,
    first: Option<String>,
    selected: Option<String>,
}

/// Plain-text rendering: tags dropped, block elements become line breaks,
/// table cells are separated by ` | `.
pub fn fragment_text(html: &str) -> String {
    let html = strip_comments(html);
    let html = html.as_str();
    let mut out = String::new();
    let mut cursor = 0;

    while let Some((start, tag)) = next_tag(html, cursor) {
        push_text(&mut out, &html[cursor..start]);
        cursor = tag.end;
        match tag.name.as_str() {
            "script" | "style" if !tag.closing => {
                cursor = find_closing(html, tag.end, &tag.name)
                    .and_then(|close| html[close..].find('>').map(|offset| close + offset + 1))
                    .unwrap_or(html.len());
            }
            "br" | "p" | "div" | "tr" | "li" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
            | "table" | "section" | "dl" | "dt" | "dd" => push_break(&mut out),
            "td" | "th" if tag.closing => out.push_str(" | "),
            "input" if !tag.closing => {
                if let Some(value) = tag.attr("value")
                    && !value.is_empty()
                    && tag.attr("type") != Some("hidden")
                {
                    out.push_str(&decode_entities(value));
                }
            }
            _ => {}
        }
    }
    push_text(&mut out, &html[cursor.min(html.len())..]);

    out.lines()
        .map(|line| line.trim().trim_end_matches('|').trim_end())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Removes `<!-- -->` blocks; an unterminated comment runs to the end.
fn strip_comments(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(open) = rest.find("<!--") {
        out.push_str(&rest[..open]);
        let body = &rest[open + 4..];
        rest = body.find("-->").map_or("", |close| &body[close + 3..]);
    }
    out.push_str(rest);
    out
}

fn push_text(out: &mut String, raw: &str) {
    let decoded = decode_entities(raw);
    let mut last_space = out.ends_with([' ', '\n']) || out.is_empty();
    for ch in decoded.chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(ch);
            last_space = false;
        }
    }
}

fn push_break(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn next_tag(html: &str, from: usize) -> Option<(usize, Tag)> {
    let mut search = from;
    loop {
        let offset = html.get(search..)?.find('<')?;
        let start = search + offset;
        let rest = &html[start..];
        if rest.starts_with("<!--") {
            search = rest
                .find("-->")
                .map_or(html.len(), |close| start + close + 3);
            continue;
        }
        if let Some(tag) = parse_tag(html, start) {
            return Some((start, tag));
        }
        search = start + 1;
    }
}

fn parse_tag(html: &str, start: usize) -> Option<Tag> {
    let bytes = html.as_bytes();
    let mut index = start + 1;
    let closing = bytes.get(index) == Some(&b'/');
    if closing {
        index += 1;
    }

    let name_start = index;
    while index < bytes.len() && (bytes[index].is_ascii_alphanumeric() || bytes[index] == b'-') {
        index += 1;
    }
    if index == name_start {
        return None;
    }
    let name = html[name_start..index].to_ascii_lowercase();

    let mut attrs = Vec::new();
    loop {
        while index < bytes.len() && (bytes[index].is_ascii_whitespace() || bytes[index] == b'/')
        {
            index += 1;
        }
        match bytes.get(index) {
            None => return None,
            Some(b'>') => {
                return Some(Tag {
                    name,
                    closing,
                    attrs,
                    end: index + 1,
                });
            }
            Some(_) => {}
        }

        let attr_start = index;
        while index < bytes.len()
            && !bytes[index].is_ascii_whitespace()
            && !matches!(bytes[index], b'=' | b'>' | b'/')
        {
            index += 1;
        }
        let attr_name = html[attr_start..index].to_ascii_lowercase();
        while index < bytes.len() && bytes[index].is_ascii_whitespace() {
            index += 1;
        }

        if bytes.get(index) != Some(&b'=') {
            attrs.push((attr_name, None));
            continue;
        }
        index += 1;
        while index < bytes.len() && bytes[index].is_ascii_whitespace() {
            index += 1;
        }

        let value = match bytes.get(index) {
            Some(&quote) if quote == b'"' || quote == b'\'' => {
                let value_start = index + 1;
                let close = html[value_start..].find(quote as char)? + value_start;
                index = close + 1;
                html[value_start..close].to_owned()
            }
            Some(_) => {
                let value_start = index;
                while index < bytes.len()
                    && !bytes[index].is_ascii_whitespace()
                    && bytes[index] != b'>'
                {
                    index += 1;
                }
                html[value_start..index].to_owned()
            }
            None => return None,
        };
        attrs.push((attr_name, Some(value)));
    }
}

fn find_closing(html: &str, from: usize, name: &str) -> Option<usize> {
    let lower = html.get(from..)?.to_ascii_lowercase();
    lower.find(&format!("</{name}")).map(|offset| from + offset)
}

pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';').filter(|semi| *semi <= 10) else {
            out.push('&');
            rest = &tail[1..];
            continue;
        };
        let entity = &tail[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" | "#39" => Some('\''),
            "nbsp" => Some(' '),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| {
                    entity
                        .strip_prefix('#')
                        .and_then(|dec| dec.parse::<u32>().ok())
                })
                .and_then(char::from_u32),
        };
        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
