//! Format templates.
//!
//! Two syntaxes are supported, both compiled once into a list of segments:
//!
//! ```text
//! percent:  %(levelprefix)s %(asctime)s %(response_status_code)-4s %(message)s
//! brace:    <green>{time:YYYY-MM-DD HH:mm:ss}</green> <level>{level: <8}</level> {extra[request_path]}
//! ```
//!
//! Rendering never fails: the caller resolves every placeholder to a value
//! (unknown names resolve to an empty string) and a conversion that does not
//! fit the value falls back to plain string rendering.

use serde_json::Value;

use crate::error::Error;
use crate::fields::display_value;
use crate::format::style::Style;
use crate::observability::level::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    /// `%(name)-8s`
    Percent,
    /// `{name: <8}` with `<color>` markup
    Brace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Str,
    Int,
    Float,
    Repr,
}

/// Width/alignment/conversion of one placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct Spec {
    pub fill: char,
    /// `None` means strings left, numbers right.
    pub align: Option<Align>,
    pub zero: bool,
    pub width: usize,
    pub precision: Option<usize>,
    pub conversion: Conversion,
}

impl Default for Spec {
    fn default() -> Self {
        Self {
            fill: ' ',
            align: None,
            zero: false,
            width: 0,
            precision: None,
            conversion: Conversion::Str,
        }
    }
}

/// A named substitution in a template.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub name: String,
    pub spec: Spec,
    /// Date pattern for `{time:...}` in brace templates.
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field(Placeholder),
    Open(Style),
    Close,
}

/// A compiled, immutable format template.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    syntax: Syntax,
    segments: Vec<Segment>,
}

impl Template {
    /// Compile a percent-style template.
    pub fn percent(source: &str) -> Result<Self, Error> {
        Ok(Self {
            source: source.to_string(),
            syntax: Syntax::Percent,
            segments: parse_percent(source)?,
        })
    }

    /// Compile a brace-style template.
    pub fn brace(source: &str) -> Result<Self, Error> {
        Ok(Self {
            source: source.to_string(),
            syntax: Syntax::Brace,
            segments: parse_brace(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn syntax(&self) -> Syntax {
        self.syntax
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &Placeholder> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Field(placeholder) => Some(placeholder),
            _ => None,
        })
    }

    /// Whether any placeholder is named `name`.
    pub fn references(&self, name: &str) -> bool {
        self.placeholders().any(|p| p.name == name)
    }

    /// Render with `lookup` resolving each placeholder.
    ///
    /// Markup is applied with the colors of `colors` when given and stripped
    /// otherwise.
    pub fn render<F>(&self, mut lookup: F, colors: Option<Severity>) -> String
    where
        F: FnMut(&Placeholder) -> Value,
    {
        let mut stack: Vec<(Option<Style>, String)> = vec![(None, String::new())];

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => push_text(&mut stack, text),
                Segment::Field(placeholder) => {
                    let value = lookup(placeholder);
                    let text = format_value(&value, &placeholder.spec);
                    push_text(&mut stack, &text);
                }
                Segment::Open(style) => stack.push((Some(*style), String::new())),
                Segment::Close => close_frame(&mut stack, colors),
            }
        }
        while stack.len() > 1 {
            close_frame(&mut stack, colors);
        }
        stack.pop().map(|(_, text)| text).unwrap_or_default()
    }
}

fn push_text(stack: &mut [(Option<Style>, String)], text: &str) {
    if let Some((_, buffer)) = stack.last_mut() {
        buffer.push_str(text);
    }
}

fn close_frame(stack: &mut Vec<(Option<Style>, String)>, colors: Option<Severity>) {
    if stack.len() < 2 {
        return;
    }
    if let Some((style, text)) = stack.pop() {
        let text = match (style, colors) {
            (Some(style), Some(severity)) => style.apply(&text, severity),
            _ => text,
        };
        push_text(stack, &text);
    }
}

// ── Rendering ─────────────────────────────────────────────────────────────────

fn as_integer(value: &Value) -> Option<i128> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
            .or_else(|| n.as_f64().map(|f| f.trunc() as i128)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i128::from(*b)),
        _ => None,
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn format_value(value: &Value, spec: &Spec) -> String {
    let (text, numeric) = match spec.conversion {
        Conversion::Int => match as_integer(value) {
            Some(n) => (n.to_string(), true),
            None => (display_value(value), false),
        },
        Conversion::Float => match as_float(value) {
            Some(f) => (format!("{:.*}", spec.precision.unwrap_or(6), f), true),
            None => (display_value(value), false),
        },
        Conversion::Repr => (value.to_string(), false),
        Conversion::Str => {
            let mut text = display_value(value);
            if let Some(precision) = spec.precision {
                text = text.chars().take(precision).collect();
            }
            (text, matches!(value, Value::Number(_)))
        }
    };
    pad(text, spec, numeric)
}

fn pad(text: String, spec: &Spec, numeric: bool) -> String {
    let len = text.chars().count();
    if len >= spec.width {
        return text;
    }
    let missing = spec.width - len;

    if spec.zero && numeric && spec.align.is_none() {
        let (sign, digits) = match text.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", text.as_str()),
        };
        return format!("{sign}{}{digits}", "0".repeat(missing));
    }

    let fill = |n: usize| spec.fill.to_string().repeat(n);
    let align = spec
        .align
        .unwrap_or(if numeric { Align::Right } else { Align::Left });
    match align {
        Align::Left => format!("{text}{}", fill(missing)),
        Align::Right => format!("{}{text}", fill(missing)),
        Align::Center => {
            let left = missing / 2;
            format!("{}{text}{}", fill(left), fill(missing - left))
        }
    }
}

// ── Percent syntax ────────────────────────────────────────────────────────────

fn flush(segments: &mut Vec<Segment>, literal: &mut String) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}

fn read_digits(chars: &[(usize, char)], j: &mut usize) -> Option<usize> {
    let mut value: Option<usize> = None;
    while let Some(digit) = chars.get(*j).and_then(|&(_, c)| c.to_digit(10)) {
        value = Some(value.unwrap_or(0) * 10 + digit as usize);
        *j += 1;
    }
    value
}

fn parse_percent(source: &str) -> Result<Vec<Segment>, Error> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        let (offset, c) = chars[i];
        if c != '%' {
            literal.push(c);
            i += 1;
            continue;
        }
        match chars.get(i + 1).map(|&(_, c)| c) {
            Some('%') => {
                literal.push('%');
                i += 2;
            }
            Some('(') => {
                let close = chars[i + 2..]
                    .iter()
                    .position(|&(_, c)| c == ')')
                    .ok_or_else(|| Error::template(offset, "unterminated field name"))?;
                let name: String = chars[i + 2..i + 2 + close].iter().map(|&(_, c)| c).collect();
                if name.trim().is_empty() {
                    return Err(Error::template(offset, "empty field name"));
                }

                let mut j = i + 3 + close;
                // Percent style right-aligns unless '-' is given.
                let mut spec = Spec {
                    align: Some(Align::Right),
                    ..Spec::default()
                };
                while let Some(&(_, flag)) = chars.get(j) {
                    match flag {
                        '-' => spec.align = Some(Align::Left),
                        '0' => spec.zero = true,
                        ' ' | '+' | '#' => {}
                        _ => break,
                    }
                    j += 1;
                }
                if spec.zero && spec.align == Some(Align::Right) {
                    spec.align = None;
                }
                spec.width = read_digits(&chars, &mut j).unwrap_or(0);
                if chars.get(j).map(|&(_, c)| c) == Some('.') {
                    j += 1;
                    spec.precision = Some(read_digits(&chars, &mut j).unwrap_or(0));
                }
                spec.conversion = match chars.get(j).map(|&(_, c)| c) {
                    Some('s') => Conversion::Str,
                    Some('d') | Some('i') => Conversion::Int,
                    Some('f') => Conversion::Float,
                    Some('r') => Conversion::Repr,
                    Some(other) => {
                        return Err(Error::template(
                            offset,
                            format!("unsupported conversion '{other}' for field '{name}'"),
                        ))
                    }
                    None => return Err(Error::template(offset, "missing conversion type")),
                };

                flush(&mut segments, &mut literal);
                segments.push(Segment::Field(Placeholder {
                    name: name.trim().to_string(),
                    spec,
                    pattern: None,
                }));
                i = j + 1;
            }
            _ => return Err(Error::template(offset, "expected '(' or '%' after '%'")),
        }
    }
    flush(&mut segments, &mut literal);
    Ok(segments)
}

// ── Brace syntax ──────────────────────────────────────────────────────────────

fn is_tag_name(tag: &str) -> bool {
    !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn parse_brace(source: &str) -> Result<Vec<Segment>, Error> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        let (offset, c) = chars[i];
        let next = chars.get(i + 1).map(|&(_, c)| c);
        match c {
            '{' if next == Some('{') => {
                literal.push('{');
                i += 2;
            }
            '}' if next == Some('}') => {
                literal.push('}');
                i += 2;
            }
            '}' => return Err(Error::template(offset, "single '}' encountered")),
            '{' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&(_, c)| c == '}')
                    .ok_or_else(|| Error::template(offset, "unterminated '{'"))?;
                let content: String = chars[i + 1..i + 1 + close].iter().map(|&(_, c)| c).collect();
                flush(&mut segments, &mut literal);
                segments.push(Segment::Field(parse_brace_field(&content, offset)?));
                i += close + 2;
            }
            '<' => {
                let end = chars[i + 1..].iter().position(|&(_, c)| c == '>');
                let tag: Option<String> =
                    end.map(|end| chars[i + 1..i + 1 + end].iter().map(|&(_, c)| c).collect());
                let segment = match tag.as_deref() {
                    Some("/") => Some(Segment::Close),
                    Some(tag) => match tag.strip_prefix('/') {
                        Some(name) if Style::from_tag(name).is_some() => Some(Segment::Close),
                        Some(_) => None,
                        None if is_tag_name(tag) => Style::from_tag(tag).map(Segment::Open),
                        None => None,
                    },
                    None => None,
                };
                match (segment, end) {
                    (Some(segment), Some(end)) => {
                        flush(&mut segments, &mut literal);
                        segments.push(segment);
                        i += end + 2;
                    }
                    _ => {
                        literal.push('<');
                        i += 1;
                    }
                }
            }
            _ => {
                literal.push(c);
                i += 1;
            }
        }
    }
    flush(&mut segments, &mut literal);
    Ok(segments)
}

fn parse_brace_field(content: &str, offset: usize) -> Result<Placeholder, Error> {
    let (name, spec) = match content.split_once(':') {
        Some((name, spec)) => (name.trim(), Some(spec)),
        None => (content.trim(), None),
    };
    let name = match name.strip_prefix("extra[").and_then(|rest| rest.strip_suffix(']')) {
        Some(key) => key.trim_matches(|c| c == '"' || c == '\''),
        None => name,
    };
    if name.is_empty() {
        return Err(Error::template(offset, "empty field name"));
    }

    if matches!(name, "time" | "asctime") {
        return Ok(Placeholder {
            name: name.to_string(),
            spec: Spec::default(),
            pattern: spec.filter(|s| !s.is_empty()).map(str::to_string),
        });
    }

    Ok(Placeholder {
        name: name.to_string(),
        spec: match spec {
            Some(spec) => parse_brace_spec(spec, offset)?,
            None => Spec::default(),
        },
        pattern: None,
    })
}

fn parse_brace_spec(spec: &str, offset: usize) -> Result<Spec, Error> {
    let chars: Vec<(usize, char)> = spec.char_indices().collect();
    let to_align = |c: char| match c {
        '<' => Some(Align::Left),
        '>' => Some(Align::Right),
        '^' => Some(Align::Center),
        _ => None,
    };

    let mut result = Spec::default();
    let mut j = 0;
    match (
        chars.first().map(|&(_, c)| c),
        chars.get(1).and_then(|&(_, c)| to_align(c)),
    ) {
        (Some(fill), Some(align)) => {
            result.fill = fill;
            result.align = Some(align);
            j = 2;
        }
        (Some(first), None) => {
            if let Some(align) = to_align(first) {
                result.align = Some(align);
                j = 1;
            }
        }
        (None, _) => return Ok(result),
    }
    if chars.get(j).map(|&(_, c)| c) == Some('0') {
        result.zero = true;
        j += 1;
    }
    result.width = read_digits(&chars, &mut j).unwrap_or(0);
    if chars.get(j).map(|&(_, c)| c) == Some('.') {
        j += 1;
        result.precision = Some(read_digits(&chars, &mut j).unwrap_or(0));
    }
    result.conversion = match chars.get(j).map(|&(_, c)| c) {
        None | Some('s') => Conversion::Str,
        Some('d') => Conversion::Int,
        Some('f') => Conversion::Float,
        Some('r') => Conversion::Repr,
        Some(other) => {
            return Err(Error::template(offset, format!("unsupported format type '{other}'")))
        }
    };
    if j + 1 < chars.len() && chars.get(j).is_some() {
        return Err(Error::template(offset, format!("invalid format spec '{spec}'")));
    }
    Ok(result)
}

/// Translate a loguru-style date pattern (`YYYY-MM-DD HH:mm:ss.SSS`) into a
/// strftime pattern.
pub fn brace_time_pattern(pattern: &str) -> String {
    const TOKENS: [(&str, &str); 20] = [
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("DDDD", "%j"),
        ("DD", "%d"),
        ("dddd", "%A"),
        ("ddd", "%a"),
        ("HH", "%H"),
        ("hh", "%I"),
        ("mm", "%M"),
        ("ss", "%S"),
        ("SSSSSS", "%6f"),
        ("SSS", "%3f"),
        ("ZZ", "%z"),
        ("zz", "%Z"),
        ("Z", "%:z"),
        ("A", "%p"),
        ("X", "%s"),
    ];

    let mut out = String::with_capacity(pattern.len() * 2);
    let mut rest = pattern;
    'outer: while let Some(c) = rest.chars().next() {
        for (token, strftime) in TOKENS {
            if let Some(after) = rest.strip_prefix(token) {
                out.push_str(strftime);
                rest = after;
                continue 'outer;
            }
        }
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }
    out
}
