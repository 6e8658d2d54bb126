//! Capture group analysis
//!
//! A capture group whose sub-pattern can only match an integer or a decimal
//! number, and which takes part in every match, gives its references a
//! numeric type. Everything else is a string.

use crate::error::syntax_error;
use core_types::{CompileError, SourcePosition, ValueType};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

// The integer part must match at least one digit: no `*`, no `{0,n}`
static INTEGER_GROUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:-\??)?(?:\\d|\[0-9\])(?:\+|\{[1-9]\d*(?:,\d*)?\})?$")
        .expect("integer group classifier is a valid regex")
});

static DECIMAL_GROUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:-\??)?(?:\\d|\[0-9\])(?:\+|\{[1-9]\d*(?:,\d*)?\})?\\\.(?:\\d|\[0-9\])(?:\+|\*|\{\d+(?:,\d*)?\})?$",
    )
    .expect("decimal group classifier is a valid regex")
});

/// A compiled pattern and the types of its capture groups
#[derive(Debug, Clone)]
pub struct PatternInfo {
    /// The compiled pattern
    pub regex: Regex,
    /// Type of each group; entry 0 describes group 1
    pub groups: Vec<ValueType>,
    /// Group index of each named group
    pub names: HashMap<String, usize>,
}

impl PatternInfo {
    /// Compile a pattern and classify its groups
    pub fn analyze(pattern: &str, position: SourcePosition) -> Result<Self, CompileError> {
        let regex = Regex::new(pattern).map_err(|e| {
            syntax_error(format!("invalid regex /{}/: {}", pattern, e), position)
        })?;

        let group_count = regex.captures_len() - 1;
        let spans = group_sources(pattern);
        let groups = if spans.len() == group_count {
            spans
                .iter()
                .map(|group| {
                    if group.optional {
                        ValueType::String
                    } else {
                        classify(group.source)
                    }
                })
                .collect()
        } else {
            vec![ValueType::String; group_count]
        };

        let names = regex
            .capture_names()
            .enumerate()
            .filter_map(|(idx, name)| name.map(|n| (n.to_string(), idx)))
            .collect();

        Ok(Self {
            regex,
            groups,
            names,
        })
    }

    /// Number of capture groups
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Type of a 1-based group, if it exists
    pub fn group_type(&self, group: usize) -> Option<ValueType> {
        group.checked_sub(1).and_then(|idx| self.groups.get(idx)).copied()
    }
}

/// Classify the source text of one capture group
pub fn classify(source: &str) -> ValueType {
    if INTEGER_GROUP.is_match(source) {
        ValueType::Int
    } else if DECIMAL_GROUP.is_match(source) {
        ValueType::Float
    } else {
        ValueType::String
    }
}

/// A capturing group as written in the pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GroupSource<'a> {
    source: &'a str,
    /// The group can be skipped by a successful match
    optional: bool,
}

/// An open group while scanning; the pattern itself is the outermost one
struct Frame {
    /// Slot in the group list if capturing
    slot: Option<usize>,
    start: usize,
    /// A top-level `|` was seen inside this group
    alternated: bool,
    /// Capturing groups nested anywhere inside
    members: Vec<usize>,
}

impl Frame {
    fn new(slot: Option<usize>, start: usize) -> Self {
        Self {
            slot,
            start,
            alternated: false,
            members: Vec::new(),
        }
    }
}

/// Every capturing group, in group-number order
fn group_sources(pattern: &str) -> Vec<GroupSource<'_>> {
    let bytes = pattern.as_bytes();
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut optional: Vec<bool> = Vec::new();
    let mut open = vec![Frame::new(None, 0)];
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'[' => i = skip_class(bytes, i),
            b'|' => {
                if let Some(frame) = open.last_mut() {
                    frame.alternated = true;
                }
                i += 1;
            }
            b'(' => {
                if bytes.get(i + 1) == Some(&b'?') {
                    let rest = &pattern[i + 2..];
                    let name_start = if rest.starts_with("P<") {
                        Some(i + 4)
                    } else if rest.starts_with('<') {
                        Some(i + 3)
                    } else {
                        None
                    };
                    match name_start.and_then(|s| pattern[s..].find('>').map(|e| s + e + 1)) {
                        Some(content) => {
                            spans.push((content, content));
                            optional.push(false);
                            open.push(Frame::new(Some(spans.len() - 1), content));
                            i = content;
                        }
                        None => {
                            open.push(Frame::new(None, i + 1));
                            i += 1;
                        }
                    }
                } else {
                    spans.push((i + 1, i + 1));
                    optional.push(false);
                    open.push(Frame::new(Some(spans.len() - 1), i + 1));
                    i += 1;
                }
            }
            b')' if open.len() > 1 => {
                if let Some(frame) = open.pop() {
                    let mut members = frame.members;
                    if frame.alternated {
                        mark(&mut optional, &members);
                    }
                    if let Some(slot) = frame.slot {
                        spans[slot] = (frame.start, i);
                        members.push(slot);
                    }
                    if zero_minimum(&bytes[i + 1..]) {
                        mark(&mut optional, &members);
                    }
                    if let Some(parent) = open.last_mut() {
                        parent.members.extend(members);
                    }
                }
                i += 1;
            }
            _ => i += 1,
        }
    }

    if let Some(top) = open.first() {
        if top.alternated {
            mark(&mut optional, &top.members);
        }
    }

    spans
        .into_iter()
        .zip(optional)
        .map(|((start, end), optional)| GroupSource {
            source: &pattern[start..end],
            optional,
        })
        .collect()
}

fn mark(optional: &mut [bool], slots: &[usize]) {
    for &slot in slots {
        optional[slot] = true;
    }
}

/// Check if the quantifier at the start of `rest` allows zero repetitions
fn zero_minimum(rest: &[u8]) -> bool {
    match rest.first() {
        Some(b'?') | Some(b'*') => true,
        Some(b'{') => matches!(rest.get(1), Some(b'0') | Some(b',')),
        _ => false,
    }
}

/// Index just past the character class opening at `start`
fn skip_class(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    if bytes.get(i) == Some(&b'^') {
        i += 1;
    }
    // A leading `]` is a literal member
    if bytes.get(i) == Some(&b']') {
        i += 1;
    }
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'[' if bytes.get(i + 1) == Some(&b':') => {
                // POSIX class like [:digit:]
                i += 2;
                while i < bytes.len() && bytes[i] != b']' {
                    i += 1;
                }
                i += 1;
            }
            b']' => return i + 1,
            _ => i += 1,
        }
    }
    i
}
