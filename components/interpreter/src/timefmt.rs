//! Reference-time layouts
//!
//! `strptime` layouts spell out the reference time
//! `Mon Jan 2 15:04:05 MST 2006` in the shape of the timestamps being
//! parsed. They are translated to chrono format strings once per call.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use core_types::RuntimeError;

/// Layout elements, longest first where one is a prefix of another
const ELEMENTS: &[(&str, &str)] = &[
    ("2006", "%Y"),
    ("January", "%B"),
    ("Monday", "%A"),
    ("Jan", "%b"),
    ("Mon", "%a"),
    ("MST", "%Z"),
    ("Z07:00", "%:z"),
    ("Z0700", "%z"),
    ("-07:00", "%:z"),
    ("-0700", "%z"),
    ("-07", "%#z"),
    (".000000000", "%.9f"),
    (".000000", "%.6f"),
    (".000", "%.3f"),
    (".999999999", "%.f"),
    (".999999", "%.f"),
    (".999", "%.f"),
    ("15", "%H"),
    ("01", "%m"),
    ("02", "%d"),
    ("_2", "%e"),
    ("03", "%I"),
    ("04", "%M"),
    ("05", "%S"),
    ("06", "%y"),
    ("PM", "%p"),
    ("pm", "%p"),
    ("1", "%-m"),
    ("2", "%-d"),
    ("3", "%-I"),
    ("4", "%-M"),
    ("5", "%-S"),
];

/// A reference-time layout translated to a chrono format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    format: String,
    has_zone: bool,
    has_year: bool,
    has_time: bool,
    utc_designator: bool,
}

impl Layout {
    /// Translate a layout
    pub fn new(layout: &str) -> Self {
        let mut format = String::with_capacity(layout.len() * 2);
        let mut has_zone = false;
        let mut has_year = false;
        let mut has_time = false;
        let mut utc_designator = false;
        let mut rest = layout;
        'scan: while !rest.is_empty() {
            for (element, spec) in ELEMENTS {
                if let Some(tail) = rest.strip_prefix(element) {
                    match *spec {
                        "%Y" | "%y" => has_year = true,
                        "%z" | "%:z" | "%#z" => has_zone = true,
                        "%H" | "%I" | "%-I" => has_time = true,
                        _ => {}
                    }
                    if element.starts_with('Z') {
                        utc_designator = true;
                    }
                    format.push_str(spec);
                    rest = tail;
                    continue 'scan;
                }
            }
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                if c == '%' {
                    format.push_str("%%");
                } else {
                    format.push(c);
                }
            }
            rest = chars.as_str();
        }
        Self {
            format,
            has_zone,
            has_year,
            has_time,
            utc_designator,
        }
    }

    /// The chrono format string
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Parse `value`; timestamps without a year take `default_year`
    pub fn parse(&self, value: &str, default_year: i32) -> Result<DateTime<Utc>, chrono::ParseError> {
        let mut text = value.trim().to_string();
        let mut format = self.format.clone();
        if self.utc_designator && text.ends_with('Z') {
            text.pop();
            text.push_str("+00:00");
            format = format.replace("%z", "%:z");
        }
        if !self.has_year {
            text.push_str(&format!(" {default_year}"));
            format.push_str(" %Y");
        }
        if self.has_zone {
            return DateTime::parse_from_str(&text, &format).map(|dt| dt.with_timezone(&Utc));
        }
        if self.has_time {
            return NaiveDateTime::parse_from_str(&text, &format).map(|dt| dt.and_utc());
        }
        NaiveDate::parse_from_str(&text, &format)
            .map(|date| date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
    }
}

/// Parse `value` against the reference-time `layout`
///
/// A layout without a year element takes the year of `now`.
pub fn strptime(value: &str, layout: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, RuntimeError> {
    Layout::new(layout)
        .parse(value, now.year())
        .map_err(|e| RuntimeError::TimeParse {
            value: value.to_string(),
            layout: layout.to_string(),
            reason: e.to_string(),
        })
}
