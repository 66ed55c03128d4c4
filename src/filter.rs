use chrono::{DateTime, Utc};

use crate::models::{FileRecord, SearchSpec};

const SIZE_UNITS: &[(&str, u64)] = &[
    ("b", 1),
    ("kb", 1024),
    ("mb", 1024 * 1024),
    ("gb", 1024 * 1024 * 1024),
];

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Parses `<number><unit>` with unit in b/kb/mb/gb (case-insensitive, 1024-based).
/// Returns `None` for anything else, which callers treat as "no bound".
pub fn parse_size(input: &str) -> Option<u64> {
    let input = input.trim().to_lowercase();
    let split = input
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(input.len());
    let (number, unit) = input.split_at(split);

    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }

    let unit = unit.trim();
    let multiplier = SIZE_UNITS
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, multiplier)| *multiplier)?;

    Some((value * multiplier as f64) as u64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Rejected,
    /// Passed the type, date and size filters. `by_type` is set when a
    /// non-empty extension filter accepted the entry.
    Passed { by_type: bool },
}

/// A search spec with its size bounds and query pre-parsed, evaluated against
/// one record at a time. Pure: no I/O.
#[derive(Debug, Clone)]
pub struct FilterPipeline<'a> {
    spec: &'a SearchSpec,
    query: String,
    min_size: Option<u64>,
    max_size: Option<u64>,
    now: DateTime<Utc>,
}

impl<'a> FilterPipeline<'a> {
    pub fn new(spec: &'a SearchSpec, now: DateTime<Utc>) -> Self {
        Self {
            spec,
            query: spec.query.to_lowercase(),
            min_size: spec.min_size_bytes(),
            max_size: spec.max_size_bytes(),
            now,
        }
    }

    pub fn check(&self, record: &FileRecord) -> Verdict {
        let mut by_type = false;
        if !self.spec.extensions.is_empty() && !record.is_dir {
            if !self.spec.extensions.contains(&record.extension) {
                return Verdict::Rejected;
            }
            by_type = true;
        }

        let days_ago = (self.now - record.modified).num_milliseconds() as f64 / MILLIS_PER_DAY;
        if !self.spec.modified.contains(days_ago) {
            return Verdict::Rejected;
        }

        if !record.is_dir {
            if matches!(self.min_size, Some(min) if record.size_bytes < min) {
                return Verdict::Rejected;
            }
            if matches!(self.max_size, Some(max) if record.size_bytes > max) {
                return Verdict::Rejected;
            }
        }

        Verdict::Passed { by_type }
    }

    /// Text-query inclusion. A type-filter pass is enough on its own.
    pub fn includes(&self, record: &FileRecord, verdict: Verdict) -> bool {
        match verdict {
            Verdict::Rejected => false,
            Verdict::Passed { by_type } => {
                by_type
                    || self.query.is_empty()
                    || record.name.to_lowercase().contains(&self.query)
                    || record.extension.contains(&self.query)
            }
        }
    }

    pub fn matches(&self, record: &FileRecord) -> bool {
        self.includes(record, self.check(record))
    }
}
