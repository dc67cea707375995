//! Lenient stdout parsing
//!
//! The counter's output format is not under our control, so parsing is
//! deliberately forgiving: a line *containing* the label is accepted, the
//! integer after the label's colon is read, and a missing or unparsable
//! field keeps the prior known value (sticky default) instead of failing the
//! trial.

use crate::experiment::WordCounts;

/// Label of the total word counter.
pub const TOTAL_WORDS_LABEL: &str = "Total Words:";
/// Label of the unique word counter.
pub const UNIQUE_WORDS_LABEL: &str = "Unique Words:";

/// Result of scanning one stdout capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedCounters {
    /// Counters after applying any fields found
    pub counts: WordCounts,
    /// Whether a `Total Words:` value was read
    pub found_total: bool,
    /// Whether an `Unique Words:` value was read
    pub found_unique: bool,
}

/// Scan stdout for counters, keeping `prior` values for fields not found.
///
/// Only the first parsable occurrence of each label counts.
///
/// ```rust
/// use scalebench::experiment::WordCounts;
/// use scalebench::runner::parse_counters;
///
/// let stdout = "Statistics:\nTotal Words:     1200\nExecution Time: 3.2 ms\n";
/// let parsed = parse_counters(stdout, WordCounts::new(7, 42));
/// assert_eq!(parsed.counts, WordCounts::new(1200, 42));
/// assert!(parsed.found_total && !parsed.found_unique);
/// ```
#[must_use]
pub fn parse_counters(stdout: &str, prior: WordCounts) -> ParsedCounters {
    let mut total = None;
    let mut unique = None;

    for line in stdout.lines() {
        if total.is_none() {
            total = labeled_value(line, TOTAL_WORDS_LABEL);
        }
        if unique.is_none() {
            unique = labeled_value(line, UNIQUE_WORDS_LABEL);
        }
        if total.is_some() && unique.is_some() {
            break;
        }
    }

    ParsedCounters {
        counts: WordCounts::new(total.unwrap_or(prior.total), unique.unwrap_or(prior.unique)),
        found_total: total.is_some(),
        found_unique: unique.is_some(),
    }
}

fn labeled_value(line: &str, label: &str) -> Option<u64> {
    let (_, rest) = line.split_once(label)?;
    let digits: String = rest
        .trim_start()
        .chars()
        .filter(|c| *c != ',')
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
