//! Cross-source deduplication keyed on a content fingerprint.
//!
//! Two records with the same normalized title/company/location are the same
//! real-world posting no matter which source produced them. On collision the
//! record with the longer description survives, which also makes the output
//! independent of source arrival order.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::models::job::JobRecord;

/// Derived dedup key. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(record: &JobRecord) -> Self {
        let composite = format!(
            "{}|{}|{}",
            normalize(&record.title),
            normalize(&record.company),
            normalize(&record.location)
        );
        let digest = Sha256::digest(composite.as_bytes());
        Fingerprint(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Lowercase, drop punctuation, collapse whitespace runs to single spaces.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = true;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
            last_was_space = false;
        } else if ch.is_whitespace() && !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
        // punctuation is dropped entirely
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Outcome of one dedupe pass.
#[derive(Debug)]
pub struct DedupeOutcome {
    pub records: Vec<JobRecord>,
    pub duplicates: usize,
}

/// Collapse records sharing a fingerprint, keeping the longest description.
///
/// Pure and idempotent: a second pass over the output is a no-op.
pub fn dedupe(records: Vec<JobRecord>) -> DedupeOutcome {
    let total = records.len();
    let mut by_fingerprint: HashMap<Fingerprint, JobRecord> = HashMap::with_capacity(total);

    for record in records {
        let key = Fingerprint::of(&record);
        match by_fingerprint.get(&key) {
            Some(incumbent) if record.description.len() <= incumbent.description.len() => {}
            _ => {
                by_fingerprint.insert(key, record);
            }
        }
    }

    let records: Vec<JobRecord> = by_fingerprint.into_values().collect();
    let duplicates = total - records.len();
    DedupeOutcome { records, duplicates }
}
