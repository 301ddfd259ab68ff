// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use rayon::prelude::*;
use regex::RegexBuilder;

use super::{Listed, QueryError};
use crate::model::HistoryEntry;

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchMode {
    /// Case-sensitive substring.
    Exact,
    CaseInsensitive,
    Regex { case_insensitive: bool },
    /// Similarity at or above `threshold` (0..=1), best matches first.
    Fuzzy { threshold: f64 },
}

/// Filters `entries` (oldest first) by `term`.
///
/// Exact, case-insensitive and regex matches keep listing order. Fuzzy matches are ranked by
/// score, ties broken by recency.
pub fn search<'a>(
    entries: &'a [HistoryEntry],
    term: &str,
    mode: SearchMode,
) -> Result<Vec<Listed<'a>>, QueryError> {
    let indexed = entries
        .iter()
        .enumerate()
        .map(|(offset, entry)| Listed {
            index: offset + 1,
            entry,
        });

    match mode {
        SearchMode::Exact => Ok(indexed
            .filter(|listed| listed.entry.command().contains(term))
            .collect()),
        SearchMode::CaseInsensitive => {
            let needle = term.to_lowercase();
            Ok(indexed
                .filter(|listed| listed.entry.command().to_lowercase().contains(&needle))
                .collect())
        }
        SearchMode::Regex { case_insensitive } => {
            let regex = RegexBuilder::new(term)
                .case_insensitive(case_insensitive)
                .build()
                .map_err(|err| QueryError::InvalidPattern {
                    pattern: term.to_owned(),
                    reason: err.to_string(),
                })?;
            Ok(indexed
                .filter(|listed| regex.is_match(listed.entry.command()))
                .collect())
        }
        SearchMode::Fuzzy { threshold } => {
            let needle = term.trim().to_lowercase();
            if needle.is_empty() {
                return Ok(Vec::new());
            }
            let mut scored: Vec<(f64, Listed<'a>)> = indexed
                .collect::<Vec<_>>()
                .into_par_iter()
                .filter_map(|listed| {
                    let score = fuzzy_score(&needle, listed.entry.command());
                    (score >= threshold).then_some((score, listed))
                })
                .collect();
            scored.sort_by(|(a, la), (b, lb)| b.total_cmp(a).then(lb.index.cmp(&la.index)));
            Ok(scored.into_iter().map(|(_, listed)| listed).collect())
        }
    }
}

/// Best similarity between `needle` (already lowercased) and the whole command or any of its
/// words. A literal substring hit scores 1.0.
fn fuzzy_score(needle: &str, command: &str) -> f64 {
    let haystack = command.to_lowercase();
    if haystack.contains(needle) {
        return 1.0;
    }
    let whole = rapidfuzz::fuzz::ratio(needle.chars(), haystack.chars());
    haystack
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty())
        .map(|word| rapidfuzz::fuzz::ratio(needle.chars(), word.chars()))
        .fold(whole, f64::max)
}
