//! Ordering, filtering, and correlation of stored entries.
//!
//! Error chains are a heuristic: warn/error entries close together in time are
//! grouped as a plausible cascade. Finding nothing is a normal result.

use console_relay_domain::{LogLevel, StoredLogEntry, SystemTag};
use serde::Serialize;
use std::collections::BTreeSet;

const LABEL_MESSAGE_CHARS: usize = 60;

/// Oldest first. Stable for equal timestamps.
pub fn sort_chronological(entries: &mut [StoredLogEntry]) {
    entries.sort_by_key(|entry| entry.timestamp);
}

/// Newest first. Stable for equal timestamps.
pub fn sort_reverse_chronological(entries: &mut [StoredLogEntry]) {
    entries.sort_by(|left, right| right.timestamp.cmp(&left.timestamp));
}

/// Keep entries from `systems`; an empty set keeps everything.
pub fn filter_by_system(
    entries: &[StoredLogEntry],
    systems: &BTreeSet<SystemTag>,
) -> Vec<StoredLogEntry> {
    entries
        .iter()
        .filter(|entry| systems.is_empty() || systems.contains(&entry.system))
        .cloned()
        .collect()
}

/// Keep entries at `levels`; an empty set keeps everything.
pub fn filter_by_level(
    entries: &[StoredLogEntry],
    levels: &BTreeSet<LogLevel>,
) -> Vec<StoredLogEntry> {
    entries
        .iter()
        .filter(|entry| levels.is_empty() || levels.contains(&entry.level))
        .cloned()
        .collect()
}

/// Case-insensitive search over message, stack, system, level, and context.
pub fn search(entries: &[StoredLogEntry], text: &str) -> Vec<StoredLogEntry> {
    let needle = text.trim().to_lowercase();
    entries
        .iter()
        .filter(|entry| needle.is_empty() || entry_matches(entry, &needle))
        .cloned()
        .collect()
}

fn entry_matches(entry: &StoredLogEntry, needle: &str) -> bool {
    let contains = |haystack: &str| haystack.to_lowercase().contains(needle);
    contains(&entry.message)
        || entry.stack.as_deref().is_some_and(contains)
        || contains(entry.system.as_str())
        || contains(entry.level.as_str())
        || entry
            .context
            .as_ref()
            .is_some_and(|context| contains(&context.to_string()))
}

/// Combined viewer filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Systems to keep; empty keeps all.
    pub systems: BTreeSet<SystemTag>,
    /// Levels to keep; empty keeps all.
    pub levels: BTreeSet<LogLevel>,
    /// Free-text query.
    pub text: Option<String>,
}

impl LogFilter {
    /// Apply every criterion, preserving input order.
    pub fn apply(&self, entries: &[StoredLogEntry]) -> Vec<StoredLogEntry> {
        let by_system = filter_by_system(entries, &self.systems);
        let by_level = filter_by_level(&by_system, &self.levels);
        match self.text.as_deref() {
            Some(text) => search(&by_level, text),
            None => by_level,
        }
    }
}

/// Error-chain heuristic parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainSettings {
    /// Maximum gap between consecutive members.
    pub proximity_ms: u64,
    /// Minimum members for a group to count.
    pub min_entries: usize,
    /// Require at least two systems in a chain.
    pub require_cross_system: bool,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            proximity_ms: 5_000,
            min_entries: 2,
            require_cross_system: false,
        }
    }
}

/// A group of temporally close warn/error entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorChain {
    /// Short description.
    pub label: String,
    /// Members, oldest first.
    pub entries: Vec<StoredLogEntry>,
    /// Timestamp of the first member.
    pub started_at_ms: u64,
    /// Timestamp of the last member.
    pub ended_at_ms: u64,
    /// Systems in order of first appearance.
    pub systems: Vec<SystemTag>,
}

/// Group warn/error entries into chains.
pub fn group_error_chains(entries: &[StoredLogEntry], settings: ChainSettings) -> Vec<ErrorChain> {
    let mut problems: Vec<StoredLogEntry> = entries
        .iter()
        .filter(|entry| entry.is_problem())
        .cloned()
        .collect();
    sort_chronological(&mut problems);

    let mut chains = Vec::new();
    let mut current: Vec<StoredLogEntry> = Vec::new();
    for entry in problems {
        let close = current.last().is_none_or(|last| {
            entry.timestamp.saturating_sub(last.timestamp) <= settings.proximity_ms
        });
        if !close {
            chains.extend(finish_chain(std::mem::take(&mut current), settings));
        }
        current.push(entry);
    }
    chains.extend(finish_chain(current, settings));
    chains
}

fn finish_chain(members: Vec<StoredLogEntry>, settings: ChainSettings) -> Option<ErrorChain> {
    if members.is_empty() || members.len() < settings.min_entries {
        return None;
    }
    let systems = systems_in_order(&members);
    if settings.require_cross_system && systems.len() < 2 {
        return None;
    }

    let started_at_ms = members.first().map_or(0, |entry| entry.timestamp);
    let ended_at_ms = members.last().map_or(started_at_ms, |entry| entry.timestamp);
    let label = chain_label(&members, &systems, ended_at_ms - started_at_ms);
    Some(ErrorChain {
        label,
        entries: members,
        started_at_ms,
        ended_at_ms,
        systems,
    })
}

fn chain_label(members: &[StoredLogEntry], systems: &[SystemTag], span_ms: u64) -> String {
    let path = systems
        .iter()
        .map(|system| system.as_str())
        .collect::<Vec<_>>()
        .join(" -> ");
    let kind = if systems.len() > 1 { "cascade" } else { "burst" };
    let errors = members
        .iter()
        .filter(|entry| entry.level == LogLevel::Error)
        .count();
    let first = members
        .iter()
        .find(|entry| entry.level == LogLevel::Error)
        .or_else(|| members.first())
        .map(|entry| truncate_chars(&entry.message, LABEL_MESSAGE_CHARS))
        .unwrap_or_default();
    format!(
        "{path} {kind}: {} entries ({errors} errors) over {span_ms} ms, starting with \"{first}\"",
        members.len()
    )
}

/// One contiguous run of entries from a single system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SystemFlowStep {
    /// System.
    pub system: SystemTag,
    /// First entry of the run.
    pub first_seen_ms: u64,
    /// Time until the next system takes over. The final run spans to its own
    /// last entry.
    pub duration_ms: u64,
    /// Entries in the run.
    pub entry_count: usize,
}

/// Chronological system transitions. A system that reappears after another
/// one starts a new step.
pub fn compute_system_flow(entries: &[StoredLogEntry]) -> Vec<SystemFlowStep> {
    let mut ordered = entries.to_vec();
    sort_chronological(&mut ordered);

    let mut steps: Vec<SystemFlowStep> = Vec::new();
    let mut last_seen = 0;
    for entry in &ordered {
        match steps.last_mut() {
            Some(step) if step.system == entry.system => step.entry_count += 1,
            Some(step) => {
                step.duration_ms = entry.timestamp.saturating_sub(step.first_seen_ms);
                steps.push(SystemFlowStep {
                    system: entry.system,
                    first_seen_ms: entry.timestamp,
                    duration_ms: 0,
                    entry_count: 1,
                });
            },
            None => steps.push(SystemFlowStep {
                system: entry.system,
                first_seen_ms: entry.timestamp,
                duration_ms: 0,
                entry_count: 1,
            }),
        }
        last_seen = entry.timestamp;
    }
    if let Some(step) = steps.last_mut() {
        step.duration_ms = last_seen.saturating_sub(step.first_seen_ms);
    }
    steps
}

fn systems_in_order(entries: &[StoredLogEntry]) -> Vec<SystemTag> {
    let mut systems = Vec::new();
    for entry in entries {
        if !systems.contains(&entry.system) {
            systems.push(entry.system);
        }
    }
    systems
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{truncated}...")
    } else {
        truncated
    }
}
