//! Grouping strategies: how a filtered event batch is partitioned into the
//! groups a detect function sees together.
//!
//! Every strategy is total (no matching event is dropped) and deterministic
//! given the input order. Sliding-window groups overlap by design; the
//! engine deduplicates the resulting alerts.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use sentinel_core::TrajectoryEvent;

/// Whether a sliding window extends both ways from its anchor or only
/// forward. Symmetric is the default reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    Symmetric,
    Forward,
}

/// Partitioning strategy selected by a rule descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingStrategy {
    /// One singleton group per event; for rules whose suspicion is
    /// self-contained in a single event.
    Individual,
    /// One group per wall-clock date of `earliest_start`, all users mixed;
    /// per-user scoping belongs to the detect function.
    Daily,
    /// One group per event, containing every event whose `earliest_start`
    /// lies within `window_days` of the anchor's.
    SlidingWindow { window_days: i64, mode: WindowMode },
}

impl GroupingStrategy {
    /// Symmetric sliding window of ± `window_days`.
    pub fn sliding(window_days: i64) -> Self {
        GroupingStrategy::SlidingWindow {
            window_days,
            mode: WindowMode::Symmetric,
        }
    }
}

/// One unit of work for a detect function: a stable key plus the events it
/// may inspect, borrowed from the batch.
#[derive(Debug, Clone)]
pub struct EventGroup<'a> {
    pub key: String,
    pub events: Vec<&'a TrajectoryEvent>,
}

impl<'a> EventGroup<'a> {
    pub fn event_ids(&self) -> Vec<String> {
        self.events.iter().map(|e| e.event_id.clone()).collect()
    }

    pub fn contains_event(&self, event_id: &str) -> bool {
        self.events.iter().any(|e| e.event_id == event_id)
    }
}

impl GroupingStrategy {
    /// Partition `events` into an ordered sequence of groups.
    pub fn partition<'a>(&self, events: &[&'a TrajectoryEvent]) -> Vec<EventGroup<'a>> {
        match *self {
            GroupingStrategy::Individual => events
                .iter()
                .map(|&e| EventGroup {
                    key: e.event_id.clone(),
                    events: vec![e],
                })
                .collect(),

            GroupingStrategy::Daily => {
                // Bucket by the wall-clock date of earliest_start; group order
                // follows the calendar, within-group order the input.
                let mut by_date = std::collections::BTreeMap::new();
                for &e in events {
                    let date = e.time_window.earliest_start.date_naive();
                    by_date.entry(date).or_insert_with(Vec::new).push(e);
                }
                by_date
                    .into_iter()
                    .map(|(date, events)| EventGroup {
                        key: date.format("%Y-%m-%d").to_string(),
                        events,
                    })
                    .collect()
            }

            GroupingStrategy::SlidingWindow { window_days, mode } => {
                let mut sorted: Vec<&TrajectoryEvent> = events.to_vec();
                sorted.sort_by_key(|e| e.time_window.earliest_start);

                let span = Duration::days(window_days);
                sorted
                    .iter()
                    .map(|&anchor| {
                        let anchor_start = anchor.time_window.earliest_start;
                        let lower = match mode {
                            WindowMode::Symmetric => anchor_start - span,
                            WindowMode::Forward => anchor_start,
                        };
                        let upper = anchor_start + span;

                        let members = sorted
                            .iter()
                            .copied()
                            .filter(|e| {
                                let start = e.time_window.earliest_start;
                                start >= lower && start <= upper
                            })
                            .collect();
                        EventGroup {
                            key: anchor.event_id.clone(),
                            events: members,
                        }
                    })
                    .collect()
            }
        }
    }
}
