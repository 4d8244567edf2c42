//! Cross-room cumulative score ranking
//!
//! Totals are keyed by username and accumulate every attempt's final score
//! for the life of the process, including attempts cut short by a
//! disconnect. Entries never expire and totals never decrease. Ties are
//! ranked by first-contribution order, which an `IndexMap` gives us for
//! free and keeps snapshots deterministic.

use indexmap::IndexMap;
use log::debug;

/// How many entries a broadcast snapshot shows.
pub const TOP_N: usize = 10;

/// Cumulative per-username totals across all attempts.
#[derive(Debug, Default)]
pub struct Leaderboard {
    totals: IndexMap<String, u64>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self {
            totals: IndexMap::new(),
        }
    }

    /// Adds an attempt's final score to a username's total, creating the
    /// entry at 0 on first contribution. A delta of 0 still creates the
    /// entry.
    pub fn add(&mut self, username: &str, delta: u64) {
        let total = self.totals.entry(username.to_string()).or_insert(0);
        *total += delta;
        debug!("Leaderboard: '{}' +{} -> {}", username, delta, total);
    }

    /// Current total for a username, if it has ever contributed.
    pub fn total(&self, username: &str) -> Option<u64> {
        self.totals.get(username).copied()
    }

    /// The `n` highest totals, descending by score.
    ///
    /// The sort is stable, so usernames with equal totals keep their
    /// first-contribution order.
    pub fn top(&self, n: usize) -> Vec<(String, u64)> {
        let mut ranked: Vec<(String, u64)> = self
            .totals
            .iter()
            .map(|(name, &score)| (name.clone(), score))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }

    /// Renders the broadcast snapshot: `LEADERBOARD:` header plus up to ten
    /// ranked lines.
    pub fn render_top(&self) -> String {
        let mut snapshot = String::from("LEADERBOARD:");
        for (rank, (name, score)) in self.top(TOP_N).into_iter().enumerate() {
            snapshot.push_str(&format!("\n{}. {}: {}", rank + 1, name, score));
        }
        snapshot
    }

    /// Number of usernames that have ever contributed.
    pub fn len(&self) -> usize {
        self.totals.len()
    }

    /// Returns true if nobody has contributed yet.
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}
