// N-gram frequency table for history-conditioned emission.
//
// Counts how often a token follows a context of the previous one token
// (bigram) or two tokens (trigram), built once from a training corpus of
// token sequences. Every overlapping window contributes one count.
//
// The table stores raw counts only; smoothing is applied by the type model at
// query time (`TypeModel::conditional_probability`), which sums
// `count + smoothing` over the configured orders. Every lookup names its
// order and reads only that order's table. A context of the wrong length
// for the order (history shorter than the order needs) finds nothing and
// counts zero, even when a lower order has seen those tokens.
//
// Serialized as flat record lists because JSON object keys cannot be tuples.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Follower token -> count.
pub type Followers = BTreeMap<String, u32>;

/// Smoothing constant used when none is configured.
pub const DEFAULT_SMOOTHING: f64 = 0.01;

/// A supported n-gram order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NGramOrder {
    /// n = 2: one token of context.
    Bigram,
    /// n = 3: two tokens of context.
    Trigram,
}

impl NGramOrder {
    /// Both supported orders, lowest first.
    pub const ALL: [NGramOrder; 2] = [NGramOrder::Bigram, NGramOrder::Trigram];

    /// Window length `n`.
    pub fn n(self) -> usize {
        match self {
            NGramOrder::Bigram => 2,
            NGramOrder::Trigram => 3,
        }
    }

    /// Number of context tokens, `n - 1`.
    pub fn context_len(self) -> usize {
        self.n() - 1
    }
}

/// Bigram and trigram follower counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NGramRecords", into = "NGramRecords")]
pub struct NGramTable {
    bigrams: BTreeMap<String, Followers>,
    trigrams: BTreeMap<(String, String), Followers>,
}

impl NGramTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every window of every order in `orders` across `sequences`.
    pub fn from_sequences<S: AsRef<[String]>>(sequences: &[S], orders: &[NGramOrder]) -> Self {
        let mut table = Self::new();
        for sequence in sequences {
            for &order in orders {
                table.observe(sequence.as_ref(), order);
            }
        }
        table
    }

    /// Add the windows of one sequence for one order.
    pub fn observe(&mut self, sequence: &[String], order: NGramOrder) {
        for window in sequence.windows(order.n()) {
            let (context, follower) = window.split_at(order.context_len());
            self.increment(context, &follower[0], 1);
        }
    }

    fn increment(&mut self, context: &[String], follower: &str, by: u32) {
        let followers = match context {
            [a] => self.bigrams.entry(a.clone()).or_default(),
            [a, b] => self.trigrams.entry((a.clone(), b.clone())).or_default(),
            _ => return,
        };
        *followers.entry(follower.to_string()).or_insert(0) += by;
    }

    /// Followers seen after `context` in the `order` table. `None` unless
    /// the context has exactly `order.context_len()` tokens.
    pub fn followers(&self, order: NGramOrder, context: &[String]) -> Option<&Followers> {
        match (order, context) {
            (NGramOrder::Bigram, [a]) => self.bigrams.get(a),
            // Borrowed tuple lookup is not possible on a `(String, String)`
            // key, so clone the two context tokens.
            (NGramOrder::Trigram, [a, b]) => self.trigrams.get(&(a.clone(), b.clone())),
            _ => None,
        }
    }

    /// How often `follower` came right after `context` under `order` (0 if
    /// never).
    pub fn count(&self, order: NGramOrder, context: &[String], follower: &str) -> u32 {
        self.followers(order, context)
            .and_then(|f| f.get(follower))
            .copied()
            .unwrap_or(0)
    }

    /// Number of distinct contexts recorded for `order`.
    pub fn context_count(&self, order: NGramOrder) -> usize {
        match order {
            NGramOrder::Bigram => self.bigrams.len(),
            NGramOrder::Trigram => self.trigrams.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bigrams.is_empty() && self.trigrams.is_empty()
    }
}

/// Trailing `order.context_len()` tokens of `history` (all of it if shorter).
pub fn context_of(history: &[String], order: NGramOrder) -> &[String] {
    &history[history.len().saturating_sub(order.context_len())..]
}

#[derive(Serialize, Deserialize)]
struct NGramRecord {
    context: Vec<String>,
    follower: String,
    count: u32,
}

#[derive(Serialize, Deserialize)]
struct NGramRecords {
    bigrams: Vec<NGramRecord>,
    trigrams: Vec<NGramRecord>,
}

impl TryFrom<NGramRecords> for NGramTable {
    type Error = String;

    fn try_from(records: NGramRecords) -> Result<Self, Self::Error> {
        let mut table = NGramTable::new();
        for (order, list) in [
            (NGramOrder::Bigram, records.bigrams),
            (NGramOrder::Trigram, records.trigrams),
        ] {
            for record in list {
                if record.context.len() != order.context_len() {
                    return Err(format!(
                        "{order:?} record has a context of {} tokens",
                        record.context.len()
                    ));
                }
                table.increment(&record.context, &record.follower, record.count);
            }
        }
        Ok(table)
    }
}

impl From<NGramTable> for NGramRecords {
    fn from(table: NGramTable) -> Self {
        fn flatten(
            entries: impl Iterator<Item = (Vec<String>, Followers)>,
        ) -> Vec<NGramRecord> {
            entries
                .flat_map(|(context, followers)| {
                    followers.into_iter().map(move |(follower, count)| NGramRecord {
                        context: context.clone(),
                        follower,
                        count,
                    })
                })
                .collect()
        }

        Self {
            bigrams: flatten(table.bigrams.into_iter().map(|(a, f)| (vec![a], f))),
            trigrams: flatten(table.trigrams.into_iter().map(|((a, b), f)| (vec![a, b], f))),
        }
    }
}
