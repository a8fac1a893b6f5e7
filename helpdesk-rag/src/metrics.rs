//! Retrieval-quality metrics: Precision@k and reciprocal rank.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// `|retrieved[..k] ∩ relevant| / k`.
///
/// Always divides by `k`, so a query with fewer than `k` results is
/// penalised. Returns 0 when `k` is zero or either input is empty.
pub fn precision_at(k: usize, retrieved: &[String], relevant: &BTreeSet<String>) -> f64 {
    if k == 0 || retrieved.is_empty() || relevant.is_empty() {
        return 0.0;
    }
    let hits = retrieved.iter().take(k).filter(|id| relevant.contains(*id)).count();
    hits as f64 / k as f64
}

/// `1 / rank` of the first relevant retrieved id, or 0 if there is none.
pub fn reciprocal_rank(retrieved: &[String], relevant: &BTreeSet<String>) -> f64 {
    if retrieved.is_empty() || relevant.is_empty() {
        return 0.0;
    }
    retrieved
        .iter()
        .position(|id| relevant.contains(id))
        .map_or(0.0, |index| 1.0 / (index + 1) as f64)
}

/// Aggregate retrieval metrics over the evaluation ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMetrics {
    #[serde(rename = "precision@1")]
    pub precision_at_1: f64,
    #[serde(rename = "precision@3")]
    pub precision_at_3: f64,
    #[serde(rename = "precision@5")]
    pub precision_at_5: f64,
    pub mrr: f64,
    /// Every recorded query, including ones excluded from the averages.
    pub total_queries: usize,
    /// Queries with both retrieved and relevant ids, i.e. the ones averaged.
    pub evaluated_queries: usize,
}

#[derive(Debug, Default)]
pub(crate) struct MetricsAccumulator {
    precision_at_1: f64,
    precision_at_3: f64,
    precision_at_5: f64,
    reciprocal_rank: f64,
    evaluated: usize,
    total: usize,
}

impl MetricsAccumulator {
    pub(crate) fn add(&mut self, retrieved: &[String], relevant: &BTreeSet<String>) {
        self.total += 1;
        if retrieved.is_empty() || relevant.is_empty() {
            return;
        }
        self.precision_at_1 += precision_at(1, retrieved, relevant);
        self.precision_at_3 += precision_at(3, retrieved, relevant);
        self.precision_at_5 += precision_at(5, retrieved, relevant);
        self.reciprocal_rank += reciprocal_rank(retrieved, relevant);
        self.evaluated += 1;
    }

    pub(crate) fn finish(self) -> RetrievalMetrics {
        if self.evaluated == 0 {
            return RetrievalMetrics { total_queries: self.total, ..RetrievalMetrics::default() };
        }
        let n = self.evaluated as f64;
        RetrievalMetrics {
            precision_at_1: self.precision_at_1 / n,
            precision_at_3: self.precision_at_3 / n,
            precision_at_5: self.precision_at_5 / n,
            mrr: self.reciprocal_rank / n,
            total_queries: self.total,
            evaluated_queries: self.evaluated,
        }
    }
}

impl fmt::Display for RetrievalMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Queries: {}", self.total_queries)?;
        writeln!(f, "Evaluated:     {}", self.evaluated_queries)?;
        for (label, value) in [
            ("Precision@1", self.precision_at_1),
            ("Precision@3", self.precision_at_3),
            ("Precision@5", self.precision_at_5),
        ] {
            writeln!(f, "{label}:   {value:.4} ({:.2}%)", value * 100.0)?;
        }
        write!(f, "MRR:           {:.4}", self.mrr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_inputs_score_zero() {
        for k in 1..=5 {
            assert_eq!(precision_at(k, &ids(&["a", "b"]), &set(&[])), 0.0);
            assert_eq!(precision_at(k, &[], &set(&["a"])), 0.0);
        }
        assert_eq!(reciprocal_rank(&[], &set(&["a"])), 0.0);
        assert_eq!(reciprocal_rank(&ids(&["a"]), &set(&[])), 0.0);
    }

    #[test]
    fn second_position_hit() {
        let retrieved = ids(&["a", "b", "c"]);
        let relevant = set(&["b"]);
        assert_eq!(precision_at(1, &retrieved, &relevant), 0.0);
        assert!((precision_at(3, &retrieved, &relevant) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(reciprocal_rank(&retrieved, &relevant), 0.5);
    }

    #[test]
    fn miss_has_zero_reciprocal_rank() {
        assert_eq!(reciprocal_rank(&ids(&["a", "b"]), &set(&["z"])), 0.0);
    }

    #[test]
    fn precision_divides_by_requested_k() {
        // one result, one hit, but k = 5
        assert!((precision_at(5, &ids(&["a"]), &set(&["a"])) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn accumulator_excludes_empty_relevance_but_counts_it() {
        let mut acc = MetricsAccumulator::default();
        acc.add(&ids(&["a", "b"]), &set(&["a"]));
        acc.add(&ids(&["c", "d"]), &set(&[]));
        let metrics = acc.finish();

        assert_eq!(metrics.total_queries, 2);
        assert_eq!(metrics.evaluated_queries, 1);
        assert_eq!(metrics.precision_at_1, 1.0);
        assert_eq!(metrics.mrr, 1.0);
    }

    #[test]
    fn serializes_with_at_sign_keys() {
        let json = serde_json::to_value(RetrievalMetrics::default()).unwrap();
        assert!(json.get("precision@1").is_some());
        assert!(json.get("mrr").is_some());
    }
}
