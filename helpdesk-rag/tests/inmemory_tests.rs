//! Property tests for in-memory vector store search ordering.

use std::collections::HashMap;

use helpdesk_rag::{DistanceMetric, EmbeddedEntry, InMemoryVectorStore, VectorStore};
use proptest::prelude::*;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

fn arb_entry(dim: usize) -> impl Strategy<Value = EmbeddedEntry> {
    ("[a-z]{3,8}", arb_normalized_embedding(dim))
        .prop_map(|(id, vector)| EmbeddedEntry { id, vector })
}

fn arb_metric() -> impl Strategy<Value = DistanceMetric> {
    prop_oneof![Just(DistanceMetric::Cosine), Just(DistanceMetric::SquaredL2)]
}

/// For any stored entries and query, search returns at most `top_k`
/// neighbours, ordered by ascending non-negative distance, and repeating the
/// search on the unchanged store yields the same sequence.
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ascending_bounded_and_deterministic(
            entries in proptest::collection::vec(arb_entry(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
            metric in arb_metric(),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (first, second, unique_count) = rt.block_on(async {
                let store = InMemoryVectorStore::with_metric(metric);
                store.create_collection("test", DIM).await.unwrap();

                // Deduplicate by id so the unique count is meaningful
                let mut deduped: HashMap<String, EmbeddedEntry> = HashMap::new();
                for entry in &entries {
                    deduped.entry(entry.id.clone()).or_insert_with(|| entry.clone());
                }
                let unique: Vec<EmbeddedEntry> = deduped.into_values().collect();
                let count = unique.len();

                store.upsert("test", &unique).await.unwrap();
                let first = store.search("test", &query, top_k).await.unwrap();
                let second = store.search("test", &query, top_k).await.unwrap();
                (first, second, count)
            });

            prop_assert!(first.len() <= top_k);
            prop_assert_eq!(first.len(), top_k.min(unique_count));

            for neighbor in &first {
                prop_assert!(neighbor.distance >= 0.0);
            }
            for window in first.windows(2) {
                prop_assert!(
                    window[0].distance <= window[1].distance,
                    "results not in ascending order: {} > {}",
                    window[0].distance,
                    window[1].distance,
                );
            }

            prop_assert_eq!(first, second);
        }
    }
}
