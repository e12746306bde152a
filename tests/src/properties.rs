//! # Cross-Crate Properties
//!
//! Properties that need more than one crate wired together. Single-crate
//! properties live next to the code they cover.

#[cfg(test)]
mod tests {
    use crate::fixtures::{result_response, store_archived_to, CHAIN};
    use lc_01_connection_pool::{ConnectionPool, MockConnector, PoolConfig};
    use lc_02_tx_dispatcher::WaiterRegistry;
    use lc_03_canonical_query::{quorum_size, CanonicalQueryService, MockFetcher, QuorumConfig, QuorumError};
    use lc_04_archive::{ArchivePipeline, MockArchiveNode};
    use proptest::prelude::*;
    use shared_types::proto::{Payload, TxRequest, TxResult, TxType};
    use shared_types::{ArchiveProgress, HeightRange, NodeArchiveStatus, NodeDescriptor, TxResultEvent};
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    fn query() -> TxRequest {
        TxRequest {
            payload: Some(Payload {
                tx_type: TxType::QueryContract as i32,
                contract_name: "asset".into(),
                method: "balance".into(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn event(tx_id: &str, height: u64) -> TxResultEvent {
        TxResultEvent {
            tx_id: tx_id.to_string(),
            result: TxResult::default(),
            timestamp: 0,
            block_height: height,
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// `None` votes are nodes that answered nothing.
        #[test]
        fn prop_query_never_returns_a_minority(
            votes in proptest::collection::vec(proptest::option::of(0u8..3), 1..8)
        ) {
            let mut fetcher = MockFetcher::new();
            let mut counts: HashMap<u8, usize> = HashMap::new();
            for vote in &votes {
                fetcher = fetcher.node(vote.map(|v| result_response(&[v])));
                if let Some(v) = vote {
                    *counts.entry(*v).or_default() += 1;
                }
            }
            let quorum = quorum_size(votes.len());
            let service = CanonicalQueryService::new(Arc::new(fetcher), QuorumConfig::for_testing());

            match runtime().block_on(service.query(&query())) {
                Ok(response) => {
                    let winner = response.result_bytes()[0];
                    prop_assert!(counts[&winner] >= quorum);
                }
                Err(QuorumError::NoQuorum { responses, .. }) => {
                    prop_assert_eq!(responses, votes.len());
                    prop_assert!(counts.values().all(|c| *c < quorum));
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }

        #[test]
        fn prop_each_waiter_is_served_at_most_once(
            publishes in proptest::collection::vec(0usize..6, 0..40)
        ) {
            let registry = WaiterRegistry::new();
            let tx_ids: Vec<String> = (0..4).map(|i| format!("tx{}", i)).collect();
            let waiters: Vec<_> = tx_ids.iter().map(|id| registry.register(id)).collect();

            let mut taken: HashSet<usize> = HashSet::new();
            for (height, i) in publishes.iter().enumerate() {
                // indices 4 and 5 name transactions nobody waits for
                let tx_id = format!("tx{}", i);
                let delivered = registry.publish(event(&tx_id, height as u64));
                let expected = *i < tx_ids.len() && taken.insert(*i);
                prop_assert_eq!(delivered, expected);
            }

            runtime().block_on(async {
                for (i, waiter) in waiters.iter().enumerate() {
                    registry.unregister(&tx_ids[i]);
                    if taken.contains(&i) {
                        let first = publishes.iter().position(|p| *p == i).unwrap() as u64;
                        assert_eq!(waiter.recv().await.map(|e| e.block_height), Some(first));
                    }
                    assert!(waiter.recv().await.is_none());
                }
            });
            prop_assert!(registry.is_empty());
        }

        #[test]
        fn prop_slot_order_is_a_permutation(
            conn_counts in proptest::collection::vec(1usize..5, 1..6)
        ) {
            let nodes: Vec<NodeDescriptor> = conn_counts
                .iter()
                .enumerate()
                .map(|(i, c)| NodeDescriptor::plain(i, format!("node{}:12301", i)).with_conn_count(*c))
                .collect();
            let pool = ConnectionPool::new(nodes, PoolConfig::for_testing(), Arc::new(MockConnector::new()))
                .unwrap();

            let order = runtime().block_on(pool.slot_order());
            let expected: HashSet<(usize, usize)> = conn_counts
                .iter()
                .enumerate()
                .flat_map(|(node, c)| (0..*c).map(move |conn| (node, conn)))
                .collect();
            let seen: HashSet<(usize, usize)> = order.iter().map(|s| (s.node, s.conn)).collect();

            prop_assert_eq!(order.len(), expected.len());
            prop_assert_eq!(seen, expected);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_restore_feeds_exactly_the_unrestored_heights(
            pivot in 1u64..30,
            target_back in 0u64..30,
            range in (0u64..30, 0u64..6),
        ) {
            let target = pivot.saturating_sub(target_back);
            let restored = HeightRange::new(range.0, range.0 + range.1);
            let mut status = NodeArchiveStatus::normal(pivot, pivot + 10);
            status.restored_ranges.push(restored);

            let node = MockArchiveNode::new(CHAIN, status);
            let (count, fed) = runtime().block_on(async {
                let store = store_archived_to(pivot).await;
                let pipeline = ArchivePipeline::new(Arc::new(node.clone()), store);
                let count = pipeline.restore(target, &mut |_: ArchiveProgress| {}).await.unwrap();
                (count, node.restored())
            });

            let expected: Vec<u64> = (target..=pivot).rev().filter(|h| !restored.contains(*h)).collect();
            prop_assert_eq!(count, expected.len() as u64);
            prop_assert_eq!(fed, expected);
        }
    }
}
