//! # Canonical Reads
//!
//! Five nodes; the first byte-exact majority wins and the stragglers are
//! cancelled. No majority after every answer is `NoQuorum`.

#[cfg(test)]
mod tests {
    use crate::fixtures::{config, result_response, session_on};
    use lc_01_connection_pool::{MockConnector, MockNodeScript};
    use lc_03_canonical_query::{CanonicalQueryService, MockFetcher, QuorumConfig, QuorumError};
    use ledger_client::{ClientConfig, ClientError, MockLedger, MockNetwork};
    use shared_types::proto::{Payload, TxRequest, TxType};
    use shared_types::ErrorKind;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    const NODES: [&str; 5] = ["a:1", "b:1", "c:1", "d:1", "e:1"];

    fn canonical_config() -> ClientConfig {
        let mut config = config(&NODES);
        config.enable_sync_canonical_tx_result = true;
        config
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

    #[tokio::test]
    async fn test_majority_wins_and_stragglers_are_cancelled() {
        let fetcher = MockFetcher::new()
            .node(Some(result_response(b"42")))
            .node(Some(result_response(b"42")))
            .slow_node(Some(result_response(b"42")), Duration::from_millis(20))
            .slow_node(Some(result_response(b"13")), Duration::from_millis(500))
            .slow_node(None, Duration::from_secs(30));
        let service = CanonicalQueryService::new(Arc::new(fetcher.clone()), QuorumConfig::for_testing());

        let started = Instant::now();
        let response = service.query(&query()).await.unwrap();

        assert_eq!(response.result_bytes(), b"42");
        assert!(started.elapsed() < Duration::from_millis(500));
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(fetcher.completed(), 3);
    }

    #[tokio::test]
    async fn test_pairwise_disagreement_is_no_quorum() {
        let fetcher = MockFetcher::new()
            .node(Some(result_response(b"42")))
            .node(Some(result_response(b"42")))
            .node(Some(result_response(b"1")))
            .node(Some(result_response(b"2")))
            .node(Some(result_response(b"3")));
        let service = CanonicalQueryService::new(Arc::new(fetcher.clone()), QuorumConfig::for_testing());

        let err = service.query(&query()).await.unwrap_err();

        assert!(matches!(
            err,
            QuorumError::NoQuorum {
                responses: 5,
                best: 2,
                quorum: 3
            }
        ));
        assert_eq!(fetcher.completed(), 5);
    }

    #[tokio::test]
    async fn test_session_query_uses_quorum() {
        let connector = MockConnector::new()
            .with_node("a:1", MockNodeScript::responding(result_response(b"42")))
            .with_node("b:1", MockNodeScript::responding(result_response(b"42")))
            .with_node("c:1", MockNodeScript::responding(result_response(b"42")))
            .with_node("d:1", MockNodeScript::responding(result_response(b"13")))
            .with_node(
                "e:1",
                MockNodeScript::responding(result_response(b"42"))
                    .with_latency(Duration::from_secs(30)),
            );
        let session = session_on(canonical_config(), Arc::new(connector)).await;

        let started = Instant::now();
        let response = session
            .query_contract("asset", "balance", Vec::new(), None)
            .await
            .unwrap();

        assert_eq!(response.result_bytes(), b"42");
        assert!(started.elapsed() < Duration::from_secs(2));
        session.close().await;
    }

    #[tokio::test]
    async fn test_session_query_without_majority_fails() {
        let connector = MockConnector::new()
            .with_node("a:1", MockNodeScript::responding(result_response(b"42")))
            .with_node("b:1", MockNodeScript::responding(result_response(b"42")))
            .with_node("c:1", MockNodeScript::responding(result_response(b"1")))
            .with_node("d:1", MockNodeScript::responding(result_response(b"2")))
            .with_node("e:1", MockNodeScript::responding(result_response(b"3")));
        let session = session_on(canonical_config(), Arc::new(connector)).await;

        let err = session
            .query_contract("asset", "balance", Vec::new(), None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NoQuorum);
        assert!(matches!(err, ClientError::Quorum(QuorumError::NoQuorum { .. })));
    }

    #[tokio::test]
    async fn test_chain_reads_agree_across_ledgers() {
        let network = NODES.iter().fold(MockNetwork::new(), |network, addr| {
            network.with_node(*addr, MockLedger::new("chain1", 8))
        });
        let session = session_on(canonical_config(), Arc::new(network)).await;

        assert_eq!(session.get_current_block_height().await.unwrap(), 8);
        let block = session.get_block_by_height(3, true).await.unwrap();
        assert_eq!(block.height(), 3);
    }
}
