//! # Session Flows
//!
//! A whole session against an in-process ledger: synchronous invoke results
//! with and without the dispatcher, resubscription, archived reads and the
//! archive / restore round trip.

#[cfg(test)]
mod tests {
    use crate::fixtures::{config, key_pem, memory_store, session_on, CHAIN};
    use ledger_client::request::system::chain_query;
    use ledger_client::{ClientConfig, ClientError, MockLedger, SessionBuilder};
    use shared_types::proto::KeyValuePair;
    use shared_types::{ArchiveProgress, NodeArchiveStatus};
    use std::sync::Arc;
    use std::time::Duration;

    fn dispatcher_config() -> ClientConfig {
        let mut config = config(&["node1:12301"]);
        config.enable_tx_result_dispatcher = true;
        config
    }

    #[tokio::test]
    async fn test_concurrent_sync_invokes_each_get_their_result() {
        let ledger = MockLedger::new(CHAIN, 2);
        let session = Arc::new(session_on(dispatcher_config(), Arc::new(ledger.clone())).await);

        let mut handles = Vec::new();
        for i in 0..8 {
            let session = session.clone();
            handles.push(tokio::spawn(async move {
                let method = format!("mint{}", i);
                session
                    .invoke_contract("asset", &method, None, Vec::new(), None, true)
                    .await
                    .map(|r| (method, r))
            }));
        }

        let mut heights = Vec::new();
        for handle in handles {
            let (method, response) = handle.await.unwrap().unwrap();
            assert!(response.is_success());
            assert_eq!(response.result_bytes(), method.as_bytes());
            heights.push(response.tx_block_height);
        }
        heights.sort_unstable();
        assert_eq!(heights, (3..=10).collect::<Vec<_>>());
        assert!(session.dispatcher().unwrap().registry().is_empty());
        assert_eq!(ledger.calls(chain_query::GET_TX_BY_TX_ID), 0);
        session.close().await;
    }

    #[tokio::test]
    async fn test_dispatcher_survives_subscription_reset() {
        let ledger = MockLedger::new(CHAIN, 2);
        let session = session_on(dispatcher_config(), Arc::new(ledger.clone())).await;

        let first = session
            .invoke_contract("asset", "mint", None, Vec::new(), None, true)
            .await
            .unwrap();
        assert_eq!(first.tx_block_height, 3);

        ledger.break_subscriptions();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The resubscription replays block 3; the next tx still lands once.
        let second = session
            .invoke_contract("asset", "burn", None, Vec::new(), None, true)
            .await
            .unwrap();
        assert_eq!(second.tx_block_height, 4);
        assert_eq!(second.result_bytes(), b"burn");
        assert!(ledger.calls("SUBSCRIBE_BLOCK") >= 2);
        session.close().await;
    }

    #[tokio::test]
    async fn test_late_commit_is_found_by_polling() {
        let ledger = MockLedger::new(CHAIN, 2);
        ledger.set_auto_commit(false);
        let mut config = config(&["node1:12301"]);
        config.retry_limit = 50;
        let session = session_on(config, Arc::new(ledger.clone())).await;

        let committer = {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(60)).await;
                ledger.commit_pending()
            })
        };
        let response = session
            .invoke_contract(
                "asset",
                "mint",
                None,
                vec![KeyValuePair::new("amount", "10")],
                None,
                true,
            )
            .await
            .unwrap();

        assert_eq!(committer.await.unwrap(), 3);
        assert_eq!(response.tx_block_height, 3);
        assert!(ledger.calls(chain_query::GET_TX_BY_TX_ID) > 1);
    }

    #[tokio::test]
    async fn test_archive_then_restore_makes_height_readable_again() {
        let ledger = MockLedger::new(CHAIN, 30);
        ledger.set_archive_status(NodeArchiveStatus::normal(0, 25));
        let archiving = SessionBuilder::new(config(&["node1:12301"]))
            .with_connector(Arc::new(ledger.clone()))
            .with_archive_backend(memory_store())
            .build()
            .await
            .unwrap();

        let archived = archiving
            .archive_blocks(12, &mut |_: ArchiveProgress| {})
            .await
            .unwrap();
        assert_eq!(archived, 12);
        ledger.set_archive_status(NodeArchiveStatus::normal(12, 25));

        // A session without an archive cannot see height 12 any more.
        let plain = session_on(config(&["node1:12301"]), Arc::new(ledger.clone())).await;
        let err = plain.get_block_by_height(12, false).await.unwrap_err();
        assert!(matches!(err, ClientError::Archived(_)));

        // The archiving session still can, through the store.
        assert_eq!(archiving.get_block_by_height(12, false).await.unwrap().height(), 12);

        let restored = archiving
            .restore_blocks(12, &mut |_: ArchiveProgress| {})
            .await
            .unwrap();
        assert_eq!(restored, 1);
        assert_eq!(plain.get_block_by_height(12, false).await.unwrap().height(), 12);
        assert!(plain.get_block_by_height(11, false).await.is_err());
    }

    #[tokio::test]
    async fn test_session_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("client.sign.key");
        std::fs::write(&key_path, key_pem()).unwrap();
        let yaml = format!(
            "authType: public\n\
             chainId: {}\n\
             userSignKeyFilePath: {}\n\
             retryLimit: 3\n\
             retryInterval: 10\n\
             nodeList:\n  - nodeAddr: node1:12301\n    connCnt: 2\n",
            CHAIN,
            key_path.display()
        );
        let config_path = dir.path().join("client.yml");
        std::fs::write(&config_path, yaml).unwrap();

        let config = ClientConfig::from_yaml_file(&config_path).unwrap();
        let ledger = MockLedger::new(CHAIN, 4);
        let session = session_on(config, Arc::new(ledger)).await;

        assert_eq!(session.chain_id(), CHAIN);
        assert_eq!(session.pool().slot_order().await.len(), 2);
        assert_eq!(session.get_current_block_height().await.unwrap(), 4);
    }
}
