//! # Pool Failover Through a Session
//!
//! 1. a node answering `Unavailable` is skipped for the current call only
//! 2. a corrupted stream is repaired by re-dialing the same node

#[cfg(test)]
mod tests {
    use crate::fixtures::{config, ok_response, session_led_by, session_on};
    use lc_01_connection_pool::{ConnState, MockConnector, MockNodeScript, PoolError};
    use ledger_client::ClientError;
    use shared_types::{ErrorKind, RpcStatus};
    use std::sync::Arc;

    const MALFORMED: &str = "malformed header: missing HTTP content-type";

    #[tokio::test]
    async fn test_unavailable_node_is_blacklisted_for_one_call() {
        let connector = MockConnector::new()
            .with_node(
                "a:1",
                MockNodeScript::responding(ok_response("a"))
                    .then(Err(RpcStatus::unavailable("connection refused"))),
            )
            .with_node("b:1", MockNodeScript::responding(ok_response("b")))
            .with_node("c:1", MockNodeScript::responding(ok_response("c")));
        let session =
            session_led_by(config(&["a:1", "b:1", "c:1"]), Arc::new(connector.clone()), 0).await;

        let first = session
            .query_contract("asset", "balance", Vec::new(), None)
            .await
            .unwrap();
        assert!(first.is_success());
        assert_ne!(first.message, "a");
        assert_eq!(connector.calls("a:1"), 1);

        let second = session
            .query_contract("asset", "balance", Vec::new(), None)
            .await
            .unwrap();
        assert!(second.is_success());
        assert_eq!(second.message, "a");
        assert_eq!(connector.calls("a:1"), 2);
        session.close().await;
    }

    #[tokio::test]
    async fn test_every_node_down_is_no_serviceable_connection() {
        let connector = MockConnector::new()
            .with_node("a:1", MockNodeScript::failing(RpcStatus::unavailable("down")))
            .with_node("b:1", MockNodeScript::failing(RpcStatus::unavailable("down")));
        let session = session_on(config(&["a:1", "b:1"]), Arc::new(connector.clone())).await;

        let err = session
            .query_contract("asset", "balance", Vec::new(), None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NoServiceableConnection);
        assert!(matches!(
            err,
            ClientError::Pool(PoolError::NoServiceableConnection { .. })
        ));
        assert_eq!(connector.calls("a:1"), 1);
        assert_eq!(connector.calls("b:1"), 1);
    }

    #[tokio::test]
    async fn test_corrupted_stream_is_repaired_on_same_node() {
        let connector = MockConnector::new().with_node(
            "solo:1",
            MockNodeScript::responding(ok_response("repaired"))
                .then(Err(RpcStatus::unknown(MALFORMED))),
        );
        let session = session_on(config(&["solo:1"]), Arc::new(connector.clone())).await;

        let response = session
            .query_contract("asset", "balance", Vec::new(), None)
            .await
            .unwrap();

        assert_eq!(response.message, "repaired");
        assert_eq!(connector.dials("solo:1"), 2);
        assert_eq!(connector.calls("solo:1"), 2);
        let states = session.pool().slot_states().await;
        assert_eq!(states.len(), 1);
        assert_ne!(states[0].1, ConnState::Shutdown);
    }

    #[tokio::test]
    async fn test_closed_session_releases_slots() {
        let connector =
            MockConnector::new().with_node("solo:1", MockNodeScript::responding(ok_response("ok")));
        let session = session_on(config(&["solo:1"]), Arc::new(connector)).await;
        session
            .query_contract("asset", "balance", Vec::new(), None)
            .await
            .unwrap();

        session.close().await;

        let err = session
            .query_contract("asset", "balance", Vec::new(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(session
            .pool()
            .slot_states()
            .await
            .iter()
            .all(|(_, state)| *state == ConnState::Absent));
    }
}
