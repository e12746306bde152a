//! # Canonical Query Service
//!
//! Fan-out, vote, cancel.

use crate::config::QuorumConfig;
use crate::domain::{QuorumCollector, QuorumError, Verdict};
use crate::ports::QueryFetcher;
use shared_types::proto::{TxRequest, TxResponse, TxType};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub struct CanonicalQueryService {
    fetcher: Arc<dyn QueryFetcher>,
    config: QuorumConfig,
}

impl CanonicalQueryService {
    pub fn new(fetcher: Arc<dyn QueryFetcher>, config: QuorumConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn node_count(&self) -> usize {
        self.fetcher.node_count()
    }

    /// Query with the configured deadline.
    pub async fn query(&self, request: &TxRequest) -> Result<TxResponse, QuorumError> {
        self.query_with_timeout(request, self.config.timeout()).await
    }

    pub async fn query_with_timeout(
        &self,
        request: &TxRequest,
        timeout: Duration,
    ) -> Result<TxResponse, QuorumError> {
        let kind = request.kind();
        if kind != TxType::QueryContract {
            return Err(QuorumError::NotAQuery(format!("{:?}", kind)));
        }
        let total = self.fetcher.node_count();
        if total == 0 {
            return Err(QuorumError::NoNodes);
        }

        let (answers_tx, mut answers_rx) = mpsc::channel(total);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let request = Arc::new(request.clone());
        let mut fetchers = JoinSet::new();

        for node in 0..total {
            let fetcher = self.fetcher.clone();
            let request = request.clone();
            let answers = answers_tx.clone();
            let mut cancel = cancel_rx.clone();
            fetchers.spawn(async move {
                let answer = tokio::select! {
                    _ = cancel.changed() => return,
                    answer = fetcher.fetch(node, &request, timeout) => answer,
                };
                if *cancel.borrow() {
                    return;
                }
                let _ = answers.send(answer).await;
            });
        }
        drop(answers_tx);

        let collect = async {
            let mut collector = QuorumCollector::new(total);
            while let Some(answer) = answers_rx.recv().await {
                match collector.offer(answer) {
                    Verdict::Pending => {}
                    Verdict::Agreed(response) => {
                        debug!(
                            "[lc-03] Quorum {} reached after {} answers",
                            collector.quorum(),
                            collector.seen()
                        );
                        return Ok(response);
                    }
                    Verdict::Exhausted { best } => {
                        return Err(QuorumError::NoQuorum {
                            responses: collector.seen(),
                            best,
                            quorum: collector.quorum(),
                        })
                    }
                }
            }
            // only reachable if a fetcher task panicked
            Err(QuorumError::NoQuorum {
                responses: collector.seen(),
                best: 0,
                quorum: collector.quorum(),
            })
        };

        let result = match tokio::time::timeout(timeout, collect).await {
            Ok(result) => result,
            Err(_) => Err(QuorumError::Timeout(timeout)),
        };

        let _ = cancel_tx.send(true);
        fetchers.abort_all();
        if let Err(e) = &result {
            warn!("[lc-03] Canonical query failed: {}", e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MockFetcher;
    use shared_types::proto::{ContractResult, Payload};

    fn query_request() -> TxRequest {
        TxRequest {
            payload: Some(Payload {
                tx_type: TxType::QueryContract as i32,
                method: "balance".into(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn answer(bytes: &[u8]) -> Option<TxResponse> {
        Some(TxResponse {
            contract_result: Some(ContractResult {
                result: bytes.to_vec(),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    fn service(fetcher: MockFetcher) -> CanonicalQueryService {
        CanonicalQueryService::new(Arc::new(fetcher), QuorumConfig::for_testing())
    }

    #[tokio::test]
    async fn test_majority_wins() {
        let fetcher = MockFetcher::new()
            .node(answer(b"A"))
            .node(answer(b"A"))
            .node(answer(b"B"));
        let response = service(fetcher).query(&query_request()).await.unwrap();
        assert_eq!(response.result_bytes(), b"A");
    }

    #[tokio::test]
    async fn test_all_distinct_is_no_quorum() {
        let fetcher = MockFetcher::new()
            .node(answer(b"A"))
            .node(answer(b"B"))
            .node(answer(b"C"));
        let err = service(fetcher).query(&query_request()).await.unwrap_err();
        assert!(matches!(
            err,
            QuorumError::NoQuorum {
                responses: 3,
                best: 1,
                quorum: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_returns_before_slow_node() {
        let fetcher = MockFetcher::new()
            .node(answer(b"A"))
            .node(answer(b"A"))
            .slow_node(answer(b"A"), Duration::from_secs(30));
        let handle = fetcher.clone();

        let started = std::time::Instant::now();
        service(fetcher).query(&query_request()).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(handle.completed(), 2);
    }

    #[tokio::test]
    async fn test_deadline_is_timeout() {
        let fetcher = MockFetcher::new()
            .node(answer(b"A"))
            .slow_node(answer(b"A"), Duration::from_secs(30))
            .slow_node(answer(b"A"), Duration::from_secs(30));
        let err = service(fetcher)
            .query_with_timeout(&query_request(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, QuorumError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_rejects_non_query() {
        let mut request = query_request();
        if let Some(p) = request.payload.as_mut() {
            p.tx_type = TxType::InvokeContract as i32;
        }
        let err = service(MockFetcher::new().node(answer(b"A")))
            .query(&request)
            .await
            .unwrap_err();
        assert!(matches!(err, QuorumError::NotAQuery(_)));
    }

    #[tokio::test]
    async fn test_single_node_is_its_own_quorum() {
        let response = service(MockFetcher::new().node(answer(b"Z")))
            .query(&query_request())
            .await
            .unwrap();
        assert_eq!(response.result_bytes(), b"Z");
    }
}
