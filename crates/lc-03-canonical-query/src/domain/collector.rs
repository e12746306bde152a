//! # Quorum Collector
//!
//! Pure vote counting. Responses are compared by the SHA-256 of their prost
//! encoding; the messages involved carry no maps, so equal messages always
//! encode to equal bytes.

use prost::Message;
use shared_crypto::sha256;
use shared_types::proto::TxResponse;
use std::collections::HashMap;

pub type Fingerprint = [u8; 32];

/// Strict majority of `nodes`.
pub fn quorum_size(nodes: usize) -> usize {
    nodes / 2 + 1
}

pub fn fingerprint(response: &TxResponse) -> Fingerprint {
    sha256(&response.encode_to_vec())
}

/// Outcome after one more vote.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Keep collecting.
    Pending,
    /// This response reached quorum.
    Agreed(TxResponse),
    /// All nodes voted; nothing reached quorum.
    Exhausted { best: usize },
}

#[derive(Debug)]
pub struct QuorumCollector {
    total: usize,
    quorum: usize,
    seen: usize,
    votes: HashMap<Fingerprint, usize>,
}

impl QuorumCollector {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            quorum: quorum_size(total),
            seen: 0,
            votes: HashMap::new(),
        }
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }

    pub fn seen(&self) -> usize {
        self.seen
    }

    fn best(&self) -> usize {
        self.votes.values().copied().max().unwrap_or(0)
    }

    /// Count one node's answer; `None` is a node that produced nothing.
    pub fn offer(&mut self, response: Option<TxResponse>) -> Verdict {
        self.seen += 1;
        if let Some(response) = response {
            let count = self.votes.entry(fingerprint(&response)).or_insert(0);
            *count += 1;
            if *count >= self.quorum {
                return Verdict::Agreed(response);
            }
        }
        if self.seen >= self.total {
            return Verdict::Exhausted { best: self.best() };
        }
        Verdict::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use shared_types::proto::ContractResult;

    fn response(result: &[u8]) -> TxResponse {
        TxResponse {
            contract_result: Some(ContractResult {
                result: result.to_vec(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_quorum_size() {
        assert_eq!(quorum_size(1), 1);
        assert_eq!(quorum_size(2), 2);
        assert_eq!(quorum_size(3), 2);
        assert_eq!(quorum_size(4), 3);
        assert_eq!(quorum_size(5), 3);
    }

    #[test]
    fn test_two_of_three_agree() {
        let mut c = QuorumCollector::new(3);
        assert_eq!(c.offer(Some(response(b"A"))), Verdict::Pending);
        assert_eq!(c.offer(Some(response(b"B"))), Verdict::Pending);
        assert_eq!(c.offer(Some(response(b"A"))), Verdict::Agreed(response(b"A")));
    }

    #[test]
    fn test_three_distinct_is_exhausted() {
        let mut c = QuorumCollector::new(3);
        c.offer(Some(response(b"A")));
        c.offer(Some(response(b"B")));
        assert_eq!(
            c.offer(Some(response(b"C"))),
            Verdict::Exhausted { best: 1 }
        );
    }

    #[test]
    fn test_missing_answers_count_towards_total() {
        let mut c = QuorumCollector::new(3);
        c.offer(None);
        c.offer(Some(response(b"A")));
        assert_eq!(c.offer(None), Verdict::Exhausted { best: 1 });
    }

    #[test]
    fn test_fingerprint_distinguishes_messages() {
        assert_eq!(fingerprint(&response(b"A")), fingerprint(&response(b"A")));
        assert_ne!(fingerprint(&response(b"A")), fingerprint(&response(b"B")));
    }

    proptest! {
        // whatever the vote order, an answer is returned iff some value has a majority
        #[test]
        fn prop_agreement_iff_majority(votes in proptest::collection::vec(0u8..3, 1..9)) {
            let mut c = QuorumCollector::new(votes.len());
            let mut verdict = Verdict::Pending;
            for v in &votes {
                verdict = c.offer(Some(response(&[*v])));
                if verdict != Verdict::Pending {
                    break;
                }
            }
            let quorum = quorum_size(votes.len());
            let has_majority = (0u8..3).any(|v| votes.iter().filter(|x| **x == v).count() >= quorum);
            match verdict {
                Verdict::Agreed(r) => {
                    let winner = r.result_bytes()[0];
                    prop_assert!(votes.iter().filter(|x| **x == winner).count() >= quorum);
                }
                Verdict::Exhausted { .. } => prop_assert!(!has_majority),
                Verdict::Pending => prop_assert!(false, "collector never finished"),
            }
        }
    }
}
