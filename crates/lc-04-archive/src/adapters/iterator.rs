//! Block iterator reading from the node, one height at a time.

use crate::domain::{ArchiveError, ArchiveWindow};
use crate::ports::{ArchiveNode, BlockIterator};
use async_trait::async_trait;
use shared_types::proto::BlockWithRwSet;
use std::sync::Arc;

pub struct NodeBlockIterator {
    node: Option<Arc<dyn ArchiveNode>>,
    next: u64,
    end: u64,
    current: u64,
    total: u64,
    exhausted: bool,
}

impl NodeBlockIterator {
    pub fn new(node: Arc<dyn ArchiveNode>, window: ArchiveWindow) -> Self {
        Self {
            node: Some(node),
            next: window.begin,
            end: window.end,
            current: window.begin.saturating_sub(1),
            total: window.len(),
            exhausted: window.is_empty(),
        }
    }
}

#[async_trait]
impl BlockIterator for NodeBlockIterator {
    async fn next(&mut self) -> Option<Result<BlockWithRwSet, ArchiveError>> {
        if self.exhausted || self.next > self.end {
            return None;
        }
        let node = self.node.as_ref()?;
        let height = self.next;
        self.current = height;
        match height.checked_add(1) {
            Some(next) => self.next = next,
            None => self.exhausted = true,
        }
        Some(node.block_with_rwset(height).await)
    }

    fn current(&self) -> u64 {
        self.current
    }

    fn total(&self) -> u64 {
        self.total
    }

    fn release(&mut self) {
        self.node = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MockArchiveNode;
    use shared_types::NodeArchiveStatus;

    #[tokio::test]
    async fn test_walks_window_in_order() {
        let node = MockArchiveNode::new("c", NodeArchiveStatus::normal(0, 100));
        let mut it = NodeBlockIterator::new(
            Arc::new(node.clone()),
            ArchiveWindow { begin: 3, end: 5 },
        );
        assert_eq!(it.total(), 3);
        let mut seen = Vec::new();
        while let Some(block) = it.next().await {
            seen.push(block.unwrap().height());
            assert_eq!(it.current(), *seen.last().unwrap());
        }
        assert_eq!(seen, vec![3, 4, 5]);
        assert_eq!(node.fetched(), vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn test_release_stops_iteration() {
        let node = MockArchiveNode::new("c", NodeArchiveStatus::normal(0, 100));
        let mut it = NodeBlockIterator::new(Arc::new(node), ArchiveWindow { begin: 1, end: 9 });
        assert!(it.next().await.is_some());
        it.release();
        assert!(it.next().await.is_none());
    }

    #[tokio::test]
    async fn test_empty_window() {
        let node = MockArchiveNode::new("c", NodeArchiveStatus::normal(0, 100));
        let mut it = NodeBlockIterator::new(Arc::new(node), ArchiveWindow { begin: 5, end: 4 });
        assert_eq!(it.total(), 0);
        assert!(it.next().await.is_none());
    }
}
