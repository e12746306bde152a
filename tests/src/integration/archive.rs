//! # Archive and Restore Windows
//!
//! The pipeline against an in-memory node and the in-memory SQL store:
//! the happy path, a node that ran ahead of the store, descending restore
//! around restored ranges, and row-level idempotence.

#[cfg(test)]
mod tests {
    use crate::fixtures::{archive_range, memory_store, store_archived_to, CHAIN};
    use lc_04_archive::{ArchiveBackend, ArchiveError, ArchivePipeline, MockArchiveNode};
    use shared_types::{ArchiveProgress, ErrorKind, HeightRange, NodeArchiveStatus};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_archive_happy_path() {
        let node = MockArchiveNode::new(CHAIN, NodeArchiveStatus::normal(10, 100));
        let store = store_archived_to(10).await;
        let pipeline = ArchivePipeline::new(Arc::new(node.clone()), store.clone());

        let mut progress = Vec::new();
        let archived = pipeline
            .archive(20, &mut |p: ArchiveProgress| progress.push(p))
            .await
            .unwrap();

        assert_eq!(archived, 10);
        assert_eq!(node.fetched(), (11..=20).collect::<Vec<_>>());
        assert_eq!(progress.len(), 10);
        assert!(progress.iter().all(|p| p.is_ok() && p.total == 10));
        assert_eq!(
            progress.iter().map(|p| p.current_height).collect::<Vec<_>>(),
            (11..=20).collect::<Vec<_>>()
        );
        assert_eq!(store.get_archived_status().await.unwrap().archived_height, 20);
    }

    #[tokio::test]
    async fn test_archive_gap_fetches_nothing() {
        let node = MockArchiveNode::new(CHAIN, NodeArchiveStatus::normal(20, 100));
        let store = store_archived_to(10).await;
        let pipeline = ArchivePipeline::new(Arc::new(node.clone()), store.clone());

        let err = pipeline
            .archive(25, &mut |_: ArchiveProgress| {})
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ArchiveError::HeightGap {
                node_begin: 21,
                store_height: 10
            }
        ));
        assert_eq!(err.kind(), ErrorKind::HeightGap);
        assert!(node.fetched().is_empty());
        assert_eq!(store.get_archived_status().await.unwrap().archived_height, 10);
    }

    #[tokio::test]
    async fn test_archive_clamps_to_max_allowed_height() {
        let node = MockArchiveNode::new(CHAIN, NodeArchiveStatus::normal(0, 5));
        let store = memory_store();
        let pipeline = ArchivePipeline::new(Arc::new(node.clone()), store.clone());

        let archived = pipeline
            .archive(50, &mut |_: ArchiveProgress| {})
            .await
            .unwrap();

        // genesis is fetched for registration, then 1..=5
        assert_eq!(archived, 5);
        assert_eq!(node.fetched(), (0..=5).collect::<Vec<_>>());
        assert_eq!(store.table().row_count(), 6);
    }

    #[tokio::test]
    async fn test_restore_descends_and_skips_restored_ranges() {
        let mut status = NodeArchiveStatus::normal(50, 100);
        status.restored_ranges = vec![HeightRange::new(30, 40)];
        let node = MockArchiveNode::new(CHAIN, status);
        let store = store_archived_to(50).await;
        let pipeline = ArchivePipeline::new(Arc::new(node.clone()), store);

        let mut progress = Vec::new();
        let restored = pipeline
            .restore(20, &mut |p: ArchiveProgress| progress.push(p.current_height))
            .await
            .unwrap();

        let expected: Vec<u64> = (41..=50).rev().chain((20..=29).rev()).collect();
        assert_eq!(restored, expected.len() as u64);
        assert_eq!(node.restored(), expected);
        assert_eq!(progress, expected);
    }

    #[tokio::test]
    async fn test_restore_stops_at_first_failure() {
        let node = MockArchiveNode::new(CHAIN, NodeArchiveStatus::normal(10, 100));
        node.fail_restore_at(7);
        let store = store_archived_to(10).await;
        let pipeline = ArchivePipeline::new(Arc::new(node.clone()), store);

        let err = pipeline
            .restore(1, &mut |_: ArchiveProgress| {})
            .await
            .unwrap_err();

        assert!(matches!(err, ArchiveError::Remote { height: 7, .. }));
        assert_eq!(node.restored(), vec![10, 9, 8]);
    }

    #[tokio::test]
    async fn test_restore_of_tampered_row_fails_integrity() {
        let node = MockArchiveNode::new(CHAIN, NodeArchiveStatus::normal(5, 100));
        let store = store_archived_to(5).await;
        store.table().tamper(4);
        let pipeline = ArchivePipeline::new(Arc::new(node.clone()), store);

        let err = pipeline
            .restore(1, &mut |_: ArchiveProgress| {})
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ArchiveIntegrity);
        assert_eq!(node.restored(), vec![5]);
    }

    #[tokio::test]
    async fn test_archiving_same_range_twice_keeps_one_row_per_height() {
        let store = store_archived_to(0).await;

        archive_range(&store, 1, 8).await;
        let again = archive_range(&store, 1, 8).await;

        assert_eq!(again, (1..=8).collect::<Vec<_>>());
        assert_eq!(store.table().row_count(), 9);
        let status = store.get_archived_status().await.unwrap();
        assert_eq!(status.archived_height, 8);
        assert!(!status.in_archive);
    }

    #[tokio::test]
    async fn test_unarchived_row_is_flipped_not_duplicated() {
        let store = store_archived_to(6).await;
        store.table().set_archived(6, false);

        archive_range(&store, 6, 6).await;

        assert_eq!(store.table().row_count(), 7);
        let block = store.get_block_by_height(6, true).await.unwrap();
        assert_eq!(block.height(), 6);
    }
}
