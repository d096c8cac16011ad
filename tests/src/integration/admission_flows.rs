//! # Batch Admission Flows
//!
//! Ordinary transactions through `TxAdmissionApi::handle_incoming_txs`:
//!
//! 1. **Mixed batch**: one invalid sibling never sinks a valid one
//! 2. **Idempotence**: repeats inside a batch, in the pool or in storage are no-ops
//! 3. **Concurrency**: overlapping batches admit each identity exactly once
//! 4. **Rejection memory**: the cache stays bounded under a flood of bad blobs

#[cfg(test)]
mod tests {
    use nc_06_tx_admission::test_utils::{key, TestNode, TxBuilder};
    use nc_06_tx_admission::{
        AdmissionOutcome, IngestFlags, OutboundMessage, PoolNamespace, PoolView,
        SemanticViolation, TxAdmissionApi,
    };

    fn submit(node: &TestNode, blobs: &[Vec<u8>]) -> nc_06_tx_admission::IngestionReport {
        node.service.handle_incoming_txs(blobs, IngestFlags::default())
    }

    // =========================================================================
    // MIXED BATCHES
    // =========================================================================

    #[test]
    fn test_invalid_and_valid_in_one_batch() {
        let node = TestNode::new();
        let invalid = TxBuilder::new(1).key_images(&[key(31), key(31)]).blob();
        let valid = TxBuilder::new(2).blob();

        let report = submit(&node, &[invalid, valid]);

        assert_eq!(report.contexts.len(), 2);
        assert!(report.contexts[0].verification_failed());
        assert_eq!(
            report.contexts[0].outcome,
            AdmissionOutcome::SemanticFailure(SemanticViolation::DuplicateKeyImage)
        );
        assert!(report.contexts[1].added_to_pool());
        assert!(!report.all_ok());
        assert_eq!(node.pool.len(), 1);
    }

    #[test]
    fn test_duplicate_key_image_rejected_at_any_position() {
        let node = TestNode::new();
        for position in 0..4 {
            let mut blobs: Vec<Vec<u8>> = (0..4)
                .map(|n| TxBuilder::new(100 * (position + 1) + n).blob())
                .collect();
            blobs[position as usize] = TxBuilder::new(90 + position)
                .key_images(&[key(7_000 + position), key(7_000 + position)])
                .blob();

            let report = submit(&node, &blobs);
            for (n, ctx) in report.contexts.iter().enumerate() {
                if n == position as usize {
                    assert_eq!(
                        ctx.outcome,
                        AdmissionOutcome::SemanticFailure(SemanticViolation::DuplicateKeyImage)
                    );
                } else {
                    assert!(ctx.added_to_pool());
                }
            }
        }
    }

    #[test]
    fn test_ring_offset_rules_end_to_end() {
        let node = TestNode::new();
        let repeated = TxBuilder::new(1).offsets(vec![9, 2, 2]).blob();
        let first_repeats = TxBuilder::new(2).offsets(vec![2, 2, 5]).blob();

        let report = submit(&node, &[repeated, first_repeats]);
        assert_eq!(
            report.contexts[0].outcome,
            AdmissionOutcome::SemanticFailure(SemanticViolation::MalformedRing(0))
        );
        assert!(report.contexts[1].added_to_pool());
    }

    #[test]
    fn test_oversized_blob_reported_as_too_large() {
        let mut config = nc_06_tx_admission::test_utils::test_config();
        config.max_tx_blob_size = 64;
        let node = TestNode::with_config(config);

        let report = submit(&node, &[TxBuilder::new(1).blob()]);
        assert!(report.contexts[0].too_large());
        assert!(report.contexts[0].verification_failed());
        assert!(node.pool.is_empty());
    }

    // =========================================================================
    // IDEMPOTENCE
    // =========================================================================

    #[test]
    fn test_same_blob_twice_in_one_batch() {
        let node = TestNode::new();
        let blob = TxBuilder::new(5).blob();

        let report = submit(&node, &[blob.clone(), blob]);
        assert!(report.contexts[0].added_to_pool());
        assert_eq!(report.contexts[1].outcome, AdmissionOutcome::Duplicate);
        assert!(!report.contexts[1].verification_failed());
        assert!(report.all_ok());
    }

    #[test]
    fn test_resubmission_changes_nothing() {
        let node = TestNode::new();
        let pooled = TxBuilder::new(1);
        let committed = TxBuilder::new(2);
        node.chain.insert_committed(&committed.build());
        assert!(submit(&node, &[pooled.blob()]).all_ok());
        let backlog = node.pool.backlog(PoolNamespace::Ordinary);
        node.relay_messages();

        let report = submit(&node, &[pooled.blob(), committed.blob()]);
        assert!(report.all_ok());
        assert!(report
            .contexts
            .iter()
            .all(|ctx| ctx.outcome == AdmissionOutcome::Duplicate));
        assert_eq!(node.pool.backlog(PoolNamespace::Ordinary), backlog);
        assert!(node.relay_messages().is_empty());
    }

    // =========================================================================
    // CONCURRENCY
    // =========================================================================

    #[test]
    fn test_overlapping_batches_admit_once() {
        let node = TestNode::new();
        let shared: Vec<Vec<u8>> = (0..24).map(|n| TxBuilder::new(n).blob()).collect();

        let reports: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| submit(&node, &shared)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for report in &reports {
            assert_eq!(report.contexts.len(), shared.len());
            assert!(report.all_ok());
        }
        for n in 0..shared.len() {
            let admitted = reports
                .iter()
                .filter(|r| r.contexts[n].added_to_pool())
                .count();
            assert_eq!(admitted, 1, "item {} admitted {} times", n, admitted);
        }
        assert_eq!(node.pool.len(), shared.len());
    }

    #[test]
    fn test_admitted_blobs_relayed_once_per_batch() {
        let node = TestNode::new();
        let blobs = vec![TxBuilder::new(1).blob(), vec![0u8; 3], TxBuilder::new(2).blob()];
        submit(&node, &blobs);

        let messages = node.relay_messages();
        assert_eq!(
            messages,
            vec![OutboundMessage::Transactions(vec![
                blobs[0].clone(),
                blobs[2].clone()
            ])]
        );
    }

    // =========================================================================
    // REJECTION MEMORY
    // =========================================================================

    #[test]
    fn test_rejection_cache_bounded_under_flood() {
        let node = TestNode::new();
        let bad: Vec<TxBuilder> = (0..250).map(|n| TxBuilder::new(n).offsets(vec![])).collect();
        let blobs: Vec<Vec<u8>> = bad.iter().map(TxBuilder::blob).collect();

        let report = submit(&node, &blobs);
        assert!(report.contexts.iter().all(|ctx| ctx.verification_failed()));

        // Two generations of 100: the full previous one plus 50 current
        let rejections = node.service.rejections();
        assert_eq!(rejections.len(), 150);
        let remembered = bad
            .iter()
            .filter(|b| rejections.was_recently_rejected(&b.tx_id()))
            .count();
        assert_eq!(remembered, 150);
    }

    #[test]
    fn test_metrics_record_outcomes() {
        notary_telemetry::register_metrics().unwrap();
        let node = TestNode::new();
        submit(&node, &[TxBuilder::new(1).blob(), vec![1, 2, 3]]);

        let text = notary_telemetry::encode_metrics().unwrap();
        assert!(text.contains("nc_admission_outcomes_total"));
        assert!(text.contains("outcome=\"admitted\""));
        assert!(text.contains("nc_ingestion_batch_size"));
    }
}
