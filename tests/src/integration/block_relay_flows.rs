//! # Found-Block Flows
//!
//! A locally found block against live ingestion:
//!
//! 1. **Commit**: pooled transactions move to storage and leave the pool
//! 2. **Failure paths**: every exit resumes the miner
//! 3. **Serialization**: block commits and batch ingestion share one gate

#[cfg(test)]
mod tests {
    use nc_06_tx_admission::test_utils::{block_with, TestNode, TxBuilder};
    use nc_06_tx_admission::{
        AdmissionOutcome, ChainView, FoundBlockError, FoundBlockReport, IngestFlags,
        OutboundMessage, PoolView, TxAdmissionApi,
    };
    use shared_types::Hash;

    fn pool_all(node: &TestNode, seeds: std::ops::Range<u64>) -> Vec<Hash> {
        let blobs: Vec<Vec<u8>> = seeds.clone().map(|s| TxBuilder::new(s).blob()).collect();
        let report = node
            .service
            .handle_incoming_txs(&blobs, IngestFlags::default());
        assert!(report.all_ok());
        node.relay_messages();
        seeds.map(|s| TxBuilder::new(s).tx_id()).collect()
    }

    #[test]
    fn test_found_block_moves_transactions_to_storage() {
        let node = TestNode::new();
        let ids = pool_all(&node, 0..3);
        let extra = pool_all(&node, 10..11);

        let report = node.service.handle_found_block(&block_with(ids.clone())).unwrap();
        assert_eq!(report, FoundBlockReport::Relayed);
        assert_eq!(node.chain.current_height(), 1);
        assert!(ids.iter().all(|id| !node.pool.have(id) && node.chain.have_tx(id)));
        assert!(node.pool.have(&extra[0]));

        // Committed transactions now dedup against storage
        let report = node
            .service
            .handle_incoming_txs(&[TxBuilder::new(0).blob()], IngestFlags::default());
        assert_eq!(report.contexts[0].outcome, AdmissionOutcome::Duplicate);
    }

    #[test]
    fn test_block_transactions_replayed_from_block_are_noted() {
        let node = TestNode::new();
        let blob = TxBuilder::new(4).blob();
        let flags = IngestFlags {
            is_from_block: true,
            ..IngestFlags::default()
        };

        let report = node.service.handle_incoming_txs(&[blob.clone()], flags);
        assert!(report.contexts[0].added_to_pool());
        // Seen again in a later block: still a duplicate, still noted
        let report = node.service.handle_incoming_txs(&[blob], flags);
        assert_eq!(report.contexts[0].outcome, AdmissionOutcome::Duplicate);
        assert!(node.chain.was_noted_in_block(&TxBuilder::new(4).tx_id()));
        assert!(node.relay_messages().is_empty());
    }

    #[test]
    fn test_every_failure_resumes_mining() {
        let node = TestNode::new();
        let ids = pool_all(&node, 0..2);

        let missing = block_with(vec![[0xab; 32]]);
        assert!(matches!(
            node.service.handle_found_block(&missing),
            Err(FoundBlockError::MissingPoolTx(_))
        ));

        node.chain.reject_blocks(true);
        assert_eq!(
            node.service.handle_found_block(&block_with(ids.clone())),
            Err(FoundBlockError::NotAccepted)
        );
        node.chain.reject_blocks(false);

        node.chain.fail_storage(true);
        assert!(matches!(
            node.service.handle_found_block(&block_with(ids)),
            Err(FoundBlockError::Storage(_))
        ));

        assert_eq!(node.miner.pauses(), 3);
        assert_eq!(node.miner.resumes(), 3);
        assert_eq!(node.pool.len(), 2);
    }

    #[test]
    fn test_stale_block_not_relayed() {
        let node = TestNode::new();
        let ids = pool_all(&node, 0..2);
        node.chain.reorg_after_commit(true);

        let report = node.service.handle_found_block(&block_with(ids.clone())).unwrap();
        assert_eq!(report, FoundBlockReport::Stale { missing: ids });
        assert!(!node
            .relay_messages()
            .iter()
            .any(|m| matches!(m, OutboundMessage::Block { .. })));
    }

    #[test]
    fn test_found_blocks_and_batches_interleave_safely() {
        let node = TestNode::new();
        let ids = pool_all(&node, 0..8);
        let late: Vec<Vec<u8>> = (100..132).map(|s| TxBuilder::new(s).blob()).collect();

        std::thread::scope(|scope| {
            let batch = scope.spawn(|| {
                node.service
                    .handle_incoming_txs(&late, IngestFlags::default())
            });
            let block = scope.spawn(|| node.service.handle_found_block(&block_with(ids.clone())));

            assert!(batch.join().unwrap().all_ok());
            assert_eq!(block.join().unwrap(), Ok(FoundBlockReport::Relayed));
        });

        assert_eq!(node.pool.len(), late.len());
        assert!(ids.iter().all(|id| node.chain.have_tx(id)));
    }
}
