//! # Notarization Flows
//!
//! Partial-signature requests through
//! `TxAdmissionApi::handle_notarization_request`, then relay from the idle tick:
//!
//! 1. **Threshold collection**: successive signatures for one event are all pooled
//! 2. **Consistency**: count and extra-index mismatches never reach the pool
//! 3. **Height gating**: requests ahead of the chain succeed without admission
//! 4. **Relay**: the idle tick re-encodes signer slots for the network
//! 5. **Supersession**: a committed fully signed transaction retires its requests

#[cfg(test)]
mod tests {
    use nc_06_tx_admission::test_utils::{block_with, test_config, TestNode, TxBuilder};
    use nc_06_tx_admission::{
        AdmissionConfig, AdmissionOutcome, GateReason, IngestFlags, OutboundMessage,
        PoolNamespace, PoolView, RefreshOutcome, SignerViolation, TxAdmissionApi,
    };
    use shared_types::TX_VERSION_NOTARIZATION;

    const SLOTS: usize = 4;

    fn node() -> TestNode {
        TestNode::with_config(AdmissionConfig {
            signer_slots: SLOTS,
            ..test_config()
        })
    }

    /// Slot text with `signers` filled in slot order.
    fn slots(signers: &[u8]) -> String {
        (0..SLOTS)
            .map(|slot| match signers.get(slot) {
                Some(index) => format!("{:02}", index),
                None => "-1".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_signatures_accumulate_toward_threshold() {
        let node = node();
        let signers = [4u8, 11, 27];

        for round in 1..=signers.len() {
            let present = &signers[..round];
            let request = TxBuilder::notarization_request(
                7,
                &slots(present),
                round as u8,
                present[round - 1],
            );
            let ctx = node.service.handle_notarization_request(&request.blob(), 0);
            assert!(ctx.added_to_pool(), "round {}: {}", round, ctx.outcome);
        }

        assert_eq!(
            node.pool.backlog(PoolNamespace::Notarization).count,
            signers.len()
        );
        assert_eq!(node.pool.backlog(PoolNamespace::Ordinary).count, 0);
    }

    #[test]
    fn test_count_mismatch_rejected_for_every_layout() {
        let node = node();
        let layouts = [vec![1u8], vec![1, 2], vec![1, 2, 3], vec![1, 2, 3, 4]];

        for present in &layouts {
            for asserted in 0..=SLOTS as u8 {
                if asserted as usize == present.len() {
                    continue;
                }
                let request = TxBuilder::notarization_request(
                    1,
                    &slots(present),
                    asserted,
                    *present.last().unwrap(),
                );
                let ctx = node.service.handle_notarization_request(&request.blob(), 0);
                assert_eq!(
                    ctx.outcome,
                    AdmissionOutcome::ConsistencyFailure(SignerViolation::CountMismatch {
                        asserted,
                        present: present.len()
                    })
                );
            }
        }
        assert!(node.pool.is_empty());
    }

    #[test]
    fn test_repeated_signer_rejected() {
        let node = node();
        let request = TxBuilder::notarization_request(1, &slots(&[9, 9]), 2, 9);
        assert_eq!(
            node.service
                .handle_notarization_request(&request.blob(), 0)
                .outcome,
            AdmissionOutcome::ConsistencyFailure(SignerViolation::RepeatedSigner(9))
        );
    }

    #[test]
    fn test_request_ahead_of_chain_held_until_caught_up() {
        let node = node();
        node.chain.set_height(100);
        let request = TxBuilder::notarization_request(3, &slots(&[12]), 1, 12);

        let ctx = node.service.handle_notarization_request(&request.blob(), 105);
        assert_eq!(
            ctx.outcome,
            AdmissionOutcome::Gated(GateReason::BehindTarget {
                current_height: 100,
                target_height: 105
            })
        );
        assert!(!ctx.verification_failed());
        assert!(!node.pool.have(&request.tx_id()));

        node.chain.set_height(104);
        let ctx = node.service.handle_notarization_request(&request.blob(), 105);
        assert!(ctx.added_to_pool());
    }

    #[test]
    fn test_requests_rejected_on_ordinary_path_and_vice_versa() {
        let node = node();
        let request = TxBuilder::notarization_request(1, &slots(&[3]), 1, 3);
        let report = node
            .service
            .handle_incoming_txs(&[request.blob()], IngestFlags::default());
        assert!(report.contexts[0].verification_failed());

        let fully_signed = TxBuilder::new(2).version(TX_VERSION_NOTARIZATION);
        let ctx = node
            .service
            .handle_notarization_request(&fully_signed.blob(), 0);
        assert!(ctx.verification_failed());

        let report = node
            .service
            .handle_incoming_txs(&[fully_signed.blob()], IngestFlags::default());
        assert!(report.contexts[0].added_to_pool());
    }

    #[test]
    fn test_idle_tick_relays_pending_requests() {
        let node = node();
        let first = TxBuilder::notarization_request(5, &slots(&[2]), 1, 2);
        let second = TxBuilder::notarization_request(5, &slots(&[2, 40]), 2, 40);
        for request in [&first, &second] {
            assert!(node
                .service
                .handle_notarization_request(&request.blob(), 0)
                .added_to_pool());
        }

        let report = node.service.on_idle();
        assert_eq!(report.checkpoint, RefreshOutcome::NotMainnet);
        assert_eq!(report.notarization_relayed, 2);

        let encoded: Vec<String> = node
            .relay_messages()
            .into_iter()
            .filter_map(|message| match message {
                OutboundMessage::NotarizationRequest(request) => Some(request.signers_index),
                _ => None,
            })
            .collect();
        assert_eq!(encoded, vec!["02-1-1-1".to_string(), "0240-1-1".to_string()]);

        // Requests stay pooled until a superseding transaction commits
        assert_eq!(node.pool.backlog(PoolNamespace::Notarization).count, 2);
    }

    #[test]
    fn test_committed_notarization_ends_relay_of_its_requests() {
        let node = node();
        let first = TxBuilder::notarization_request(5, &slots(&[2]), 1, 2);
        let second = TxBuilder::next_request(6, &first, &slots(&[2, 40]), 2, 40);
        for request in [&first, &second] {
            assert!(node
                .service
                .handle_notarization_request(&request.blob(), 0)
                .added_to_pool());
        }
        assert_eq!(node.service.on_idle().notarization_relayed, 2);

        let completed = TxBuilder::completing(7, &second, &slots(&[2, 40, 11]), 3);
        let report = node
            .service
            .handle_incoming_txs(&[completed.blob()], IngestFlags::default());
        assert!(report.contexts[0].added_to_pool());
        node.service
            .handle_found_block(&block_with(vec![completed.tx_id()]))
            .unwrap();
        node.relay_messages();

        for _ in 0..3 {
            assert_eq!(node.service.on_idle().notarization_relayed, 0);
        }
        assert!(!node.pool.have(&first.tx_id()));
        assert!(!node.pool.have(&second.tx_id()));
        assert_eq!(node.pool.backlog(PoolNamespace::Notarization).count, 0);
        assert!(node.relay_messages().is_empty());
    }

    #[test]
    fn test_storage_failure_keeps_request_out_of_pool() {
        let node = node();
        node.chain.fail_storage(true);
        let request = TxBuilder::notarization_request(1, &slots(&[6]), 1, 6);

        let ctx = node.service.handle_notarization_request(&request.blob(), 0);
        assert!(ctx.verification_impossible());
        assert!(node.pool.is_empty());
    }
}
