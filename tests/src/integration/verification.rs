//! # Verification Flows
//!
//! Producer → mediator → verification feed → sessions, wired through
//! `node-runtime` exactly as the binary wires them.
//!
//! 1. A well-formed block verifies, in both session types, to the same hash
//! 2. A forged signature fails the block but leaves the stream running
//! 3. Block linkage is checked against the previous session's hash
//! 4. A protocol violation halts the whole stream

#[cfg(test)]
mod tests {
    use super::super::wait_until;
    use block_node_telemetry::BlockNodeMetrics;
    use bn_01_live_stream::BatchEvent;
    use bn_02_block_verification::test_utils::{
        block_batches, block_batches_with_parent, block_hash_of,
    };
    use bn_02_block_verification::{
        BlockVerificationSessionType, BlockVerificationStatus, VerificationResult,
        VerificationResultFuture,
    };
    use ed25519_dalek::{Signer, SigningKey};
    use node_runtime::{BlockNode, BlockNodeConfig};
    use shared_bus::{PublishError, SubscriptionHandler};
    use shared_types::{BlockItem, BlockItemBatch};
    use std::sync::Arc;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(10);

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    fn ledger_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn config(session_type: BlockVerificationSessionType) -> BlockNodeConfig {
        let mut config = BlockNodeConfig::default();
        config.verification.session_type = session_type;
        config.verifier_threads = 2;
        config
    }

    fn start(config: BlockNodeConfig) -> (BlockNode, BlockNodeMetrics) {
        let metrics = BlockNodeMetrics::new().unwrap();
        let node = BlockNode::start_with_metrics(config, &metrics).unwrap();
        (node, metrics)
    }

    fn signed_node(session_type: BlockVerificationSessionType) -> (BlockNode, BlockNodeMetrics) {
        let mut config = config(session_type);
        config.ledger_public_key = Some(hex::encode(ledger_key().verifying_key().to_bytes()));
        start(config)
    }

    /// Replace the proof signature with the ledger's signature over the
    /// block hash.
    fn sign(batches: Vec<BatchEvent>, key: &SigningKey) -> Vec<BatchEvent> {
        let signature = key.sign(&block_hash_of(&batches)).to_bytes().to_vec();
        batches
            .into_iter()
            .map(|batch| {
                let items = batch
                    .items()
                    .iter()
                    .cloned()
                    .map(|item| match item {
                        BlockItem::BlockProof(mut proof) => {
                            proof.block_signature = signature.clone();
                            BlockItem::BlockProof(proof)
                        }
                        other => other,
                    })
                    .collect();
                Arc::new(BlockItemBatch::new(items))
            })
            .collect()
    }

    fn publish_all(node: &BlockNode, batches: &[BatchEvent]) {
        for batch in batches {
            node.publish(batch.clone()).unwrap();
        }
    }

    /// Result future of the session verifying block `number`.
    fn session_result(node: &BlockNode, number: u64) -> VerificationResultFuture {
        let feed = node.verification().unwrap();
        let lookup = || {
            feed.with_service(|service| {
                service
                    .current_session()
                    .filter(|session| session.block_number() == number)
                    .map(|session| session.result().clone())
            })
        };
        assert!(wait_until(|| lookup().is_some()), "no session for block {number}");
        lookup().unwrap()
    }

    fn verified(node: &BlockNode, number: u64) -> VerificationResult {
        session_result(node, number)
            .wait_timeout(WAIT)
            .expect("session did not complete")
            .unwrap()
    }

    // =========================================================================
    // END TO END
    // =========================================================================

    #[test]
    fn test_signed_block_verifies_end_to_end() {
        let (node, metrics) = signed_node(BlockVerificationSessionType::Async);
        let batches = sign(block_batches(1, 4, 8), &ledger_key());

        publish_all(&node, &batches);
        let result = verified(&node, 1);

        assert_eq!(result.status, BlockVerificationStatus::Verified);
        assert_eq!(result.block_hash, block_hash_of(&batches));
        assert!(wait_until(|| metrics.verification().blocks_verified.get() == 1));
        assert_eq!(metrics.verification().blocks_received.get(), 1);
        assert_eq!(metrics.verification().blocks_failed.get(), 0);
        assert!(node.status().is_accepting());
    }

    #[test]
    fn test_sync_and_async_sessions_agree() {
        let batches = block_batches(3, 5, 13);
        let mut hashes = Vec::new();

        for session_type in [
            BlockVerificationSessionType::Sync,
            BlockVerificationSessionType::Async,
        ] {
            let (node, _) = start(config(session_type));
            publish_all(&node, &batches);
            let result = verified(&node, 3);
            assert!(result.is_verified());
            hashes.push(result.block_hash);
        }

        assert_eq!(hashes[0], hashes[1]);
        assert_eq!(hashes[0], block_hash_of(&batches));
    }

    #[test]
    fn test_large_block_matches_level_by_level_hash() {
        let mut config = config(BlockVerificationSessionType::Async);
        config.verification = config.verification.with_hash_combine_batch_size(16).unwrap();
        let (node, _) = start(config);
        let batches = block_batches(9, 40, 25);

        publish_all(&node, &batches);

        assert_eq!(verified(&node, 9).block_hash, block_hash_of(&batches));
    }

    #[test]
    fn test_forged_signature_fails_block_only() {
        let (node, metrics) = signed_node(BlockVerificationSessionType::Sync);
        let forger = SigningKey::from_bytes(&[8u8; 32]);
        let batches = sign(block_batches(1, 2, 3), &forger);

        publish_all(&node, &batches);
        let result = verified(&node, 1);

        assert_eq!(result.status, BlockVerificationStatus::InvalidHashOrSignature);
        assert_eq!(result.block_hash, block_hash_of(&batches));
        assert!(wait_until(|| metrics.verification().blocks_failed.get() == 1));
        assert!(node.status().is_accepting());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_result_future_resolves_asynchronously() {
        let (node, metrics) = start(config(BlockVerificationSessionType::Async));
        let batches = block_batches(5, 3, 6);
        publish_all(&node, &batches);

        let feed = node.verification().unwrap().clone();
        let future = tokio::time::timeout(WAIT, async {
            loop {
                let found = feed.with_service(|service| {
                    service
                        .current_session()
                        .filter(|session| session.block_number() == 5)
                        .map(|session| session.result().clone())
                });
                if let Some(future) = found {
                    break future;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("no session for block 5");

        let result = tokio::time::timeout(WAIT, future.wait_async())
            .await
            .expect("session did not complete")
            .unwrap();
        assert!(result.is_verified());
        assert_eq!(result.block_hash, block_hash_of(&batches));
        assert_eq!(metrics.verification().blocks_verified.get(), 1);
    }

    // =========================================================================
    // BLOCK LINKAGE
    // =========================================================================

    #[test]
    fn test_linked_blocks_pass_linkage_check() {
        let (node, metrics) = start(config(BlockVerificationSessionType::Async));
        let first = block_batches(1, 2, 4);
        let second = block_batches_with_parent(2, block_hash_of(&first), 2, 4);

        publish_all(&node, &first);
        let first_result = session_result(&node, 1);
        publish_all(&node, &second);

        assert!(first_result.wait_timeout(WAIT).unwrap().is_ok());
        verified(&node, 2);
        assert!(wait_until(|| metrics.verification().blocks_verified.get() == 2));
        assert_eq!(metrics.verification().blocks_failed.get(), 0);
    }

    #[test]
    fn test_broken_linkage_counts_failed_block() {
        let (node, metrics) = start(config(BlockVerificationSessionType::Sync));
        let first = block_batches(1, 2, 4);
        let second = block_batches_with_parent(2, [0xab; 48], 2, 4);

        publish_all(&node, &first);
        publish_all(&node, &second);
        verified(&node, 2);

        assert!(wait_until(|| metrics.verification().blocks_failed.get() == 1));
        assert_eq!(metrics.verification().blocks_verified.get(), 2);
        assert!(node.status().is_accepting());
    }

    // =========================================================================
    // GLOBAL HALT
    // =========================================================================

    #[test]
    fn test_empty_batch_halts_the_node() {
        let (node, metrics) = start(config(BlockVerificationSessionType::Async));
        let (consumer, _receiver) = node.subscribe_live_consumer(16).unwrap();
        publish_all(&node, &block_batches(1, 1, 2));

        node.publish(Arc::new(BlockItemBatch::new(Vec::new())))
            .unwrap();

        assert!(wait_until(|| !node.status().is_accepting()));
        assert!(wait_until(|| node.mediator().subscriber_count() == 0));
        assert!(!node.mediator().is_subscribed(consumer.as_ref()));
        assert_eq!(metrics.verification().verification_errors.get(), 1);
        assert_eq!(metrics.channel().producers_halted.get(), 1);
        assert!(matches!(
            node.publish(block_batches(2, 1, 1).remove(0)),
            Err(PublishError::NotAccepting(_))
        ));
    }

    #[test]
    fn test_disabled_verification_still_streams() {
        let mut config = config(BlockVerificationSessionType::Async);
        config.verification.enabled = false;
        let (node, metrics) = start(config);
        let (_consumer, mut receiver) = node.subscribe_live_consumer(16).unwrap();
        let batches = block_batches(1, 3, 2);

        publish_all(&node, &batches);

        let mut received = Vec::new();
        assert!(wait_until(|| {
            while let Ok(batch) = receiver.try_recv() {
                received.push(batch);
            }
            received.len() == batches.len()
        }));
        assert_eq!(received, batches);
        assert_eq!(metrics.verification().blocks_received.get(), 0);
    }
}
