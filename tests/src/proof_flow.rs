//! Proof finalization flows: direct signatures, indirect sibling chains,
//! and stale signatures.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ll_02_block_stream::{BlockStreamConfig, InitialStateHash};
    use shared_crypto::{combine, sha384};
    use shared_types::{BlockItem, BlockProof, ChainSnapshot, Hash};

    use crate::fakes::{
        result_item, round, transaction_item, FakeSigner, FakeWriterFactory, Harness, TEST_VERSION,
    };

    fn every_round_config() -> BlockStreamConfig {
        BlockStreamConfig {
            rounds_per_block: 1,
            block_period: Duration::ZERO,
            ..Default::default()
        }
    }

    /// Three closed blocks (10, 11, 12) pending, none proven yet.
    async fn harness_with_three_pending() -> Harness {
        let h = Harness::resuming(
            every_round_config(),
            FakeSigner::manual(true),
            FakeWriterFactory::new(),
            ChainSnapshot::resuming_from(9, TEST_VERSION),
            InitialStateHash::ready(100, sha384(b"state-100")),
            sha384(b"block-9"),
        );
        for n in 101..=103u64 {
            let r = round(n, n as i64);
            h.service.start_round(&r).await.unwrap();
            h.service.write_item(transaction_item(n as i64, n as u8)).unwrap();
            h.service.write_item(result_item(n as i64, n as u8)).unwrap();
            h.service
                .notify_state_hashed(n, sha384(&n.to_be_bytes()));
            assert!(h.service.end_round(&r).await.unwrap(), "round {n}");
        }
        // Open block 13 so blocks 10 through 12 enter the trailing window.
        h.service.start_round(&round(104, 104)).await.unwrap();
        h
    }

    fn proof_of(h: &Harness, block: u64) -> BlockProof {
        match h.log.items_for(block).last().unwrap() {
            BlockItem::BlockProof(proof) => proof.clone(),
            other => panic!("block {block} ends with {other:?}"),
        }
    }

    /// Climbs an indirect proof's sibling chain from `start` upward.
    fn climb(start: Hash, proof: &BlockProof) -> Hash {
        assert_eq!(proof.sibling_hashes.len() % 2, 0);
        proof.sibling_hashes.chunks_exact(2).fold(start, |hash, pair| {
            combine(&combine(&hash, &pair[0].hash), &pair[1].hash)
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stale_signature_flushes_nothing() {
        let h = harness_with_three_pending().await;
        h.service
            .handle_signature(sha384(b"nothing pending has this hash"), b"sig")
            .await
            .unwrap();
        assert!(h.log.closed_blocks().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_signature_for_latest_block_proves_all_pending() {
        let h = harness_with_three_pending().await;
        let h10 = h.service.block_hash_by_number(10).unwrap();
        let h11 = h.service.block_hash_by_number(11).unwrap();
        let h12 = h.service.block_hash_by_number(12).unwrap();

        h.service.handle_signature(h12, b"ledger-sig").await.unwrap();

        assert_eq!(h.log.closed_blocks(), vec![10, 11, 12]);
        let p10 = proof_of(&h, 10);
        let p11 = proof_of(&h, 11);
        let p12 = proof_of(&h, 12);

        assert_eq!(p10.sibling_hashes.len(), 4);
        assert_eq!(p11.sibling_hashes.len(), 2);
        assert!(p12.sibling_hashes.is_empty());
        for proof in [&p10, &p11, &p12] {
            assert_eq!(proof.signature, b"ledger-sig");
        }
        assert_eq!(p10.previous_block_root_hash, sha384(b"block-9"));

        // The sibling chains really connect each block hash to the signed
        // one.
        assert_eq!(climb(h10, &p10), h12);
        assert_eq!(climb(h11, &p11), h12);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_earlier_signature_leaves_later_blocks_pending() {
        let h = harness_with_three_pending().await;
        let h10 = h.service.block_hash_by_number(10).unwrap();
        let h11 = h.service.block_hash_by_number(11).unwrap();

        h.service.handle_signature(h10, b"sig-a").await.unwrap();
        assert_eq!(h.log.closed_blocks(), vec![10]);
        assert!(proof_of(&h, 10).sibling_hashes.is_empty());

        h.service.handle_signature(h11, b"sig-b").await.unwrap();
        assert_eq!(h.log.closed_blocks(), vec![10, 11]);
        assert!(proof_of(&h, 11).sibling_hashes.is_empty());
    }
}
