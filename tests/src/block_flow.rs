//! Round-driven block lifecycle flows: boundary decisions, chained
//! headers, and seed behavior.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ll_02_block_stream::BlockStreamConfig;
    use shared_crypto::sha384;
    use shared_types::{BlockItem, ZERO_HASH};

    use crate::fakes::{
        freeze_round, result_item, round, transaction_item, wait_until, FakeSigner, Harness,
    };

    fn every_round_config() -> BlockStreamConfig {
        BlockStreamConfig {
            rounds_per_block: 1,
            block_period: Duration::ZERO,
            serialization_batch_size: 4,
            ..Default::default()
        }
    }

    fn long_period_config() -> BlockStreamConfig {
        BlockStreamConfig {
            block_period: Duration::from_secs(3600),
            ..Default::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_headers_chain_across_blocks() {
        let h = Harness::new(every_round_config(), FakeSigner::manual(true));
        for n in 1..=3u64 {
            let r = round(n, 10 + n as i64);
            h.service.start_round(&r).await.unwrap();
            h.service.write_item(transaction_item(10 + n as i64, n as u8)).unwrap();
            h.service.write_item(result_item(10 + n as i64, n as u8)).unwrap();
            h.service
                .notify_state_hashed(n, sha384(&n.to_be_bytes()));
            assert!(h.service.end_round(&r).await.unwrap(), "round {n}");
        }
        // Open block 4 so the trailing window covers blocks 1 through 3.
        h.service.start_round(&round(4, 14)).await.unwrap();

        let mut previous = ZERO_HASH;
        for block in 1..=3u64 {
            let items = h.log.items_for(block);
            match &items[0] {
                BlockItem::Header(header) => {
                    assert_eq!(header.number, block);
                    assert_eq!(
                        header.previous_block_hash, previous,
                        "header of block {block}"
                    );
                }
                other => panic!("block {block} starts with {other:?}"),
            }
            previous = h.service.block_hash_by_number(block).unwrap();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_freeze_round_closes_despite_long_period() {
        let h = Harness::new(long_period_config(), FakeSigner::manual(true));
        let r = freeze_round(1, 10);
        h.service.start_round(&r).await.unwrap();
        h.service.notify_state_hashed(1, sha384(b"s1"));
        assert!(h.service.end_round(&r).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_unready_signer_holds_even_a_freeze_block() {
        let h = Harness::new(every_round_config(), FakeSigner::manual(false));
        let r1 = freeze_round(1, 10);
        h.service.start_round(&r1).await.unwrap();
        h.service.notify_state_hashed(1, sha384(b"s1"));
        assert!(!h.service.end_round(&r1).await.unwrap());

        // Once the signer comes back, the held freeze closes the block.
        h.signer.set_ready(true);
        let r2 = round(2, 11);
        h.service.start_round(&r2).await.unwrap();
        h.service.notify_state_hashed(2, sha384(b"s2"));
        assert!(h.service.end_round(&r2).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_period_measured_in_consensus_time() {
        let config = BlockStreamConfig {
            block_period: Duration::from_secs(2),
            ..Default::default()
        };
        let h = Harness::new(config, FakeSigner::manual(true));
        for (n, seconds, expect_close) in [(1u64, 10i64, false), (2, 11, false), (3, 13, true)] {
            let r = round(n, seconds);
            h.service.start_round(&r).await.unwrap();
            h.service
                .notify_state_hashed(n, sha384(&n.to_be_bytes()));
            assert_eq!(
                h.service.end_round(&r).await.unwrap(),
                expect_close,
                "round {n}"
            );
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_seed_advances_with_each_result() {
        let h = Harness::new(long_period_config(), FakeSigner::manual(true));
        h.service.start_round(&round(1, 10)).await.unwrap();

        for payload in 0..3u8 {
            h.service.write_item(result_item(10, payload)).unwrap();
        }
        let first = h.service.prng_seed().await.unwrap();
        assert!(first.is_some());

        h.service.write_item(result_item(10, 3)).unwrap();
        let second = h.service.prng_seed().await.unwrap();
        assert!(second.is_some());
        assert_ne!(first, second);

        // Without a new result the window holds still.
        assert_eq!(h.service.prng_seed().await.unwrap(), second);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_auto_signer_end_to_end() {
        let h = Harness::new(every_round_config(), FakeSigner::auto());
        let r = round(1, 10);
        h.service.start_round(&r).await.unwrap();
        h.service.write_item(transaction_item(10, 1)).unwrap();
        h.service.write_item(result_item(10, 1)).unwrap();
        h.service.notify_state_hashed(1, sha384(b"s1"));
        assert!(h.service.end_round(&r).await.unwrap());

        let log = h.log.clone();
        wait_until(move || log.closed_blocks() == vec![1]).await;

        let committed = h.store.committed();
        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].block_number, 1);
        assert_eq!(committed[0].software_version, crate::fakes::TEST_VERSION);

        let items = h.log.items_for(1);
        match items.last().unwrap() {
            BlockItem::BlockProof(proof) => {
                assert_eq!(proof.block, 1);
                assert!(proof.sibling_hashes.is_empty());
                assert!(proof.signature.starts_with(b"sig:"));
                assert_eq!(proof.previous_block_root_hash, ZERO_HASH);
            }
            other => panic!("block ends with {other:?}"),
        }
    }
}
