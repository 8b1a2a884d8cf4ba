//! Write-order guarantees: frames reach the writer in submission order no
//! matter how the parallel stage and the writer interleave.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ll_02_block_stream::BlockStreamConfig;
    use shared_crypto::sha384;
    use shared_types::BlockItem;

    use crate::fakes::{round, transaction_item, FakeSigner, FakeWriterFactory, Harness};
    use ll_02_block_stream::InitialStateHash;
    use shared_types::{ChainSnapshot, ZERO_HASH};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_submission_order_survives_racing_batches() {
        // One item per batch maximizes the number of independently racing
        // parallel stages; the jittering writer stresses the sequential
        // chain on top.
        let config = BlockStreamConfig {
            rounds_per_block: 1,
            block_period: Duration::ZERO,
            serialization_batch_size: 1,
            ..Default::default()
        };
        let h = Harness::resuming(
            config,
            FakeSigner::manual(true),
            FakeWriterFactory::with_write_delay(Duration::from_millis(2)),
            ChainSnapshot::genesis(crate::fakes::TEST_VERSION),
            InitialStateHash::ready(0, ZERO_HASH),
            ZERO_HASH,
        );

        let r = round(1, 10);
        h.service.start_round(&r).await.unwrap();
        let total = 150u8;
        for payload in 0..total {
            h.service.write_item(transaction_item(10, payload)).unwrap();
        }
        h.service.notify_state_hashed(1, sha384(b"s1"));
        assert!(h.service.end_round(&r).await.unwrap());

        let items = h.log.items_for(1);
        assert!(matches!(items[0], BlockItem::Header(_)));
        let payloads: Vec<u8> = items[1..]
            .iter()
            .map(|item| match item {
                BlockItem::EventTransaction(tx) => tx.transaction[0],
                other => panic!("unexpected item {other:?}"),
            })
            .collect();
        let expected: Vec<u8> = (0..total).collect();
        assert_eq!(payloads, expected);
    }
}
