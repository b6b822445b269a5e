// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Batch coordinator: partial failure, fail-fast and finalisation.

mod common;

use std::time::Duration;

use common::{noisy_rgb, png};
use stegforge::queue::BatchCounts;
use stegforge::{
    Algorithm, BatchCoordinator, BatchId, BatchItem, BatchOptions, EmbedConfig, ErrorKind, JobStatus,
    Passphrase, Payload, ProcessingQueue, QueueConfig, QueueError,
};

const WAIT: Duration = Duration::from_secs(120);

fn embed_item(carrier: &[u8], text: &str, config: &EmbedConfig) -> BatchItem {
    BatchItem::Embed { carrier: carrier.to_vec(), payload: Payload::text(text), config: config.clone() }
}

#[test]
fn one_oversized_item_fails_alone() {
    let queue = ProcessingQueue::new(QueueConfig::default().with_workers(3)).unwrap();
    let batches = BatchCoordinator::new(queue.handle());
    let carrier = png(&noisy_rgb(32, 32, 51));
    let config = EmbedConfig::new(Algorithm::Lsb);

    let items = (0..5)
        .map(|i| {
            if i == 2 {
                embed_item(&carrier, &"x".repeat(4096), &config)
            } else {
                embed_item(&carrier, &format!("item {i}"), &config)
            }
        })
        .collect();
    let id = batches.submit_batch(items, BatchOptions::default()).unwrap();
    let summary = batches.wait_batch(id, WAIT).unwrap();

    assert!(summary.finalized);
    assert!(summary.finalized_at.is_some());
    assert_eq!(
        summary.counts,
        BatchCounts { total: 5, pending: 0, running: 0, succeeded: 4, failed: 1, cancelled: 0 }
    );
    let failed = &summary.items[2];
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.error.as_ref().unwrap().kind, ErrorKind::PayloadTooLarge);
    for (i, item) in summary.items.iter().enumerate() {
        assert_eq!(item.index, i);
        if i != 2 {
            assert_eq!(item.status, JobStatus::Completed);
            assert!(item.outcome.is_some());
        }
    }
}

#[test]
fn fail_fast_cancels_the_rest() {
    let queue = ProcessingQueue::new(QueueConfig::default().with_workers(1)).unwrap();
    let batches = BatchCoordinator::new(queue.handle());
    let carrier = png(&noisy_rgb(32, 32, 52));
    let slow = EmbedConfig::new(Algorithm::Lsb).with_encryption(Passphrase::new("slow"));

    let mut items = vec![embed_item(&carrier, &"x".repeat(4096), &slow)];
    items.extend((0..4).map(|i| embed_item(&carrier, &format!("item {i}"), &slow)));
    let id = batches.submit_batch(items, BatchOptions { fail_fast: true }).unwrap();
    let summary = batches.wait_batch(id, WAIT).unwrap();

    assert!(summary.finalized);
    assert_eq!(summary.counts.failed, 1);
    assert_eq!(summary.items[0].status, JobStatus::Failed);
    // The single worker may already have picked up the next item; it still
    // stops at its next phase boundary.
    assert!(summary.counts.cancelled >= 3, "{:?}", summary.counts);
    assert_eq!(summary.counts.terminal(), 5);
}

#[test]
fn extract_items_mix_with_embeds() {
    let queue = ProcessingQueue::new(QueueConfig::default().with_workers(2)).unwrap();
    let batches = BatchCoordinator::new(queue.handle());
    let carrier = png(&noisy_rgb(64, 64, 53));
    let items = vec![
        embed_item(&carrier, "hello", &EmbedConfig::new(Algorithm::Lsb)),
        BatchItem::Extract { image: carrier.clone(), config: stegforge::ExtractConfig::auto() },
    ];
    let id = batches.submit_batch(items, BatchOptions::default()).unwrap();
    let summary = batches.wait_batch(id, WAIT).unwrap();
    assert_eq!(summary.counts.succeeded, 1);
    assert_eq!(summary.items[1].error.as_ref().unwrap().kind, ErrorKind::NoEmbeddingDetected);
}

#[test]
fn empty_batch_is_final_at_once() {
    let queue = ProcessingQueue::new(QueueConfig::default().with_workers(1)).unwrap();
    let batches = BatchCoordinator::new(queue.handle());
    let id = batches.submit_batch(Vec::new(), BatchOptions::default()).unwrap();
    let summary = batches.get_batch(id).unwrap();
    assert!(summary.finalized);
    assert_eq!(summary.counts.total, 0);
}

#[test]
fn unknown_batch() {
    let queue = ProcessingQueue::new(QueueConfig::default().with_workers(1)).unwrap();
    let batches = BatchCoordinator::new(queue.handle());
    assert_eq!(batches.get_batch(BatchId(42)), Err(QueueError::UnknownBatch(BatchId(42))));
}

#[test]
fn cleared_jobs_release_batch_outcomes() {
    let queue = ProcessingQueue::new(QueueConfig::default().with_workers(2)).unwrap();
    let batches = BatchCoordinator::new(queue.handle());
    let carrier = png(&noisy_rgb(32, 32, 55));
    let items = (0..2).map(|i| embed_item(&carrier, &format!("{i}"), &EmbedConfig::new(Algorithm::Lsb))).collect();
    let id = batches.submit_batch(items, BatchOptions::default()).unwrap();
    let summary = batches.wait_batch(id, WAIT).unwrap();
    assert!(summary.items.iter().all(|i| i.outcome.is_some()));

    assert_eq!(queue.clear_finished(), 2);
    let after = batches.get_batch(id).unwrap();
    assert_eq!(after.counts.succeeded, 2);
    assert!(after.items.iter().all(|i| i.outcome.is_none()));
}

#[test]
fn finalised_batches_expire_with_the_job_ttl() {
    let queue = ProcessingQueue::new(QueueConfig::default().with_workers(1).with_job_ttl_secs(0)).unwrap();
    let batches = BatchCoordinator::new(queue.handle());
    let carrier = png(&noisy_rgb(32, 32, 56));
    let id = batches
        .submit_batch(vec![embed_item(&carrier, "short-lived", &EmbedConfig::new(Algorithm::Lsb))], BatchOptions::default())
        .unwrap();
    assert!(batches.wait_batch(id, WAIT).unwrap().finalized);

    assert_eq!(batches.purge_expired(), 1);
    assert_eq!(batches.get_batch(id), Err(QueueError::UnknownBatch(id)));
}

#[test]
fn cancel_batch_and_remove() {
    let queue = ProcessingQueue::new(QueueConfig::default().with_workers(1)).unwrap();
    let batches = BatchCoordinator::new(queue.handle());
    let carrier = png(&noisy_rgb(32, 32, 54));
    let slow = EmbedConfig::new(Algorithm::Lsb).with_encryption(Passphrase::new("slow"));
    let items = (0..4).map(|i| embed_item(&carrier, &format!("{i}"), &slow)).collect();
    let id = batches.submit_batch(items, BatchOptions::default()).unwrap();

    assert!(batches.cancel_batch(id).unwrap() >= 3);
    let summary = batches.wait_batch(id, WAIT).unwrap();
    assert!(summary.finalized);
    assert!(summary.counts.cancelled >= 3);

    batches.remove_batch(id).unwrap();
    assert!(batches.get_batch(id).is_err());
}
