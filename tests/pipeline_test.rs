use futures::future::join_all;
use muduo_queue::{BoundedBlockingQueue, CountdownLatch, TryTakeError};
use std::time::Duration;
use tracing::info;

#[path = "../src/bin/pipeline/pipeline.rs"]
mod pipeline;

const PRODUCERS: usize = 3;
const CONSUMERS: usize = 2;
const ITEMS: usize = 500;

#[tokio::test]
async fn blocking_pool_pipeline() {
    let queue = BoundedBlockingQueue::new(4);
    let done = CountdownLatch::new(PRODUCERS);

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|id| {
            let queue = queue.clone();
            let done = done.clone();
            tokio::task::spawn_blocking(move || {
                for seq in 0..ITEMS {
                    queue.put((id, seq)).unwrap();
                }
                done.countdown();
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let queue = queue.clone();
            tokio::task::spawn_blocking(move || {
                let mut got = Vec::new();
                loop {
                    match queue.try_take(Duration::from_millis(10)) {
                        Ok(item) => got.push(item),
                        Err(TryTakeError::WouldBlock) => continue,
                        Err(TryTakeError::Closed) => break,
                    }
                }
                got
            })
        })
        .collect();

    let closer = queue.clone();
    let closed = tokio::task::spawn_blocking(move || {
        done.wait();
        closer.close()
    });

    for result in join_all(producers).await {
        result.unwrap();
    }
    assert!(closed.await.unwrap());

    let mut per_producer = vec![Vec::new(); PRODUCERS];
    for result in join_all(consumers).await {
        let got = result.unwrap();
        // one consumer sees each producer's items in put order
        let mut last = vec![None; PRODUCERS];
        for &(id, seq) in &got {
            if let Some(prev) = last[id] {
                assert!(seq > prev);
            }
            last[id] = Some(seq);
            per_producer[id].push(seq);
        }
    }

    for mut seqs in per_producer {
        seqs.sort();
        assert_eq!(seqs, (0..ITEMS).collect::<Vec<_>>());
    }
    let stat = queue.stats();
    assert_eq!(stat.total_takes, (PRODUCERS * ITEMS) as u64);
    info!("{}", stat.report());
}

fn options(producers: usize, consumers: usize, capacity: usize, items: usize) -> pipeline::Options {
    pipeline::Options {
        capacity,
        producers,
        consumers,
        items,
        max_delay_us: 0,
        report_ms: 1000,
    }
}

#[tokio::test]
async fn pipeline_default_run() {
    let (summary, stats) = pipeline::run(&options(2, 2, 8, 1000)).await.unwrap();
    assert!(summary.check().is_ok());
    assert_eq!(summary.consumed, 2000);
    assert_eq!(summary.out_of_order, 0);
    assert!(stats.closed);
    assert_eq!(stats.size, 0);
}

#[tokio::test]
async fn pipeline_more_workers_than_blocking_pool() {
    // tokio's blocking pool holds 512 threads
    let options = options(600, 1, 1, 2);
    let (summary, stats) = tokio::time::timeout(Duration::from_secs(60), pipeline::run(&options))
        .await
        .expect("pipeline hung")
        .unwrap();
    assert!(summary.check().is_ok());
    assert_eq!(summary.produced, 1200);
    assert_eq!(summary.consumed, 1200);
    assert!(stats.high_watermark <= 1);
}

#[tokio::test]
async fn pipeline_without_consumers() {
    assert!(pipeline::run(&options(1, 0, 4, 10)).await.is_err());
    let (summary, _) = pipeline::run(&options(0, 0, 4, 10)).await.unwrap();
    assert!(summary.check().is_ok());
}

#[test]
fn summary_check() {
    let mut summary = pipeline::Summary {
        expected: 10,
        produced: 10,
        consumed: 10,
        out_of_order: 0,
    };
    assert!(summary.check().is_ok());

    summary.out_of_order = 1;
    assert!(summary.check().is_err());

    summary.out_of_order = 0;
    summary.consumed = 9;
    assert!(summary.check().is_err());
}
