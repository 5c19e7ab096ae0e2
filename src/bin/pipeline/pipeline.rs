use clap::Parser;
use futures::future::join_all;
use muduo_queue::{BoundedBlockingQueue, CountdownLatch, QueueStats, Result};
use rand::Rng;
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Options {
    /// queue capacity
    #[clap(short, long)]
    #[clap(default_value_t = 8)]
    pub capacity: usize,

    /// number of producer threads
    #[clap(short, long)]
    #[clap(default_value_t = 2)]
    pub producers: usize,

    /// number of consumer threads
    #[clap(short = 'n', long)]
    #[clap(default_value_t = 2)]
    pub consumers: usize,

    /// items put by each producer
    #[clap(short, long)]
    #[clap(default_value_t = 1000)]
    pub items: usize,

    /// upper bound of the random pause after each put or take, 0 for none
    #[clap(short, long)]
    #[clap(default_value_t = 0)]
    pub max_delay_us: u64,

    /// statistics report period
    #[clap(short, long)]
    #[clap(default_value_t = 1000)]
    pub report_ms: u64,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub expected: usize,
    pub produced: usize,
    pub consumed: usize,
    pub out_of_order: usize,
}

impl Summary {
    pub fn check(&self) -> Result<()> {
        if self.produced != self.expected || self.consumed != self.produced {
            error!(
                "expected {} items, produced {}, consumed {}",
                self.expected, self.produced, self.consumed
            );
            return Err(format!(
                "lost items: produced {}, consumed {}",
                self.produced, self.consumed
            )
            .into());
        }
        if self.out_of_order > 0 {
            error!("{} items arrived out of order", self.out_of_order);
            return Err(format!("{} items arrived out of order", self.out_of_order).into());
        }
        Ok(())
    }
}

struct Item {
    producer: usize,
    seq: usize,
}

#[derive(Default)]
struct Consumed {
    count: usize,
    out_of_order: usize,
}

fn jitter(max_delay_us: u64) {
    if max_delay_us > 0 {
        let us = rand::thread_rng().gen_range(0..=max_delay_us);
        thread::sleep(Duration::from_micros(us));
    }
}

// Workers block for their whole life, so they get their own threads instead
// of the runtime's bounded blocking pool.
fn spawn_worker<T, F>(name: String, f: F) -> Result<oneshot::Receiver<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    thread::Builder::new().name(name).spawn(move || {
        let _ = tx.send(f());
    })?;
    Ok(rx)
}

fn spawn_producer(
    id: usize,
    queue: BoundedBlockingQueue<Item>,
    done: CountdownLatch,
    options: &Options,
) -> Result<oneshot::Receiver<usize>> {
    let items = options.items;
    let max_delay_us = options.max_delay_us;
    spawn_worker(format!("producer-{}", id), move || {
        let mut produced = 0;
        for seq in 0..items {
            jitter(max_delay_us);
            if let Err(err) = queue.put(Item { producer: id, seq }) {
                error!(cause = %err, "producer-{} stopped at seq {}", id, seq);
                break;
            }
            produced += 1;
        }
        info!("producer-{} done, {} items", id, produced);
        done.countdown();
        produced
    })
}

fn spawn_consumer(
    id: usize,
    queue: BoundedBlockingQueue<Item>,
    producers: usize,
    options: &Options,
) -> Result<oneshot::Receiver<Consumed>> {
    let max_delay_us = options.max_delay_us;
    spawn_worker(format!("consumer-{}", id), move || {
        let mut consumed = Consumed::default();
        // per producer sequence numbers must arrive in order to a single consumer
        let mut last_seq: Vec<Option<usize>> = vec![None; producers];
        while let Ok(item) = queue.take() {
            if let Some(last) = last_seq[item.producer] {
                if item.seq <= last {
                    error!(
                        "consumer-{} got producer-{} seq {} after {}",
                        id, item.producer, item.seq, last
                    );
                    consumed.out_of_order += 1;
                }
            }
            last_seq[item.producer] = Some(item.seq);
            consumed.count += 1;
            jitter(max_delay_us);
        }
        info!("consumer-{} done, {} items", id, consumed.count);
        consumed
    })
}

pub async fn run(options: &Options) -> Result<(Summary, QueueStats)> {
    if options.consumers == 0 && options.producers > 0 && options.items > 0 {
        return Err("at least one consumer is needed to drain the queue".into());
    }

    let queue = BoundedBlockingQueue::<Item>::try_new(options.capacity)?;
    let done = CountdownLatch::new(options.producers);

    // the only place the queue is closed
    let closer_queue = queue.clone();
    let closer_done = done.clone();
    let closer = spawn_worker(String::from("closer"), move || {
        closer_done.wait();
        if closer_queue.close() {
            info!("all producers done, queue closed");
        }
    })?;

    let mut consumers = Vec::with_capacity(options.consumers);
    for id in 0..options.consumers {
        consumers.push(spawn_consumer(id, queue.clone(), options.producers, options)?);
    }
    let mut producers = Vec::with_capacity(options.producers);
    for id in 0..options.producers {
        producers.push(spawn_producer(id, queue.clone(), done.clone(), options)?);
    }

    let mut summary = Summary {
        expected: options.producers * options.items,
        ..Summary::default()
    };
    let mut interval = time::interval(Duration::from_millis(options.report_ms.max(1)));
    let all_consumers = join_all(consumers);
    tokio::pin!(all_consumers);
    loop {
        tokio::select! {
            results = &mut all_consumers => {
                for result in results {
                    let consumed = result?;
                    summary.consumed += consumed.count;
                    summary.out_of_order += consumed.out_of_order;
                }
                break;
            }
            _ = interval.tick() => {
                info!("stats\n{}", queue.stats().report());
            }
        }
    }

    for result in join_all(producers).await {
        summary.produced += result?;
    }
    closer.await?;

    Ok((summary, queue.stats()))
}
