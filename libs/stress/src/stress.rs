use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, anyhow, bail, ensure};
use hdrhistogram::Histogram;
use prio_queue::{MaxQueue, Storage};
use rand::{Rng, rngs::ThreadRng};
use tracing::info;

use crate::Job;

#[derive(Debug, Clone, Copy)]
pub struct StressTestConfig {
    pub num_producers: usize,
    pub jobs_per_producer: usize,
    pub num_consumers: usize,
    pub priority_range: (u64, u64),
    /// Upper bound of the random pause a producer takes after each submission.
    pub max_producer_delay_us: u64,
    /// Submit through `wait_for_empty_push`, keeping at most one job per producer in flight.
    pub handoff: bool,
}

impl Default for StressTestConfig {
    fn default() -> Self {
        Self {
            num_producers: 4,
            jobs_per_producer: 1_000,
            num_consumers: 2,
            priority_range: (1, 1_000),
            max_producer_delay_us: 0,
            handoff: false,
        }
    }
}

impl StressTestConfig {
    /// Creates a [Job] with the given `id` and a priority within the pre-configured range.
    fn randomized_job(&self, id: u64, rng: &mut ThreadRng) -> Job {
        let priority = rng.random_range(self.priority_range.0..self.priority_range.1);
        Job::new(id, priority)
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.priority_range.0 < self.priority_range.1,
            "Empty priority range {:?}",
            self.priority_range
        );
        Ok(())
    }

    fn total_jobs(&self) -> anyhow::Result<usize> {
        self.jobs_per_producer
            .checked_mul(self.num_producers)
            .ok_or_else(|| anyhow!("Overflow while calculating the number of jobs"))
    }
}

/// Runs producers and consumers against `queue` until every producer is done, then shuts the
/// queue down and waits for the consumers to drain it.
///
/// The queue is shut down when this returns, so it cannot be reused for another run. That also
/// holds when a producer panics: consumers are released and joined before the error is returned.
pub fn run_stress_test<S>(
    queue: Arc<MaxQueue<Job, S>>,
    config: StressTestConfig,
) -> anyhow::Result<TestResults>
where
    S: Storage<Job> + Send + 'static,
{
    config.validate()?;
    let total_jobs = config.total_jobs()?;
    info!(
        producers = config.num_producers,
        consumers = config.num_consumers,
        jobs_per_producer = config.jobs_per_producer,
        handoff = config.handoff,
        "starting stress test"
    );
    let start_time = Instant::now();

    // -- Metrics
    let max_depth = Arc::new(AtomicUsize::new(0));
    let latency_template = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3)
        .context("could not create latency histogram")?;
    let (received_source, received_sink) = crossbeam::channel::unbounded::<u64>();

    // region:    --- Consumers
    let mut consumer_handles = vec![];

    for consumer_id in 1..=config.num_consumers {
        let cloned_queue = Arc::clone(&queue);
        let received_source = received_source.clone();
        let mut latency = latency_template.clone();

        let handle = thread::spawn(move || -> anyhow::Result<Histogram<u64>> {
            let mut total_received = 0usize;

            while let Some(job) = cloned_queue.wait_for_nonempty_pop() {
                let residency = u64::try_from(job.enqueued_at.elapsed().as_micros())
                    .unwrap_or(u64::MAX);
                latency.saturating_record(residency);
                received_source
                    .send(job.id)
                    .context("result channel closed")?;
                total_received += 1;
            }

            info!(consumer_id, total_received, "consumer completed");
            Ok(latency)
        });
        consumer_handles.push(handle);
    }
    drop(received_source);

    // endregion: --- Consumers

    // region:    --- Producers
    let mut producer_handles = vec![];

    for producer_id in 0..config.num_producers {
        let cloned_queue = Arc::clone(&queue);
        let cloned_max_depth = Arc::clone(&max_depth);

        let handle = thread::spawn(move || {
            let mut rng = rand::rng();
            let first_id = (producer_id * config.jobs_per_producer) as u64;

            for offset in 0..config.jobs_per_producer as u64 {
                let job = config.randomized_job(first_id + offset, &mut rng);

                // --> Submit
                if config.handoff {
                    cloned_queue.wait_for_empty_push(job);
                } else {
                    cloned_queue.push(job);
                }
                cloned_max_depth.fetch_max(cloned_queue.len(), Ordering::Relaxed);

                if config.max_producer_delay_us > 0 {
                    let delay = rng.random_range(0..=config.max_producer_delay_us);
                    thread::sleep(Duration::from_micros(delay));
                }
            }

            info!(producer_id, submitted = config.jobs_per_producer, "producer completed");
        });
        producer_handles.push(handle);
    }

    // endregion: --- Producers

    let mut producers_panicked = 0;
    for handle in producer_handles {
        if handle.join().is_err() {
            producers_panicked += 1;
        }
    }
    info!("producers done, shutting down queue");
    queue.shutdown();

    if producers_panicked > 0 {
        for handle in consumer_handles {
            let _ = handle.join();
        }
        bail!("{producers_panicked} producer thread(s) panicked");
    }

    let mut latency = latency_template;
    for handle in consumer_handles {
        let consumer_latency = handle
            .join()
            .map_err(|_| anyhow!("Consumer thread panicked"))??;
        latency
            .add(&consumer_latency)
            .context("could not merge latency histograms")?;
    }

    let mut received_ids: Vec<u64> = received_sink.try_iter().collect();
    received_ids.sort_unstable();

    let test_duration = start_time.elapsed();
    let jobs_per_second = received_ids.len() as f64 / test_duration.as_secs_f64().max(1e-9);

    Ok(TestResults {
        test_duration,
        total_submitted: total_jobs,
        received_ids,
        jobs_per_second,
        max_observed_depth: max_depth.load(Ordering::Relaxed),
        latency,
    })
}

#[derive(Debug)]
pub struct TestResults {
    pub test_duration: Duration,
    pub total_submitted: usize,
    /// Ids of every job handed to a consumer, sorted.
    pub received_ids: Vec<u64>,
    pub jobs_per_second: f64,
    /// Largest queue depth a producer saw right after submitting.
    pub max_observed_depth: usize,
    /// Time between submission and removal, in microseconds.
    pub latency: Histogram<u64>,
}

impl TestResults {
    /// True if every submitted job was received exactly once.
    pub fn is_conserved(&self) -> bool {
        self.received_ids.len() == self.total_submitted
            && self
                .received_ids
                .iter()
                .zip(0u64..)
                .all(|(&received, expected)| received == expected)
    }

    pub fn print_summary(&self) {
        println!("\n{:=^75}", " Stress Test Results ");
        println!("Test duration: {:?}", self.test_duration);
        println!("Total jobs submitted: {}", self.total_submitted);
        println!("Total jobs received: {}", self.received_ids.len());
        println!("Conserved: {}", self.is_conserved());
        println!("Jobs per second: {:.2}", self.jobs_per_second);
        println!("Max observed depth: {}", self.max_observed_depth);

        if !self.latency.is_empty() {
            println!("\nQueue residency:");
            for quantile in [0.5, 0.9, 0.99, 0.999] {
                println!(
                    "  - p{:<5} {} µs",
                    quantile * 100.0,
                    self.latency.value_at_quantile(quantile)
                );
            }
            println!("  - max    {} µs", self.latency.max());
        }
    }
}
