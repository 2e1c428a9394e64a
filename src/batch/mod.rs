//! Chunked fan-out of a work list with settle-all semantics.
//!
//! Chunks run as concurrent futures on the calling task: they interleave at
//! every awaited API call or backoff sleep, but never run in parallel. Results
//! are reduced after every chunk has settled, so no collector is shared
//! between chunks.

use crate::core::{Result, SweepError};
use crate::instrument::Stopwatch;
use futures::FutureExt;
use futures::future::join_all;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::time::Duration;
use tracing::{Instrument, info, info_span, warn};

/// Splits `items` into at most `max_chunks` contiguous chunks of
/// `ceil(len / max_chunks)` items; the last chunk may be shorter.
///
/// An empty list yields no chunks. `max_chunks` of zero is treated as one.
pub fn partition<T: Clone>(items: &[T], max_chunks: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    let max_chunks = max_chunks.max(1);
    let chunk_size = items.len().div_ceil(max_chunks);
    items.chunks(chunk_size).map(<[T]>::to_vec).collect()
}

/// Outcome of every chunk of one batch run, in chunk order.
#[derive(Debug)]
pub struct BatchReport<T> {
    pub name: String,
    pub chunk_sizes: Vec<usize>,
    pub outcomes: Vec<Result<T>>,
    pub elapsed: Duration,
}

impl<T> BatchReport<T> {
    pub fn chunk_count(&self) -> usize {
        self.chunk_sizes.len()
    }

    pub fn total_items(&self) -> usize {
        self.chunk_sizes.iter().sum()
    }

    pub fn failed_chunks(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_err()).count()
    }

    pub fn successes(&self) -> impl Iterator<Item = &T> {
        self.outcomes.iter().filter_map(|outcome| outcome.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (usize, &SweepError)> {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(index, outcome)| outcome.as_ref().err().map(|err| (index, err)))
    }

    pub fn into_successes(self) -> Vec<T> {
        self.outcomes.into_iter().filter_map(Result::ok).collect()
    }
}

/// Runs `operation` once per chunk of `items`, all chunks concurrently, and
/// waits until every chunk has settled.
///
/// A chunk that fails (or panics) does not cancel its siblings; its error is
/// kept in the report. No retry happens here.
pub async fn run_in_batches<I, T, F, Fut>(
    name: &str,
    items: &[I],
    max_chunks: usize,
    operation: F,
) -> BatchReport<T>
where
    I: Clone,
    F: Fn(usize, Vec<I>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let stopwatch = Stopwatch::start();
    let chunks = partition(items, max_chunks);
    let chunk_sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();

    let tasks = chunks.into_iter().enumerate().map(|(index, chunk)| {
        let span = info_span!("batch.chunk", batch = name, chunk = index, size = chunk.len());
        AssertUnwindSafe(operation(index, chunk))
            .catch_unwind()
            .map(move |settled| settled.unwrap_or_else(|panic| Err(panicked(index, panic))))
            .instrument(span)
    });
    let outcomes = join_all(tasks).await;

    for (index, outcome) in outcomes.iter().enumerate() {
        if let Err(err) = outcome {
            warn!(batch = name, chunk = index, error = %err, "chunk failed");
        }
    }
    info!(
        "Done all {} chunks (total items: {}).",
        chunk_sizes.len(),
        items.len()
    );
    stopwatch.report(name, "Q", items.len());

    BatchReport {
        name: name.to_string(),
        chunk_sizes,
        outcomes,
        elapsed: stopwatch.elapsed(),
    }
}

fn panicked(index: usize, panic: Box<dyn Any + Send>) -> SweepError {
    let message = panic
        .downcast_ref::<&str>()
        .map(|msg| msg.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    SweepError::Chunk(format!("chunk {} panicked: {}", index, message))
}
