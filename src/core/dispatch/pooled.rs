//! Pooled mode: one producer, a fixed set of consumer threads and a single response
//! writer.
//!
//! # Design
//!
//! - The producer runs on the calling thread and is the only enqueuer.
//! - Consumers are scoped OS threads that borrow the queue, feed and signal; nothing
//!   is a process-wide singleton.
//! - Responses travel over a crossbeam channel to one writer thread that owns the
//!   output stream, so lines never interleave.
//! - Every exit path of the producer closes the queue and broadcasts, so parked
//!   consumers always reach `DONE`.

use std::io::{Read, Write};
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, error, warn, Span};

use crate::config::EngineConfig;
use crate::core::feed::Feed;
use crate::core::queue::{Dequeued, WorkQueue};
use crate::core::EngineError;
use crate::protocol::{RequestDecoder, Response, ResponseEncoder};

use super::{apply, RequestCounters, RunOutcome, WorkSignal};

pub(crate) fn run_pooled<R, W>(
    config: &EngineConfig,
    consumers: usize,
    input: R,
    output: W,
) -> Result<RunOutcome, EngineError>
where
    R: Read,
    W: Write + Send,
{
    let queue = WorkQueue::new();
    let feed = Feed::with_reader_capacity(config.reader_capacity);
    let signal = WorkSignal::new();
    let counters = RequestCounters::default();
    let (response_tx, response_rx) = unbounded::<Response>();
    let span = Span::current();

    thread::scope(|scope| {
        let writer = {
            let span = span.clone();
            thread::Builder::new()
                .name("feed-writer".into())
                .spawn_scoped(scope, move || {
                    let _guard = span.enter();
                    write_responses(&response_rx, output)
                })?
        };

        let mut workers = Vec::with_capacity(consumers);
        for worker_id in 0..consumers {
            let responses = response_tx.clone();
            let span = span.clone();
            let (queue, feed, signal) = (&queue, &feed, &signal);
            let spawned = thread::Builder::new()
                .name(format!("feed-consumer-{worker_id}"))
                .stack_size(config.thread_stack_size)
                .spawn_scoped(scope, move || {
                    let _guard = span.enter();
                    consume(worker_id, queue, feed, signal, &responses);
                });
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    error!(worker_id, error = %e, "failed to spawn consumer; shutting down");
                    queue.close();
                    signal.notify_all();
                    return Err(e.into());
                }
            }
        }
        // Consumers hold the remaining senders; the writer stops once they all exit.
        drop(response_tx);

        let produced = produce(input, &queue, &signal, &counters);

        let mut panicked = None;
        for (worker_id, handle) in workers.into_iter().enumerate() {
            if handle.join().is_err() {
                error!(worker_id, "consumer panicked");
                panicked.get_or_insert_with(|| format!("feed-consumer-{worker_id}"));
            }
        }
        let written = writer
            .join()
            .map_err(|_| EngineError::WorkerPanicked("feed-writer".into()))?;

        let implicit_done = produced?;
        if let Some(name) = panicked {
            return Err(EngineError::WorkerPanicked(name));
        }
        Ok(RunOutcome {
            requests: counters.snapshot(),
            responses: written?,
            implicit_done,
        })
    })
}

/// Decode requests and publish them. Returns whether the input ended without an
/// explicit `DONE`.
fn produce<R: Read>(
    input: R,
    queue: &WorkQueue,
    signal: &WorkSignal,
    counters: &RequestCounters,
) -> Result<bool, EngineError> {
    let mut decoder = RequestDecoder::new(input);
    loop {
        let request = match decoder.next_request() {
            Ok(Some(request)) => request,
            Ok(None) => {
                warn!(decoded = decoder.decoded(), "input ended without DONE; closing queue");
                queue.close();
                signal.notify_all();
                return Ok(true);
            }
            Err(e) => {
                error!(error = %e, "producer failed; closing queue so consumers drain and exit");
                queue.close();
                signal.notify_all();
                return Err(e);
            }
        };
        counters.record(request.kind());

        if request.is_done() {
            queue.enqueue(request);
            signal.notify_all();
            debug!(decoded = decoder.decoded(), "DONE enqueued, producer exiting");
            return Ok(false);
        }
        queue.enqueue(request);
        signal.notify_one();
    }
}

fn consume(
    worker_id: usize,
    queue: &WorkQueue,
    feed: &Feed,
    signal: &WorkSignal,
    responses: &Sender<Response>,
) {
    debug!(worker_id, "consumer started");
    let mut handled = 0_u64;
    let mut writer_gone = false;

    loop {
        match queue.dequeue() {
            Dequeued::Work(request) => {
                handled += 1;
                let Some(response) = apply(feed, request) else {
                    continue;
                };
                if responses.send(response).is_err() && !writer_gone {
                    warn!(worker_id, "response writer stopped; discarding responses");
                    writer_gone = true;
                }
            }
            Dequeued::Empty => signal.wait_for_work(queue),
            Dequeued::Done => break,
        }
    }

    debug!(worker_id, handled, "consumer observed DONE, exiting");
}

fn write_responses<W: Write>(
    responses: &Receiver<Response>,
    output: W,
) -> Result<u64, EngineError> {
    let mut encoder = ResponseEncoder::new(output);
    for response in responses {
        encoder.encode(&response)?;
        if responses.is_empty() {
            encoder.flush()?;
        }
    }
    encoder.flush()?;
    Ok(encoder.written())
}
