//! Direct mode: decode, apply and answer one request at a time on the calling
//! thread.

use std::io::{Read, Write};

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::core::feed::Feed;
use crate::core::EngineError;
use crate::protocol::{RequestDecoder, ResponseEncoder};

use super::{apply, RequestCounters, RunOutcome};

pub(crate) fn run_direct<R, W>(
    config: &EngineConfig,
    input: R,
    output: W,
) -> Result<RunOutcome, EngineError>
where
    R: Read,
    W: Write,
{
    let feed = Feed::with_reader_capacity(config.reader_capacity);
    let counters = RequestCounters::default();
    let mut decoder = RequestDecoder::new(input);
    let mut encoder = ResponseEncoder::new(output);
    let mut implicit_done = false;

    loop {
        let Some(request) = decoder.next_request()? else {
            warn!(decoded = decoder.decoded(), "input ended without DONE; stopping");
            implicit_done = true;
            break;
        };
        counters.record(request.kind());

        let Some(response) = apply(&feed, request) else {
            debug!(decoded = decoder.decoded(), "DONE received");
            break;
        };
        encoder.encode(&response)?;
        // The client may wait for this answer before sending the next command.
        encoder.flush()?;
    }

    encoder.flush()?;
    Ok(RunOutcome {
        requests: counters.snapshot(),
        responses: encoder.written(),
        implicit_done,
    })
}
