//! Streaming decoder for requests and line encoder for responses.

use std::io::{BufReader, BufWriter, Read, Write};

use serde_json::de::IoRead;
use serde_json::StreamDeserializer;

use crate::core::EngineError;

use super::{Request, Response};

/// Decodes one [`Request`] at a time from a byte stream.
///
/// Records may be separated by any JSON whitespace, including none.
pub struct RequestDecoder<R: Read> {
    stream: StreamDeserializer<'static, IoRead<BufReader<R>>, Request>,
    decoded: usize,
}

impl<R: Read> RequestDecoder<R> {
    /// Wrap a reader.
    pub fn new(reader: R) -> Self {
        Self {
            stream: serde_json::Deserializer::from_reader(BufReader::new(reader)).into_iter(),
            decoded: 0,
        }
    }

    /// Number of records decoded so far.
    #[must_use]
    pub const fn decoded(&self) -> usize {
        self.decoded
    }

    /// Decode the next record. Returns `Ok(None)` at a clean end of input.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Decode`] carrying the zero-based record index when the
    /// record is not valid JSON or not a known command.
    pub fn next_request(&mut self) -> Result<Option<Request>, EngineError> {
        match self.stream.next() {
            None => Ok(None),
            Some(Ok(request)) => {
                self.decoded += 1;
                Ok(Some(request))
            }
            Some(Err(source)) => Err(EngineError::Decode {
                index: self.decoded,
                source,
            }),
        }
    }
}

/// Writes [`Response`] records as newline-terminated JSON.
pub struct ResponseEncoder<W: Write> {
    writer: BufWriter<W>,
    written: u64,
}

impl<W: Write> ResponseEncoder<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            written: 0,
        }
    }

    /// Number of responses encoded so far.
    #[must_use]
    pub const fn written(&self) -> u64 {
        self.written
    }

    /// Encode one response followed by a newline. The output stays buffered until
    /// [`flush`](Self::flush).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Encode`] or [`EngineError::Io`] when writing fails.
    pub fn encode(&mut self, response: &Response) -> Result<(), EngineError> {
        serde_json::to_writer(&mut self.writer, response).map_err(EngineError::Encode)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Flush buffered responses to the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Io`] when the underlying writer fails.
    pub fn flush(&mut self) -> Result<(), EngineError> {
        self.writer.flush()?;
        Ok(())
    }
}
