use flate2::{Decompress, FlushDecompress, Status};
use tracing::trace;

use crate::error::CompressionError;

/// Minimum number of bytes to grow the output buffer by when it fills up.
const MIN_GROWTH: usize = 4096;

/// Streaming zlib inflater shared by every compressed payload on a session.
///
/// Senders compress successive payloads with a single long-lived compressor
/// and sync-flush after each one, so a payload can only be inflated by a
/// context that has already seen every earlier payload in order. A compressor
/// reset on the sender side is mirrored by replacing the context.
pub struct CompressionContext {
    stream: Decompress,
}

impl CompressionContext {
    pub fn new() -> Self {
        Self {
            stream: Decompress::new(true),
        }
    }

    /// Inflate one sync-flushed chunk, returning all output it produced.
    pub fn inflate(&mut self, input: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let mut output = Vec::with_capacity(input.len().saturating_mul(4).max(MIN_GROWTH));
        let mut consumed = 0;

        loop {
            if output.len() == output.capacity() {
                output.reserve(output.capacity().max(MIN_GROWTH));
            }

            let total_in = self.stream.total_in();
            let total_out = self.stream.total_out();
            let status =
                self.stream
                    .decompress_vec(&input[consumed..], &mut output, FlushDecompress::Sync)?;
            consumed += (self.stream.total_in() - total_in) as usize;
            let progressed =
                self.stream.total_in() != total_in || self.stream.total_out() != total_out;

            match status {
                Status::StreamEnd => break,
                Status::Ok | Status::BufError => {
                    let room_left = output.len() < output.capacity();
                    if room_left && (consumed == input.len() || !progressed) {
                        break;
                    }
                }
            }
        }

        trace!(
            compressed = input.len(),
            inflated = output.len(),
            "inflated chunk"
        );
        Ok(output)
    }
}

impl Default for CompressionContext {
    fn default() -> Self {
        Self::new()
    }
}
