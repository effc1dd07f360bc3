//! Streaming DEFLATE decompression.
//!
//! Thin resumable wrapper over the `miniz_oxide` stream inflater. Each call
//! consumes some input, produces some output and reports how to continue:
//! feed more compressed bytes, drain the output buffer, or stop. The
//! decompressor can be reset to the start of the stream, which is how
//! backward seeks in compressed archive entries are serviced.

use miniz_oxide::inflate::stream::{inflate, InflateState};
use miniz_oxide::{DataFormat, MZError, MZFlush, MZStatus};

use crate::error::{FsError, FsResult};

/// Non-error outcome of one decompression step.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InflateStatus {
    /// The end of the compressed stream was reached.
    Done,
    /// All given input was consumed without reaching the end of the stream.
    NeedsMoreInput,
    /// The output buffer was filled with compressed data still pending.
    HasMoreOutput,
}

/// Byte counts and status for one decompression step.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InflateProgress {
    pub consumed: usize,
    pub produced: usize,
    pub status: InflateStatus,
}

/// A resumable streaming inflater.
///
/// With `zlib_header` the stream is expected to carry a zlib wrapper; the
/// trailing Adler-32 checksum is then verified as part of decoding and a
/// mismatch surfaces as [`FsError::ChecksumMismatch`]. ZIP entries use the
/// raw format.
pub struct InflateStream {
    state: Box<InflateState>,
    format: DataFormat,
    finished: bool,
}

impl InflateStream {
    pub fn new(zlib_header: bool) -> Self {
        let format = if zlib_header { DataFormat::Zlib } else { DataFormat::Raw };
        Self { state: InflateState::new_boxed(format), format, finished: false }
    }

    /// Rewinds the decompressor to the start of the stream.
    pub fn reset(&mut self) {
        self.state.reset(self.format);
        self.finished = false;
    }

    /// Runs one decompression step.
    ///
    /// `has_more_input` tells the decoder whether more compressed bytes
    /// exist beyond `input`; when clear, running dry mid-stream is a
    /// corruption error instead of a request for more data.
    pub fn inflate(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        has_more_input: bool,
    ) -> FsResult<InflateProgress> {
        if self.finished {
            return Ok(InflateProgress { consumed: 0, produced: 0, status: InflateStatus::Done });
        }

        let flush = if has_more_input { MZFlush::None } else { MZFlush::Finish };
        let result = inflate(&mut self.state, input, output, flush);

        let status = match result.status {
            Ok(MZStatus::StreamEnd) => {
                self.finished = true;
                InflateStatus::Done
            }
            Ok(MZStatus::Ok) => {
                if result.bytes_written == output.len() && !output.is_empty() {
                    InflateStatus::HasMoreOutput
                } else {
                    InflateStatus::NeedsMoreInput
                }
            }
            Ok(MZStatus::NeedDict) => return Err(FsError::InvalidFile),
            Err(MZError::Buf) => {
                // No forward progress was possible. With more input on the
                // way that simply means "feed me"; otherwise the stream was
                // cut short.
                if has_more_input {
                    InflateStatus::NeedsMoreInput
                } else if result.bytes_written == output.len() && !output.is_empty() {
                    InflateStatus::HasMoreOutput
                } else {
                    return Err(FsError::InvalidFile);
                }
            }
            Err(MZError::Data) => {
                return Err(if self.format == DataFormat::Zlib {
                    FsError::ChecksumMismatch
                } else {
                    FsError::InvalidFile
                });
            }
            Err(_) => return Err(FsError::Other),
        };

        Ok(InflateProgress {
            consumed: result.bytes_consumed,
            produced: result.bytes_written,
            status,
        })
    }
}
