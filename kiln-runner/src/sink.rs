//! Destinations for streamed build output

use std::io::{self, Write};

/// Receives raw container output as it arrives
pub trait LogSink: Send {
    /// Forwards one chunk; chunks are not line-aligned
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()>;
}

/// Any writer is a sink; each chunk is flushed so output shows up immediately
impl<W: Write + Send> LogSink for W {
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.write_all(chunk)?;
        self.flush()
    }
}
