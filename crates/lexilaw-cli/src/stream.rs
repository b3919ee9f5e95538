//! Incremental output for `lookup --stream`.

use std::io::{self, Write};

use lexilaw_common::model::DictionaryEntry;

/// Writes chunks as they arrive. The first write error stops further output
/// and is returned from [`StreamPrinter::finish`].
pub struct StreamPrinter<W: Write> {
    out: W,
    printed: bool,
    error: Option<io::Error>,
}

impl<W: Write> StreamPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            printed: false,
            error: None,
        }
    }

    pub fn push(&mut self, chunk: &str) {
        if self.error.is_some() || chunk.is_empty() {
            return;
        }
        let out = &mut self.out;
        match out.write_all(chunk.as_bytes()).and_then(|()| out.flush()) {
            Ok(()) => self.printed |= !chunk.trim().is_empty(),
            Err(e) => self.error = Some(e),
        }
    }

    /// Terminates the output. If nothing visible was streamed, the entry's
    /// text (the no-definition fallback) is printed in its place.
    pub fn finish(mut self, entry: &DictionaryEntry) -> io::Result<()> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        if self.printed {
            writeln!(self.out)?;
        } else {
            writeln!(self.out, "{}", entry.text)?;
        }
        self.out.flush()
    }
}
