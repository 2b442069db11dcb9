use crate::revapatch::tui::progress::GLOBAL_MP;
use std::io::{self, Write};

/// Routes tracing output through the global [`indicatif::MultiProgress`] so
/// log lines are printed above active progress bars instead of through them.
#[derive(Debug, Default)]
pub struct MultiProgressWriter;

impl MultiProgressWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Write for MultiProgressWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);

        // A hidden MultiProgress (no terminal) swallows println, so fall back to stderr.
        if GLOBAL_MP.is_hidden() {
            io::stderr().write_all(buf)?;
        } else {
            GLOBAL_MP.println(text.trim_end_matches('\n'))?;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}
