//! Batch progress bar shared with the tracing subscriber.
//!
//! While a batch runs, log lines go through [`ProgressBar::println`] so they
//! land above the bar instead of tearing it.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::sync::{Mutex, MutexGuard};

static ACTIVE_BAR: Mutex<Option<ProgressBar>> = Mutex::new(None);

fn active_bar() -> MutexGuard<'static, Option<ProgressBar>> {
    // A panic while holding the guard leaves a plain Option behind.
    ACTIVE_BAR.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Bar for a batch of `total` domains, registered as the log sink until
/// [`finish_batch_bar`] is called.
pub fn start_batch_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        bar.set_style(style.progress_chars("█▓░"));
    }
    *active_bar() = Some(bar.clone());
    bar
}

pub fn finish_batch_bar(bar: &ProgressBar) {
    active_bar().take();
    bar.finish_and_clear();
}

/// The registered bar, cloned so the lock is released before use.
fn current_bar() -> Option<ProgressBar> {
    active_bar().clone()
}

/// Print a line without disturbing the active bar, if any.
pub fn println(line: &str) {
    match current_bar() {
        Some(bar) => bar.println(line),
        None => eprintln!("{}", line),
    }
}

/// Drain every complete line from `buffer`, leaving any partial tail.
fn take_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=pos).collect();
        lines.push(
            String::from_utf8_lossy(&line)
                .trim_end_matches(['\r', '\n'])
                .to_string(),
        );
    }
    lines
}

/// Line-buffered log writer that defers to the active bar.
#[derive(Default)]
pub struct LogWriter {
    buffer: Vec<u8>,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        for line in take_lines(&mut self.buffer) {
            println(&line);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let rest = String::from_utf8_lossy(&self.buffer).trim_end().to_string();
        self.buffer.clear();
        if !rest.is_empty() {
            println(&rest);
        }
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// `MakeWriter` handed to `tracing_subscriber::fmt().with_writer(..)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriterFactory;

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter::default()
    }
}
