//! Where samples go
//!
//! The relay only produces [`Sample`]s; a [`ReportSink`] decides how they are
//! rendered and where they are written.

use std::io::Write;

use crate::config::OutputFormat;
use crate::error::SinkError;
use crate::reporter::Sample;

/// Destination for emitted samples
///
/// Shared by every connection's reporter, so implementations must keep each
/// record whole when called concurrently.
pub trait ReportSink: Send + Sync {
    fn emit(&self, sample: &Sample) -> Result<(), SinkError>;
}

/// Writes samples to standard output
///
/// Records are handed to a dedicated writer thread, so a slow or stalled
/// stdout never blocks the async runtime. Once a write fails the thread stops
/// and every later [`emit`](ReportSink::emit) returns [`SinkError::Closed`].
#[derive(Debug, Clone)]
pub struct StdoutSink {
    tx: tokio::sync::mpsc::UnboundedSender<Sample>,
}

impl StdoutSink {
    pub fn spawn(format: OutputFormat) -> std::io::Result<Self> {
        Self::spawn_writer(std::io::stdout(), format)
    }

    fn spawn_writer<W: Write + Send + 'static>(
        mut writer: W,
        format: OutputFormat,
    ) -> std::io::Result<Self> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Sample>();

        std::thread::Builder::new()
            .name("tcpinfo-output".to_string())
            .spawn(move || {
                while let Some(sample) = rx.blocking_recv() {
                    if let Err(e) = write_record(&mut writer, &sample, format) {
                        tracing::error!(error = %e, "cannot write samples, output stopped");
                        break;
                    }
                }
            })?;

        Ok(Self { tx })
    }
}

impl ReportSink for StdoutSink {
    fn emit(&self, sample: &Sample) -> Result<(), SinkError> {
        self.tx.send(sample.clone()).map_err(|_| SinkError::Closed)
    }
}

/// Writes samples to any writer
pub struct WriterSink<W> {
    writer: std::sync::Mutex<W>,
    format: OutputFormat,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer: std::sync::Mutex::new(writer),
            format,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<W: Write + Send> ReportSink for WriterSink<W> {
    fn emit(&self, sample: &Sample) -> Result<(), SinkError> {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        write_record(&mut *writer, sample, self.format)
    }
}

/// Forwards samples over a channel, for embedding the relay in another program
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: tokio::sync::mpsc::UnboundedSender<Sample>,
}

impl ChannelSink {
    pub fn channel() -> (Self, tokio::sync::mpsc::UnboundedReceiver<Sample>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ReportSink for ChannelSink {
    fn emit(&self, sample: &Sample) -> Result<(), SinkError> {
        self.tx.send(sample.clone()).map_err(|_| SinkError::Closed)
    }
}

fn write_record<W: Write + ?Sized>(
    writer: &mut W,
    sample: &Sample,
    format: OutputFormat,
) -> Result<(), SinkError> {
    match format {
        OutputFormat::Pretty => serde_json::to_writer_pretty(&mut *writer, sample)?,
        OutputFormat::Compact => serde_json::to_writer(&mut *writer, sample)?,
    }
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
