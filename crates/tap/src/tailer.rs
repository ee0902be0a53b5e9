//! Continuous follower for the JSON-lines record source
//!
//! The `Tailer` behaves like `tail -F` done in-process: it reads complete
//! lines as they are appended, sleeps when it reaches the end of the file,
//! and reopens the path when the file is truncated or replaced. Each line is
//! parsed into a [`Record`]; what happens to lines that are not valid JSON is
//! decided by [`MalformedPolicy`].
//!
//! # Failure handling
//!
//! - Opening the source at startup is all-or-nothing (`SourceUnavailable`).
//! - A failed read is retried up to `max_read_retries` times, reopening at the
//!   last good offset between attempts. Any successful read resets the count.
//! - A missing path at end-of-file is treated as a rotation in progress: the
//!   tailer keeps the old handle and waits for the path to come back.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use herald_config::{MalformedPolicy, SourceConfig, StartAt};

use crate::broker::Broker;
use crate::error::{Result, TapError};
use crate::record::Record;

/// Tailer settings
#[derive(Debug, Clone)]
pub struct TailerConfig {
    pub start_at: StartAt,
    pub poll_interval: Duration,
    pub max_read_retries: u32,
    pub retry_delay: Duration,
    pub on_malformed: MalformedPolicy,
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self::from(&SourceConfig::default())
    }
}

impl From<&SourceConfig> for TailerConfig {
    fn from(config: &SourceConfig) -> Self {
        Self {
            start_at: config.start_at,
            poll_interval: config.poll_interval,
            max_read_retries: config.max_read_retries,
            retry_delay: config.retry_delay,
            on_malformed: config.on_malformed,
        }
    }
}

/// Counters reported when the tailer stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TailerReport {
    /// Complete lines read
    pub lines: u64,
    /// Records handed to the broker
    pub published: u64,
    /// Lines skipped under `MalformedPolicy::Skip`
    pub skipped: u64,
}

/// Device and inode, used to notice the path being replaced
type FileIdentity = (u64, u64);

/// Follows one append-only file
#[derive(Debug)]
pub struct Tailer {
    path: PathBuf,
    reader: BufReader<File>,
    identity: Option<FileIdentity>,
    /// Byte offset where `pending` starts
    line_start: u64,
    /// Bytes of a line whose newline has not been read yet
    pending: Vec<u8>,
    /// Drop the first line: following began in the middle of it
    discard_fragment: bool,
    /// Lines read from the current file, reset on rotation
    line_number: u64,
    /// Consecutive failed reads
    failures: u32,
    config: TailerConfig,
    report: TailerReport,
}

impl Tailer {
    /// Open the source and position at the configured start
    pub async fn open<P: AsRef<Path>>(path: P, config: TailerConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let unavailable = |source: io::Error| TapError::SourceUnavailable {
            path: path.clone(),
            source,
        };

        let file = File::open(&path).await.map_err(unavailable)?;
        let metadata = file.metadata().await.map_err(unavailable)?;
        let identity = file_identity(&metadata);

        let position = match config.start_at {
            StartAt::End => metadata.len(),
            StartAt::Beginning => 0,
        };

        let mut reader = BufReader::new(file);
        let mut discard_fragment = false;
        if position > 0 {
            // Starting mid-file: if the byte before us is not a newline the
            // writer is part way through a line we only half saw.
            reader
                .seek(SeekFrom::Start(position - 1))
                .await
                .map_err(unavailable)?;
            discard_fragment = reader.read_u8().await.map_err(unavailable)? != b'\n';
        }

        info!(
            path = %path.display(),
            offset = position,
            start_at = ?config.start_at,
            "following record source"
        );

        Ok(Self {
            path,
            reader,
            identity,
            line_start: position,
            pending: Vec::new(),
            discard_fragment,
            line_number: 0,
            failures: 0,
            config,
            report: TailerReport::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset of the next unread byte
    pub fn position(&self) -> u64 {
        self.line_start + self.pending.len() as u64
    }

    pub fn report(&self) -> TailerReport {
        self.report
    }

    /// Wait for the next well-formed record
    ///
    /// Malformed lines are skipped or returned as `MalformedRecord` depending
    /// on the policy.
    pub async fn next_record(&mut self) -> Result<Record> {
        loop {
            let line = self.next_line().await?;
            match Record::from_slice(&line) {
                Ok(record) => return Ok(record),
                Err(source) => match self.config.on_malformed {
                    MalformedPolicy::Skip => {
                        self.report.skipped += 1;
                        warn!(
                            line = self.line_number,
                            error = %source,
                            "skipping malformed record"
                        );
                    }
                    MalformedPolicy::Fatal => {
                        return Err(TapError::MalformedRecord {
                            line: self.line_number,
                            source,
                        });
                    }
                },
            }
        }
    }

    /// Publish every record to `broker` until `shutdown` fires
    ///
    /// Returns `Err` only for conditions that end ingestion for everyone.
    pub async fn run(
        mut self,
        broker: Arc<Broker>,
        shutdown: CancellationToken,
    ) -> Result<TailerReport> {
        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => None,
                record = self.next_record() => Some(record),
            };

            let Some(record) = next else {
                info!(
                    path = %self.path.display(),
                    lines = self.report.lines,
                    published = self.report.published,
                    skipped = self.report.skipped,
                    "tailer stopped"
                );
                return Ok(self.report);
            };

            let report = broker.publish(Arc::new(record?));
            self.report.published += 1;
            trace!(
                delivered = report.delivered,
                dropped = report.dropped,
                "record published"
            );
        }
    }

    /// Next complete, non-blank line without its terminator
    async fn next_line(&mut self) -> Result<Vec<u8>> {
        loop {
            let before = self.pending.len();
            match self.reader.read_until(b'\n', &mut self.pending).await {
                Ok(0) => {
                    self.failures = 0;
                    self.check_replaced().await;
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                Ok(_) => {
                    self.failures = 0;

                    if self.pending.last() != Some(&b'\n') {
                        // Partial line, wait for the rest
                        continue;
                    }

                    let mut line = std::mem::take(&mut self.pending);
                    self.line_start += line.len() as u64;
                    if self.discard_fragment {
                        self.discard_fragment = false;
                        debug!(bytes = line.len(), "discarded partial first line");
                        continue;
                    }

                    self.report.lines += 1;
                    self.line_number += 1;
                    while matches!(line.last().copied(), Some(b'\n' | b'\r')) {
                        line.pop();
                    }
                    if line.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    return Ok(line);
                }
                Err(e) => {
                    // Bytes from the failed read are re-read after reopening
                    self.pending.truncate(before);
                    self.recover(e).await?;
                }
            }
        }
    }

    /// Reopen from the start if the file shrank or the path now names a
    /// different file
    async fn check_replaced(&mut self) {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                trace!(error = %e, "source path not available, keeping current handle");
                return;
            }
        };

        let replaced = self.identity.is_some() && file_identity(&metadata) != self.identity;
        let truncated = metadata.len() < self.position();
        if !replaced && !truncated {
            return;
        }

        info!(
            path = %self.path.display(),
            replaced,
            truncated,
            "record source rotated, reading from start"
        );

        match self.reopen(0).await {
            Ok(()) => {
                if !self.pending.is_empty() {
                    debug!(bytes = self.pending.len(), "dropping partial line from old file");
                    self.pending.clear();
                }
                self.line_start = 0;
                self.line_number = 0;
                self.discard_fragment = false;
            }
            Err(e) => warn!(error = %e, "failed to reopen record source"),
        }
    }

    /// Handle a failed read: retry budget, delay, reopen at the last offset
    async fn recover(&mut self, error: io::Error) -> Result<()> {
        self.failures += 1;
        if self.failures > self.config.max_read_retries {
            return Err(TapError::SourceRead {
                path: self.path.clone(),
                attempts: self.failures,
                source: error,
            });
        }

        warn!(
            attempt = self.failures,
            max_retries = self.config.max_read_retries,
            error = %error,
            "record source read failed, retrying"
        );
        tokio::time::sleep(self.config.retry_delay).await;

        let position = self.position();
        if let Err(e) = self.reopen(position).await {
            debug!(error = %e, "reopen before retry failed");
        }
        Ok(())
    }

    async fn reopen(&mut self, position: u64) -> io::Result<()> {
        let file = File::open(&self.path).await?;
        let identity = file_identity(&file.metadata().await?);
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(position)).await?;

        self.reader = reader;
        self.identity = identity;
        Ok(())
    }
}

#[cfg(unix)]
fn file_identity(metadata: &std::fs::Metadata) -> Option<FileIdentity> {
    use std::os::unix::fs::MetadataExt;
    Some((metadata.dev(), metadata.ino()))
}

#[cfg(not(unix))]
fn file_identity(_metadata: &std::fs::Metadata) -> Option<FileIdentity> {
    None
}

#[cfg(test)]
#[path = "tailer_test.rs"]
mod tests;
