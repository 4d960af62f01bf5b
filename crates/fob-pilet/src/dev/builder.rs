//! Turns the bundler's output directory into build events.
//!
//! The external bundler writes artifacts to disk; this builder snapshots the
//! entry artifact (content hash) and derives the protocol reference for the
//! configured schema.

use crate::dev::bundle::{BuildEvent, BundleInfo, ProtocolVersion};
use crate::dev::bundler::DevBundler;
use crate::dev::watcher::{FileChange, OutputWatcher};
use crate::error::{Result, ResultExt};
use std::path::PathBuf;
use std::time::Instant;
use tokio::sync::mpsc;

/// Characters of the content hash used in a generated protocol reference.
const REF_HASH_LEN: usize = 8;

/// Snapshots the output directory after each bundler run.
pub struct OutputBuilder {
    /// Directory the bundler writes into
    out_dir: PathBuf,
    /// Entry artifact file name, relative to `out_dir`
    entry: String,
    /// Protocol the unit is built against
    schema: ProtocolVersion,
}

impl OutputBuilder {
    pub fn new(out_dir: PathBuf, entry: impl Into<String>, schema: ProtocolVersion) -> Self {
        Self {
            out_dir,
            entry: entry.into(),
            schema,
        }
    }

    pub fn out_dir(&self) -> &PathBuf {
        &self.out_dir
    }

    /// Hash the entry artifact and describe the build.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry artifact cannot be read.
    pub async fn snapshot(&self) -> Result<(BundleInfo, BuildEvent)> {
        let entry_path = self.out_dir.join(self.entry.trim_start_matches('/'));
        let content = tokio::fs::read(&entry_path)
            .await
            .with_path(&entry_path)
            .with_hint("Run the bundler once before starting the dev server")?;

        let hash = blake3::hash(&content).to_hex().to_string();
        let protocol_ref = self
            .schema
            .exposes_ref()
            .then(|| format!("pr_{}", &hash[..REF_HASH_LEN]));

        let bundle = BundleInfo {
            name: format!("/{}", self.entry.trim_start_matches('/')),
            hash,
            out_dir: self.out_dir.clone(),
        };

        Ok((bundle, BuildEvent::new(self.schema.clone(), protocol_ref)))
    }

    /// Create the output directory if the bundler has not written it yet.
    pub async fn prepare(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.out_dir)
            .await
            .with_path(&self.out_dir)
    }

    /// Run one build cycle against `bundler`.
    ///
    /// Readiness is withdrawn while the snapshot is taken. On failure the
    /// bundler stays not-ready until the next successful cycle.
    pub async fn rebuild(&self, bundler: &DevBundler) -> Result<u64> {
        let start = Instant::now();
        bundler.begin_build();

        self.finish(bundler).await?;
        Ok(start.elapsed().as_millis() as u64)
    }

    /// Rebuild after the first change of a burst has been seen.
    ///
    /// Readiness is withdrawn before the burst settles, so unit requests that
    /// arrive while the bundler is still writing wait for the finished output.
    /// Returns the cycle duration and how many further changes were folded in.
    pub async fn rebuild_after_burst(
        &self,
        bundler: &DevBundler,
        watcher: &OutputWatcher,
        changes: &mut mpsc::Receiver<FileChange>,
    ) -> Result<(u64, usize)> {
        let start = Instant::now();
        bundler.begin_build();

        let folded = watcher.settle(changes).await;
        self.finish(bundler).await?;
        Ok((start.elapsed().as_millis() as u64, folded))
    }

    /// Complete a build that is already in flight.
    async fn finish(&self, bundler: &DevBundler) -> Result<()> {
        let (bundle, event) = self.snapshot().await?;
        bundler.complete_build(bundle, event);
        Ok(())
    }
}
