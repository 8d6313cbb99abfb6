//! Per-format best-effort repair.
//!
//! Every strategy writes a new artifact into the destination directory and
//! never touches the source. Output goes through [`Staged`], so a failed
//! strategy leaves nothing under a final name.

use crate::config::EngineConfig;
use crate::detect::panic_message;
use crate::route::Route;
use crate::transfer::{Staged, TransferError, VerifiedCopy};
use reclaim_core::formats::archive::SalvageStats;
use reclaim_core::formats::{archive, audio, image, pdf, tarball, video};
use reclaim_core::{CoreError, Handle, Item, Kind, Storage};
use serde::Serialize;
use std::io::{BufReader, Cursor, Write};
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// How faithfully a repaired artifact reproduces the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "fidelity", rename_all = "snake_case")]
pub enum Fidelity {
    /// Byte-identical copy.
    Exact,
    /// Byte-identical copy under a new name after the structure validated.
    Relabelled,
    /// Pixels decoded and re-encoded.
    Lossy,
    /// Samples copied unchanged into a new container.
    Remuxed { tracks: usize, samples: u64 },
    /// Only the entries that read back cleanly.
    Salvaged { kept: usize, skipped: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repaired {
    pub handle: Handle,
    pub name: String,
    #[serde(flatten)]
    pub fidelity: Fidelity,
    /// Digest of the committed bytes when they went through a verified copy.
    pub sha256: Option<String>,
}

#[derive(Debug, Error)]
pub enum RepairError {
    #[error("source unreadable: {0}")]
    Source(#[source] CoreError),

    #[error("{kind} repair failed: {source}")]
    Strategy {
        kind: Kind,
        #[source]
        source: CoreError,
    },

    #[error("repaired output failed verification: {0}")]
    Verification(#[source] CoreError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("repair aborted: {0}")]
    Panicked(String),
}

/// Dispatches each item to the strategy for its format.
pub struct RepairDispatcher<'a> {
    storage: &'a dyn Storage,
    config: &'a EngineConfig,
}

impl<'a> RepairDispatcher<'a> {
    pub fn new(storage: &'a dyn Storage, config: &'a EngineConfig) -> Self {
        Self { storage, config }
    }

    pub fn repair(&self, item: &Item, dest_dir: &Handle) -> Result<Repaired, RepairError> {
        self.repair_as(item, dest_dir, &self.output_name(item))
    }

    /// Repairs `item` into `dest_dir` under `name` rather than the name
    /// [`output_name`](Self::output_name) would pick.
    pub fn repair_as(&self, item: &Item, dest_dir: &Handle, name: &str) -> Result<Repaired, RepairError> {
        let route = Route::for_item(item);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(item, route, dest_dir, name)))
            .unwrap_or_else(|payload| Err(RepairError::Panicked(panic_message(payload.as_ref()))));

        match &outcome {
            Ok(repaired) => tracing::info!(
                item = %item.handle(),
                output = %repaired.name,
                fidelity = ?repaired.fidelity,
                "repaired"
            ),
            Err(e) => tracing::warn!(item = %item.handle(), ?route, error = %e, "repair failed"),
        }
        outcome
    }

    /// The name the strategy for `item` commits its artifact under.
    pub fn output_name(&self, item: &Item) -> String {
        let route = Route::for_item(item);
        let (fallback, ext) = match route {
            Route::Image => ("image", "jpg".to_string()),
            Route::Mp4 => ("video", "mp4".to_string()),
            Route::Audio => ("audio", item.extension().unwrap_or_else(|| "m4a".to_string())),
            Route::Pdf => ("document", "pdf".to_string()),
            Route::Zip => ("archive", "zip".to_string()),
            Route::Tar { .. } => ("archive", "tar".to_string()),
            Route::Text | Route::OfficeZip | Route::Gzip | Route::Unsupported(_) | Route::Opaque => {
                return item.name().to_string();
            }
        };
        let mut base = self.base_for(item, fallback);
        // `backup.tar.gz` salvages to `backup_fixed.tar`.
        if matches!(route, Route::Tar { .. }) && base.to_ascii_lowercase().ends_with(".tar") {
            base.truncate(base.len() - ".tar".len());
            if base.is_empty() {
                base = fallback.to_string();
            }
        }
        self.config.repaired_name(&base, &ext)
    }

    fn dispatch(&self, item: &Item, route: Route, dest_dir: &Handle, name: &str) -> Result<Repaired, RepairError> {
        match route {
            Route::Image => self.reencode_image(item, dest_dir, name),
            Route::Mp4 => self.remux_video(item, dest_dir, name),
            Route::Audio => self.relabel_audio(item, dest_dir, name),
            Route::Pdf => self.revalidate_pdf(item, dest_dir, name),
            Route::Zip => self.salvage_archive(item, dest_dir, name),
            Route::Tar { gzip } => self.salvage_tar(item, gzip, dest_dir, name),
            Route::Gzip => Err(RepairError::Strategy {
                kind: Kind::Archive,
                source: CoreError::Unsupported("gzip stream has no entries to salvage".to_string()),
            }),
            Route::Unsupported(kind) => Err(RepairError::Strategy {
                kind,
                source: CoreError::Unsupported(format!("no parser for {}", item.name())),
            }),
            Route::Text | Route::OfficeZip | Route::Opaque => {
                let copied = VerifiedCopy::new(self.storage, self.config).copy(item.handle(), dest_dir, name)?;
                Ok(Repaired {
                    handle: copied.handle,
                    name: copied.name,
                    fidelity: Fidelity::Exact,
                    sha256: Some(copied.sha256),
                })
            }
        }
    }

    /// Base for output names, preferring what storage reports now.
    fn base_for(&self, item: &Item, fallback: &str) -> String {
        let name = self
            .storage
            .display_name(item.handle())
            .unwrap_or_else(|| item.name().to_string());
        match reclaim_core::base_name(&name) {
            "" => fallback.to_string(),
            base => base.to_string(),
        }
    }

    fn open(&self, item: &Item) -> Result<Box<dyn reclaim_core::ByteStream>, RepairError> {
        self.storage.open_read(item.handle()).map_err(RepairError::Source)
    }

    fn reencode_image(&self, item: &Item, dest_dir: &Handle, name: &str) -> Result<Repaired, RepairError> {
        let source = self.open(item)?;
        let encoded = image::reencode_jpeg(BufReader::new(source), self.config.jpeg_quality)
            .map_err(|source| RepairError::Strategy {
                kind: Kind::Image,
                source,
            })?;

        let written = VerifiedCopy::new(self.storage, self.config).write_from(
            &mut Cursor::new(encoded),
            dest_dir,
            name,
            "image/jpeg",
        )?;
        Ok(Repaired {
            handle: written.handle,
            name: written.name,
            fidelity: Fidelity::Lossy,
            sha256: Some(written.sha256),
        })
    }

    fn remux_video(&self, item: &Item, dest_dir: &Handle, name: &str) -> Result<Repaired, RepairError> {
        let source = self.open(item)?;
        let staged = Staged::begin(self.storage, self.config, dest_dir, name, "video/mp4")?;

        let stats = {
            let mut out = staged.open_write()?;
            let stats = video::remux_mp4(source, &mut *out).map_err(|source| {
                RepairError::Strategy {
                    kind: Kind::Video,
                    source,
                }
            })?;
            out.flush().map_err(TransferError::Io)?;
            out.sync_all().map_err(TransferError::Io)?;
            stats
        };

        let back = staged.open_read_back()?;
        video::probe_mp4(back).map_err(RepairError::Verification)?;

        let handle = staged.commit()?;
        Ok(Repaired {
            handle,
            name: name.to_string(),
            fidelity: Fidelity::Remuxed {
                tracks: stats.tracks,
                samples: stats.samples,
            },
            sha256: None,
        })
    }

    /// Validates the audio metadata, then copies the bytes unchanged.
    fn relabel_audio(&self, item: &Item, dest_dir: &Handle, name: &str) -> Result<Repaired, RepairError> {
        audio::probe_duration(self.open(item)?).map_err(|source| RepairError::Strategy {
            kind: Kind::Audio,
            source,
        })?;
        self.relabelled_copy(item, dest_dir, name)
    }

    fn revalidate_pdf(&self, item: &Item, dest_dir: &Handle, name: &str) -> Result<Repaired, RepairError> {
        let pages = pdf::page_count(self.open(item)?).map_err(|source| RepairError::Strategy {
            kind: Kind::Document,
            source,
        })?;
        if pages == 0 {
            return Err(RepairError::Strategy {
                kind: Kind::Document,
                source: CoreError::invalid("document has no pages"),
            });
        }
        self.relabelled_copy(item, dest_dir, name)
    }

    fn relabelled_copy(&self, item: &Item, dest_dir: &Handle, name: &str) -> Result<Repaired, RepairError> {
        let copied = VerifiedCopy::new(self.storage, self.config).copy(item.handle(), dest_dir, name)?;
        Ok(Repaired {
            handle: copied.handle,
            name: copied.name,
            fidelity: Fidelity::Relabelled,
            sha256: Some(copied.sha256),
        })
    }

    /// Rebuilds the archive from its readable entries. Keeping none still
    /// succeeds with an empty archive.
    fn salvage_archive(&self, item: &Item, dest_dir: &Handle, name: &str) -> Result<Repaired, RepairError> {
        let source = self.open(item)?;
        let staged = Staged::begin(self.storage, self.config, dest_dir, name, "application/zip")?;

        let stats = {
            let mut out = staged.open_write()?;
            let stats = archive::salvage_zip(source, &mut *out).map_err(|source| {
                RepairError::Strategy {
                    kind: Kind::Archive,
                    source,
                }
            })?;
            out.flush().map_err(TransferError::Io)?;
            out.sync_all().map_err(TransferError::Io)?;
            stats
        };

        let back = staged.open_read_back()?;
        let entries = archive::walk_zip(back).map_err(RepairError::Verification)?;
        self.commit_salvage(item, staged, name, stats, entries)
    }

    /// Rebuilds a tar from its readable entries as an uncompressed tar,
    /// whatever the input's compression.
    fn salvage_tar(&self, item: &Item, gzip: bool, dest_dir: &Handle, name: &str) -> Result<Repaired, RepairError> {
        let source = self.open(item)?;
        let staged = Staged::begin(self.storage, self.config, dest_dir, name, "application/x-tar")?;

        let stats = {
            let mut out = staged.open_write()?;
            let stats = tarball::salvage_tar(BufReader::new(source), gzip, &mut *out).map_err(|source| {
                RepairError::Strategy {
                    kind: Kind::Archive,
                    source,
                }
            })?;
            out.flush().map_err(TransferError::Io)?;
            out.sync_all().map_err(TransferError::Io)?;
            stats
        };

        let back = staged.open_read_back()?;
        let entries = tarball::walk_tar(BufReader::new(back), false).map_err(RepairError::Verification)?;
        self.commit_salvage(item, staged, name, stats, entries)
    }

    fn commit_salvage(
        &self,
        item: &Item,
        staged: Staged<'_>,
        name: &str,
        stats: SalvageStats,
        entries: usize,
    ) -> Result<Repaired, RepairError> {
        if entries != stats.kept {
            return Err(RepairError::Verification(CoreError::invalid(format!(
                "salvaged archive holds {entries} entries, expected {}",
                stats.kept
            ))));
        }
        if stats.truncated {
            tracing::debug!(item = %item.handle(), kept = stats.kept, "archive was truncated");
        }
        let handle = staged.commit()?;
        Ok(Repaired {
            handle,
            name: name.to_string(),
            fidelity: Fidelity::Salvaged {
                kept: stats.kept,
                skipped: stats.skipped,
            },
            sha256: None,
        })
    }
}
