//! Bounded structural probes per item.

use crate::config::EngineConfig;
use crate::route::Route;
use reclaim_core::formats::{archive, audio, generic, image, pdf, tarball, video};
use reclaim_core::{CoreError, CorruptReport, Item, Storage};
use std::any::Any;
use std::io::BufReader;
use std::panic::{self, AssertUnwindSafe};

/// Prefix of every report produced when the probe itself could not run.
pub const CHECK_ERROR_PREFIX: &str = "error during check";

enum ProbeFailure {
    /// The bytes were read but do not form a valid structure.
    Structure(CoreError),
    /// The item could not be read at all.
    Access(CoreError),
}

/// Answers "is this item structurally healthy?" without writing anything.
pub struct CorruptionDetector<'a> {
    storage: &'a dyn Storage,
    config: &'a EngineConfig,
}

impl<'a> CorruptionDetector<'a> {
    pub fn new(storage: &'a dyn Storage, config: &'a EngineConfig) -> Self {
        Self { storage, config }
    }

    /// `None` when healthy. A probe that cannot run, including one that
    /// panics inside a parser, yields a non-fixable report.
    pub fn detect(&self, item: &Item) -> Option<CorruptReport> {
        let route = Route::for_item(item);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.probe(item, route)));

        let report = match outcome {
            Ok(Ok(())) => return None,
            Ok(Err(ProbeFailure::Structure(e))) => {
                tracing::debug!(item = %item.handle(), ?route, error = %e, "probe failed");
                CorruptReport::new(item, route.failure_reason(), route.fixable())
            }
            Ok(Err(ProbeFailure::Access(e))) => {
                CorruptReport::new(item, format!("{CHECK_ERROR_PREFIX}: {e}"), false)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!(item = %item.handle(), %message, "probe panicked");
                CorruptReport::new(item, format!("{CHECK_ERROR_PREFIX}: {message}"), false)
            }
        };
        Some(report)
    }

    fn probe(&self, item: &Item, route: Route) -> Result<(), ProbeFailure> {
        let stream = self
            .storage
            .open_read(item.handle())
            .map_err(ProbeFailure::Access)?;
        let limit = self.config.probe_read_bytes;

        let result = match route {
            Route::Image => image::probe_bounds(BufReader::new(stream)).map(drop),
            Route::Mp4 => video::probe_mp4(stream).map(drop),
            Route::Audio => audio::probe_duration(stream).map(drop),
            Route::Pdf => pdf::page_count(stream).and_then(|pages| match pages {
                0 => Err(CoreError::invalid("document has no pages")),
                _ => Ok(()),
            }),
            Route::OfficeZip | Route::Zip => archive::walk_zip(stream).map(drop),
            Route::Tar { gzip } => tarball::walk_tar(stream, gzip).map(drop),
            Route::Gzip => tarball::inflate_gzip(stream).map(drop),
            Route::Text | Route::Unsupported(_) | Route::Opaque => {
                generic::bounded_read(stream, limit).and_then(|n| match n {
                    0 => Err(CoreError::invalid("no readable bytes")),
                    _ => Ok(()),
                })
            }
        };
        result.map_err(ProbeFailure::Structure)
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "parser panicked".to_string()
    }
}
