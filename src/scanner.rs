//! Enumeration of candidate files across catalog and directory-tree sources.

use crate::config::EngineConfig;
use reclaim_core::{
    CatalogSource, Collection, DirIdentity, DirectoryTree, Entry, Item, Kind, RawRecord,
    ScanProgress, Selector, SourceTier,
};
use std::collections::HashSet;
use std::time::Instant;

/// How records seen through several sources are collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupPolicy {
    /// Collapse records sharing display name and reported size. Cheap, but
    /// two distinct files that happen to match on both become one item.
    #[default]
    NameAndSize,
    /// Collapse only records that resolve to the same handle.
    Handle,
}

/// Options for one scan invocation.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Emit records the source reports as trashed.
    pub include_trash: bool,
    /// Kinds to keep (empty = all).
    pub kinds: Vec<Kind>,
    pub dedup: DedupPolicy,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            include_trash: true,
            kinds: Vec::new(),
            dedup: DedupPolicy::default(),
        }
    }
}

impl ScanOptions {
    pub fn without_trash(mut self) -> Self {
        self.include_trash = false;
        self
    }

    pub fn with_kinds(mut self, kinds: Vec<Kind>) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn with_dedup(mut self, dedup: DedupPolicy) -> Self {
        self.dedup = dedup;
        self
    }
}

/// The sources one scan walks. Enumeration order is fixed by tier: primary
/// catalogs, then removable catalogs, then directory trees, each group in
/// insertion order.
#[derive(Default)]
pub struct SourceSet<'a> {
    catalogs: Vec<&'a dyn CatalogSource>,
    trees: Vec<&'a dyn DirectoryTree>,
}

impl<'a> SourceSet<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catalog(mut self, source: &'a dyn CatalogSource) -> Self {
        self.catalogs.push(source);
        self
    }

    pub fn tree(mut self, tree: &'a dyn DirectoryTree) -> Self {
        self.trees.push(tree);
        self
    }

    /// Every primary-tier catalog among `catalogs`.
    pub fn primary(catalogs: &[&'a dyn CatalogSource]) -> Self {
        Self::with_tier(catalogs, SourceTier::Primary)
    }

    /// Every removable-tier catalog among `catalogs`.
    pub fn removable(catalogs: &[&'a dyn CatalogSource]) -> Self {
        Self::with_tier(catalogs, SourceTier::Removable)
    }

    /// A single user-chosen directory tree.
    pub fn folder(tree: &'a dyn DirectoryTree) -> Self {
        Self::new().tree(tree)
    }

    fn with_tier(catalogs: &[&'a dyn CatalogSource], tier: SourceTier) -> Self {
        Self {
            catalogs: catalogs
                .iter()
                .copied()
                .filter(|c| c.tier() == tier)
                .collect(),
            trees: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty() && self.trees.is_empty()
    }

    fn ordered_catalogs(&self) -> Vec<&'a dyn CatalogSource> {
        let mut ordered = self.catalogs.clone();
        // Stable: ties keep insertion order.
        ordered.sort_by_key(|c| c.tier());
        ordered
    }
}

/// A source that could not be (fully) enumerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: String,
    pub reason: String,
}

/// Result of a scan. On cancellation `items` holds what was gathered so far.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub items: Vec<Item>,
    pub cancelled: bool,
    pub processed: u64,
    /// Records collapsed into an earlier item by the dedup policy.
    pub merged: u64,
    /// Records dropped by trash policy, acceptance or kind filters.
    pub filtered: u64,
    pub failures: Vec<SourceFailure>,
}

/// Walks sources and produces a unified, deduplicated item list.
pub struct Scanner<'c> {
    config: &'c EngineConfig,
}

struct Walk<'o, P, C> {
    options: &'o ScanOptions,
    on_progress: P,
    is_cancelled: C,
    interval: u64,
    outcome: ScanOutcome,
    seen: HashSet<(String, u64)>,
    seen_handles: HashSet<reclaim_core::Handle>,
    expected: u64,
    exact: bool,
}

impl<P, C> Walk<'_, P, C>
where
    P: FnMut(ScanProgress),
    C: Fn() -> bool,
{
    fn cancelled(&mut self) -> bool {
        if !self.outcome.cancelled && (self.is_cancelled)() {
            tracing::info!(processed = self.outcome.processed, "scan cancelled");
            self.outcome.cancelled = true;
        }
        self.outcome.cancelled
    }

    fn report(&mut self) {
        let progress = ScanProgress {
            processed: self.outcome.processed,
            expected: self.expected.max(self.outcome.processed),
            exact: self.exact,
        };
        tracing::trace!(processed = progress.processed, expected = progress.expected, "scan progress");
        (self.on_progress)(progress);
    }

    fn tick(&mut self) {
        self.outcome.processed += 1;
        if self.outcome.processed % self.interval == 0 {
            self.report();
        }
    }

    fn offer(&mut self, item: Item) {
        if !self.options.kinds.is_empty() && !self.options.kinds.contains(&item.kind()) {
            self.outcome.filtered += 1;
            return;
        }
        let fresh = match self.options.dedup {
            DedupPolicy::NameAndSize => self.seen.insert((item.name().to_string(), item.size())),
            DedupPolicy::Handle => self.seen_handles.insert(item.handle().clone()),
        };
        if fresh {
            self.outcome.items.push(item);
        } else {
            tracing::debug!(name = item.name(), size = item.size(), "collapsed duplicate record");
            self.outcome.merged += 1;
        }
    }
}

impl<'c> Scanner<'c> {
    pub fn new(config: &'c EngineConfig) -> Self {
        Self { config }
    }

    /// Enumerates every source in order, draining one before starting the next.
    ///
    /// `is_cancelled` is polled before every record; once it returns true the
    /// scan stops and returns what it has gathered. Progress is reported every
    /// `progress_interval` records and at the end of each source.
    pub fn scan<P, C>(
        &self,
        sources: &SourceSet<'_>,
        options: &ScanOptions,
        on_progress: P,
        is_cancelled: C,
    ) -> ScanOutcome
    where
        P: FnMut(ScanProgress),
        C: Fn() -> bool,
    {
        let started = Instant::now();
        let mut walk = Walk {
            options,
            on_progress,
            is_cancelled,
            interval: self.config.progress_interval.max(1),
            outcome: ScanOutcome::default(),
            seen: HashSet::new(),
            seen_handles: HashSet::new(),
            expected: 0,
            exact: true,
        };

        tracing::info!(
            catalogs = sources.catalogs.len(),
            trees = sources.trees.len(),
            include_trash = options.include_trash,
            "starting scan"
        );

        for catalog in sources.ordered_catalogs() {
            if walk.cancelled() {
                break;
            }
            self.scan_catalog(catalog, &mut walk);
            walk.report();
        }
        for tree in &sources.trees {
            if walk.cancelled() {
                break;
            }
            self.scan_tree(*tree, &mut walk);
            walk.report();
        }

        tracing::info!(
            items = walk.outcome.items.len(),
            processed = walk.outcome.processed,
            merged = walk.outcome.merged,
            cancelled = walk.outcome.cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scan finished"
        );
        walk.outcome
    }

    fn scan_catalog<P, C>(&self, catalog: &dyn CatalogSource, walk: &mut Walk<'_, P, C>)
    where
        P: FnMut(ScanProgress),
        C: Fn() -> bool,
    {
        for collection in Collection::SCAN_ORDER {
            if walk.cancelled() {
                return;
            }
            let selector = Selector {
                collection,
                include_trash: walk.options.include_trash,
            };
            match catalog.count(&selector) {
                Some(count) => walk.expected = walk.outcome.processed + count,
                None => {
                    walk.exact = false;
                    walk.expected = walk.outcome.processed;
                }
            }

            let records = match catalog.list_records(&selector) {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(source = catalog.id(), ?collection, error = %e, "catalog query failed");
                    walk.outcome.failures.push(SourceFailure {
                        source: catalog.id().to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            for record in records {
                if walk.cancelled() {
                    return;
                }
                walk.tick();
                match record {
                    Ok(record) => self.accept_record(catalog.id(), record, walk),
                    Err(e) => {
                        tracing::warn!(source = catalog.id(), error = %e, "unreadable catalog record");
                        walk.outcome.failures.push(SourceFailure {
                            source: catalog.id().to_string(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
    }

    fn accept_record<P, C>(&self, source_id: &str, record: RawRecord, walk: &mut Walk<'_, P, C>)
    where
        P: FnMut(ScanProgress),
        C: Fn() -> bool,
    {
        if record.trashed && !walk.options.include_trash {
            walk.outcome.filtered += 1;
            return;
        }
        if !self.accepts(&record.name, record.mime.as_deref()) {
            walk.outcome.filtered += 1;
            return;
        }
        walk.offer(Item::new(
            record.handle,
            record.name,
            record.mime,
            record.size,
            Some(source_id.to_string()),
            record.trashed,
        ));
    }

    /// Depth-first over an explicit stack so depth is bounded only by memory.
    /// Directories whose identity was already visited are treated as leaves.
    fn scan_tree<P, C>(&self, tree: &dyn DirectoryTree, walk: &mut Walk<'_, P, C>)
    where
        P: FnMut(ScanProgress),
        C: Fn() -> bool,
    {
        let root = tree.root();
        let mut visited: HashSet<DirIdentity> = tree.root_identity().into_iter().collect();
        walk.exact = false;
        let mut pending_files: u64 = 0;

        let root_children = match tree.children(&root) {
            Ok(children) => children,
            Err(e) => {
                tracing::warn!(tree = %root, error = %e, "cannot list tree root");
                walk.outcome.failures.push(SourceFailure {
                    source: root.to_string(),
                    reason: e.to_string(),
                });
                return;
            }
        };
        pending_files += count_files(&root_children);
        walk.expected = walk.outcome.processed + pending_files;
        let mut stack: Vec<(std::vec::IntoIter<Entry>, bool)> = vec![(root_children.into_iter(), false)];

        while let Some((level, in_trash)) = stack.last_mut() {
            let in_trash = *in_trash;
            let Some(entry) = level.next() else {
                stack.pop();
                continue;
            };
            if walk.cancelled() {
                return;
            }

            if entry.is_directory() {
                if let Some(identity) = entry.dir_identity {
                    if !visited.insert(identity) {
                        tracing::debug!(dir = %entry.handle, "directory already visited, not descending");
                        continue;
                    }
                }
                match tree.children(&entry.handle) {
                    Ok(children) => {
                        pending_files += count_files(&children);
                        walk.expected = walk.outcome.processed + pending_files;
                        let trashed = in_trash || self.is_trash_dir(&entry.name);
                        stack.push((children.into_iter(), trashed));
                    }
                    Err(e) => {
                        tracing::warn!(dir = %entry.handle, error = %e, "cannot list directory");
                        walk.outcome.failures.push(SourceFailure {
                            source: entry.handle.to_string(),
                            reason: e.to_string(),
                        });
                    }
                }
                continue;
            }

            pending_files = pending_files.saturating_sub(1);
            walk.tick();
            let trashed = in_trash || self.is_trashed_file(&entry.name);
            if trashed && !walk.options.include_trash {
                walk.outcome.filtered += 1;
                continue;
            }
            if !self.accepts(&entry.name, entry.mime.as_deref()) {
                walk.outcome.filtered += 1;
                continue;
            }
            walk.offer(Item::new(entry.handle, entry.name, entry.mime, entry.size, None, trashed));
        }
    }

    /// Drops obvious system records. A missing mime is never a reason.
    fn accepts(&self, name: &str, mime: Option<&str>) -> bool {
        if name.is_empty() {
            return false;
        }
        if self
            .config
            .rejected_names
            .iter()
            .any(|r| r.eq_ignore_ascii_case(name))
        {
            return false;
        }
        match mime {
            Some(mime) => !self
                .config
                .rejected_mime_prefixes
                .iter()
                .any(|p| mime.to_ascii_lowercase().starts_with(p.as_str())),
            None => true,
        }
    }

    fn is_trash_dir(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.config
            .trash_dir_patterns
            .iter()
            .any(|p| lower.starts_with(&p.to_lowercase()))
    }

    fn is_trashed_file(&self, name: &str) -> bool {
        !self.config.trashed_file_prefix.is_empty()
            && name.starts_with(self.config.trashed_file_prefix.as_str())
    }
}

fn count_files(entries: &[Entry]) -> u64 {
    entries.iter().filter(|e| !e.is_directory()).count() as u64
}
