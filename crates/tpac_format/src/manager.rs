//! Directory-wide package loading and cross-package asset resolution.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};

use bon::Builder;
use indexmap::IndexMap;
use tracing::{info, instrument, warn};

use crate::asset::Asset;
use crate::error::{Error, Result};
use crate::guid::Guid;
use crate::read::Package;
use crate::registry::CodecRegistry;

/// Progress callback: `(index, count, file_name, parsed_ok) -> continue`.
///
/// Invoked on the calling thread after each package file finishes, never
/// from a worker. Returning `false` cancels the scan at the next file
/// boundary; files already parsed are kept.
pub type ProgressFn = Box<dyn FnMut(usize, usize, &str, bool) -> bool>;

/// Options for [`AssetManager::load_directory_with`].
#[derive(Builder)]
pub struct LoadOptions {
    #[builder(default = Arc::new(CodecRegistry::standard()))]
    pub registry: Arc<CodecRegistry>,
    pub progress: Option<ProgressFn>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions::builder().build()
    }
}

/// Where one asset lives: which package slot, which asset position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AssetLocation {
    package: usize,
    asset: usize,
}

/// Outcome of resolving a GUID reference.
///
/// Callers need to tell "try again later" apart from "permanently absent":
/// no resolver installed yet, the asset's package since unloaded, and a
/// GUID nothing loaded carries are three different answers.
#[derive(Debug)]
pub enum Resolution<'a> {
    /// No asset manager is installed yet; retry once one exists.
    NoResolver,
    /// No loaded package carries this GUID.
    Missing,
    /// The asset was loaded once, but its package has been unloaded.
    Invalidated,
    Resolved(&'a Asset),
}

/// A GUID reference to an asset in some other package, with an optional
/// display-name hint for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssetRef {
    pub guid: Guid,
    pub name_hint: Option<String>,
}

impl AssetRef {
    pub fn new(guid: Guid) -> Self {
        AssetRef {
            guid,
            name_hint: None,
        }
    }

    pub fn named(guid: Guid, name: impl Into<String>) -> Self {
        AssetRef {
            guid,
            name_hint: Some(name.into()),
        }
    }

    pub fn resolve<'a>(&self, manager: Option<&'a AssetManager>) -> Resolution<'a> {
        match manager {
            Some(manager) => manager.resolve(self.guid),
            None => Resolution::NoResolver,
        }
    }
}

/// Aggregates packages from a directory and indexes every asset by GUID.
#[derive(Default)]
pub struct AssetManager {
    /// Slots stay in place after unloading so index entries can report
    /// the invalidated state instead of silently missing.
    packages: Vec<Option<Package>>,
    index: IndexMap<Guid, AssetLocation>,
}

impl AssetManager {
    /// Load every `.tpac` file under `directory` with default options.
    pub fn load_directory(directory: impl AsRef<Path>) -> Result<Self> {
        AssetManager::load_directory_with(directory, LoadOptions::default())
    }

    /// Load every `.tpac` file under `directory`.
    ///
    /// Each file is an independent unit of work parsed on a scoped worker
    /// thread. A file that fails to parse is logged and skipped; the rest
    /// of the directory still loads. A missing directory fails before any
    /// file is touched.
    #[instrument(skip(options), fields(directory = %directory.as_ref().display()))]
    pub fn load_directory_with(
        directory: impl AsRef<Path>,
        mut options: LoadOptions,
    ) -> Result<Self> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            return Err(Error::DirectoryNotFound(directory.to_path_buf()));
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(directory)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("tpac"))
            })
            .collect();
        files.sort();

        let count = files.len();
        let mut slots: Vec<Option<Package>> = Vec::new();
        slots.resize_with(count, || None);

        let next = AtomicUsize::new(0);
        let cancel = AtomicBool::new(false);
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(count.max(1));

        std::thread::scope(|scope| {
            let (tx, rx) = mpsc::channel::<(usize, Result<Package>)>();
            for _ in 0..workers {
                let tx = tx.clone();
                let files = &files;
                let next = &next;
                let cancel = &cancel;
                let registry = Arc::clone(&options.registry);
                scope.spawn(move || loop {
                    if cancel.load(Ordering::Relaxed) {
                        break;
                    }
                    let i = next.fetch_add(1, Ordering::Relaxed);
                    if i >= files.len() {
                        break;
                    }
                    let outcome = Package::open_with(&files[i], Arc::clone(&registry));
                    if tx.send((i, outcome)).is_err() {
                        break;
                    }
                });
            }
            drop(tx);

            // Progress runs here, on the caller's thread.
            let mut done = 0;
            for (i, outcome) in rx {
                done += 1;
                let file_name = files[i]
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let ok = match outcome {
                    Ok(package) => {
                        slots[i] = Some(package);
                        true
                    }
                    Err(e) => {
                        warn!(file = %files[i].display(), error = %e, "skipping package");
                        false
                    }
                };
                if let Some(progress) = options.progress.as_mut() {
                    if !progress(done, count, &file_name, ok) {
                        cancel.store(true, Ordering::Relaxed);
                    }
                }
            }
        });

        let packages: Vec<Option<Package>> = slots.into_iter().filter(|s| s.is_some()).collect();
        let mut manager = AssetManager {
            packages,
            index: IndexMap::new(),
        };
        manager.rebuild_index();

        info!(
            packages = manager.packages.len(),
            assets = manager.index.len(),
            "directory loaded"
        );
        Ok(manager)
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (package_slot, package) in self.packages.iter().enumerate() {
            let Some(package) = package else { continue };
            for (asset_slot, asset) in package.assets.iter().enumerate() {
                let location = AssetLocation {
                    package: package_slot,
                    asset: asset_slot,
                };
                if let Some(previous) = self.index.insert(asset.guid, location) {
                    warn!(
                        guid = %asset.guid,
                        name = %asset.name,
                        previous_package = previous.package,
                        "duplicate asset GUID, later package wins"
                    );
                }
            }
        }
    }

    /// Add one already-parsed package to the set.
    pub fn add_package(&mut self, package: Package) {
        self.packages.push(Some(package));
        self.rebuild_index();
    }

    /// Drop a package. Index entries for its assets become
    /// [`Resolution::Invalidated`] rather than missing.
    pub fn unload_package(&mut self, guid: Guid) -> bool {
        for slot in self.packages.iter_mut() {
            if slot.as_ref().is_some_and(|p| p.guid == guid) {
                *slot = None;
                return true;
            }
        }
        false
    }

    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.iter().filter_map(|p| p.as_ref())
    }

    pub fn asset_count(&self) -> usize {
        self.index.len()
    }

    pub fn resolve(&self, guid: Guid) -> Resolution<'_> {
        match self.index.get(&guid) {
            None => Resolution::Missing,
            Some(location) => match &self.packages[location.package] {
                None => Resolution::Invalidated,
                Some(package) => Resolution::Resolved(&package.assets[location.asset]),
            },
        }
    }

    /// The asset for `guid` if it is currently resolvable.
    pub fn asset(&self, guid: Guid) -> Option<&Asset> {
        match self.resolve(guid) {
            Resolution::Resolved(asset) => Some(asset),
            _ => None,
        }
    }
}
