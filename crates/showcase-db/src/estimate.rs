// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use showcase_app::{StorageEstimate, StorageEstimator};
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use sysinfo::Disks;

/// Measures the database file plus its WAL and shared-memory sidecars against a
/// fixed byte budget.
#[derive(Debug, Clone)]
pub struct StoreQuotaEstimator {
    db_path: PathBuf,
    budget_bytes: u64,
}

impl StoreQuotaEstimator {
    pub fn new(db_path: impl Into<PathBuf>, budget_bytes: u64) -> Self {
        Self {
            db_path: db_path.into(),
            budget_bytes,
        }
    }
}

impl StorageEstimator for StoreQuotaEstimator {
    fn estimate(&mut self) -> Result<StorageEstimate> {
        let main = fs::metadata(&self.db_path)
            .with_context(|| format!("stat database file {}", self.db_path.display()))?;
        let mut used_bytes = main.len();
        for sidecar in sidecar_paths(&self.db_path) {
            used_bytes += optional_file_len(&sidecar)?;
        }
        Ok(StorageEstimate {
            used_bytes,
            total_bytes: self.budget_bytes,
        })
    }
}

/// The `-wal` and `-shm` files SQLite keeps next to a database in WAL mode.
pub fn sidecar_paths(db_path: &Path) -> [PathBuf; 2] {
    ["-wal", "-shm"].map(|suffix| {
        let mut name = OsString::from(db_path.as_os_str());
        name.push(suffix);
        PathBuf::from(name)
    })
}

fn optional_file_len(path: &Path) -> Result<u64> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(metadata.len()),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(0),
        Err(error) => Err(error).with_context(|| format!("stat {}", path.display())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MountSpace {
    mount_point: PathBuf,
    total_bytes: u64,
    available_bytes: u64,
}

/// Reports usage of the filesystem that holds `target`.
#[derive(Debug, Clone)]
pub struct DiskEstimator {
    target: PathBuf,
}

impl DiskEstimator {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl StorageEstimator for DiskEstimator {
    fn estimate(&mut self) -> Result<StorageEstimate> {
        let resolved = existing_ancestor(&self.target)?;
        let disks = Disks::new_with_refreshed_list();
        let mounts: Vec<MountSpace> = disks
            .list()
            .iter()
            .map(|disk| MountSpace {
                mount_point: disk.mount_point().to_path_buf(),
                total_bytes: disk.total_space(),
                available_bytes: disk.available_space(),
            })
            .collect();

        let mount = find_mount(&resolved, &mounts).ok_or_else(|| {
            anyhow!(
                "no mounted filesystem contains {}; set [quota].source = \"store\" or \"off\"",
                resolved.display()
            )
        })?;
        Ok(StorageEstimate {
            used_bytes: mount.total_bytes.saturating_sub(mount.available_bytes),
            total_bytes: mount.total_bytes,
        })
    }
}

fn existing_ancestor(path: &Path) -> Result<PathBuf> {
    for candidate in path.ancestors() {
        if candidate.as_os_str().is_empty() {
            continue;
        }
        if let Ok(resolved) = candidate.canonicalize() {
            return Ok(resolved);
        }
    }
    let cwd = std::env::current_dir().context("resolve current directory")?;
    if path.is_relative() {
        return Ok(cwd);
    }
    bail!("cannot resolve any existing parent of {}", path.display())
}

fn find_mount<'a>(path: &Path, mounts: &'a [MountSpace]) -> Option<&'a MountSpace> {
    mounts
        .iter()
        .filter(|mount| path.starts_with(&mount.mount_point))
        .max_by_key(|mount| mount.mount_point.as_os_str().len())
}
