// Copyright 2016 Mozilla Foundation
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use errors::*;

pub const INFO_FILE_NAME: &'static str = "cache.info";

/// Fixed lock file name. The name is the lock's identity: every launcher
/// on the machine opens the same path, so an exclusive lock on it
/// serializes counter updates across processes.
pub const LOCK_FILE_NAME: &'static str = "cache.lock";

/// The persisted counters: a fixed-size native-endian record of
/// `(hits: u32, misses: u32, size_bytes: u64)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheInfo {
    pub hits: u32,
    pub misses: u32,
    pub size_bytes: u64,
}

impl CacheInfo {
    /// Hit rate in percent; 0 when nothing has been recorded yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits as u64 + self.misses as u64;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }
}

/// `load`/`update` access to the counter record, each holding the
/// cross-process lock for the duration of the file I/O.
#[derive(Debug)]
pub struct CounterFile {
    dir: PathBuf,
}

impl CounterFile {
    /// `dir` is the cache directory (`<cache_root>/.lelcache`); it is
    /// created on first use.
    pub fn new<P: AsRef<Path>>(dir: P) -> CounterFile {
        CounterFile { dir: dir.as_ref().to_owned() }
    }

    pub fn load(&self) -> Result<CacheInfo> {
        let _lock = self.lock()?;
        self.read_record()
    }

    /// Read-modify-write under the lock.
    pub fn update<F>(&self, apply: F) -> Result<CacheInfo>
        where F: FnOnce(&mut CacheInfo),
    {
        let _lock = self.lock()?;
        let mut info = self.read_record()?;
        apply(&mut info);
        self.write_record(&info)?;
        Ok(info)
    }

    /// The lock is released when the returned handle is dropped.
    fn lock(&self) -> Result<File> {
        fs::create_dir_all(&self.dir)
            .chain_err(|| format!("unable to create cache directory '{}'", self.dir.display()))?;
        let path = self.dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .chain_err(|| format!("unable to open lock file '{}'", path.display()))?;
        file.lock_exclusive()
            .chain_err(|| format!("unable to lock '{}'", path.display()))?;
        Ok(file)
    }

    fn read_record(&self) -> Result<CacheInfo> {
        let path = self.dir.join(INFO_FILE_NAME);
        if !path.exists() {
            return Ok(CacheInfo::default());
        }
        let mut file = File::open(&path)
            .chain_err(|| format!("unable to open counter file '{}'", path.display()))?;
        let hits = file.read_u32::<NativeEndian>()?;
        let misses = file.read_u32::<NativeEndian>()?;
        let size_bytes = file.read_u64::<NativeEndian>()?;
        Ok(CacheInfo {
            hits: hits,
            misses: misses,
            size_bytes: size_bytes,
        })
    }

    fn write_record(&self, info: &CacheInfo) -> Result<()> {
        let mut record = Vec::with_capacity(16);
        record.write_u32::<NativeEndian>(info.hits)?;
        record.write_u32::<NativeEndian>(info.misses)?;
        record.write_u64::<NativeEndian>(info.size_bytes)?;
        let path = self.dir.join(INFO_FILE_NAME);
        let tmp = path.with_extension(format!("tmp{}", Uuid::new_v4().simple()));
        fs::write(&tmp, &record)
            .chain_err(|| format!("unable to write counter file '{}'", tmp.display()))?;
        fs::rename(&tmp, &path)
            .chain_err(|| format!("unable to finalize counter file '{}'", path.display()))?;
        Ok(())
    }
}
