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

pub mod disk;
pub mod info;

use std::path::PathBuf;

use util;

/// Name of the cache directory created under the configured cache root.
pub const CACHE_DIR_NAME: &'static str = ".lelcache";

/// The two-level key identifying a cache entry: the content hash of the
/// preprocessed source and the hash of the canonicalized compiler flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheKey {
    pub preproc_hash: u64,
    pub flags_hash: u64,
}

impl CacheKey {
    pub fn new(preproc_hash: u64, flags_hash: u64) -> CacheKey {
        CacheKey {
            preproc_hash: preproc_hash,
            flags_hash: flags_hash,
        }
    }

    /// The entry directory relative to the cache directory: the preproc
    /// hash split into eight two-hex-digit path segments, then the flags
    /// hash flat. The split keeps any single directory from growing huge.
    pub fn relative_path(&self) -> PathBuf {
        let preproc = util::hash_hex(self.preproc_hash);
        let mut path = PathBuf::new();
        for segment in preproc.as_bytes().chunks(2) {
            // Chunks of a 16-byte ASCII string, always valid UTF-8.
            path.push(::std::str::from_utf8(segment).unwrap());
        }
        path.push(util::hash_hex(self.flags_hash));
        path
    }
}
