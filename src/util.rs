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

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use uuid::Uuid;
use xxhash_rust::xxh64::{xxh64, Xxh64};

use errors::*;

/// Seed for all 64-bit content hashes. Changing it invalidates every
/// existing cache entry.
pub const HASH_SEED: u64 = 0;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Hash a byte slice with XXH64.
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    xxh64(bytes, HASH_SEED)
}

/// Hash the full content of the file at `path` with XXH64, streaming so
/// large preprocessed sources don't get pulled into memory at once.
pub fn hash_file(path: &Path) -> Result<u64> {
    let mut file = File::open(path)
        .chain_err(|| format!("unable to open file '{}'", path.display()))?;
    let mut hasher = Xxh64::new(HASH_SEED);
    let mut buffer = [0u8; READ_BUFFER_SIZE];
    loop {
        let count = file.read(&mut buffer)
            .chain_err(|| format!("unable to read file '{}'", path.display()))?;
        if count == 0 {
            break;
        }
        hasher.update(&buffer[..count]);
    }
    Ok(hasher.digest())
}

/// Render a 64-bit hash as 16 lowercase hex digits.
pub fn hash_hex(hash: u64) -> String {
    format!("{:016x}", hash)
}

/// Render arguments the way they would appear on a command line: each
/// quoted, separated by single spaces. This is the canonical form that
/// gets hashed, so the rendering must stay stable.
pub fn render_args(args: &[String]) -> String {
    let mut rendered = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            rendered.push(' ');
        }
        rendered.push('"');
        rendered.push_str(arg);
        rendered.push('"');
    }
    rendered
}

/// Generate a path for the preprocessed output of `source`, unique across
/// concurrent invocations, placed next to the source file.
pub fn preprocess_temp_path(source: &Path) -> PathBuf {
    let stem = source.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("input"));
    let name = match source.extension() {
        Some(ext) => format!("{}-{}.{}", stem, Uuid::new_v4().simple(), ext.to_string_lossy()),
        None => format!("{}-{}", stem, Uuid::new_v4().simple()),
    };
    match source.parent() {
        Some(parent) if parent != Path::new("") => parent.join(name),
        _ => PathBuf::from(name),
    }
}

/// A file that is deleted when the guard goes out of scope, on every exit
/// path. The file does not need to exist yet, or ever.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    pub fn new(path: PathBuf) -> TempFile {
        TempFile { path: path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("failed to remove temporary file '{}': {}", self.path.display(), e);
            }
        }
    }
}
