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

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use cache::CACHE_DIR_NAME;
use cache::info::CounterFile;
use cmdline::Command;
use compiler;
use config;
use mock_command::{CommandCreator, ProcessCommandCreator};

use errors::*;

/// Smallest accepted value for `-m`, in megabytes.
const MIN_CACHE_SIZE_MB: u64 = 32;

const COMPILER_FILE_NAME: &'static str = "cl.exe";

pub fn run_command(command: Command) -> Result<i32> {
    match command {
        Command::ShowInfo => show_info(),
        Command::SetMaxSize(megabytes) => set_max_size(megabytes),
        Command::SetCacheRoot(path) => set_cache_root(&path),
        Command::Compile { compiler, arguments } => compile(&compiler, &arguments),
    }
}

fn show_info() -> Result<i32> {
    let config = config::load()?;
    let info = CounterFile::new(config.cache_root.join(CACHE_DIR_NAME)).load()?;
    println!("cache hits:         {}", info.hits);
    println!("cache misses:       {}", info.misses);
    println!("cache hit rate:     {:.2}%", info.hit_rate());
    println!("maximum cache size: {} MB", config.max_cache_size / (1024 * 1024));
    println!("current cache size: {} MB", info.size_bytes / (1024 * 1024));
    println!("cache location:     {}", config.cache_root.display());
    Ok(0)
}

fn set_max_size(megabytes: u64) -> Result<i32> {
    if megabytes < MIN_CACHE_SIZE_MB {
        bail!("cache size must be at least {} megabytes", MIN_CACHE_SIZE_MB);
    }
    let mut config = config::load()?;
    config.max_cache_size = megabytes * 1024 * 1024;
    config::store(&config)?;
    Ok(0)
}

fn set_cache_root(path: &Path) -> Result<i32> {
    let mut config = config::load()?;
    config.cache_root = normalize_cache_root(path)?;
    config::store(&config)?;
    Ok(0)
}

/// The absolute form of `path` with trailing separators stripped, so the
/// persisted root joins cleanly with the cache directory name.
fn normalize_cache_root(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_owned()
    } else {
        env::current_dir()
            .chain_err(|| "unable to determine the working directory")?
            .join(path)
    };
    let text = absolute.to_string_lossy();
    let trimmed = text.trim_end_matches(|c| c == '/' || c == '\\');
    if trimmed.is_empty() {
        Ok(absolute.clone())
    } else {
        Ok(PathBuf::from(trimmed))
    }
}

fn compile(compiler_path: &Path, arguments: &[OsString]) -> Result<i32> {
    if compiler_path.file_name().map_or(true, |name| name != COMPILER_FILE_NAME) {
        eprintln!("lelcache: first argument is expected to be the path to cl.exe");
        return Ok(compiler::EXIT_FAILURE);
    }
    let config = config::load()?;
    let mut creator = ProcessCommandCreator::new_creator();
    compiler::run_invocation(&mut creator, &config, compiler_path, arguments)
}
