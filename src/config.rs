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

use directories::{BaseDirs, ProjectDirs};
use serde_json;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use errors::*;

const APP_NAME: &'static str = "lelcache";
const CONFIG_FILE_NAME: &'static str = "config.json";

/// Default maximum cache size: 4 gigabytes. Recorded, never enforced.
pub const DEFAULT_MAX_CACHE_SIZE: u64 = 4 * 1024 * 1024 * 1024;

/// The persisted launcher configuration. The cache itself lives under
/// `cache_root/.lelcache`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub cache_root: PathBuf,
    pub max_cache_size: u64,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            cache_root: BaseDirs::new().home_dir().to_path_buf(),
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
        }
    }
}

/// Location of the configuration file, in the per-user local data
/// directory.
pub fn file_path() -> PathBuf {
    ProjectDirs::from("", "", APP_NAME)
        .data_local_dir()
        .join(CONFIG_FILE_NAME)
}

pub fn load() -> Result<Config> {
    load_from(&file_path())
}

pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let file = File::open(path)
        .chain_err(|| format!("unable to open config file '{}'", path.display()))?;
    let config = serde_json::from_reader(file)
        .chain_err(|| format!("unable to parse config file '{}'", path.display()))?;
    Ok(config)
}

pub fn store(config: &Config) -> Result<()> {
    store_to(config, &file_path())
}

pub fn store_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .chain_err(|| format!("unable to create config directory '{}'", parent.display()))?;
    }
    let file = File::create(path)
        .chain_err(|| format!("unable to write config file '{}'", path.display()))?;
    serde_json::to_writer_pretty(file, config)?;
    Ok(())
}
