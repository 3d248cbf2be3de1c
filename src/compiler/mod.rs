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

pub mod msvc;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use cache::{CacheKey, CACHE_DIR_NAME};
use cache::disk::DiskCache;
use cache::info::CounterFile;
use config::Config;
use mock_command::{CommandChild, CommandCreator, RunCommand};
use util::{self, TempFile};

use errors::*;

pub const EXIT_FAILURE: i32 = 1;

/// The result of parsing a wrapped compiler command line.
#[derive(Debug, PartialEq)]
pub enum CompilerArguments<T> {
    /// Understood and cacheable.
    Ok(T),
    /// Understood, but caching it is not possible or not worthwhile.
    CannotCache(&'static str),
    /// Not a compilation at all (no `/c`).
    NotCompilation,
}

/// The results of parsing a compiler commandline.
#[derive(Debug, PartialEq, Clone)]
pub struct ParsedArguments {
    /// The input source file.
    pub input: PathBuf,
    /// Where the object file goes; defaulted from the source name when
    /// no `/Fo` was given.
    pub object_out: PathBuf,
    /// Where the pdb goes, iff this compile emits debug information.
    pub pdb_out: Option<PathBuf>,
    /// The temp file the preprocessed text is written to.
    pub preprocessed_file: PathBuf,
    /// Flags that affect the preprocessed text, in command-line order.
    pub preprocessor_args: Vec<OsString>,
    /// Flags that affect code generation, in command-line order.
    pub compiler_args: Vec<OsString>,
    /// Hash of the canonicalized compile flags; the second half of the
    /// cache key.
    pub flags_hash: u64,
    /// Whether `/nologo` was on the command line. Not hashed, re-added
    /// to the compile command line.
    pub seen_nologo: bool,
}

impl ParsedArguments {
    /// The argument vector for the preprocess phase, after the compiler
    /// path. `/EP` suppresses `#line` directives so the preprocessed
    /// text is a pure content fingerprint; `/P` sends it to the `/Fi:`
    /// file instead of stdout.
    pub fn preprocess_arguments(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["/EP".into(), "/P".into(), "/nologo".into()];
        args.extend(self.preprocessor_args.iter().cloned());
        let mut fi = OsString::from("/Fi:");
        fi.push(self.preprocessed_file.as_os_str());
        args.push(fi);
        args.push(self.input.clone().into_os_string());
        args
    }

    /// The argument vector for the code-generation phase, after the
    /// compiler path. Everything that was kept out of the flags hash is
    /// appended here, behind the hashed flags.
    pub fn compile_arguments(&self) -> Vec<OsString> {
        let mut args = self.compiler_args.clone();
        if self.seen_nologo {
            args.push("/nologo".into());
        }
        args.extend(self.preprocessor_args.iter().cloned());
        let mut fo = OsString::from("/Fo:");
        fo.push(self.object_out.as_os_str());
        args.push(fo);
        if let Some(ref pdb) = self.pdb_out {
            let mut fd = OsString::from("/Fd:");
            fd.push(pdb.as_os_str());
            args.push(fd);
        }
        args.push(self.input.clone().into_os_string());
        args
    }
}

/// Where the compiler's standard output goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    /// Stdout to the null sink. The preprocess phase prints the source
    /// file name, which is noise.
    Silent,
    /// Standard handles inherited, so the user sees diagnostics.
    Verbose,
}

/// Launch the compiler and wait for it. A failure to launch is reported
/// on stderr and returned as a failing exit code, never as an error.
pub fn run_compiler<T>(creator: &mut T, executable: &Path, args: &[OsString], mode: Mode) -> i32
    where T: CommandCreator,
{
    let mut cmd = creator.new_command(executable);
    cmd.args(args);
    if let Mode::Silent = mode {
        cmd.stdout(Stdio::null());
    }
    trace!("run_compiler: {:?} {:?}", executable, args);
    match cmd.spawn().and_then(|child| child.wait()) {
        Ok(status) => status.code().unwrap_or(EXIT_FAILURE),
        Err(e) => {
            eprintln!("lelcache: unable to start {}: {}", executable.display(), e);
            EXIT_FAILURE
        }
    }
}

/// Forward the original arguments to the compiler untouched and hand its
/// exit code back. No cache I/O happens on this path.
pub fn pass_through<T>(creator: &mut T, compiler: &Path, arguments: &[OsString]) -> i32
    where T: CommandCreator,
{
    run_compiler(creator, compiler, arguments, Mode::Verbose)
}

/// Drive one wrapped compile: parse, preprocess, probe the cache, and
/// either copy the cached artifacts out or run the real compile and
/// deposit its results.
///
/// The preprocessed temp file is deleted on every path out of here; the
/// guard taken right after parsing sees to that.
pub fn run_invocation<T>(creator: &mut T,
                         config: &Config,
                         compiler: &Path,
                         arguments: &[OsString])
                         -> Result<i32>
    where T: CommandCreator,
{
    let parsed = match msvc::parse_arguments(compiler, arguments) {
        CompilerArguments::Ok(parsed) => parsed,
        CompilerArguments::CannotCache(why) => {
            debug!("cannot cache ({}); passing through", why);
            return Ok(pass_through(creator, compiler, arguments));
        }
        CompilerArguments::NotCompilation => {
            debug!("not a compilation; passing through");
            return Ok(pass_through(creator, compiler, arguments));
        }
    };
    let temp = TempFile::new(parsed.preprocessed_file.clone());

    let status = run_compiler(creator, compiler, &parsed.preprocess_arguments(), Mode::Silent);
    if status != 0 {
        debug!("preprocess of {} failed with exit code {}", parsed.input.display(), status);
        return Ok(status);
    }

    let preproc_hash = util::hash_file(temp.path())?;
    let key = CacheKey::new(preproc_hash, parsed.flags_hash);
    let cache_dir = config.cache_root.join(CACHE_DIR_NAME);
    let storage = DiskCache::new(&cache_dir);
    let counters = CounterFile::new(&cache_dir);

    if storage.probe(&key) {
        debug!("cache hit for {}", parsed.input.display());
        storage.get(&key,
                    &parsed.object_out,
                    parsed.pdb_out.as_ref().map(|p| p.as_path()))?;
        if let Err(e) = counters.update(|info| info.hits += 1) {
            warn!("unable to update cache counters: {}", e);
        }
        Ok(0)
    } else {
        debug!("cache miss for {}", parsed.input.display());
        let status = run_compiler(creator, compiler, &parsed.compile_arguments(), Mode::Verbose);
        if status != 0 {
            return Ok(status);
        }
        match storage.put(&key,
                          &parsed.object_out,
                          parsed.pdb_out.as_ref().map(|p| p.as_path())) {
            Ok(deposited) => {
                if let Err(e) = counters.update(|info| {
                    info.misses += 1;
                    info.size_bytes += deposited;
                }) {
                    warn!("unable to update cache counters: {}", e);
                }
            }
            // The user already has their object file; a failed deposit
            // only costs a future hit.
            Err(e) => warn!("unable to deposit cache entry: {}", e),
        }
        Ok(0)
    }
}
