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

use clap::{App, AppSettings, Arg, ArgGroup};
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use errors::*;

/// A parsed launcher invocation.
#[derive(Debug, PartialEq)]
pub enum Command {
    /// Print counters and configuration.
    ShowInfo,
    /// Persist a new size budget, in megabytes.
    SetMaxSize(u64),
    /// Persist a new cache root.
    SetCacheRoot(PathBuf),
    /// Wrap a compile.
    Compile {
        compiler: PathBuf,
        arguments: Vec<OsString>,
    },
}

fn get_app<'a, 'b>() -> App<'a, 'b> {
    App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compiler cache for cl.exe. Wrap a compile as `lelcache <path to cl.exe> <cl arguments...>`.")
        .setting(AppSettings::ArgRequiredElseHelp)
        .arg(Arg::with_name("show-info")
                 .short("i")
                 .help("show cache statistics"))
        .arg(Arg::with_name("set-max-size")
                 .short("m")
                 .takes_value(true)
                 .value_name("MB")
                 .help("set the maximum cache size in megabytes (at least 32)"))
        .arg(Arg::with_name("set-cache-root")
                 .short("p")
                 .takes_value(true)
                 .value_name("PATH")
                 .help("set the cache directory"))
        .group(ArgGroup::with_name("command")
                   .args(&["show-info", "set-max-size", "set-cache-root"])
                   .required(true))
}

pub fn parse() -> Result<Command> {
    parse_from(env::args_os().collect())
}

/// A first argument that does not look like an option is the compiler
/// path, and everything after it belongs to the compiler; only then does
/// clap get a say. Administrative errors (unknown options, a missing
/// value) exit 1 via clap.
fn parse_from(args: Vec<OsString>) -> Result<Command> {
    if let Some(compiler) = args.get(1) {
        if !compiler.to_string_lossy().starts_with('-') {
            return Ok(Command::Compile {
                compiler: PathBuf::from(compiler),
                arguments: args[2..].to_vec(),
            });
        }
    }
    let matches = get_app().get_matches_from(args);
    if let Some(value) = matches.value_of("set-max-size") {
        let megabytes = value.parse::<u64>().chain_err(|| {
            format!("the -m option expects a number in megabytes, got '{}'", value)
        })?;
        return Ok(Command::SetMaxSize(megabytes));
    }
    if let Some(path) = matches.value_of_os("set-cache-root") {
        return Ok(Command::SetCacheRoot(PathBuf::from(path)));
    }
    Ok(Command::ShowInfo)
}

#[cfg(test)]
mod test {
    use super::*;

    fn args(args: &[&str]) -> Vec<OsString> {
        let mut all = vec![OsString::from("lelcache")];
        all.extend(args.iter().map(OsString::from));
        all
    }

    #[test]
    fn test_parse_compile() {
        let cmd = parse_from(args(&["C:/tools/cl.exe", "/c", "/O2", "foo.c"])).unwrap();
        assert_eq!(Command::Compile {
            compiler: PathBuf::from("C:/tools/cl.exe"),
            arguments: vec![OsString::from("/c"), OsString::from("/O2"), OsString::from("foo.c")],
        }, cmd);
    }

    #[test]
    fn test_parse_show_info() {
        assert_eq!(Command::ShowInfo, parse_from(args(&["-i"])).unwrap());
    }

    #[test]
    fn test_parse_set_max_size() {
        assert_eq!(Command::SetMaxSize(64), parse_from(args(&["-m", "64"])).unwrap());
        assert_eq!(Command::SetMaxSize(64), parse_from(args(&["-m64"])).unwrap());
    }

    #[test]
    fn test_parse_set_max_size_not_a_number() {
        assert!(parse_from(args(&["-m", "lots"])).is_err());
    }

    #[test]
    fn test_parse_set_cache_root() {
        assert_eq!(Command::SetCacheRoot(PathBuf::from("/tmp/cache")),
                   parse_from(args(&["-p", "/tmp/cache"])).unwrap());
    }
}
