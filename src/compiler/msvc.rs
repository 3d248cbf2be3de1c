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

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use compiler::{CompilerArguments, ParsedArguments};
use util;

/// The pdb name cl.exe uses when `/Zi` is given without `/Fd`.
const DEFAULT_PDB_NAME: &'static str = "vc140.pdb";

/// How a table pattern matches a flag (the argv token with its leading
/// `/` or `-` stripped).
#[derive(Debug, Clone, Copy, PartialEq)]
enum Match {
    Exact,
    Prefix,
    /// The pattern followed by a decimal digit, e.g. `/F2048`.
    PrefixDigit,
}

/// What a flag means for caching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArgKind {
    /// Linker and preprocess-only flags; the invocation cannot be cached.
    TooHard,
    /// Changes the preprocessed text; forwarded to the preprocess phase.
    Preprocessor,
    /// `/Fo` — names the object file. Consumed, not forwarded.
    Object,
    /// `/Fd` — names the pdb. Consumed, not forwarded.
    Pdb,
    /// `/Zi` or `/ZI` — the compile emits debug information.
    DebugInfo,
    /// Bare `/c` — compile to an object file without linking.
    DoCompilation,
    /// `/nologo` — tracked but never hashed; it cannot change output.
    NoLogo,
    /// Everything else affects code generation.
    Compiler,
}

struct ArgInfo {
    pattern: &'static str,
    how: Match,
    kind: ArgKind,
}

impl ArgInfo {
    fn matches(&self, flag: &str) -> bool {
        match self.how {
            Match::Exact => flag == self.pattern,
            Match::Prefix => flag.starts_with(self.pattern),
            Match::PrefixDigit => {
                flag.len() > self.pattern.len() && flag.starts_with(self.pattern)
                    && flag.as_bytes()[self.pattern.len()].is_ascii_digit()
            }
        }
    }
}

macro_rules! arg {
    ($pattern:expr, $how:ident, $kind:ident) => {
        ArgInfo { pattern: $pattern, how: Match::$how, kind: ArgKind::$kind }
    };
}

/// Classification of the cl.exe flag dialect, kept sorted by pattern.
/// `classify` picks the best match, so adding a flag is a one-line
/// change.
static ARGS: &'static [ArgInfo] = &[
    arg!("AI", Prefix, Preprocessor),
    arg!("C", Exact, Preprocessor),
    arg!("D", Prefix, Preprocessor),
    arg!("E", Exact, TooHard),
    arg!("E", Prefix, Preprocessor),
    arg!("EH", Prefix, Compiler),
    arg!("F", PrefixDigit, TooHard),
    arg!("FI", Prefix, Preprocessor),
    arg!("FU", Prefix, Preprocessor),
    arg!("Fd", Prefix, Pdb),
    arg!("Fo", Prefix, Object),
    arg!("Fx", Prefix, Preprocessor),
    arg!("I", Prefix, Preprocessor),
    arg!("L", Prefix, TooHard),
    arg!("P", Exact, TooHard),
    arg!("U", Prefix, Preprocessor),
    arg!("X", Exact, Preprocessor),
    arg!("ZI", Exact, DebugInfo),
    arg!("Zi", Exact, DebugInfo),
    arg!("c", Exact, DoCompilation),
    arg!("l", Prefix, TooHard),
    arg!("nologo", Exact, NoLogo),
    arg!("u", Exact, Preprocessor),
];

/// An exact match beats a prefix match, a longer prefix beats a shorter
/// one; a flag nothing matches affects code generation.
pub fn classify(flag: &str) -> ArgKind {
    let mut best: Option<&ArgInfo> = None;
    for info in ARGS.iter().filter(|info| info.matches(flag)) {
        best = match best {
            Some(prev) if !better(info, prev) => Some(prev),
            _ => Some(info),
        };
    }
    best.map(|info| info.kind).unwrap_or(ArgKind::Compiler)
}

fn better(candidate: &ArgInfo, incumbent: &ArgInfo) -> bool {
    let candidate_exact = candidate.how == Match::Exact;
    let incumbent_exact = incumbent.how == Match::Exact;
    if candidate_exact != incumbent_exact {
        return candidate_exact;
    }
    candidate.pattern.len() > incumbent.pattern.len()
}

/// Extract the path value of an `/Fo` or `/Fd` flag: everything after
/// the two-letter prefix, with the optional `:` and leading whitespace
/// stripped. An empty value counts as unset.
fn output_value(flag: &str) -> Option<PathBuf> {
    let mut value = &flag[2..];
    if value.starts_with(':') {
        value = &value[1..];
    }
    let value = value.trim_start();
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

/// When no `/Fo` is given the object lands in the working directory,
/// named after the source file.
fn default_object_out(input: &Path) -> PathBuf {
    match input.file_name() {
        Some(name) => PathBuf::from(name).with_extension("obj"),
        None => input.with_extension("obj"),
    }
}

/// Hash of the canonicalized compile command line: the compiler path
/// plus the code-generation flags, lexically sorted, each rendered
/// quoted and space-separated, hashed as UTF-8 bytes.
///
/// This runs before `/nologo`, the preprocessor flags, the output
/// locations and the source file are appended, so none of them can leak
/// into the key. Flags are compared lexically: `/Z7` followed by `/Zi`
/// hashes differently from `/Zi` alone even though the compiler would
/// let the latter win.
pub fn hash_compiler_flags(compiler: &Path, compiler_args: &[OsString]) -> u64 {
    let mut flags = Vec::with_capacity(compiler_args.len() + 1);
    flags.push(compiler.to_string_lossy().into_owned());
    flags.extend(compiler_args.iter().map(|arg| arg.to_string_lossy().into_owned()));
    flags.sort();
    util::hash_bytes(util::render_args(&flags).as_bytes())
}

/// Parse `arguments`, determining whether the invocation is supported.
///
/// Unsupported command lines (linker flags, preprocess-only flags,
/// multiple source files, no source file) yield
/// `CompilerArguments::CannotCache`; a command line without `/c` yields
/// `CompilerArguments::NotCompilation`. Both are passed through to the
/// compiler untouched.
pub fn parse_arguments(compiler: &Path, arguments: &[OsString]) -> CompilerArguments<ParsedArguments> {
    let mut input = None;
    let mut object_out = None;
    let mut pdb_out = None;
    let mut preprocessor_args = vec![];
    let mut compiler_args: Vec<OsString> = vec![];
    let mut compiles_to_obj = false;
    let mut emit_pdb = false;
    let mut seen_nologo = false;

    for arg in arguments {
        let text = arg.to_string_lossy();
        if text.starts_with('/') || text.starts_with('-') {
            let flag = &text[1..];
            match classify(flag) {
                ArgKind::TooHard => return CompilerArguments::CannotCache("unsupported flag"),
                ArgKind::Preprocessor => preprocessor_args.push(arg.clone()),
                ArgKind::Object => object_out = output_value(flag),
                ArgKind::Pdb => pdb_out = output_value(flag),
                ArgKind::DebugInfo => {
                    emit_pdb = true;
                    compiler_args.push(arg.clone());
                }
                ArgKind::DoCompilation => {
                    compiles_to_obj = true;
                    compiler_args.push(arg.clone());
                }
                ArgKind::NoLogo => seen_nologo = true,
                ArgKind::Compiler => compiler_args.push(arg.clone()),
            }
        } else {
            if input.is_some() {
                return CompilerArguments::CannotCache("multiple input files");
            }
            input = Some(PathBuf::from(arg));
        }
    }

    // We only support compilation.
    if !compiles_to_obj {
        return CompilerArguments::NotCompilation;
    }
    let input = match input {
        Some(input) => input,
        None => return CompilerArguments::CannotCache("no input file"),
    };

    let object_out = object_out.unwrap_or_else(|| default_object_out(&input));
    // /Fd names nothing unless the compile actually emits debug info.
    let pdb_out = if emit_pdb {
        Some(pdb_out.unwrap_or_else(|| PathBuf::from(DEFAULT_PDB_NAME)))
    } else {
        None
    };
    let flags_hash = hash_compiler_flags(compiler, &compiler_args);
    let preprocessed_file = util::preprocess_temp_path(&input);

    CompilerArguments::Ok(ParsedArguments {
        input: input,
        object_out: object_out,
        pdb_out: pdb_out,
        preprocessed_file: preprocessed_file,
        preprocessor_args: preprocessor_args,
        compiler_args: compiler_args,
        flags_hash: flags_hash,
        seen_nologo: seen_nologo,
    })
}

#[cfg(test)]
mod test {
    use compiler::*;
    use std::ffi::OsString;
    use std::path::Path;

    use super::*;

    fn _parse_arguments(arguments: &[String]) -> CompilerArguments<ParsedArguments> {
        let args = arguments.iter().map(OsString::from).collect::<Vec<_>>();
        parse_arguments(Path::new("cl.exe"), &args)
    }

    fn parse_ok(arguments: &[String]) -> ParsedArguments {
        match _parse_arguments(arguments) {
            CompilerArguments::Ok(parsed) => parsed,
            o => panic!("unexpected parse result: {:?}", o),
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(ArgKind::DoCompilation, classify("c"));
        assert_eq!(ArgKind::NoLogo, classify("nologo"));
        assert_eq!(ArgKind::Preprocessor, classify("DFOO=1"));
        assert_eq!(ArgKind::Preprocessor, classify("Iinclude"));
        assert_eq!(ArgKind::Preprocessor, classify("FIstdafx.h"));
        assert_eq!(ArgKind::Preprocessor, classify("C"));
        assert_eq!(ArgKind::Preprocessor, classify("u"));
        assert_eq!(ArgKind::Preprocessor, classify("X"));
        assert_eq!(ArgKind::Preprocessor, classify("UDEBUG"));
        assert_eq!(ArgKind::Object, classify("Fofoo.obj"));
        assert_eq!(ArgKind::Pdb, classify("Fdfoo.pdb"));
        assert_eq!(ArgKind::DebugInfo, classify("Zi"));
        assert_eq!(ArgKind::DebugInfo, classify("ZI"));
        assert_eq!(ArgKind::Compiler, classify("Z7"));
        assert_eq!(ArgKind::Compiler, classify("O2"));
        assert_eq!(ArgKind::Compiler, classify("W4"));
        assert_eq!(ArgKind::Compiler, classify("clr"));
    }

    #[test]
    fn test_classify_preprocess_only_and_linker() {
        assert_eq!(ArgKind::TooHard, classify("E"));
        assert_eq!(ArgKind::TooHard, classify("P"));
        assert_eq!(ArgKind::TooHard, classify("F2048"));
        assert_eq!(ArgKind::TooHard, classify("LD"));
        assert_eq!(ArgKind::TooHard, classify("link"));
        // /EP is preprocessor-affecting, only the bare forms force
        // pass-through.
        assert_eq!(ArgKind::Preprocessor, classify("EP"));
        // /EH selects the exception model, nothing to do with /E.
        assert_eq!(ArgKind::Compiler, classify("EHsc"));
    }

    #[test]
    fn test_parse_arguments_simple() {
        let parsed = parse_ok(&stringvec!["/c", "/O2", "foo.c"]);
        assert_eq!(Path::new("foo.c"), parsed.input.as_path());
        assert_eq!(Path::new("foo.obj"), parsed.object_out.as_path());
        assert_eq!(None, parsed.pdb_out);
        assert!(parsed.preprocessor_args.is_empty());
        assert_eq!(ovec!["/c", "/O2"], parsed.compiler_args);
        assert!(!parsed.seen_nologo);
    }

    #[test]
    fn test_parse_arguments_routes_preprocessor_flags() {
        let parsed = parse_ok(&stringvec!["/c", "/DFOO=1", "/Iinc", "/O2", "foo.c"]);
        assert_eq!(ovec!["/DFOO=1", "/Iinc"], parsed.preprocessor_args);
        assert_eq!(ovec!["/c", "/O2"], parsed.compiler_args);
    }

    #[test]
    fn test_parse_arguments_object_name_variants() {
        assert_eq!(Path::new("x.obj"), parse_ok(&stringvec!["/c", "/Fox.obj", "foo.c"]).object_out.as_path());
        assert_eq!(Path::new("x.obj"), parse_ok(&stringvec!["/c", "/Fo:x.obj", "foo.c"]).object_out.as_path());
        assert_eq!(Path::new("x.obj"), parse_ok(&stringvec!["/c", "/Fo: x.obj", "foo.c"]).object_out.as_path());
        assert_eq!(Path::new("x.obj"), parse_ok(&stringvec!["/c", "-Fox.obj", "foo.c"]).object_out.as_path());
    }

    #[test]
    fn test_parse_arguments_default_object_keeps_inner_dots() {
        let parsed = parse_ok(&stringvec!["/c", "dir/foo.bar.cpp"]);
        assert_eq!(Path::new("foo.bar.obj"), parsed.object_out.as_path());
    }

    #[test]
    fn test_parse_arguments_empty_output_value_is_unset() {
        let parsed = parse_ok(&stringvec!["/c", "/Fo:", "foo.c"]);
        assert_eq!(Path::new("foo.obj"), parsed.object_out.as_path());
    }

    #[test]
    fn test_parse_arguments_pdb() {
        let parsed = parse_ok(&stringvec!["/c", "/Zi", "/Fdfoo.pdb", "foo.c"]);
        assert_eq!(Some(Path::new("foo.pdb")), parsed.pdb_out.as_ref().map(|p| p.as_path()));

        let parsed = parse_ok(&stringvec!["/c", "/ZI", "foo.c"]);
        assert_eq!(Some(Path::new("vc140.pdb")), parsed.pdb_out.as_ref().map(|p| p.as_path()));

        // /Fd without /Zi names nothing.
        let parsed = parse_ok(&stringvec!["/c", "/Fdfoo.pdb", "foo.c"]);
        assert_eq!(None, parsed.pdb_out);
    }

    #[test]
    fn test_parse_arguments_not_compile() {
        assert_eq!(CompilerArguments::NotCompilation,
                   _parse_arguments(&stringvec!["/O2", "foo.c"]));
        assert_eq!(CompilerArguments::NotCompilation, _parse_arguments(&vec![]));
    }

    #[test]
    fn test_parse_arguments_no_input() {
        assert_eq!(CompilerArguments::CannotCache("no input file"),
                   _parse_arguments(&stringvec!["/c", "/O2"]));
    }

    #[test]
    fn test_parse_arguments_too_many_inputs() {
        assert_eq!(CompilerArguments::CannotCache("multiple input files"),
                   _parse_arguments(&stringvec!["/c", "foo.c", "bar.c"]));
    }

    #[test]
    fn test_parse_arguments_unsupported_flags() {
        for flag in &["/E", "/P", "/F2048", "/LD", "/link"] {
            assert_eq!(CompilerArguments::CannotCache("unsupported flag"),
                       _parse_arguments(&stringvec!["/c", flag.to_string(), "foo.c"]),
                       "flag {} should not be cacheable", flag);
        }
    }

    #[test]
    fn test_flags_hash_order_insensitive() {
        let a = parse_ok(&stringvec!["/c", "/O2", "/W4", "foo.c"]);
        let b = parse_ok(&stringvec!["/W4", "/O2", "/c", "foo.c"]);
        assert_eq!(a.flags_hash, b.flags_hash);
    }

    #[test]
    fn test_flags_hash_ignores_nologo() {
        let a = parse_ok(&stringvec!["/c", "/O2", "foo.c"]);
        let b = parse_ok(&stringvec!["/c", "/nologo", "/O2", "foo.c"]);
        assert_eq!(a.flags_hash, b.flags_hash);
        assert!(b.seen_nologo);
    }

    #[test]
    fn test_flags_hash_ignores_output_paths() {
        let a = parse_ok(&stringvec!["/c", "/O2", "/Foone.obj", "foo.c"]);
        let b = parse_ok(&stringvec!["/c", "/O2", "/Foother.obj", "foo.c"]);
        assert_eq!(a.flags_hash, b.flags_hash);

        let a = parse_ok(&stringvec!["/c", "/Zi", "/Fdone.pdb", "foo.c"]);
        let b = parse_ok(&stringvec!["/c", "/Zi", "/Fdother.pdb", "foo.c"]);
        assert_eq!(a.flags_hash, b.flags_hash);
    }

    #[test]
    fn test_flags_hash_ignores_preprocessor_flags() {
        // Preprocessor settings show up in the preprocessed text, which
        // carries the first half of the key; they stay out of the flags
        // hash.
        let a = parse_ok(&stringvec!["/c", "/O2", "/DFOO=1", "foo.c"]);
        let b = parse_ok(&stringvec!["/c", "/O2", "/DFOO=2", "foo.c"]);
        assert_eq!(a.flags_hash, b.flags_hash);
    }

    #[test]
    fn test_flags_hash_sees_codegen_changes() {
        let a = parse_ok(&stringvec!["/c", "/O2", "foo.c"]);
        let b = parse_ok(&stringvec!["/c", "/O1", "foo.c"]);
        assert_ne!(a.flags_hash, b.flags_hash);

        let plain = parse_ok(&stringvec!["/c", "foo.c"]);
        let zi = parse_ok(&stringvec!["/c", "/Zi", "foo.c"]);
        assert_ne!(plain.flags_hash, zi.flags_hash);
    }

    #[test]
    fn test_flags_hash_sees_compiler_path() {
        let args = vec![OsString::from("/c"), OsString::from("foo.c")];
        let a = parse_arguments(Path::new("cl.exe"), &args);
        let b = parse_arguments(Path::new("C:/tools/cl.exe"), &args);
        match (a, b) {
            (CompilerArguments::Ok(a), CompilerArguments::Ok(b)) => {
                assert_ne!(a.flags_hash, b.flags_hash)
            }
            o => panic!("unexpected parse results: {:?}", o),
        }
    }

    #[test]
    fn test_temp_path_unique_per_parse() {
        let a = parse_ok(&stringvec!["/c", "foo.c"]);
        let b = parse_ok(&stringvec!["/c", "foo.c"]);
        assert_ne!(a.preprocessed_file, b.preprocessed_file);
    }
}
