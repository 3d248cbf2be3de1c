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

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitStatus;
use tempdir::TempDir;

/// A `vec!` of `String`s.
macro_rules! stringvec {
    ( $( $x:expr ),* ) => { vec!($( $x.to_owned(), )*) };
}

/// A `vec!` of `OsString`s.
macro_rules! ovec {
    ( $( $x:expr ),* ) => { vec!($( ::std::ffi::OsString::from($x), )*) };
}

/// A scratch directory for a single test.
pub struct TestFixture {
    pub tempdir: TempDir,
}

impl TestFixture {
    pub fn new() -> TestFixture {
        TestFixture {
            tempdir: TempDir::new("lelcache").unwrap(),
        }
    }

    /// Create `name` under the fixture directory with `contents`,
    /// returning its full path.
    pub fn touch(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.tempdir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }
}

/// Return an `ExitStatus` with the given exit code.
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(code as u32)
}
