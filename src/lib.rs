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

extern crate byteorder;
extern crate clap;
extern crate directories;
#[macro_use]
extern crate error_chain;
extern crate fs2;
#[macro_use]
extern crate log;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;
#[cfg(test)]
extern crate tempdir;
extern crate uuid;
extern crate xxhash_rust;

#[cfg(test)]
#[macro_use]
mod test;

pub mod cache;
pub mod cmdline;
pub mod commands;
pub mod compiler;
pub mod config;
pub mod errors;
pub mod mock_command;
pub mod util;
