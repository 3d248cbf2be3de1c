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

extern crate env_logger;
extern crate lelcache;

use std::process;

use lelcache::cmdline;
use lelcache::commands;

fn main() {
    drop(env_logger::init());
    process::exit(match cmdline::parse() {
        Ok(command) => {
            match commands::run_command(command) {
                Ok(code) => code,
                Err(e) => {
                    eprintln!("lelcache: {}", e);
                    for cause in e.iter().skip(1) {
                        eprintln!("lelcache: caused by: {}", cause);
                    }
                    1
                }
            }
        }
        Err(e) => {
            eprintln!("lelcache: {}", e);
            1
        }
    });
}
