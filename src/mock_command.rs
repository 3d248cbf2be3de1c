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

//! Traits for spawning the wrapped compiler, so that tests can intercept
//! process creation instead of running a real `cl.exe`.
//!
//! `CommandCreator` hands out `RunCommand`s, which spawn `CommandChild`ren.
//! The real implementation is a thin veneer over `std::process`; the mock
//! implementation hands back queued results and records that it was asked
//! to spawn at all, which is how tests prove a cache hit skipped the
//! compile phase.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::process::{self, Stdio};
use std::sync::{Arc, Mutex};

/// A child process to be waited upon.
pub trait CommandChild {
    fn wait(self) -> io::Result<process::ExitStatus>;
}

/// A command that can be spawned.
pub trait RunCommand: fmt::Debug {
    type C: CommandChild;

    fn arg<S: AsRef<OsStr>>(&mut self, arg: S) -> &mut Self;
    fn args(&mut self, args: &[OsString]) -> &mut Self;
    fn stdout(&mut self, cfg: Stdio) -> &mut Self;
    fn stderr(&mut self, cfg: Stdio) -> &mut Self;
    fn spawn(&mut self) -> io::Result<Self::C>;
}

/// A factory for `RunCommand`s.
pub trait CommandCreator {
    type Cmd: RunCommand;

    fn new_creator() -> Self;
    fn new_command<S: AsRef<OsStr>>(&mut self, program: S) -> Self::Cmd;
}

impl CommandChild for process::Child {
    fn wait(mut self) -> io::Result<process::ExitStatus> {
        process::Child::wait(&mut self)
    }
}

impl RunCommand for process::Command {
    type C = process::Child;

    fn arg<S: AsRef<OsStr>>(&mut self, arg: S) -> &mut process::Command {
        process::Command::arg(self, arg)
    }
    fn args(&mut self, args: &[OsString]) -> &mut process::Command {
        process::Command::args(self, args)
    }
    fn stdout(&mut self, cfg: Stdio) -> &mut process::Command {
        process::Command::stdout(self, cfg)
    }
    fn stderr(&mut self, cfg: Stdio) -> &mut process::Command {
        process::Command::stderr(self, cfg)
    }
    fn spawn(&mut self) -> io::Result<process::Child> {
        process::Command::spawn(self)
    }
}

/// Spawns real processes.
pub struct ProcessCommandCreator;

impl CommandCreator for ProcessCommandCreator {
    type Cmd = process::Command;

    fn new_creator() -> ProcessCommandCreator {
        ProcessCommandCreator
    }
    fn new_command<S: AsRef<OsStr>>(&mut self, program: S) -> process::Command {
        process::Command::new(program)
    }
}

/// A mock child that reports a canned wait result.
pub struct MockChild {
    pub wait_result: io::Result<process::ExitStatus>,
}

impl MockChild {
    pub fn new(status: process::ExitStatus) -> MockChild {
        MockChild { wait_result: Ok(status) }
    }

    pub fn with_error(err: io::Error) -> MockChild {
        MockChild { wait_result: Err(err) }
    }
}

impl CommandChild for MockChild {
    fn wait(self) -> io::Result<process::ExitStatus> {
        self.wait_result
    }
}

pub enum ChildOrCall {
    Child(io::Result<MockChild>),
    Call(Box<FnMut(&[OsString]) -> io::Result<MockChild> + Send>),
}

impl fmt::Debug for ChildOrCall {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ChildOrCall::Child(ref r) => write!(f, "ChildOrCall::Child({:?})", r.is_ok()),
            ChildOrCall::Call(_) => write!(f, "ChildOrCall::Call(...)"),
        }
    }
}

/// Hands out queued spawn results in order; panics if spawned more times
/// than results were queued.
#[derive(Debug, Default)]
pub struct MockCommandCreator {
    /// Queued spawn outcomes, consumed front to back.
    pub children: Vec<ChildOrCall>,
}

impl MockCommandCreator {
    /// The next spawned command returns `child`.
    pub fn next_command_spawns(&mut self, child: io::Result<MockChild>) {
        self.children.push(ChildOrCall::Child(child));
    }

    /// The next spawned command invokes `call` with the argument vector
    /// and returns its result. Tests use this to inspect the constructed
    /// command line and to fabricate the output files the compiler would
    /// have written.
    pub fn next_command_calls<C>(&mut self, call: C)
        where C: FnMut(&[OsString]) -> io::Result<MockChild> + Send + 'static,
    {
        self.children.push(ChildOrCall::Call(Box::new(call)));
    }
}

#[derive(Debug)]
pub struct MockCommand {
    pub creator: Arc<Mutex<MockCommandCreator>>,
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl RunCommand for MockCommand {
    type C = MockChild;

    fn arg<S: AsRef<OsStr>>(&mut self, arg: S) -> &mut MockCommand {
        self.args.push(arg.as_ref().to_owned());
        self
    }
    fn args(&mut self, args: &[OsString]) -> &mut MockCommand {
        self.args.extend(args.iter().cloned());
        self
    }
    fn stdout(&mut self, _cfg: Stdio) -> &mut MockCommand {
        self
    }
    fn stderr(&mut self, _cfg: Stdio) -> &mut MockCommand {
        self
    }
    fn spawn(&mut self) -> io::Result<MockChild> {
        let mut creator = self.creator.lock().unwrap();
        assert!(!creator.children.is_empty(),
                "spawned a command with no mock children left: {:?} {:?}",
                self.program, self.args);
        match creator.children.remove(0) {
            ChildOrCall::Child(child) => child,
            ChildOrCall::Call(mut call) => call(&self.args),
        }
    }
}

impl CommandCreator for Arc<Mutex<MockCommandCreator>> {
    type Cmd = MockCommand;

    fn new_creator() -> Arc<Mutex<MockCommandCreator>> {
        Arc::new(Mutex::new(MockCommandCreator::default()))
    }
    fn new_command<S: AsRef<OsStr>>(&mut self, program: S) -> MockCommand {
        MockCommand {
            creator: self.clone(),
            program: program.as_ref().to_owned(),
            args: vec![],
        }
    }
}
