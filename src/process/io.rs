// Process surface
//
// What the console layer needs from "a process": somewhere to write user
// input, a pollable stream of output, an error stream, and a lifecycle.
// Anything providing these parts can be attached to a ProcessHandler.

use std::io::{self, Read, Write};
use std::sync::Arc;

use crate::errors::Result;

/// A readable stream the handler can poll without blocking.
pub trait InputSource: Read + Send {
    /// Bytes readable right now without blocking.
    fn available(&mut self) -> io::Result<usize>;

    /// True once the producer is gone and every byte has been read.
    fn is_finished(&self) -> bool;
}

pub trait ProcessLifecycle: Send + Sync {
    /// Block until the process has gone away.
    fn wait_for(&self);

    fn exit_value(&self) -> Result<i32>;

    fn destroy(&self) -> Result<()>;
}

/// The parts of a running process, handed to a ProcessHandler.
pub struct ProcessIo {
    /// Bytes from the user into the process.
    pub stdin: Box<dyn Write + Send>,
    /// Bytes from the process to the console.
    pub stdout: Box<dyn InputSource>,
    pub stderr: Box<dyn Read + Send>,
    pub lifecycle: Arc<dyn ProcessLifecycle>,
}
