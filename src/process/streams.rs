// Byte streams of the nREPL process
//
// EvalSink      user bytes -> eval request -> rendered reply -> queue
// ResponseSource queue -> console reader (single owner, non-blocking)
// ErrorSource   unused; errors arrive as `err` text on the response stream

use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;

use tracing::{debug, info};

use super::io::InputSource;
use super::nrepl_process::ExitSignal;
use super::render::Renderer;
use crate::errors::{BridgeError, Result};
use crate::nrepl::NreplClient;

/// Unbounded FIFO carrying rendered replies from the sink to the source.
pub fn response_queue() -> (Sender<Vec<u8>>, Receiver<Vec<u8>>) {
    mpsc::channel()
}

/// Writable end: every `write` is one expression.
///
/// Submission is synchronous on the caller's thread so replies are queued in
/// the order expressions were written.
pub struct EvalSink {
    client: NreplClient,
    renderer: Renderer,
    queue: Sender<Vec<u8>>,
    exit: Arc<ExitSignal>,
}

impl EvalSink {
    pub(crate) fn new(client: NreplClient, queue: Sender<Vec<u8>>, exit: Arc<ExitSignal>) -> Self {
        Self {
            client,
            renderer: Renderer::new(),
            queue,
            exit,
        }
    }

    pub fn namespace(&self) -> &str {
        self.renderer.namespace()
    }

    /// Evaluate `expr` in the current namespace and queue the rendered reply.
    pub fn submit(&mut self, expr: &str) -> Result<()> {
        let code = self.renderer.wrap_code(expr);
        info!(ns = %self.renderer.namespace(), "Submitting expression");
        debug!(code = %code, "nREPL eval");

        let response = self.client.send(&[("op", "eval"), ("code", &code)])?;
        let combined = response.combined_response();
        let bytes = self.renderer.render(&combined)?;

        self.queue.send(bytes).map_err(|_| {
            BridgeError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "response reader is gone",
            ))
        })
    }
}

impl Write for EvalSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let expr = String::from_utf8_lossy(buf);
        self.submit(&expr).map_err(BridgeError::into_io)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for EvalSink {
    fn drop(&mut self) {
        self.client.close();
        self.exit.fire();
    }
}

/// Readable end of the response queue.
///
/// Holds the reply being drained (`current`) and how much of it has been
/// read (`offset`). It takes `&mut self` everywhere, so only its one owner
/// can touch that state.
pub struct ResponseSource {
    queue: Receiver<Vec<u8>>,
    current: Vec<u8>,
    offset: usize,
    disconnected: bool,
}

impl ResponseSource {
    pub fn new(queue: Receiver<Vec<u8>>) -> Self {
        Self {
            queue,
            current: Vec::new(),
            offset: 0,
            disconnected: false,
        }
    }

    fn remaining(&self) -> usize {
        self.current.len() - self.offset
    }
}

impl InputSource for ResponseSource {
    fn available(&mut self) -> io::Result<usize> {
        if self.remaining() > 0 {
            return Ok(self.remaining());
        }

        loop {
            match self.queue.try_recv() {
                Ok(next) if next.is_empty() => continue,
                Ok(next) => {
                    self.current = next;
                    self.offset = 0;
                    return Ok(self.current.len());
                }
                Err(TryRecvError::Empty) => return Ok(0),
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    return Ok(0);
                }
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.disconnected && self.remaining() == 0
    }
}

impl Read for ResponseSource {
    /// Copy from the current reply; `WouldBlock` when nothing is queued,
    /// `Ok(0)` once the sink is gone and the queue is drained.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.remaining() == 0 && self.available()? == 0 {
            if self.is_finished() {
                return Ok(0);
            }
            return Err(io::ErrorKind::WouldBlock.into());
        }

        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.current[self.offset..self.offset + n]);
        self.offset += n;

        if self.offset >= self.current.len() {
            self.current = Vec::new();
            self.offset = 0;
        }
        Ok(n)
    }
}

/// The nREPL has no separate error channel.
pub struct ErrorSource;

impl Read for ErrorSource {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(BridgeError::Unsupported("error stream").into_io())
    }
}
