// In-memory pipe used to collect a synchronous evaluation's output

use std::io::{self, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Mutex;
use std::time::Duration;

pub fn pipe(timeout: Option<Duration>) -> (PipeWriter, PipeReader) {
    let (tx, rx) = mpsc::channel();
    (
        PipeWriter {
            tx: Mutex::new(Some(tx)),
        },
        PipeReader {
            rx,
            chunk: Vec::new(),
            pos: 0,
            timeout,
        },
    )
}

/// Write end. Shared between threads; closing it ends the reader's stream.
pub struct PipeWriter {
    tx: Mutex<Option<Sender<Vec<u8>>>>,
}

impl PipeWriter {
    pub fn write(&self, bytes: &[u8]) -> io::Result<()> {
        let tx = self.tx.lock().unwrap();
        let Some(tx) = tx.as_ref() else {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        };
        tx.send(bytes.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader gone"))
    }

    pub fn close(&self) {
        self.tx.lock().unwrap().take();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.lock().unwrap().is_none()
    }
}

/// Read end. Blocks for data; end of stream once the writer is closed.
pub struct PipeReader {
    rx: Receiver<Vec<u8>>,
    chunk: Vec<u8>,
    pos: usize,
    timeout: Option<Duration>,
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pos >= self.chunk.len() {
            let next = match self.timeout {
                Some(timeout) => match self.rx.recv_timeout(timeout) {
                    Ok(bytes) => bytes,
                    Err(RecvTimeoutError::Disconnected) => return Ok(0),
                    Err(RecvTimeoutError::Timeout) => {
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "no REPL output before timeout",
                        ))
                    }
                },
                None => match self.rx.recv() {
                    Ok(bytes) => bytes,
                    Err(_) => return Ok(0),
                },
            };
            self.chunk = next;
            self.pos = 0;
        }

        let n = buf.len().min(self.chunk.len() - self.pos);
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
