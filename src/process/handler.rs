// Process handler
//
// Owns a ProcessIo, runs one reader thread that polls the output stream,
// and fans text out to listeners. The reader emits one event per chunk it
// reads, and it reads whole replies, so one reply becomes one event.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::io::{InputSource, ProcessIo, ProcessLifecycle};
use crate::errors::{BridgeError, Result};

pub type ListenerId = u64;

/// Origin/styling of a text event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Stdout,
    Stderr,
    /// Messages from the handler itself (e.g. termination notice)
    System,
}

pub trait ProcessListener: Send + Sync {
    fn on_text_available(&self, text: &str, kind: OutputKind);

    fn on_process_terminated(&self) {}
}

#[derive(Default)]
struct Listeners {
    next_id: ListenerId,
    entries: Vec<(ListenerId, Arc<dyn ProcessListener>)>,
}

type SharedListeners = Arc<RwLock<Listeners>>;

/// Snapshot so callbacks may add or remove listeners without deadlocking.
fn snapshot(listeners: &RwLock<Listeners>) -> Vec<Arc<dyn ProcessListener>> {
    listeners
        .read()
        .unwrap()
        .entries
        .iter()
        .map(|(_, l)| Arc::clone(l))
        .collect()
}

fn dispatch_text(listeners: &RwLock<Listeners>, text: &str, kind: OutputKind) {
    for listener in snapshot(listeners) {
        listener.on_text_available(text, kind);
    }
}

/// Handle for raising text events without owning the handler.
#[derive(Clone)]
pub struct TextNotifier {
    listeners: Weak<RwLock<Listeners>>,
}

impl TextNotifier {
    pub fn notify(&self, text: &str, kind: OutputKind) {
        if let Some(listeners) = self.listeners.upgrade() {
            dispatch_text(&listeners, text, kind);
        }
    }
}

pub struct ProcessHandler {
    working_dir: PathBuf,
    stdin: Mutex<Option<Box<dyn Write + Send>>>,
    stdout: Mutex<Option<Box<dyn InputSource>>>,
    lifecycle: Arc<dyn ProcessLifecycle>,
    listeners: SharedListeners,
    reader: Mutex<Option<JoinHandle<()>>>,
    poll_interval: Duration,
    stop: Arc<AtomicBool>,
    terminated: Arc<AtomicBool>,
}

impl ProcessHandler {
    pub fn new(io: ProcessIo, working_dir: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        // The error stream is never read: errors arrive as text on stdout
        let ProcessIo {
            stdin,
            stdout,
            stderr: _,
            lifecycle,
        } = io;

        Self {
            working_dir: working_dir.into(),
            stdin: Mutex::new(Some(stdin)),
            stdout: Mutex::new(Some(stdout)),
            lifecycle,
            listeners: Arc::new(RwLock::new(Listeners::default())),
            reader: Mutex::new(None),
            poll_interval,
            stop: Arc::new(AtomicBool::new(false)),
            terminated: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn add_process_listener(&self, listener: Arc<dyn ProcessListener>) -> ListenerId {
        let mut listeners = self.listeners.write().unwrap();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, listener));
        id
    }

    pub fn remove_process_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap();
        let before = listeners.entries.len();
        listeners.entries.retain(|(lid, _)| *lid != id);
        listeners.entries.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().unwrap().entries.len()
    }

    pub fn notifier(&self) -> TextNotifier {
        TextNotifier {
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn notify_text_available(&self, text: &str, kind: OutputKind) {
        dispatch_text(&self.listeners, text, kind);
    }

    /// Start the reader thread. Calling it again is a no-op.
    pub fn start_notify(&self) -> Result<()> {
        let Some(source) = self.stdout.lock().unwrap().take() else {
            debug!("start_notify called twice; reader already running");
            return Ok(());
        };

        let pump = Pump {
            source,
            listeners: Arc::clone(&self.listeners),
            poll_interval: self.poll_interval,
            stop: Arc::clone(&self.stop),
            terminated: Arc::clone(&self.terminated),
        };
        let handle = thread::Builder::new()
            .name("nrepl-output-reader".to_string())
            .spawn(move || pump.run())?;

        *self.reader.lock().unwrap() = Some(handle);
        Ok(())
    }

    /// Send user input to the process. Blocks while the expression is evaluated.
    pub fn write_input(&self, bytes: &[u8]) -> Result<()> {
        let mut stdin = self.stdin.lock().unwrap();
        let Some(writer) = stdin.as_mut() else {
            return Err(BridgeError::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                "process has been destroyed",
            )));
        };
        writer.write_all(bytes).map_err(BridgeError::from_io)?;
        writer.flush().map_err(BridgeError::from_io)
    }

    /// Tear the process down: drop its input (closing the connection), stop
    /// the reader, tell listeners. Safe to call more than once.
    pub fn destroy_process(&self) {
        let stdin = self.stdin.lock().unwrap().take();
        if stdin.is_none() && self.is_process_terminated() {
            return;
        }
        drop(stdin);
        self.stop.store(true, Ordering::SeqCst);

        let reader = self.reader.lock().unwrap().take();
        if let Some(handle) = reader {
            if handle.thread().id() != thread::current().id() {
                if handle.join().is_err() {
                    warn!("nREPL output reader panicked");
                }
            }
        }

        notify_terminated(&self.listeners, &self.terminated);
        info!(dir = %self.working_dir.display(), "Process destroyed");
    }

    pub fn is_process_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Block until the underlying process goes away.
    pub fn wait_for(&self) {
        self.lifecycle.wait_for();
    }

    pub fn exit_value(&self) -> Result<i32> {
        self.lifecycle.exit_value()
    }
}

impl Drop for ProcessHandler {
    fn drop(&mut self) {
        self.destroy_process();
    }
}

fn notify_terminated(listeners: &RwLock<Listeners>, terminated: &AtomicBool) {
    if terminated.swap(true, Ordering::SeqCst) {
        return;
    }
    for listener in snapshot(listeners) {
        listener.on_process_terminated();
    }
}

struct Pump {
    source: Box<dyn InputSource>,
    listeners: SharedListeners,
    poll_interval: Duration,
    stop: Arc<AtomicBool>,
    terminated: Arc<AtomicBool>,
}

impl Pump {
    fn run(mut self) {
        let mut decoder = Utf8Carry::default();

        while !self.stop.load(Ordering::SeqCst) {
            let available = match self.source.available() {
                Ok(n) => n,
                Err(e) => {
                    warn!(error = %e, "Output stream failed");
                    break;
                }
            };

            if available == 0 {
                if self.source.is_finished() {
                    break;
                }
                thread::sleep(self.poll_interval);
                continue;
            }

            let mut buf = vec![0u8; available];
            match self.source.read(&mut buf) {
                Ok(0) => continue,
                Ok(n) => {
                    buf.truncate(n);
                    let text = decoder.push(&buf);
                    if !text.is_empty() {
                        dispatch_text(&self.listeners, &text, OutputKind::Stdout);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(self.poll_interval);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!(error = %e, "Output stream read failed");
                    break;
                }
            }
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            dispatch_text(&self.listeners, &tail, OutputKind::Stdout);
        }
        debug!("nREPL output reader exiting");

        // A stop request means destroy_process is handling notification
        if !self.stop.load(Ordering::SeqCst) {
            notify_terminated(&self.listeners, &self.terminated);
        }
    }
}

/// Decodes UTF-8 across chunk boundaries, holding back an incomplete tail.
#[derive(Default)]
struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let text = text.to_string();
                self.pending.clear();
                text
            }
            // Truncated sequence at the end: emit the valid prefix, keep the rest
            Err(e) if e.error_len().is_none() => {
                let valid = e.valid_up_to();
                let text = String::from_utf8_lossy(&self.pending[..valid]).into_owned();
                self.pending.drain(..valid);
                text
            }
            Err(_) => self.finish(),
        }
    }

    fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

/// Prints a status line into attached consoles when the process ends.
pub struct ProcessTerminatedListener {
    notifier: TextNotifier,
}

impl ProcessTerminatedListener {
    pub fn attach(handler: &ProcessHandler) -> ListenerId {
        handler.add_process_listener(Arc::new(Self {
            notifier: handler.notifier(),
        }))
    }
}

impl ProcessListener for ProcessTerminatedListener {
    fn on_text_available(&self, _text: &str, _kind: OutputKind) {}

    fn on_process_terminated(&self) {
        self.notifier
            .notify("\nnREPL session closed\n", OutputKind::System);
    }
}
