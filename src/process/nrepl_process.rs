// nREPL-backed process
//
// Presents a network REPL connection as the stdin/stdout/stderr/lifecycle
// parts of a process so it can be attached to a console.

use std::sync::{Arc, Condvar, Mutex};

use tracing::info;

use super::io::{ProcessIo, ProcessLifecycle};
use super::streams::{response_queue, ErrorSource, EvalSink, ResponseSource};
use crate::config::ReplConfig;
use crate::errors::{BridgeError, Result};
use crate::nrepl::NreplClient;

/// Fired once when the process's input side is torn down.
#[derive(Default)]
pub struct ExitSignal {
    fired: Mutex<bool>,
    cond: Condvar,
}

impl ExitSignal {
    pub fn fire(&self) {
        let mut fired = self.fired.lock().unwrap();
        *fired = true;
        self.cond.notify_all();
    }

    pub fn is_fired(&self) -> bool {
        *self.fired.lock().unwrap()
    }

    pub fn wait(&self) {
        let mut fired = self.fired.lock().unwrap();
        while !*fired {
            fired = self.cond.wait(fired).unwrap();
        }
    }
}

/// Lifecycle of an nREPL process.
///
/// There is no exit code to observe; `wait_for` returns once the session
/// drops its input side, which also closes the connection.
pub struct NreplLifecycle {
    exit: Arc<ExitSignal>,
}

impl ProcessLifecycle for NreplLifecycle {
    fn wait_for(&self) {
        self.exit.wait();
    }

    fn exit_value(&self) -> Result<i32> {
        Err(BridgeError::Unsupported("exitValue"))
    }

    fn destroy(&self) -> Result<()> {
        Err(BridgeError::Unsupported("destroy"))
    }
}

pub struct NreplProcess {
    sink: EvalSink,
    source: ResponseSource,
    exit: Arc<ExitSignal>,
}

impl NreplProcess {
    /// Connect to the configured server and, if enabled, queue the greeting.
    pub fn connect(config: &ReplConfig) -> Result<Self> {
        let client = NreplClient::connect_with(&config.url, &config.connect_options())?;
        let mut process = Self::from_client(client);

        if let Some(greeting) = config.greeting_expr() {
            process
                .sink
                .submit(greeting)
                .map_err(|e| BridgeError::connect(&config.url, e))?;
        }

        info!(url = %config.url, "nREPL process started");
        Ok(process)
    }

    pub fn from_client(client: NreplClient) -> Self {
        let (tx, rx) = response_queue();
        let exit = Arc::new(ExitSignal::default());
        Self {
            sink: EvalSink::new(client, tx, Arc::clone(&exit)),
            source: ResponseSource::new(rx),
            exit,
        }
    }

    pub fn sink(&mut self) -> &mut EvalSink {
        &mut self.sink
    }

    pub fn into_io(self) -> ProcessIo {
        ProcessIo {
            stdin: Box::new(self.sink),
            stdout: Box::new(self.source),
            stderr: Box::new(ErrorSource),
            lifecycle: Arc::new(NreplLifecycle { exit: self.exit }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_exit_signal_releases_waiter() {
        let exit = Arc::new(ExitSignal::default());
        let lifecycle = NreplLifecycle {
            exit: Arc::clone(&exit),
        };
        let waiter = thread::spawn(move || lifecycle.wait_for());

        thread::sleep(Duration::from_millis(20));
        assert!(!exit.is_fired());
        exit.fire();
        waiter.join().unwrap();
        assert!(exit.is_fired());
    }

    #[test]
    fn test_exit_value_and_destroy_unsupported() {
        let lifecycle = NreplLifecycle {
            exit: Arc::new(ExitSignal::default()),
        };
        assert!(matches!(lifecycle.exit_value(), Err(BridgeError::Unsupported(_))));
        assert!(matches!(lifecycle.destroy(), Err(BridgeError::Unsupported(_))));
    }
}
