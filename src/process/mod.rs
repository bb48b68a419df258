// Process module
// The nREPL connection dressed up as a child process, and the handler that
// pumps its output to listeners

mod handler;
mod io;
mod nrepl_process;
mod render;
mod streams;

pub use handler::{
    ListenerId, OutputKind, ProcessHandler, ProcessListener, ProcessTerminatedListener,
    TextNotifier,
};
pub use io::{InputSource, ProcessIo, ProcessLifecycle};
pub use nrepl_process::{ExitSignal, NreplLifecycle, NreplProcess};
pub use render::Renderer;
pub use streams::{response_queue, ErrorSource, EvalSink, ResponseSource};
