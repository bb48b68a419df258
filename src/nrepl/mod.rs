// nREPL protocol client
// Bencode codec, blocking TCP client, and combined response view

pub mod bencode;
mod client;
mod response;

pub use bencode::Value;
pub use client::{ConnectOptions, NreplClient};
pub use response::{CombinedResponse, Response};
