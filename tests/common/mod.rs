// Fake nREPL server for integration tests
//
// Speaks bencode over a local TCP socket and answers a small set of
// scripted expressions. Anything unscripted evaluates to itself.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::{BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use nrepl_bridge::config::constants::GREETING_EXPR;
use nrepl_bridge::config::ReplConfig;
use nrepl_bridge::nrepl::bencode::{self, Value};

pub const CLOJURE_VERSION: &str = "Clojure 1.11.1";

#[derive(Clone, Default)]
struct Stats {
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    evals: Arc<Mutex<Vec<String>>>,
}

pub struct FakeServer {
    port: u16,
    stats: Stats,
}

impl FakeServer {
    pub fn start() -> Self {
        Self::start_with_tag(None)
    }

    /// Every plain value is prefixed with `tag`, so replies from two servers differ.
    pub fn start_with_tag(tag: Option<&str>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake nREPL server");
        let port = listener.local_addr().unwrap().port();
        let stats = Stats::default();
        let tag = tag.map(str::to_string);

        let accept_stats = stats.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let stats = accept_stats.clone();
                let tag = tag.clone();
                thread::spawn(move || serve(stream, stats, tag));
            }
        });

        Self { port, stats }
    }

    pub fn url(&self) -> String {
        format!("nrepl://127.0.0.1:{}", self.port)
    }

    /// Config pointed at this server, tuned for fast tests.
    pub fn config(&self) -> ReplConfig {
        let mut config = ReplConfig::with_url(self.url());
        config.poll_interval_ms = 1;
        config.sync_timeout_secs = 5;
        config
    }

    pub fn connections_opened(&self) -> usize {
        self.stats.opened.load(Ordering::SeqCst)
    }

    pub fn connections_closed(&self) -> usize {
        self.stats.closed.load(Ordering::SeqCst)
    }

    /// `code` of every eval request received, in order.
    pub fn evals(&self) -> Vec<String> {
        self.stats.evals.lock().unwrap().clone()
    }

    pub fn wait_for_closed(&self, count: usize) -> bool {
        wait_until(Duration::from_secs(5), || self.connections_closed() >= count)
    }
}

/// An address nothing listens on.
pub fn unused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("nrepl://127.0.0.1:{}", port)
}

pub fn wait_until(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while !cond() {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(2));
    }
    true
}

fn serve(stream: TcpStream, stats: Stats, tag: Option<String>) {
    stats.opened.fetch_add(1, Ordering::SeqCst);
    let mut writer = stream.try_clone().expect("clone fake server stream");
    let mut reader = BufReader::new(stream);

    while let Ok(Some(request)) = bencode::read_value(&mut reader) {
        let id = request.get("id").and_then(Value::as_str).unwrap_or("").to_string();
        let op = request.get("op").and_then(Value::as_str).unwrap_or("");

        let fragments = match op {
            "describe" => vec![fragment(
                &id,
                vec![
                    ("ops", Value::dict([("eval", empty_dict()), ("describe", empty_dict())])),
                    ("status", status(&["done"])),
                ],
            )],
            "eval" => {
                let code = request.get("code").and_then(Value::as_str).unwrap_or("").to_string();
                stats.evals.lock().unwrap().push(code.clone());
                eval(&id, &code, tag.as_deref())
            }
            _ => vec![fragment(&id, vec![("status", status(&["unknown-op", "done"]))])],
        };

        for f in fragments {
            if writer.write_all(&f.to_bytes()).is_err() {
                stats.closed.fetch_add(1, Ordering::SeqCst);
                return;
            }
        }
    }

    stats.closed.fetch_add(1, Ordering::SeqCst);
}

fn eval(id: &str, code: &str, tag: Option<&str>) -> Vec<Value> {
    let (ns, expr) = unwrap_code(code);
    let done = fragment(id, vec![("status", status(&["done"]))]);
    let value = |v: String, ns: &str| {
        fragment(id, vec![("value", Value::from(v)), ("ns", Value::from(ns))])
    };

    match expr.as_str() {
        e if e == GREETING_EXPR => vec![value(CLOJURE_VERSION.to_string(), &ns), done],
        "(println \"hi\")" => vec![
            fragment(id, vec![("out", Value::from("hi\n"))]),
            value("nil".to_string(), &ns),
            done,
        ],
        "(bad-bytes)" => vec![
            fragment(id, vec![("out", Value::Bytes(vec![b'o', b'k', 0xff, 0xfe]))]),
            done,
        ],
        e if e.starts_with("(throw") => vec![
            fragment(id, vec![("err", Value::from("boom\n"))]),
            fragment(id, vec![("status", status(&["eval-error"]))]),
            done,
        ],
        "(/ 1 0)" => vec![
            fragment(
                id,
                vec![(
                    "err",
                    Value::from(
                        "Execution error (ArithmeticException) at user/eval1 (REPL:1).\nDivide by zero\n",
                    ),
                )],
            ),
            fragment(id, vec![("status", status(&["eval-error"]))]),
            done,
        ],
        e if e.starts_with("(ns ") && e.ends_with(')') => {
            let new_ns = e[4..e.len() - 1].trim().to_string();
            vec![value("nil".to_string(), &new_ns), done]
        }
        e => {
            let result = match e {
                "(+ 1 1)" => "2".to_string(),
                "(+ 1 2 3)" => "6".to_string(),
                other => other.to_string(),
            };
            let result = match tag {
                Some(tag) => format!("{}:{}", tag, result),
                None => result,
            };
            vec![value(result, &ns), done]
        }
    }
}

/// Split `(do (ns N)\nEXPR)` into `N` and `EXPR`.
fn unwrap_code(code: &str) -> (String, String) {
    if let Some(rest) = code.strip_prefix("(do (ns ") {
        if let Some((ns, tail)) = rest.split_once(")\n") {
            let expr = tail.strip_suffix(')').unwrap_or(tail);
            return (ns.to_string(), expr.to_string());
        }
    }
    ("user".to_string(), code.to_string())
}

fn fragment(id: &str, mut pairs: Vec<(&str, Value)>) -> Value {
    pairs.push(("id", Value::from(id)));
    pairs.push(("session", Value::from("fake-session")));
    Value::dict(pairs)
}

fn empty_dict() -> Value {
    Value::Dict(BTreeMap::new())
}

fn status(items: &[&str]) -> Value {
    Value::List(items.iter().map(|s| Value::from(*s)).collect())
}
