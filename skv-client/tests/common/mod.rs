//! In-process RESP2 server used by the integration tests.
//!
//! It keeps string values in memory and implements the subset of commands the
//! client sends, with the reply shapes and error texts a real server uses.
//! Cluster behavior (CROSSSLOT, MOVED, ASK) is opt-in per server.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::{Mutex, MutexGuard};
use skv_client::{hash_slot, ClientConfig, ClusterConfig};

const NOT_INTEGER: &str = "ERR value is not an integer or out of range";
const NOT_FLOAT: &str = "ERR value is not a valid float";
const SYNTAX: &str = "ERR syntax error";

/// Handle to a running fake server. The listener thread lives until the
/// test process exits.
pub struct FakeServer {
    addr: String,
    state: Arc<Mutex<State>>,
}

impl FakeServer {
    /// Plain standalone server.
    pub fn start() -> Self {
        Self::spawn(State::default())
    }

    /// Server that rejects cross-slot commands, like a cluster node.
    pub fn start_cluster_node() -> Self {
        Self::spawn(State {
            cluster: true,
            ..State::default()
        })
    }

    /// Standalone server with `requirepass` set.
    pub fn with_password(password: &str) -> Self {
        Self::spawn(State {
            requirepass: Some(password.to_string()),
            ..State::default()
        })
    }

    fn spawn(state: State) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr").to_string();
        let state = Arc::new(Mutex::new(state));
        let shared = state.clone();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let state = shared.clone();
                thread::spawn(move || serve(stream, state));
            }
        });

        FakeServer { addr, state }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// How many times a command (upper-case name) was received.
    pub fn calls(&self, name: &str) -> usize {
        self.lock().calls.get(name).copied().unwrap_or(0)
    }

    /// Commands received, excluding connection setup (AUTH, SELECT).
    pub fn data_calls(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|(name, _)| !matches!(name.as_str(), "AUTH" | "SELECT"))
            .map(|(_, count)| *count)
            .sum()
    }

    /// Same effect as `CONFIG SET requirepass`; open sessions stay authenticated.
    pub fn set_requirepass(&self, password: Option<&str>) {
        self.lock().requirepass = password.map(str::to_string);
    }

    /// Answers every command on `slot` with `-MOVED slot addr`.
    pub fn redirect_moved(&self, slot: u16, addr: &str) {
        self.lock().redirects.insert(slot, Redirect::Moved(addr.to_string()));
    }

    /// Answers every command on `slot` with `-ASK slot addr`.
    pub fn redirect_ask(&self, slot: u16, addr: &str) {
        self.lock().redirects.insert(slot, Redirect::Ask(addr.to_string()));
    }

    /// Stored value, bypassing the protocol.
    pub fn raw_value(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.lock().live(key).map(|entry| entry.value.clone())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            addr: self.addr.clone(),
            max_idle: 2,
            max_total: 4,
            read_timeout: Some(Duration::from_secs(2)),
            write_timeout: Some(Duration::from_secs(2)),
            connect_timeout: Some(Duration::from_secs(1)),
            ..ClientConfig::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock()
    }
}

/// Cluster config seeded with the given servers, in order.
pub fn cluster_config(seeds: &[&FakeServer]) -> ClusterConfig {
    ClusterConfig {
        nodes: seeds.iter().map(|server| server.addr().to_string()).collect(),
        read_timeout: Some(Duration::from_secs(2)),
        write_timeout: Some(Duration::from_secs(2)),
        connect_timeout: Some(Duration::from_secs(1)),
        ..ClusterConfig::default()
    }
}

enum Redirect {
    Moved(String),
    Ask(String),
}

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct State {
    data: HashMap<Vec<u8>, Entry>,
    requirepass: Option<String>,
    cluster: bool,
    redirects: HashMap<u16, Redirect>,
    calls: HashMap<String, usize>,
}

#[derive(Default)]
struct Session {
    authed: bool,
}

enum Reply {
    Simple(&'static str),
    Error(String),
    Int(i64),
    Bulk(Option<Vec<u8>>),
    Array(Vec<Reply>),
}

impl Reply {
    fn ok() -> Self {
        Reply::Simple("OK")
    }

    fn err(message: impl Into<String>) -> Self {
        Reply::Error(message.into())
    }

    fn bulk(data: &[u8]) -> Self {
        Reply::Bulk(Some(data.to_vec()))
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Reply::Simple(msg) => {
                out.push(b'+');
                out.extend_from_slice(msg.as_bytes());
            }
            Reply::Error(msg) => {
                out.push(b'-');
                out.extend_from_slice(msg.as_bytes());
            }
            Reply::Int(value) => {
                out.push(b':');
                out.extend_from_slice(value.to_string().as_bytes());
            }
            Reply::Bulk(None) => out.extend_from_slice(b"$-1"),
            Reply::Bulk(Some(data)) => {
                out.push(b'$');
                out.extend_from_slice(data.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                out.extend_from_slice(data);
            }
            Reply::Array(items) => {
                out.push(b'*');
                out.extend_from_slice(items.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                for item in items {
                    item.encode(out);
                }
                return;
            }
        }
        out.extend_from_slice(b"\r\n");
    }
}

fn serve(stream: TcpStream, state: Arc<Mutex<State>>) {
    let Ok(mut writer) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(stream);
    let mut session = Session::default();
    let mut out = Vec::with_capacity(256);

    while let Ok(args) = read_command(&mut reader) {
        if args.is_empty() {
            break;
        }
        let reply = state.lock().handle(&mut session, &args);
        out.clear();
        reply.encode(&mut out);
        if writer.write_all(&out).and_then(|_| writer.flush()).is_err() {
            break;
        }
    }
}

impl State {
    fn handle(&mut self, session: &mut Session, args: &[Vec<u8>]) -> Reply {
        let name = String::from_utf8_lossy(&args[0]).to_ascii_uppercase();
        *self.calls.entry(name.clone()).or_default() += 1;
        let rest = &args[1..];

        if name == "AUTH" {
            return self.auth(session, rest);
        }
        if self.requirepass.is_some() && !session.authed {
            return Reply::err("NOAUTH Authentication required.");
        }

        let keys = command_keys(&name, rest);
        if let Some(first) = keys.first() {
            let slot = hash_slot(first);
            if self.cluster && keys.iter().any(|key| hash_slot(key) != slot) {
                return Reply::err("CROSSSLOT Keys in request don't hash to the same slot");
            }
            match self.redirects.get(&slot) {
                Some(Redirect::Moved(addr)) => return Reply::err(format!("MOVED {slot} {addr}")),
                Some(Redirect::Ask(addr)) => return Reply::err(format!("ASK {slot} {addr}")),
                None => {}
            }
        }

        self.dispatch(&name, rest)
    }

    fn auth(&mut self, session: &mut Session, rest: &[Vec<u8>]) -> Reply {
        let password = match rest {
            [password] | [_, password] => password,
            _ => return arity("auth"),
        };
        match &self.requirepass {
            None => Reply::err(
                "ERR AUTH <password> called without any password configured for the default user. \
                 Are you sure your configuration is correct?",
            ),
            Some(expected) if expected.as_bytes() == password.as_slice() => {
                session.authed = true;
                Reply::ok()
            }
            Some(_) => Reply::err("WRONGPASS invalid username-password pair or user is disabled."),
        }
    }

    fn dispatch(&mut self, name: &str, rest: &[Vec<u8>]) -> Reply {
        match name {
            "PING" => match rest {
                [] => Reply::Simple("PONG"),
                [payload] => Reply::bulk(payload),
                _ => arity("ping"),
            },
            "ASKING" | "SELECT" => Reply::ok(),
            "CONFIG" => self.config(rest),
            "SET" => self.set(rest),
            "GET" => match rest {
                [key] => Reply::Bulk(self.live(key).map(|entry| entry.value.clone())),
                _ => arity("get"),
            },
            "GETEX" => self.get_ex(rest),
            "GETDEL" => match rest {
                [key] => {
                    let value = self.live(key).map(|entry| entry.value.clone());
                    self.data.remove(key.as_slice());
                    Reply::Bulk(value)
                }
                _ => arity("getdel"),
            },
            "MSET" | "MSETNX" => self.mset(name == "MSETNX", rest),
            "MGET" => Reply::Array(
                rest.iter()
                    .map(|key| Reply::Bulk(self.live(key).map(|entry| entry.value.clone())))
                    .collect(),
            ),
            "INCR" | "DECR" => match rest {
                [key] => self.incr_by(key, if name == "INCR" { 1 } else { -1 }),
                _ => arity("incr"),
            },
            "INCRBY" | "DECRBY" => match rest {
                [key, delta] => match parse_int(delta) {
                    Some(delta) if name == "INCRBY" => self.incr_by(key, delta),
                    Some(delta) => match delta.checked_neg() {
                        Some(delta) => self.incr_by(key, delta),
                        None => Reply::err("ERR decrement would overflow"),
                    },
                    None => Reply::err(NOT_INTEGER),
                },
                _ => arity("incrby"),
            },
            "INCRBYFLOAT" => self.incr_by_float(rest),
            "STRLEN" => match rest {
                [key] => Reply::Int(self.live(key).map_or(0, |entry| entry.value.len() as i64)),
                _ => arity("strlen"),
            },
            "APPEND" => match rest {
                [key, value] => {
                    let len = match self.live(key) {
                        Some(entry) => {
                            entry.value.extend_from_slice(value);
                            entry.value.len()
                        }
                        None => {
                            self.insert(key, value.clone(), None);
                            value.len()
                        }
                    };
                    Reply::Int(len as i64)
                }
                _ => arity("append"),
            },
            "SETRANGE" => self.set_range(rest),
            "GETRANGE" => self.get_range(rest),
            "LCS" => self.lcs(rest),
            "DEL" => {
                let mut removed = 0;
                for key in rest {
                    if self.live(key).is_some() {
                        self.data.remove(key.as_slice());
                        removed += 1;
                    }
                }
                Reply::Int(removed)
            }
            "EXISTS" => Reply::Int(rest.iter().filter(|key| self.live(key).is_some()).count() as i64),
            "TTL" => match rest {
                [key] => Reply::Int(match self.live(key) {
                    None => -2,
                    Some(Entry { expires_at: None, .. }) => -1,
                    Some(Entry {
                        expires_at: Some(at),
                        ..
                    }) => {
                        let ms = at.saturating_duration_since(Instant::now()).as_millis() as i64;
                        (ms + 500) / 1000
                    }
                }),
                _ => arity("ttl"),
            },
            other => Reply::err(format!("ERR unknown command '{other}'")),
        }
    }

    fn live(&mut self, key: &[u8]) -> Option<&mut Entry> {
        let expired = self
            .data
            .get(key)
            .and_then(|entry| entry.expires_at)
            .is_some_and(|at| at <= Instant::now());
        if expired {
            self.data.remove(key);
        }
        self.data.get_mut(key)
    }

    fn insert(&mut self, key: &[u8], value: Vec<u8>, expires_at: Option<Instant>) {
        self.data.insert(key.to_vec(), Entry { value, expires_at });
    }

    fn config(&mut self, rest: &[Vec<u8>]) -> Reply {
        match rest {
            [sub, param, value]
                if sub.eq_ignore_ascii_case(b"SET") && param.eq_ignore_ascii_case(b"requirepass") =>
            {
                self.requirepass = if value.is_empty() {
                    None
                } else {
                    Some(String::from_utf8_lossy(value).into_owned())
                };
                Reply::ok()
            }
            _ => Reply::err("ERR unsupported CONFIG subcommand"),
        }
    }

    fn set(&mut self, rest: &[Vec<u8>]) -> Reply {
        let [key, value, options @ ..] = rest else {
            return arity("set");
        };
        let (mut nx, mut xx, mut get, mut keep_ttl) = (false, false, false, false);
        let mut if_eq = None;
        let mut expires_at = None;

        let mut i = 0;
        while i < options.len() {
            let option = String::from_utf8_lossy(&options[i]).to_ascii_uppercase();
            match option.as_str() {
                "NX" => nx = true,
                "XX" => xx = true,
                "GET" => get = true,
                "KEEPTTL" => keep_ttl = true,
                "IFEQ" | "EX" | "PX" | "EXAT" | "PXAT" => {
                    i += 1;
                    let Some(arg) = options.get(i) else {
                        return Reply::err(SYNTAX);
                    };
                    if option == "IFEQ" {
                        if_eq = Some(arg.clone());
                    } else {
                        match parse_int(arg) {
                            Some(n) if n > 0 => expires_at = Some(deadline(&option, n)),
                            Some(_) => return Reply::err("ERR invalid expire time in 'set' command"),
                            None => return Reply::err(NOT_INTEGER),
                        }
                    }
                }
                _ => return Reply::err(SYNTAX),
            }
            i += 1;
        }
        if nx && (xx || if_eq.is_some()) {
            return Reply::err(SYNTAX);
        }

        let (old, old_expiry) = match self.live(key) {
            Some(entry) => (Some(entry.value.clone()), entry.expires_at),
            None => (None, None),
        };
        let allowed = !(nx && old.is_some())
            && !(xx && old.is_none())
            && if_eq.as_ref().map_or(true, |expected| old.as_ref() == Some(expected));
        if allowed {
            let expires_at = if keep_ttl { old_expiry } else { expires_at };
            self.insert(key, value.clone(), expires_at);
        }

        match (get, allowed) {
            (true, _) => Reply::Bulk(old),
            (false, true) => Reply::ok(),
            (false, false) => Reply::Bulk(None),
        }
    }

    fn get_ex(&mut self, rest: &[Vec<u8>]) -> Reply {
        let (key, options) = match rest {
            [key, options @ ..] => (key, options),
            _ => return arity("getex"),
        };
        let new_expiry = match options {
            [] => None,
            [persist] if persist.eq_ignore_ascii_case(b"PERSIST") => Some(None),
            [unit, n] => {
                let unit = String::from_utf8_lossy(unit).to_ascii_uppercase();
                if !matches!(unit.as_str(), "EX" | "PX" | "EXAT" | "PXAT") {
                    return Reply::err(SYNTAX);
                }
                match parse_int(n) {
                    Some(n) if n > 0 => Some(Some(deadline(&unit, n))),
                    Some(_) => return Reply::err("ERR invalid expire time in 'getex' command"),
                    None => return Reply::err(NOT_INTEGER),
                }
            }
            _ => return Reply::err(SYNTAX),
        };
        match self.live(key) {
            None => Reply::Bulk(None),
            Some(entry) => {
                if let Some(expires_at) = new_expiry {
                    entry.expires_at = expires_at;
                }
                Reply::bulk(&entry.value)
            }
        }
    }

    fn mset(&mut self, only_new: bool, rest: &[Vec<u8>]) -> Reply {
        if rest.is_empty() || rest.len() % 2 != 0 {
            return arity(if only_new { "msetnx" } else { "mset" });
        }
        if only_new && rest.iter().step_by(2).any(|key| self.live(key).is_some()) {
            return Reply::Int(0);
        }
        for pair in rest.chunks(2) {
            self.insert(&pair[0], pair[1].clone(), None);
        }
        if only_new {
            Reply::Int(1)
        } else {
            Reply::ok()
        }
    }

    fn incr_by(&mut self, key: &[u8], delta: i64) -> Reply {
        let current = match self.live(key) {
            Some(entry) => match parse_int(&entry.value) {
                Some(value) => value,
                None => return Reply::err(NOT_INTEGER),
            },
            None => 0,
        };
        let Some(next) = current.checked_add(delta) else {
            return Reply::err("ERR increment or decrement would overflow");
        };
        self.store_number(key, next.to_string().into_bytes());
        Reply::Int(next)
    }

    fn incr_by_float(&mut self, rest: &[Vec<u8>]) -> Reply {
        let [key, delta] = rest else {
            return arity("incrbyfloat");
        };
        let Some(delta) = parse_float(delta) else {
            return Reply::err(NOT_FLOAT);
        };
        let current = match self.live(key) {
            Some(entry) => match parse_float(&entry.value) {
                Some(value) => value,
                None => return Reply::err(NOT_FLOAT),
            },
            None => 0.0,
        };
        let next = current + delta;
        if !next.is_finite() {
            return Reply::err("ERR increment would produce NaN or Infinity");
        }
        let encoded = next.to_string().into_bytes();
        self.store_number(key, encoded.clone());
        Reply::Bulk(Some(encoded))
    }

    fn store_number(&mut self, key: &[u8], value: Vec<u8>) {
        match self.live(key) {
            Some(entry) => entry.value = value,
            None => self.insert(key, value, None),
        }
    }

    fn set_range(&mut self, rest: &[Vec<u8>]) -> Reply {
        let [key, offset, value] = rest else {
            return arity("setrange");
        };
        let offset = match parse_int(offset) {
            Some(offset) if offset >= 0 => offset as usize,
            Some(_) => return Reply::err("ERR offset is out of range"),
            None => return Reply::err(NOT_INTEGER),
        };
        let exists = self.live(key).is_some();
        if !exists {
            if value.is_empty() {
                return Reply::Int(0);
            }
            self.insert(key, Vec::new(), None);
        }
        let Some(entry) = self.live(key) else {
            return Reply::Int(0);
        };
        if !value.is_empty() {
            let end = offset + value.len();
            if entry.value.len() < end {
                entry.value.resize(end, 0);
            }
            entry.value[offset..end].copy_from_slice(value);
        }
        Reply::Int(entry.value.len() as i64)
    }

    fn get_range(&mut self, rest: &[Vec<u8>]) -> Reply {
        let [key, start, end] = rest else {
            return arity("getrange");
        };
        let (Some(mut start), Some(mut end)) = (parse_int(start), parse_int(end)) else {
            return Reply::err(NOT_INTEGER);
        };
        let value = self.live(key).map(|entry| entry.value.clone()).unwrap_or_default();
        let len = value.len() as i64;
        if start < 0 && end < 0 && start > end {
            return Reply::bulk(b"");
        }
        if start < 0 {
            start += len;
        }
        if end < 0 {
            end += len;
        }
        start = start.max(0);
        end = end.max(0);
        if end >= len {
            end = len - 1;
        }
        if len == 0 || start > end {
            return Reply::bulk(b"");
        }
        Reply::bulk(&value[start as usize..=end as usize])
    }

    fn lcs(&mut self, rest: &[Vec<u8>]) -> Reply {
        let [key1, key2, options @ ..] = rest else {
            return arity("lcs");
        };
        let (mut want_len, mut want_idx, mut with_match_len) = (false, false, false);
        let mut min_match_len = 0usize;
        let mut i = 0;
        while i < options.len() {
            let option = String::from_utf8_lossy(&options[i]).to_ascii_uppercase();
            match option.as_str() {
                "LEN" => want_len = true,
                "IDX" => want_idx = true,
                "WITHMATCHLEN" => with_match_len = true,
                "MINMATCHLEN" => {
                    i += 1;
                    match options.get(i).and_then(|arg| parse_int(arg)) {
                        Some(n) => min_match_len = n.max(0) as usize,
                        None => return Reply::err(NOT_INTEGER),
                    }
                }
                _ => return Reply::err(SYNTAX),
            }
            i += 1;
        }
        if want_len && want_idx {
            return Reply::err(
                "ERR If you want both the length and indexes, please just use IDX.",
            );
        }

        let a = self.live(key1).map(|entry| entry.value.clone()).unwrap_or_default();
        let b = self.live(key2).map(|entry| entry.value.clone()).unwrap_or_default();
        let outcome = longest_common_subsequence(&a, &b, min_match_len);

        if want_len {
            return Reply::Int(outcome.len as i64);
        }
        if !want_idx {
            return Reply::Bulk(Some(outcome.sequence));
        }
        let matches = outcome
            .ranges
            .into_iter()
            .map(|range| {
                let mut item = vec![
                    pair_reply(range.a),
                    pair_reply(range.b),
                ];
                if with_match_len {
                    item.push(Reply::Int((range.a.1 - range.a.0 + 1) as i64));
                }
                Reply::Array(item)
            })
            .collect();
        Reply::Array(vec![
            Reply::bulk(b"matches"),
            Reply::Array(matches),
            Reply::bulk(b"len"),
            Reply::Int(outcome.len as i64),
        ])
    }
}

fn pair_reply((start, end): (usize, usize)) -> Reply {
    Reply::Array(vec![Reply::Int(start as i64), Reply::Int(end as i64)])
}

struct LcsRange {
    a: (usize, usize),
    b: (usize, usize),
}

struct LcsOutcome {
    sequence: Vec<u8>,
    ranges: Vec<LcsRange>,
    len: usize,
}

/// Dynamic-programming LCS with the server's backtracking order: ranges are
/// reported from the end of both strings towards the start.
fn longest_common_subsequence(a: &[u8], b: &[u8], min_match_len: usize) -> LcsOutcome {
    let width = b.len() + 1;
    let mut table = vec![0usize; (a.len() + 1) * width];
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            table[i * width + j] = if a[i - 1] == b[j - 1] {
                table[(i - 1) * width + j - 1] + 1
            } else {
                table[(i - 1) * width + j].max(table[i * width + j - 1])
            };
        }
    }
    let len = table[a.len() * width + b.len()];

    let mut sequence = vec![0u8; len];
    let mut ranges = Vec::new();
    let mut remaining = len;
    let (mut i, mut j) = (a.len(), b.len());
    let mut current: Option<LcsRange> = None;

    while i > 0 && j > 0 {
        let mut emit = false;
        if a[i - 1] == b[j - 1] {
            sequence[remaining - 1] = a[i - 1];
            match current.as_mut() {
                None => {
                    current = Some(LcsRange {
                        a: (i - 1, i - 1),
                        b: (j - 1, j - 1),
                    })
                }
                Some(range) if range.a.0 == i && range.b.0 == j => {
                    range.a.0 -= 1;
                    range.b.0 -= 1;
                }
                Some(_) => emit = true,
            }
            if current
                .as_ref()
                .is_some_and(|range| range.a.0 == 0 || range.b.0 == 0)
            {
                emit = true;
            }
            remaining -= 1;
            i -= 1;
            j -= 1;
        } else {
            if table[(i - 1) * width + j] > table[i * width + j - 1] {
                i -= 1;
            } else {
                j -= 1;
            }
            emit = current.is_some();
        }

        if emit {
            if let Some(range) = current.take() {
                let match_len = range.a.1 - range.a.0 + 1;
                if min_match_len == 0 || match_len >= min_match_len {
                    ranges.push(range);
                }
            }
        }
    }

    LcsOutcome {
        sequence,
        ranges,
        len,
    }
}

/// Keys a command touches, used for slot checks.
fn command_keys<'a>(name: &str, rest: &'a [Vec<u8>]) -> Vec<&'a [u8]> {
    match name {
        "PING" | "AUTH" | "SELECT" | "CONFIG" | "ASKING" => Vec::new(),
        "MSET" | "MSETNX" => rest.iter().step_by(2).map(Vec::as_slice).collect(),
        "MGET" | "DEL" | "EXISTS" => rest.iter().map(Vec::as_slice).collect(),
        "LCS" => rest.iter().take(2).map(Vec::as_slice).collect(),
        _ => rest.iter().take(1).map(Vec::as_slice).collect(),
    }
}

fn arity(command: &str) -> Reply {
    Reply::err(format!("ERR wrong number of arguments for '{command}' command"))
}

fn parse_int(data: &[u8]) -> Option<i64> {
    std::str::from_utf8(data).ok()?.parse().ok()
}

fn parse_float(data: &[u8]) -> Option<f64> {
    std::str::from_utf8(data)
        .ok()?
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn deadline(unit: &str, amount: i64) -> Instant {
    let now = Instant::now();
    let amount = amount.max(0) as u64;
    match unit {
        "EX" => now + Duration::from_secs(amount),
        "PX" => now + Duration::from_millis(amount),
        _ => {
            let at = if unit == "EXAT" {
                Duration::from_secs(amount)
            } else {
                Duration::from_millis(amount)
            };
            let elapsed = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            now + at.saturating_sub(elapsed)
        }
    }
}

fn read_command(reader: &mut BufReader<TcpStream>) -> std::io::Result<Vec<Vec<u8>>> {
    let mut line = Vec::new();
    if read_line(reader, &mut line)?.is_none() {
        return Ok(Vec::new());
    }
    if line.first() != Some(&b'*') {
        return Err(invalid("expected array"));
    }
    let count = parse_usize(&line[1..])?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        read_line(reader, &mut line)?
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof"))?;
        if line.first() != Some(&b'$') {
            return Err(invalid("expected bulk"));
        }
        let len = parse_usize(&line[1..])?;
        let mut data = vec![0u8; len];
        reader.read_exact(&mut data)?;
        let mut crlf = [0u8; 2];
        reader.read_exact(&mut crlf)?;
        if crlf != [b'\r', b'\n'] {
            return Err(invalid("missing crlf"));
        }
        args.push(data);
    }
    Ok(args)
}

fn read_line(reader: &mut BufReader<TcpStream>, buf: &mut Vec<u8>) -> std::io::Result<Option<()>> {
    buf.clear();
    let bytes = reader.read_until(b'\n', buf)?;
    if bytes == 0 {
        return Ok(None);
    }
    if buf.len() < 2 || buf[buf.len() - 2] != b'\r' {
        return Err(invalid("invalid line"));
    }
    buf.truncate(buf.len() - 2);
    Ok(Some(()))
}

fn parse_usize(data: &[u8]) -> std::io::Result<usize> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| invalid("digit"))
}

fn invalid(message: &'static str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, message)
}
