//! Minimal in-process LDAPv3 server.
//!
//! Speaks just enough BER to answer simple binds, searches and unbinds, and
//! records what the client sent so tests can assert on the wire contents.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const TAG_SEQUENCE: u8 = 0x30;
const TAG_SET: u8 = 0x31;
const TAG_INTEGER: u8 = 0x02;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_ENUMERATED: u8 = 0x0a;
const TAG_SIMPLE_AUTH: u8 = 0x80;

const OP_BIND_REQUEST: u8 = 0x60;
const OP_BIND_RESPONSE: u8 = 0x61;
const OP_UNBIND_REQUEST: u8 = 0x42;
const OP_SEARCH_REQUEST: u8 = 0x63;
const OP_SEARCH_ENTRY: u8 = 0x64;
const OP_SEARCH_DONE: u8 = 0x65;

const RESULT_SUCCESS: u8 = 0;
const RESULT_INVALID_CREDENTIALS: u8 = 49;

/// A bind request as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindRecord {
    pub name: String,
    pub password: String,
}

impl BindRecord {
    pub fn new(name: &str, password: &str) -> Self {
        Self {
            name: name.to_string(),
            password: password.to_string(),
        }
    }
}

/// A search request as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRecord {
    pub base: String,
    pub scope: i64,
    pub time_limit_secs: i64,
}

#[derive(Debug, Default)]
struct Recorded {
    binds: Vec<BindRecord>,
    searches: Vec<SearchRecord>,
    unbinds: usize,
}

struct State {
    reject_binds: bool,
    recorded: Mutex<Recorded>,
}

/// Handle to a running server; it stops with the test runtime.
pub struct DirectoryServer {
    pub url: String,
    state: Arc<State>,
}

impl DirectoryServer {
    /// Starts a server that accepts every bind.
    pub async fn start() -> Self {
        Self::spawn(false).await
    }

    /// Starts a server that answers every bind with invalidCredentials.
    pub async fn start_rejecting_binds() -> Self {
        Self::spawn(true).await
    }

    async fn spawn(reject_binds: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ldap://{}", listener.local_addr().unwrap());
        let state = Arc::new(State {
            reject_binds,
            recorded: Mutex::new(Recorded::default()),
        });

        let accept_state = state.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve(socket, accept_state.clone()));
            }
        });

        Self { url, state }
    }

    pub fn binds(&self) -> Vec<BindRecord> {
        self.state.recorded.lock().binds.clone()
    }

    pub fn searches(&self) -> Vec<SearchRecord> {
        self.state.recorded.lock().searches.clone()
    }

    /// Waits until at least `count` unbinds have arrived.
    pub async fn wait_for_unbinds(&self, count: usize) {
        for _ in 0..300 {
            if self.state.recorded.lock().unbinds >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {count} unbinds, saw {}",
            self.state.recorded.lock().unbinds
        );
    }
}

async fn serve(mut socket: TcpStream, state: Arc<State>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        while let Some((tag, body, used)) =
            read_tlv(&buf).map(|(tag, content, used)| (tag, content.to_vec(), used))
        {
            buf.drain(..used);
            if tag != TAG_SEQUENCE {
                return;
            }
            match state.handle(&body) {
                Reply::Send(bytes) => {
                    if socket.write_all(&bytes).await.is_err() {
                        return;
                    }
                }
                Reply::Close => return,
                Reply::Nothing => {}
            }
        }

        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}

enum Reply {
    Send(Vec<u8>),
    Close,
    Nothing,
}

impl State {
    fn handle(&self, message: &[u8]) -> Reply {
        let parts = elements(message);
        let (Some((_, id)), Some(&(op, body))) = (parts.first(), parts.get(1)) else {
            return Reply::Close;
        };

        match op {
            OP_BIND_REQUEST => {
                let fields = elements(body);
                let name = fields.get(1).map(|f| text(f.1)).unwrap_or_default();
                let password = fields
                    .get(2)
                    .filter(|f| f.0 == TAG_SIMPLE_AUTH)
                    .map(|f| text(f.1))
                    .unwrap_or_default();
                self.recorded
                    .lock()
                    .binds
                    .push(BindRecord { name, password });

                let code = if self.reject_binds {
                    RESULT_INVALID_CREDENTIALS
                } else {
                    RESULT_SUCCESS
                };
                Reply::Send(envelope(id, &tlv(OP_BIND_RESPONSE, &ldap_result(code))))
            }
            OP_SEARCH_REQUEST => {
                let fields = elements(body);
                let base = fields.first().map(|f| text(f.1)).unwrap_or_default();
                let scope = fields.get(1).map(|f| integer(f.1)).unwrap_or(-1);
                let time_limit_secs = fields.get(4).map(|f| integer(f.1)).unwrap_or(-1);
                self.recorded.lock().searches.push(SearchRecord {
                    base: base.clone(),
                    scope,
                    time_limit_secs,
                });

                let dn = format!("uid=jdoe,{base}");
                let attributes = [
                    attribute("cn", "Jane Doe"),
                    attribute("mail", "jdoe@example.com"),
                ]
                .concat();
                let entry = [
                    tlv(TAG_OCTET_STRING, dn.as_bytes()),
                    tlv(TAG_SEQUENCE, &attributes),
                ]
                .concat();

                Reply::Send(
                    [
                        envelope(id, &tlv(OP_SEARCH_ENTRY, &entry)),
                        envelope(id, &tlv(OP_SEARCH_DONE, &ldap_result(RESULT_SUCCESS))),
                    ]
                    .concat(),
                )
            }
            OP_UNBIND_REQUEST => {
                self.recorded.lock().unbinds += 1;
                Reply::Close
            }
            _ => Reply::Nothing,
        }
    }
}

fn read_tlv(buf: &[u8]) -> Option<(u8, &[u8], usize)> {
    let tag = *buf.first()?;
    let first = *buf.get(1)?;
    let (len, header) = if first & 0x80 == 0 {
        (usize::from(first), 2)
    } else {
        let n = usize::from(first & 0x7f);
        let bytes = buf.get(2..2 + n)?;
        let len = bytes
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | usize::from(*b));
        (len, 2 + n)
    };
    let content = buf.get(header..header + len)?;
    Some((tag, content, header + len))
}

fn elements(mut buf: &[u8]) -> Vec<(u8, &[u8])> {
    let mut out = Vec::new();
    while let Some((tag, content, used)) = read_tlv(buf) {
        out.push((tag, content));
        buf = &buf[used..];
    }
    out
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn integer(bytes: &[u8]) -> i64 {
    bytes.iter().fold(0i64, |acc, b| (acc << 8) | i64::from(*b))
}

fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let len = content.len();
    let mut out = vec![tag];
    if len < 0x80 {
        out.push(len as u8);
    } else if len <= 0xff {
        out.extend([0x81, len as u8]);
    } else {
        out.extend([0x82, (len >> 8) as u8, len as u8]);
    }
    out.extend_from_slice(content);
    out
}

fn envelope(id: &[u8], op: &[u8]) -> Vec<u8> {
    tlv(TAG_SEQUENCE, &[tlv(TAG_INTEGER, id), op.to_vec()].concat())
}

fn ldap_result(code: u8) -> Vec<u8> {
    [
        tlv(TAG_ENUMERATED, &[code]),
        tlv(TAG_OCTET_STRING, b""),
        tlv(TAG_OCTET_STRING, b""),
    ]
    .concat()
}

fn attribute(name: &str, value: &str) -> Vec<u8> {
    tlv(
        TAG_SEQUENCE,
        &[
            tlv(TAG_OCTET_STRING, name.as_bytes()),
            tlv(TAG_SET, &tlv(TAG_OCTET_STRING, value.as_bytes())),
        ]
        .concat(),
    )
}
