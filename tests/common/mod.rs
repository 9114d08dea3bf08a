//! Throwaway cache server for harness self-tests
//!
//! Speaks both memcached protocols (text and binary), sniffing the
//! first byte of each connection: 0x80 means binary. Supports exactly
//! what the harness needs: get, set and quit.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

type Store = Arc<Mutex<HashMap<String, Vec<u8>>>>;

const MAGIC_REQUEST: u8 = 0x80;
const MAGIC_RESPONSE: u8 = 0x81;
const OP_GET: u8 = 0x00;
const OP_SET: u8 = 0x01;
const OP_QUIT: u8 = 0x07;
const STATUS_OK: u16 = 0x0000;
const STATUS_KEY_NOT_FOUND: u16 = 0x0001;

pub struct TestServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to read local addr");
        let store: Store = Arc::new(Mutex::new(HashMap::new()));

        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let store = store.clone();
                tokio::spawn(async move {
                    let _ = handle_connection(stream, store).await;
                });
            }
        });

        Self { addr, handle }
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_connection(stream: TcpStream, store: Store) -> std::io::Result<()> {
    let mut first = [0u8; 1];
    let n = stream.peek(&mut first).await?;
    if n == 0 {
        return Ok(());
    }
    if first[0] == MAGIC_REQUEST {
        handle_binary(stream, store).await
    } else {
        handle_ascii(stream, store).await
    }
}

async fn handle_ascii(stream: TcpStream, store: Store) -> std::io::Result<()> {
    let mut stream = BufStream::new(stream);

    loop {
        let mut line = String::new();
        if stream.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        let line = line.trim_end();
        let mut parts = line.split_ascii_whitespace();

        match parts.next() {
            Some("get") => {
                let key = parts.next().unwrap_or("");
                let value = store.lock().unwrap().get(key).cloned();
                if let Some(value) = value {
                    let header = format!("VALUE {} 0 {}\r\n", key, value.len());
                    stream.write_all(header.as_bytes()).await?;
                    stream.write_all(&value).await?;
                    stream.write_all(b"\r\n").await?;
                }
                stream.write_all(b"END\r\n").await?;
            }
            Some("set") => {
                let key = parts.next().unwrap_or("").to_string();
                let _flags = parts.next();
                let _ttl = parts.next();
                let len: usize = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);

                let mut data = vec![0u8; len + 2];
                stream.read_exact(&mut data).await?;
                data.truncate(len);

                store.lock().unwrap().insert(key, data);
                stream.write_all(b"STORED\r\n").await?;
            }
            Some("quit") => return Ok(()),
            _ => {
                stream.write_all(b"ERROR\r\n").await?;
            }
        }
        stream.flush().await?;
    }
}

async fn handle_binary(stream: TcpStream, store: Store) -> std::io::Result<()> {
    let mut stream = BufStream::new(stream);

    loop {
        let mut header = [0u8; 24];
        if let Err(e) = stream.read_exact(&mut header).await {
            return if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Ok(())
            } else {
                Err(e)
            };
        }
        if header[0] != MAGIC_REQUEST {
            return Ok(());
        }
        let opcode = header[1];
        let key_len = u16::from_be_bytes([header[2], header[3]]) as usize;
        let extras_len = header[4] as usize;
        let body_len = u32::from_be_bytes([header[8], header[9], header[10], header[11]]) as usize;

        let mut body = vec![0u8; body_len];
        stream.read_exact(&mut body).await?;
        let key = String::from_utf8_lossy(&body[extras_len..extras_len + key_len]).to_string();

        match opcode {
            OP_GET => {
                let value = store.lock().unwrap().get(&key).cloned();
                let frame = match value {
                    // GET responses carry 4 bytes of flags extras
                    Some(value) => response_frame(opcode, STATUS_OK, &[0u8; 4], &value),
                    None => response_frame(opcode, STATUS_KEY_NOT_FOUND, &[], b"Not found"),
                };
                stream.write_all(&frame).await?;
            }
            OP_SET => {
                let value = body[extras_len + key_len..].to_vec();
                store.lock().unwrap().insert(key, value);
                let frame = response_frame(opcode, STATUS_OK, &[], &[]);
                stream.write_all(&frame).await?;
            }
            OP_QUIT => return Ok(()),
            _ => {
                let frame = response_frame(opcode, 0x0081, &[], b"Unknown command");
                stream.write_all(&frame).await?;
            }
        }
        stream.flush().await?;
    }
}

fn response_frame(opcode: u8, status: u16, extras: &[u8], value: &[u8]) -> Vec<u8> {
    let body_len = extras.len() + value.len();
    let mut frame = Vec::with_capacity(24 + body_len);

    frame.push(MAGIC_RESPONSE);
    frame.push(opcode);
    frame.extend_from_slice(&0u16.to_be_bytes()); // key length
    frame.push(extras.len() as u8);
    frame.push(0); // data type
    frame.extend_from_slice(&status.to_be_bytes());
    frame.extend_from_slice(&(body_len as u32).to_be_bytes());
    frame.extend_from_slice(&0u32.to_be_bytes()); // opaque
    frame.extend_from_slice(&0u64.to_be_bytes()); // cas

    frame.extend_from_slice(extras);
    frame.extend_from_slice(value);
    frame
}
