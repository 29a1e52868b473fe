//! Shared utilities for integration testing.

use std::collections::HashMap;
use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Start a backend that answers every request with a JSON description of
/// what it saw on the wire: method, path, framing headers and body size.
///
/// Special paths:
/// - `/fail` answers 500 with a plain body
/// - `/protected` demands digest authentication (401 challenge until an
///   `Authorization` header arrives)
///
/// Returns the bound address.
pub async fn start_introspect_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    tokio::spawn(async move {
                        let _ = handle_connection(socket).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn handle_connection(mut socket: TcpStream) -> std::io::Result<()> {
    let mut buf: Vec<u8> = Vec::new();

    // Read until the end of the request head.
    let head_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let mut tmp = [0u8; 4096];
        let n = socket.read(&mut tmp).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&tmp[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or("");
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let target = parts.next().unwrap_or("").to_string();

    let mut headers: HashMap<String, String> = HashMap::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    // Read the body according to the framing the client chose.
    let mut body = buf[head_end..].to_vec();
    let chunked = headers
        .get("transfer-encoding")
        .map(|v| v.to_ascii_lowercase().contains("chunked"))
        .unwrap_or(false);
    let body = if chunked {
        loop {
            if let Some(decoded) = decode_chunked(&body) {
                break decoded;
            }
            let mut tmp = [0u8; 4096];
            let n = socket.read(&mut tmp).await?;
            if n == 0 {
                break body;
            }
            body.extend_from_slice(&tmp[..n]);
        }
    } else {
        let expected: usize = headers
            .get("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        while body.len() < expected {
            let mut tmp = [0u8; 4096];
            let n = socket.read(&mut tmp).await?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&tmp[..n]);
        }
        body.truncate(expected);
        body
    };

    let path = target.split('?').next().unwrap_or("").to_string();
    let (status_line, payload) = if path == "/fail" {
        ("HTTP/1.1 500 Internal Server Error".to_string(), "boom".to_string())
    } else if path == "/protected" && !headers.contains_key("authorization") {
        let challenge = "HTTP/1.1 401 Unauthorized\r\nWWW-Authenticate: Digest realm=\"test\", nonce=\"f3a9b2\", qop=\"auth\"\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
        socket.write_all(challenge.as_bytes()).await?;
        socket.shutdown().await?;
        return Ok(());
    } else {
        let description = serde_json::json!({
            "method": method,
            "path": path,
            "content_length": headers.get("content-length"),
            "transfer_encoding": headers.get("transfer-encoding"),
            "authorization": headers.get("authorization"),
            "body_len": body.len(),
        });
        ("HTTP/1.1 200 OK".to_string(), description.to_string())
    };

    let response = format!(
        "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        payload.len(),
        payload
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await?;
    Ok(())
}

/// Decode a complete chunked body; `None` while more bytes are needed.
fn decode_chunked(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    let mut pos = 0;
    loop {
        let line_end = find(&data[pos..], b"\r\n")? + pos;
        let size_text = String::from_utf8_lossy(&data[pos..line_end]);
        let size = usize::from_str_radix(size_text.trim(), 16).ok()?;
        pos = line_end + 2;
        if size == 0 {
            return Some(out);
        }
        if data.len() < pos + size + 2 {
            return None;
        }
        out.extend_from_slice(&data[pos..pos + size]);
        pos += size + 2;
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
