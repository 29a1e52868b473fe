//! Client-side authentication.
//!
//! # Responsibilities
//! - Hold origin and proxy credentials keyed by target host, so origin
//!   and proxy entries never collide
//! - Produce preemptive `Basic` authorization headers
//! - Answer digest challenges (RFC 7616, MD5 and SHA-256)
//!
//! # Design Decisions
//! - Credentials are scoped per (host, port), never global
//! - Basic auth is applied preemptively; digest is challenge-driven and
//!   answered at most once per request

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use md5::{Digest, Md5};
use reqwest::Url;
use sha2::Sha256;

/// Case-insensitive (host, port) credential scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostKey {
    host: String,
    port: u16,
}

impl HostKey {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_ascii_lowercase(),
            port,
        }
    }

    fn from_url(url: &Url) -> Option<Self> {
        let host = url.host_str()?;
        let port = url.port_or_known_default()?;
        Some(Self::new(host, port))
    }
}

/// One set of user credentials and the scheme they are used with.
#[derive(Debug, Clone)]
pub enum Credentials {
    Basic { username: String, password: String },
    Digest { username: String, password: String },
}

impl Credentials {
    /// Preemptive `Authorization` value; basic scheme only.
    pub fn basic_header(&self) -> Option<String> {
        match self {
            Credentials::Basic { username, password } => {
                let token = BASE64.encode(format!("{}:{}", username, password));
                Some(format!("Basic {}", token))
            }
            Credentials::Digest { .. } => None,
        }
    }

    /// Answer a digest challenge header; digest scheme only. Returns the
    /// full `Authorization`/`Proxy-Authorization` value.
    pub fn answer_digest_challenge(
        &self,
        challenge: &str,
        method: &str,
        uri: &str,
    ) -> Option<String> {
        match self {
            Credentials::Digest { username, password } => {
                let cnonce = format!("{:016x}", fastrand::u64(..));
                digest_response(challenge, username, password, method, uri, &cnonce, "00000001")
            }
            Credentials::Basic { .. } => None,
        }
    }
}

/// Credentials for one client handle: origin entries and proxy entries
/// live in separate maps so the two scopes cannot collide.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    origin: HashMap<HostKey, Credentials>,
    proxy: HashMap<HostKey, Credentials>,
}

impl CredentialStore {
    pub fn add_origin(&mut self, key: HostKey, credentials: Credentials) {
        self.origin.insert(key, credentials);
    }

    pub fn add_proxy(&mut self, key: HostKey, credentials: Credentials) {
        self.proxy.insert(key, credentials);
    }

    /// Origin credentials for the request target, if any.
    pub fn origin_for(&self, url: &Url) -> Option<&Credentials> {
        let key = HostKey::from_url(url)?;
        self.origin.get(&key)
    }

    /// Preemptive basic `Authorization` value for the request target.
    pub fn origin_basic_header(&self, url: &Url) -> Option<String> {
        self.origin_for(url).and_then(Credentials::basic_header)
    }

    /// Origin digest credentials for the request target.
    pub fn origin_digest(&self, url: &Url) -> Option<&Credentials> {
        self.origin_for(url)
            .filter(|c| matches!(c, Credentials::Digest { .. }))
    }

    /// Digest credentials of the configured proxy, if any. A client has
    /// at most one proxy.
    pub fn proxy_digest(&self) -> Option<&Credentials> {
        self.proxy
            .values()
            .find(|c| matches!(c, Credentials::Digest { .. }))
    }

    pub fn is_empty(&self) -> bool {
        self.origin.is_empty() && self.proxy.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DigestAlgorithm {
    Md5,
    Sha256,
}

/// Compute the digest authorization value for a parsed challenge.
/// Visible in-crate so tests can pin the cnonce.
pub(crate) fn digest_response(
    challenge: &str,
    username: &str,
    password: &str,
    method: &str,
    uri: &str,
    cnonce: &str,
    nc: &str,
) -> Option<String> {
    let params = parse_challenge(challenge)?;
    let realm = params.get("realm").map(String::as_str).unwrap_or("");
    let nonce = params.get("nonce")?;

    let algorithm = match params.get("algorithm").map(String::as_str) {
        None | Some("MD5") => DigestAlgorithm::Md5,
        Some("SHA-256") => DigestAlgorithm::Sha256,
        Some(_) => return None,
    };

    let qop_auth = params
        .get("qop")
        .map(|qop| qop.split(',').any(|q| q.trim() == "auth"))
        .unwrap_or(false);

    let ha1 = hex_hash(algorithm, &format!("{}:{}:{}", username, realm, password));
    let ha2 = hex_hash(algorithm, &format!("{}:{}", method, uri));

    let response = if qop_auth {
        hex_hash(
            algorithm,
            &format!("{}:{}:{}:{}:auth:{}", ha1, nonce, nc, cnonce, ha2),
        )
    } else {
        hex_hash(algorithm, &format!("{}:{}:{}", ha1, nonce, ha2))
    };

    let mut header = format!(
        "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", response=\"{}\"",
        username, realm, nonce, uri, response
    );
    header.push_str(match algorithm {
        DigestAlgorithm::Md5 => ", algorithm=MD5",
        DigestAlgorithm::Sha256 => ", algorithm=SHA-256",
    });
    if let Some(opaque) = params.get("opaque") {
        header.push_str(&format!(", opaque=\"{}\"", opaque));
    }
    if qop_auth {
        header.push_str(&format!(", qop=auth, nc={}, cnonce=\"{}\"", nc, cnonce));
    }
    Some(header)
}

/// Parse `Digest k="v", k2=v2, ...` into a parameter map.
fn parse_challenge(challenge: &str) -> Option<HashMap<String, String>> {
    let rest = challenge.trim();
    if rest.len() < 6 || !rest[..6].eq_ignore_ascii_case("digest") {
        return None;
    }
    let rest = &rest[6..];

    let mut params = HashMap::new();
    for part in split_challenge_params(rest) {
        if let Some((key, value)) = part.split_once('=') {
            let value = value.trim().trim_matches('"');
            params.insert(key.trim().to_ascii_lowercase(), value.to_string());
        }
    }
    Some(params)
}

/// Split on commas that are outside quoted values.
fn split_challenge_params(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                if !current.trim().is_empty() {
                    parts.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

fn hex_hash(algorithm: DigestAlgorithm, input: &str) -> String {
    match algorithm {
        DigestAlgorithm::Md5 => to_hex(&Md5::digest(input.as_bytes())),
        DigestAlgorithm::Sha256 => to_hex(&Sha256::digest(input.as_bytes())),
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
