//! Rotating client identity for portal requests.
//!
//! The portal rate-limits aggressively when every request presents the same
//! User-Agent. Each request therefore draws a fresh identity from a pool of
//! real browser header sets, shuffled once per process so runs do not all
//! open with the same one.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::seq::SliceRandom;

/// Real browser User-Agent strings, one per identity in the pool.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36 Edg/126.0.0.0",
];

/// Header set presented on one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub referer: String,
    pub connection: String,
}

/// Strategy seam for the fetcher, so tests can pin a fixed identity.
pub trait IdentityRotation: Send + Sync {
    fn next_identity(&self) -> ClientIdentity;
}

/// Round-robin pool over [`USER_AGENTS`].
pub struct UserAgentPool {
    agents: Vec<&'static str>,
    cursor: AtomicUsize,
}

impl UserAgentPool {
    pub fn new() -> Self {
        let mut agents = USER_AGENTS.to_vec();
        agents.shuffle(&mut rand::thread_rng());
        Self {
            agents,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl Default for UserAgentPool {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityRotation for UserAgentPool {
    fn next_identity(&self) -> ClientIdentity {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.agents.len();
        ClientIdentity {
            user_agent: self.agents[idx].to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                .to_string(),
            accept_language: "en-US,en;q=0.5".to_string(),
            referer: "https://www.google.com/".to_string(),
            connection: "keep-alive".to_string(),
        }
    }
}
