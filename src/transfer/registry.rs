//! Offer registry: the shared table of in-flight transfers.
//!
//! Each offered file gets a unique port from the ephemeral range and a
//! six-digit access token. The registry owns allocation, token resolution,
//! and cleanup; it is the only place that deletes a staged file.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::Rng;

/// Ephemeral port range, chosen to avoid registered services.
const EPHEMERAL_PORT_START: u16 = 49152;
const EPHEMERAL_PORT_END: u16 = 65535;

/// Metadata for one pending or in-progress transfer.
#[derive(Debug, Clone)]
struct Offer {
    file_path: PathBuf,
    uploader_host: String,
}

/// Thread-safe table of offers keyed by transfer port.
///
/// Both maps support concurrent read/insert/remove; every operation is
/// scoped to a single port, so no cross-offer coordination exists.
#[derive(Default)]
pub struct OfferRegistry {
    offers: DashMap<u16, Offer>,
    tokens: DashMap<u16, String>,
}

fn generate_port() -> u16 {
    rand::rng().random_range(EPHEMERAL_PORT_START..=EPHEMERAL_PORT_END)
}

/// Six-digit numeric token shared out-of-band with the downloader.
/// Uniqueness is not formally guaranteed; only distinctness among live
/// offers matters, and the reverse lookup tolerates the theoretical tie.
fn generate_access_token() -> String {
    rand::rng().random_range(100_000..=999_999u32).to_string()
}

impl OfferRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers an offer and returns its transfer port.
    ///
    /// Generate-and-check: candidate ports are drawn until one inserts into
    /// a vacant slot. The entry API makes check-and-insert atomic, so two
    /// concurrent allocations can never claim the same port.
    pub fn allocate(&self, file_path: PathBuf, uploader_host: String) -> u16 {
        loop {
            let port = generate_port();
            match self.offers.entry(port) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    slot.insert(Offer {
                        file_path,
                        uploader_host,
                    });
                    self.tokens.insert(port, generate_access_token());
                    return port;
                }
            }
        }
    }

    pub fn is_occupied(&self, port: u16) -> bool {
        self.offers.contains_key(&port)
    }

    /// Exact-match token check for a specific port.
    pub fn validate_token(&self, port: u16, token: &str) -> bool {
        self.tokens
            .get(&port)
            .map(|stored| *stored == token)
            .unwrap_or(false)
    }

    pub fn token_of(&self, port: u16) -> Option<String> {
        self.tokens.get(&port).map(|t| t.clone())
    }

    /// Reverse lookup used by the download path. Any match wins on ties.
    pub fn resolve_token(&self, token: &str) -> Option<u16> {
        self.tokens
            .iter()
            .find(|entry| entry.value() == token)
            .map(|entry| *entry.key())
    }

    pub fn host_of(&self, port: u16) -> Option<String> {
        self.offers.get(&port).map(|o| o.uploader_host.clone())
    }

    pub fn path_of(&self, port: u16) -> Option<PathBuf> {
        self.offers.get(&port).map(|o| o.file_path.clone())
    }

    /// Removes the offer for `port`, deleting its staged file if present.
    ///
    /// Idempotent: cleaning an absent or already-cleaned port is a no-op.
    pub fn cleanup(&self, port: u16) {
        let Some((_, offer)) = self.offers.remove(&port) else {
            return;
        };

        match std::fs::remove_file(&offer.file_path) {
            Ok(()) => {
                tracing::info!(path = %offer.file_path.display(), "deleted staged file after download");
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(
                    path = %offer.file_path.display(),
                    error = %err,
                    "failed to delete staged file"
                );
            }
        }

        self.tokens.remove(&port);
        tracing::info!(port, "cleaned up offer and token");
    }
}
