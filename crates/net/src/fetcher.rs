//! Binary asset download with per-path content sanity checks.
//!
//! A response is only accepted when it is 2xx, larger than the configured
//! minimum, and not declared as a markup page. Relays in particular like to
//! answer `200 OK` with an HTML interstitial; such a response fails its path
//! and the next path is tried. `data:` URLs never touch the network.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::resolver::{AcceptPolicy, NetworkFailure, Rejection, Resolver};
use crate::transport::{HttpResponse, LogicalRequest};

/// Sanity thresholds for fetched payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// A payload must be strictly larger than this many bytes.
    pub min_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { min_bytes: 2000 }
    }
}

/// Where a fetched asset came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOrigin {
    /// Decoded from an inline `data:` URL.
    Inline,
    /// Downloaded over the network.
    Network,
}

/// A downloaded (or decoded) asset payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedAsset {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub origin: AssetOrigin,
}

/// Errors from [`AssetFetcher::fetch_asset`].
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Every path answered, and every answer failed the content check.
    #[error("asset failed validation on every path: {0}")]
    Validation(NetworkFailure),

    #[error(transparent)]
    Network(NetworkFailure),

    #[error("invalid inline data: {0}")]
    InlineData(String),
}

/// Fetches binary assets through a [`Resolver`].
#[derive(Debug, Clone)]
pub struct AssetFetcher {
    resolver: Resolver,
    config: FetchConfig,
}

impl AssetFetcher {
    pub fn new(resolver: Resolver, config: FetchConfig) -> Self {
        Self { resolver, config }
    }

    /// Fetches `url`, or decodes it locally when it is a `data:` URL.
    pub async fn fetch_asset(&self, url: &str) -> Result<FetchedAsset, FetchError> {
        if url.starts_with("data:") {
            let (content_type, bytes) = decode_data_url(url).map_err(FetchError::InlineData)?;
            debug!(bytes = bytes.len(), "decoded inline asset");
            return Ok(FetchedAsset {
                bytes,
                content_type,
                origin: AssetOrigin::Inline,
            });
        }

        let min = self.config.min_bytes;
        let check = move |resp: &HttpResponse| sanity_check(resp, min);
        let request = LogicalRequest::get(url);

        match self
            .resolver
            .resolve(&request, AcceptPolicy::Custom(&check))
            .await
        {
            Ok(resp) => {
                info!(url = %url, bytes = resp.body.len(), "asset fetched");
                Ok(FetchedAsset {
                    bytes: resp.body,
                    content_type: resp.content_type,
                    origin: AssetOrigin::Network,
                })
            }
            Err(failure) if failure.all_content_rejections() => {
                Err(FetchError::Validation(failure))
            }
            Err(failure) => Err(FetchError::Network(failure)),
        }
    }
}

fn sanity_check(resp: &HttpResponse, min_bytes: usize) -> Result<(), Rejection> {
    if !resp.is_success() {
        return Err(Rejection::Status);
    }
    if resp.is_markup() {
        return Err(Rejection::Markup);
    }
    if resp.body.len() <= min_bytes {
        return Err(Rejection::TooSmall {
            len: resp.body.len(),
            min: min_bytes,
        });
    }
    Ok(())
}

/// Decodes a `data:[<mime>][;base64],<payload>` URL.
///
/// Returns the declared mime type (if any) and the payload bytes.
pub fn decode_data_url(url: &str) -> Result<(Option<String>, Vec<u8>), String> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| "missing data: scheme".to_string())?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| "missing ',' separator".to_string())?;

    let (mime, is_base64) = match meta.strip_suffix(";base64") {
        Some(mime) => (mime, true),
        None => (meta, false),
    };
    let content_type = (!mime.is_empty()).then(|| mime.to_string());

    let bytes = if is_base64 {
        BASE64
            .decode(payload.trim())
            .map_err(|e| format!("base64 decode failed: {e}"))?
    } else {
        percent_decode_str(payload).collect()
    };

    Ok((content_type, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{NetworkPath, ResolverConfig};
    use crate::testing::ScriptedTransport;
    use crate::transport::TransportError;
    use std::sync::Arc;

    const RELAY_A: &str = "https://relay-a.test/?";
    const RELAY_B: &str = "https://relay-b.test/raw?url=";

    fn fetcher(transport: &Arc<ScriptedTransport>) -> AssetFetcher {
        let config = ResolverConfig {
            paths: vec![
                NetworkPath::Direct,
                NetworkPath::relay(RELAY_A),
                NetworkPath::relay(RELAY_B),
            ],
        };
        AssetFetcher::new(
            Resolver::new(transport.clone(), &config),
            FetchConfig::default(),
        )
    }

    fn binary(len: usize) -> HttpResponse {
        HttpResponse::new(200, Some("application/octet-stream"), vec![7u8; len])
    }

    #[tokio::test]
    async fn direct_binary_is_accepted() {
        let transport = ScriptedTransport::new(|_| Ok(binary(5000)));
        let asset = fetcher(&transport)
            .fetch_asset("https://cdn.test/world.spz")
            .await
            .unwrap();

        assert_eq!(asset.bytes.len(), 5000);
        assert_eq!(asset.origin, AssetOrigin::Network);
        assert_eq!(transport.urls().len(), 1);
    }

    #[tokio::test]
    async fn html_200_on_direct_moves_to_next_relay() {
        let transport = ScriptedTransport::new(|req| {
            if req.url.starts_with(RELAY_A) {
                Ok(binary(8000))
            } else {
                Ok(HttpResponse::new(200, Some("text/html"), vec![b'<'; 50_000]))
            }
        });
        let asset = fetcher(&transport)
            .fetch_asset("https://cdn.test/world.spz")
            .await
            .unwrap();

        assert_eq!(asset.bytes.len(), 8000);
        let urls = transport.urls();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0], "https://cdn.test/world.spz");
        assert!(urls[1].starts_with(RELAY_A));
    }

    #[tokio::test]
    async fn undersized_payload_is_rejected_on_every_path() {
        let transport = ScriptedTransport::new(|_| Ok(binary(2000)));
        let err = fetcher(&transport)
            .fetch_asset("https://cdn.test/world.spz")
            .await
            .unwrap_err();

        assert_eq!(transport.urls().len(), 3);
        match err {
            FetchError::Validation(failure) => {
                assert_eq!(failure.attempts.len(), 3);
                assert_eq!(failure.last_status(), Some(200));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn markup_everywhere_is_validation_failure() {
        let transport = ScriptedTransport::new(|_| {
            Ok(HttpResponse::new(200, Some("text/html"), vec![0u8; 9000]))
        });
        let err = fetcher(&transport)
            .fetch_asset("https://cdn.test/pano.png")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Validation(_)));
    }

    #[tokio::test]
    async fn mixed_failures_are_network_failure() {
        let transport = ScriptedTransport::new(|req| {
            if req.url.starts_with(RELAY_B) {
                Err(TransportError::Other("dns".into()))
            } else if req.url.starts_with(RELAY_A) {
                Ok(HttpResponse::json(500, "{}"))
            } else {
                Ok(binary(10))
            }
        });
        let err = fetcher(&transport)
            .fetch_asset("https://cdn.test/world.spz")
            .await
            .unwrap_err();

        match err {
            FetchError::Network(failure) => {
                assert_eq!(failure.attempts.len(), 3);
                assert_eq!(failure.last_error(), Some("transport error: dns"));
            }
            other => panic!("expected network failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn data_url_bypasses_network() {
        let transport = ScriptedTransport::new(|_| Ok(binary(5000)));
        let asset = fetcher(&transport)
            .fetch_asset("data:image/png;base64,aGVsbG8=")
            .await
            .unwrap();

        assert_eq!(asset.bytes, b"hello");
        assert_eq!(asset.content_type.as_deref(), Some("image/png"));
        assert_eq!(asset.origin, AssetOrigin::Inline);
        assert!(transport.urls().is_empty());
    }

    #[tokio::test]
    async fn malformed_data_url_is_inline_error() {
        let transport = ScriptedTransport::new(|_| Ok(binary(5000)));
        let err = fetcher(&transport)
            .fetch_asset("data:image/png;base64,@@@")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InlineData(_)));
        assert!(transport.urls().is_empty());
    }

    #[test]
    fn decode_data_url_variants() {
        let (ct, bytes) = decode_data_url("data:,hello%20world").unwrap();
        assert_eq!(ct, None);
        assert_eq!(bytes, b"hello world");

        let (ct, bytes) = decode_data_url("data:text/plain;base64,aGk=").unwrap();
        assert_eq!(ct.as_deref(), Some("text/plain"));
        assert_eq!(bytes, b"hi");

        assert!(decode_data_url("data:image/png;base64").is_err());
        assert!(decode_data_url("https://x.test").is_err());
    }
}
