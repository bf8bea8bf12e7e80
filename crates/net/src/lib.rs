//! Network plumbing for the world asset pipeline.
//!
//! Every outbound call goes through a [`Resolver`], which tries a fixed,
//! ordered list of [`NetworkPath`]s (direct first, then relay services) and
//! returns the first response the caller's [`AcceptPolicy`] accepts. The
//! [`AssetFetcher`] layers per-path content sanity checks on top of it.

pub mod fetcher;
pub mod resolver;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;

pub use fetcher::{
    AssetFetcher, AssetOrigin, FetchConfig, FetchError, FetchedAsset, decode_data_url,
};
pub use resolver::{
    AcceptPolicy, NetworkFailure, NetworkPath, PathAttempt, PathOutcome, Rejection, Resolver,
    ResolverConfig,
};
pub use transport::{
    HttpResponse, HttpTransport, LogicalRequest, Method, ReqwestTransport, TransportError,
    is_markup_content_type, looks_like_markup,
};
