//! Artwork sources.
//!
//! # Architecture
//!
//! ```text
//! resolver.rs   - which sources to try, in what order (pure)
//! traits.rs     - collaborator traits the engine depends on, plus mocks
//! local.rs      - on-device files and sidecar artwork
//! http.rs       - coalescing HTTP downloads
//! lastfm/       - Last.fm metadata API (client, DTOs, adapter)
//! domain.rs     - OUR types; API responses are converted into these
//! ```

mod domain;
mod http;
pub mod lastfm;
mod local;
mod resolver;
pub mod traits;

pub use domain::{ArtworkInfo, ImageCandidate, ImageSize, NetworkState, Source, SourceError};
pub use http::HttpClient;
pub use lastfm::LastFmClient;
pub use local::FileMediaSource;
pub use resolver::SourceResolver;
pub use traits::{Connectivity, HttpFetch, LocalMedia, MetadataLookup, PreferenceSource};
