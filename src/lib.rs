//! Artwork Minder - artwork acquisition and caching for a music player.
//!
//! Callers ask an [`engine::ArtworkManager`] for album or artist artwork at
//! thumbnail or full resolution. Requests for the same image are coalesced,
//! served from a two-tier cache when possible, and otherwise fetched from
//! local media, a direct URL, or a metadata API lookup, in an order chosen
//! from connectivity and user preferences.

pub mod artwork;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod sources;
#[cfg(test)]
pub mod test_utils;
