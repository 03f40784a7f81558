//! Last.fm API integration
//!
//! Looks up album and artist info, which carries a list of image URLs in
//! several sizes. Requires an API key (`[credentials] lastfm_api_key`).
//!
//! API docs: https://www.last.fm/api

mod adapter;
mod client;
pub mod dto;

pub use adapter::{album_to_info, artist_to_info};
pub use client::LastFmClient;
