//! Artwork identities and cache keys.

use std::borrow::Cow;
use std::fmt;

use crate::error::{Error, Result};

/// URI schemes that point at on-device media rather than the network.
const LOCAL_SCHEMES: &[&str] = &["content", "file", "android.resource"];

/// Separates the components of a cache key.
const KEY_SEPARATOR: char = '\u{1f}';

/// Resolution class of a cached image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtworkKind {
    /// Small, numerous images for lists and grids
    Thumbnail,
    /// Large images for now-playing and detail views
    Full,
}

impl ArtworkKind {
    /// Both kinds, thumbnail first.
    pub const ALL: [ArtworkKind; 2] = [ArtworkKind::Thumbnail, ArtworkKind::Full];

    /// The other kind.
    pub fn opposite(self) -> Self {
        match self {
            Self::Thumbnail => Self::Full,
            Self::Full => Self::Thumbnail,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Thumbnail => "thumbnail",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for ArtworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the artwork depicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArtSubject {
    /// Album cover
    #[default]
    Album,
    /// Artist image
    Artist,
}

/// Identifies an artwork subject.
///
/// Immutable once constructed. Empty or whitespace-only fields are stored as
/// absent, so `Some("")` never reaches the cache or the network.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtIdentity {
    subject: ArtSubject,
    artist_name: Option<String>,
    album_name: Option<String>,
    artwork_uri: Option<String>,
}

impl ArtIdentity {
    /// Build an identity from raw, possibly empty fields.
    pub fn new(
        subject: ArtSubject,
        artist_name: Option<String>,
        album_name: Option<String>,
        artwork_uri: Option<String>,
    ) -> Self {
        Self {
            subject,
            artist_name: non_empty(artist_name),
            album_name: non_empty(album_name),
            artwork_uri: non_empty(artwork_uri),
        }
    }

    /// Album cover identified by artist and album name.
    pub fn album(artist: impl Into<String>, album: impl Into<String>) -> Self {
        Self::new(
            ArtSubject::Album,
            Some(artist.into()),
            Some(album.into()),
            None,
        )
    }

    /// Artist image identified by artist name.
    pub fn artist(name: impl Into<String>) -> Self {
        Self::new(ArtSubject::Artist, Some(name.into()), None, None)
    }

    /// Album cover known only by its URI.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self::new(ArtSubject::Album, None, None, Some(uri.into()))
    }

    /// Copy of this identity with an artwork URI attached.
    pub fn with_uri(&self, uri: impl Into<String>) -> Self {
        Self::new(
            self.subject,
            self.artist_name.clone(),
            self.album_name.clone(),
            Some(uri.into()),
        )
    }

    pub fn subject(&self) -> ArtSubject {
        self.subject
    }

    pub fn artist_name(&self) -> Option<&str> {
        self.artist_name.as_deref()
    }

    pub fn album_name(&self) -> Option<&str> {
        self.album_name.as_deref()
    }

    pub fn artwork_uri(&self) -> Option<&str> {
        self.artwork_uri.as_deref()
    }

    /// Both artist and album name are present.
    pub fn has_artist_album(&self) -> bool {
        self.artist_name.is_some() && self.album_name.is_some()
    }

    pub fn has_uri(&self) -> bool {
        self.artwork_uri.is_some()
    }

    /// Check the identity has enough fields for its subject.
    pub fn validate(&self) -> Result<()> {
        let usable = match self.subject {
            ArtSubject::Album => self.has_artist_album() || self.has_uri(),
            ArtSubject::Artist => self.artist_name.is_some(),
        };
        if usable {
            Ok(())
        } else {
            Err(Error::invalid_identity(format!(
                "{:?} identity needs {}",
                self.subject,
                match self.subject {
                    ArtSubject::Album => "artist and album names or an artwork uri",
                    ArtSubject::Artist => "an artist name",
                }
            )))
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl fmt::Display for ArtIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.subject, &self.artist_name, &self.album_name, &self.artwork_uri) {
            (ArtSubject::Artist, Some(artist), _, _) => write!(f, "artist {artist}"),
            (_, Some(artist), Some(album), _) => write!(f, "{artist} - {album}"),
            (_, _, _, Some(uri)) => f.write_str(uri),
            _ => f.write_str("<empty identity>"),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// True if the URI points at on-device media.
///
/// Bare paths (no scheme) count as local; `http`/`https` and any other
/// scheme with an authority count as remote.
pub fn is_local_uri(uri: &str) -> bool {
    match uri.split_once("://") {
        Some((scheme, _)) => LOCAL_SCHEMES
            .iter()
            .any(|local| scheme.eq_ignore_ascii_case(local)),
        None => {
            let lower = uri.to_ascii_lowercase();
            !(lower.starts_with("http:") || lower.starts_with("https:"))
        }
    }
}

/// Cache and coalescing key for an (identity, kind) pair.
///
/// The artist/album pair wins over the URI when both are present, since the
/// names stay stable while artwork URIs may change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: ArtworkKind,
    value: String,
}

impl CacheKey {
    /// Derive the key, rejecting invalid identities.
    pub fn new(identity: &ArtIdentity, kind: ArtworkKind) -> Result<Self> {
        identity.validate()?;

        let sep = KEY_SEPARATOR;
        let value = match (
            identity.subject(),
            identity.artist_name().map(escape_component),
            identity.album_name().map(escape_component),
            identity.artwork_uri().map(escape_component),
        ) {
            (ArtSubject::Artist, Some(artist), _, _) => format!("{kind}{sep}{artist}{sep}"),
            (ArtSubject::Album, Some(artist), Some(album), _) => {
                format!("{kind}{sep}{artist}{sep}{album}")
            }
            (_, _, _, Some(uri)) => format!("{kind}{sep}{uri}"),
            _ => return Err(Error::invalid_identity(identity.to_string())),
        };

        Ok(Self { kind, value })
    }

    pub fn kind(&self) -> ArtworkKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

/// Escape the separator (and the escape character) inside one key
/// component, so distinct field splits never produce the same key.
fn escape_component(field: &str) -> Cow<'_, str> {
    if !field.contains(['\\', KEY_SEPARATOR]) {
        return Cow::Borrowed(field);
    }
    let mut escaped = String::with_capacity(field.len() + 4);
    for c in field.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            KEY_SEPARATOR => escaped.push_str("\\x1f"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let readable = self.value.replace(KEY_SEPARATOR, "/");
        f.write_str(readable.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fields_are_absent() {
        let identity = ArtIdentity::new(
            ArtSubject::Album,
            Some("Low".to_string()),
            Some("  ".to_string()),
            Some(String::new()),
        );
        assert!(!identity.has_artist_album());
        assert!(!identity.has_uri());
        assert!(!identity.is_valid());
    }

    #[test]
    fn test_validation_rules() {
        assert!(ArtIdentity::album("Low", "Double Negative").is_valid());
        assert!(ArtIdentity::from_uri("content://media/external/audio/albumart/7").is_valid());
        assert!(ArtIdentity::artist("Low").is_valid());
        assert!(!ArtIdentity::new(ArtSubject::Album, None, None, None).is_valid());
        assert!(!ArtIdentity::new(ArtSubject::Artist, None, Some("x".into()), None).is_valid());
    }

    #[test]
    fn test_key_prefers_artist_album_over_uri() {
        let plain = ArtIdentity::album("Low", "Double Negative");
        let with_uri = plain.with_uri("https://example.com/dn.jpg");

        let a = CacheKey::new(&plain, ArtworkKind::Thumbnail).unwrap();
        let b = CacheKey::new(&with_uri, ArtworkKind::Thumbnail).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_depends_on_kind() {
        let identity = ArtIdentity::album("Low", "Double Negative");
        let thumb = CacheKey::new(&identity, ArtworkKind::Thumbnail).unwrap();
        let full = CacheKey::new(&identity, ArtworkKind::Full).unwrap();
        assert_ne!(thumb, full);
        assert_eq!(thumb.kind(), ArtworkKind::Thumbnail);
        assert_eq!(full.kind(), ArtworkKind::Full);
    }

    #[test]
    fn test_key_uses_uri_without_names() {
        let identity = ArtIdentity::from_uri("https://example.com/a.jpg");
        let key = CacheKey::new(&identity, ArtworkKind::Full).unwrap();
        assert_eq!(key.to_string(), "full/https://example.com/a.jpg");
    }

    #[test]
    fn test_artist_and_album_keys_do_not_collide() {
        let artist = CacheKey::new(&ArtIdentity::artist("Low"), ArtworkKind::Full).unwrap();
        let uri = CacheKey::new(&ArtIdentity::from_uri("Low"), ArtworkKind::Full).unwrap();
        assert_ne!(artist, uri);
    }

    #[test]
    fn test_separator_in_names_does_not_collide() {
        let a = ArtIdentity::album("A\u{1f}B", "C");
        let b = ArtIdentity::album("A", "B\u{1f}C");
        assert_ne!(
            CacheKey::new(&a, ArtworkKind::Full).unwrap(),
            CacheKey::new(&b, ArtworkKind::Full).unwrap()
        );

        let uri = ArtIdentity::from_uri("Low\u{1f}Double Negative");
        assert_ne!(
            CacheKey::new(&uri, ArtworkKind::Full).unwrap(),
            CacheKey::new(&ArtIdentity::album("Low", "Double Negative"), ArtworkKind::Full).unwrap()
        );
    }

    #[test]
    fn test_escaping_is_unambiguous() {
        let escaped = ArtIdentity::album("A\\x1f", "B");
        let raw = ArtIdentity::album("A\u{1f}", "B");
        assert_ne!(
            CacheKey::new(&escaped, ArtworkKind::Full).unwrap(),
            CacheKey::new(&raw, ArtworkKind::Full).unwrap()
        );
        // Plain names are unchanged
        assert_eq!(escape_component("Double Negative"), "Double Negative");
    }

    #[test]
    fn test_invalid_identity_has_no_key() {
        let identity = ArtIdentity::new(ArtSubject::Album, Some("Low".into()), None, None);
        let err = CacheKey::new(&identity, ArtworkKind::Full).unwrap_err();
        assert!(matches!(err, Error::InvalidIdentity(_)));
    }

    #[test]
    fn test_local_uri_detection() {
        assert!(is_local_uri("content://media/external/audio/albumart/12"));
        assert!(is_local_uri("file:///music/cover.jpg"));
        assert!(is_local_uri("/music/Low/Double Negative/cover.jpg"));
        assert!(is_local_uri("ANDROID.RESOURCE://pkg/drawable/x"));
        assert!(!is_local_uri("https://lastfm.freetls.fastly.net/i/u/300x300/a.png"));
        assert!(!is_local_uri("http://example.com/a.jpg"));
    }

    #[test]
    fn test_kind_opposite() {
        assert_eq!(ArtworkKind::Thumbnail.opposite(), ArtworkKind::Full);
        assert_eq!(ArtworkKind::Full.opposite(), ArtworkKind::Thumbnail);
    }
}
