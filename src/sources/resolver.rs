//! Source selection policy.
//!
//! Decides which sources to try, and in what order, for an identity:
//! - explicit URIs are trusted over API lookups
//! - local media beats the network unless the user prefers downloads
//! - Wi-Fi-only gating applies to discretionary downloads, not to following
//!   a known remote URI
//!
//! The resolver is pure: no I/O, same inputs always give the same plan.

use crate::artwork::{ArtIdentity, ArtSubject, is_local_uri};
use crate::config::ArtworkPreferences;

use super::domain::{NetworkState, Source};

/// Pure decision function over identity, connectivity and preferences.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceResolver;

impl SourceResolver {
    pub fn new() -> Self {
        Self
    }

    /// Ordered list of sources to try. Empty means give up for this pass.
    pub fn decide(
        &self,
        identity: &ArtIdentity,
        network: NetworkState,
        prefs: &ArtworkPreferences,
    ) -> Vec<Source> {
        if !identity.is_valid() {
            return Vec::new();
        }

        let online = network.online(prefs.only_on_wifi);

        if identity.subject() == ArtSubject::Artist {
            return if online && prefs.download_missing_artist_images {
                vec![Source::MetadataApi]
            } else {
                Vec::new()
            };
        }

        let local = identity.artwork_uri().map(is_local_uri);

        match (identity.has_artist_album(), local) {
            (true, Some(local)) => {
                let uri_source = if local {
                    Source::LocalMedia
                } else {
                    Source::DirectUrl
                };
                if online {
                    if prefs.download_missing_artwork {
                        if prefs.prefer_download_over_local {
                            vec![Source::MetadataApi, uri_source]
                        } else if local {
                            vec![Source::LocalMedia, Source::MetadataApi]
                        } else {
                            vec![Source::DirectUrl]
                        }
                    } else {
                        // Following a known URI is not a discretionary download
                        vec![uri_source]
                    }
                } else if local && !prefs.prefer_download_over_local {
                    vec![Source::LocalMedia]
                } else {
                    Vec::new()
                }
            }
            // No URI to fall back to
            (true, None) if online => vec![Source::MetadataApi],
            (true, None) => Vec::new(),
            (false, Some(true)) => vec![Source::LocalMedia],
            (false, Some(false)) if network.any() => vec![Source::DirectUrl],
            (false, _) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LOCAL: &str = "content://media/external/audio/albumart/42";
    const REMOTE: &str = "https://example.com/dn.jpg";

    fn prefs(want: bool, prefer: bool) -> ArtworkPreferences {
        ArtworkPreferences {
            only_on_wifi: false,
            download_missing_artwork: want,
            download_missing_artist_images: want,
            prefer_download_over_local: prefer,
            want_low_resolution_art: false,
        }
    }

    fn album() -> ArtIdentity {
        ArtIdentity::album("Low", "Double Negative")
    }

    fn decide(identity: &ArtIdentity, network: NetworkState, prefs: &ArtworkPreferences) -> Vec<Source> {
        SourceResolver::new().decide(identity, network, prefs)
    }

    #[test]
    fn test_local_first_then_api() {
        let plan = decide(&album().with_uri(LOCAL), NetworkState::WIFI, &prefs(true, false));
        assert_eq!(plan, vec![Source::LocalMedia, Source::MetadataApi]);
    }

    #[test]
    fn test_remote_uri_goes_direct_without_api() {
        let plan = decide(&album().with_uri(REMOTE), NetworkState::WIFI, &prefs(true, false));
        assert_eq!(plan, vec![Source::DirectUrl]);
    }

    #[test]
    fn test_prefer_download_tries_api_first() {
        let local = decide(&album().with_uri(LOCAL), NetworkState::WIFI, &prefs(true, true));
        assert_eq!(local, vec![Source::MetadataApi, Source::LocalMedia]);

        let remote = decide(&album().with_uri(REMOTE), NetworkState::WIFI, &prefs(true, true));
        assert_eq!(remote, vec![Source::MetadataApi, Source::DirectUrl]);
    }

    #[test]
    fn test_remote_uri_followed_without_download_permission() {
        for prefer in [false, true] {
            let plan = decide(&album().with_uri(REMOTE), NetworkState::WIFI, &prefs(false, prefer));
            assert_eq!(plan, vec![Source::DirectUrl]);
        }
    }

    #[test]
    fn test_local_uri_without_download_permission() {
        let plan = decide(&album().with_uri(LOCAL), NetworkState::WIFI, &prefs(false, false));
        assert_eq!(plan, vec![Source::LocalMedia]);
    }

    #[test]
    fn test_offline_local_only() {
        for want in [false, true] {
            let plan = decide(&album().with_uri(LOCAL), NetworkState::OFFLINE, &prefs(want, false));
            assert_eq!(plan, vec![Source::LocalMedia]);
        }
    }

    #[test]
    fn test_offline_otherwise_gives_up() {
        let remote = decide(&album().with_uri(REMOTE), NetworkState::OFFLINE, &prefs(true, false));
        assert!(remote.is_empty());

        let prefer = decide(&album().with_uri(LOCAL), NetworkState::OFFLINE, &prefs(true, true));
        assert!(prefer.is_empty());
    }

    #[test]
    fn test_names_only_online_uses_api() {
        for want in [false, true] {
            let plan = decide(&album(), NetworkState::WIFI, &prefs(want, false));
            assert_eq!(plan, vec![Source::MetadataApi]);
        }
    }

    #[test]
    fn test_names_only_offline_gives_up() {
        assert!(decide(&album(), NetworkState::OFFLINE, &prefs(true, false)).is_empty());
    }

    #[test]
    fn test_uri_only_local() {
        for network in [NetworkState::WIFI, NetworkState::OFFLINE] {
            let plan = decide(&ArtIdentity::from_uri(LOCAL), network, &prefs(true, false));
            assert_eq!(plan, vec![Source::LocalMedia]);
        }
    }

    #[test]
    fn test_uri_only_remote_ignores_wifi_only() {
        let mut wifi_only = prefs(true, false);
        wifi_only.only_on_wifi = true;
        let plan = decide(&ArtIdentity::from_uri(REMOTE), NetworkState::CELLULAR, &wifi_only);
        assert_eq!(plan, vec![Source::DirectUrl]);
    }

    #[test]
    fn test_uri_only_remote_offline_gives_up() {
        let plan = decide(&ArtIdentity::from_uri(REMOTE), NetworkState::OFFLINE, &prefs(true, false));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_insufficient_identity_gives_up() {
        let empty = ArtIdentity::new(ArtSubject::Album, None, Some("Double Negative".into()), None);
        assert!(decide(&empty, NetworkState::WIFI, &prefs(true, false)).is_empty());
    }

    #[test]
    fn test_wifi_only_blocks_cellular_api_lookups() {
        let mut wifi_only = prefs(true, false);
        wifi_only.only_on_wifi = true;
        assert!(decide(&album(), NetworkState::CELLULAR, &wifi_only).is_empty());
        assert_eq!(
            decide(&album(), NetworkState::WIFI, &wifi_only),
            vec![Source::MetadataApi]
        );
    }

    #[test]
    fn test_artist_uses_api_only() {
        let artist = ArtIdentity::artist("Low").with_uri(LOCAL);
        assert_eq!(
            decide(&artist, NetworkState::WIFI, &prefs(true, false)),
            vec![Source::MetadataApi]
        );
        assert!(decide(&artist, NetworkState::WIFI, &prefs(false, false)).is_empty());
        assert!(decide(&artist, NetworkState::OFFLINE, &prefs(true, false)).is_empty());
    }

    #[test]
    fn test_scenario_low_double_negative() {
        let prefs = ArtworkPreferences {
            only_on_wifi: false,
            download_missing_artwork: true,
            prefer_download_over_local: false,
            ..Default::default()
        };
        let plan = decide(&album(), NetworkState::CELLULAR, &prefs);
        assert_eq!(plan, vec![Source::MetadataApi]);
    }

    fn network() -> impl Strategy<Value = NetworkState> {
        prop_oneof![
            Just(NetworkState::WIFI),
            Just(NetworkState::CELLULAR),
            Just(NetworkState::OFFLINE),
        ]
    }

    fn preferences() -> impl Strategy<Value = ArtworkPreferences> {
        any::<[bool; 5]>().prop_map(|[wifi, want, artist, prefer, low]| ArtworkPreferences {
            only_on_wifi: wifi,
            download_missing_artwork: want,
            download_missing_artist_images: artist,
            prefer_download_over_local: prefer,
            want_low_resolution_art: low,
        })
    }

    fn identity() -> impl Strategy<Value = ArtIdentity> {
        let name = prop_oneof![Just(None), Just(Some(String::new())), Just(Some("Low".to_string()))];
        let uri = prop_oneof![
            Just(None),
            Just(Some(LOCAL.to_string())),
            Just(Some(REMOTE.to_string())),
        ];
        (any::<bool>(), name.clone(), name, uri).prop_map(|(artist_only, artist, album, uri)| {
            let subject = if artist_only { ArtSubject::Artist } else { ArtSubject::Album };
            ArtIdentity::new(subject, artist, album, uri)
        })
    }

    proptest! {
        #[test]
        fn prop_plan_never_repeats_a_source(id in identity(), net in network(), p in preferences()) {
            let plan = decide(&id, net, &p);
            for (i, source) in plan.iter().enumerate() {
                prop_assert!(!plan[i + 1..].contains(source));
            }
        }

        #[test]
        fn prop_offline_plan_stays_local(id in identity(), p in preferences()) {
            let plan = decide(&id, NetworkState::OFFLINE, &p);
            prop_assert!(plan.iter().all(|s| *s == Source::LocalMedia));
        }

        #[test]
        fn prop_invalid_identity_gets_empty_plan(id in identity(), net in network(), p in preferences()) {
            if !id.is_valid() {
                prop_assert!(decide(&id, net, &p).is_empty());
            }
        }
    }
}
