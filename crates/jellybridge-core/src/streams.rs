//! Audio/subtitle index reconciliation
//!
//! The host numbers subtitle tracks from 0 across its own list; the server
//! numbers every media stream (video, audio, subtitles) of the source.
//! `subs_mapping` covers the tracks whose host index is known in advance
//! (external subtitles); other tracks are located with an offset past the
//! mapped tracks and the audio streams.

use crate::host::PlayerHost;
use crate::types::{StreamProperties, SubsMapping};
use tracing::{debug, info, warn};

/// Remote stream indices derived from the host selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamSelection {
    pub audio_stream_index: Option<i32>,
    pub subtitle_stream_index: Option<i32>,
}

/// Remote subtitle index for a host subtitle index
pub fn remote_subtitle_index(mapping: &SubsMapping, host_index: i32, audio_tracks: usize) -> i32 {
    match mapping.get(&host_index) {
        Some(remote) => *remote,
        None => host_index - mapping.len() as i32 + audio_tracks as i32 + 1,
    }
}

/// Host subtitle index for a remote subtitle index.
///
/// When several host indices map to the same remote index, the lowest
/// host index wins.
pub fn host_subtitle_index(mapping: &SubsMapping, remote_index: i32, audio_tracks: usize) -> i32 {
    mapping
        .iter()
        .find(|(_, remote)| **remote == remote_index)
        .map(|(host, _)| *host)
        .unwrap_or_else(|| mapping.len() as i32 + remote_index - audio_tracks as i32 - 1)
}

/// Read the host's current streams and translate them to remote indices
pub fn detect(host: &dyn PlayerHost, mapping: &SubsMapping) -> StreamSelection {
    let props = host.stream_properties().unwrap_or_else(|e| {
        debug!(error = %e, "Stream properties unavailable");
        StreamProperties::default()
    });

    let audio = props.current_audio.unwrap_or(0);
    let subs = props.current_subtitle.unwrap_or(0);
    let subs_enabled = props.subtitle_enabled.unwrap_or(false);

    let mut selection = StreamSelection {
        audio_stream_index: Some(audio + 1),
        subtitle_stream_index: None,
    };

    if !subs_enabled || host.subtitle_stream_count() == 0 {
        return selection;
    }

    selection.subtitle_stream_index = Some(remote_subtitle_index(
        mapping,
        subs,
        host.audio_stream_count(),
    ));
    selection
}

/// Select the host streams matching the requested remote indices.
///
/// An audio index of 0 means "no request". A missing or -1 subtitle index
/// turns subtitles off.
pub fn apply(host: &dyn PlayerHost, mapping: &SubsMapping, audio: Option<i32>, subtitle: Option<i32>) {
    info!(audio = ?audio, subtitle = ?subtitle, "Setting audio and subtitles");

    let audio_tracks = host.audio_stream_count();

    if let Some(audio) = audio.filter(|a| *a != 0) {
        if audio_tracks > 1 {
            host.set_audio_stream(audio - 1);
        }
    }

    let subtitle = match subtitle {
        None | Some(-1) => {
            host.show_subtitles(false);
            return;
        }
        Some(index) => index,
    };

    let host_index = host_subtitle_index(mapping, subtitle, audio_tracks);
    if host_index < 0 {
        warn!(subtitle, host_index, "Subtitle index resolves before the first host track");
    }
    host.set_subtitle_stream(host_index);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(pairs: &[(i32, i32)]) -> SubsMapping {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_mapped_round_trip() {
        let map = mapping(&[(2, 5)]);
        assert_eq!(remote_subtitle_index(&map, 2, 2), 5);
        assert_eq!(host_subtitle_index(&map, 5, 2), 2);
    }

    #[test]
    fn test_unmapped_offsets() {
        let map = mapping(&[(0, 10), (1, 11)]);
        // host 3, two mapped, two audio: 3 - 2 + 2 + 1
        assert_eq!(remote_subtitle_index(&map, 3, 2), 4);
        // remote 7 not mapped: 2 + 7 - 2 - 1
        assert_eq!(host_subtitle_index(&map, 7, 2), 6);
    }

    #[test]
    fn test_empty_mapping_offsets() {
        let map = SubsMapping::new();
        assert_eq!(remote_subtitle_index(&map, 0, 1), 2);
        assert_eq!(host_subtitle_index(&map, 2, 1), 0);
    }

    #[test]
    fn test_offsets_invert_when_no_collision() {
        // Pins the current fallback formulas: detect then apply returns the
        // original host index unless the offset lands on a mapped value.
        for tracks in 0..4usize {
            for mapped in 0..3i32 {
                let map: SubsMapping = (0..mapped).map(|h| (h, 100 + h)).collect();
                for host in mapped..mapped + 5 {
                    let remote = remote_subtitle_index(&map, host, tracks);
                    assert_eq!(host_subtitle_index(&map, remote, tracks), host);
                }
            }
        }
    }

    #[test]
    fn test_offset_collision_prefers_mapping() {
        // Unmapped host 3 offsets to remote 4, which host 0 also maps to
        let map = mapping(&[(0, 4), (1, 9)]);
        let remote = remote_subtitle_index(&map, 3, 2);
        assert_eq!(remote, 4);
        assert_eq!(host_subtitle_index(&map, remote, 2), 0);
    }

    #[test]
    fn test_duplicate_remote_index_prefers_lowest_host() {
        let map: SubsMapping = serde_json::from_str(r#"{"3": 6, "1": 6}"#).unwrap();
        assert_eq!(host_subtitle_index(&map, 6, 1), 1);
    }
}
