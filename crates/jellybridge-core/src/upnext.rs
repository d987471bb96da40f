//! Next-episode planning
//!
//! Once an episode is far enough in, the tracker asks the server for the
//! episodes adjacent to it and hands the following one to the Up Next
//! overlay, together with the outro time from the EDL when there is one.

use crate::edl::get_outro;
use crate::error::Result;
use crate::session::Session;
use crate::types::*;
use tracing::{debug, info, warn};
use url::Url;

/// Command the overlay uses to start the next episode
pub const PLAY_NOW: &str = "PlayNow";

/// Image URL for an item's artwork of `image_type`
pub fn artwork_url(server: &Url, item_id: &str, image_type: &str, index: usize, tag: &str) -> Option<String> {
    let mut url = server
        .join(&format!("Items/{}/Images/{}/{}", item_id, image_type, index))
        .ok()?;
    url.query_pairs_mut()
        .append_pair("format", "original")
        .append_pair("Tag", tag);
    Some(url.to_string())
}

/// Series poster, backdrop and thumbnail of an episode
pub fn episode_art(server: &Url, item: &RemoteItem) -> UpNextArt {
    let tvshow_poster = match (&item.series_id, &item.series_primary_image_tag) {
        (Some(series_id), Some(tag)) => artwork_url(server, series_id, "Primary", 0, tag),
        _ => None,
    };

    let tvshow_fanart = match item.backdrop_image_tags.first() {
        Some(tag) => artwork_url(server, &item.id, "Backdrop", 0, tag),
        None => match (&item.parent_backdrop_item_id, item.parent_backdrop_image_tags.first()) {
            (Some(parent), Some(tag)) => artwork_url(server, parent, "Backdrop", 0, tag),
            _ => None,
        },
    };

    let thumb = item
        .image_tags
        .get("Primary")
        .and_then(|tag| artwork_url(server, &item.id, "Primary", 0, tag));

    UpNextArt {
        tvshow_poster,
        tvshow_fanart,
        thumb,
    }
}

/// Map a server episode to the overlay's episode format
pub fn map_episode(server: &Url, item: &RemoteItem) -> UpNextEpisode {
    UpNextEpisode {
        episodeid: item.id.clone(),
        tvshowid: item.series_id.clone().unwrap_or_default(),
        title: item.name.clone(),
        art: episode_art(server, item),
        season: item.parent_index_number,
        episode: item.index_number,
        showtitle: item.series_name.clone(),
        plot: item.overview.clone(),
        playcount: item.user_data.as_ref().and_then(|u| u.play_count),
        rating: item.community_rating,
        firstaired: item.premiere_date.clone(),
        runtime: item.run_time_ticks.map(ticks_to_seconds),
    }
}

/// Episode following `item_id` in `episodes`, if any
pub fn next_after<'a>(episodes: &'a [RemoteItem], item_id: &str) -> Option<&'a RemoteItem> {
    let index = episodes.iter().position(|episode| episode.id == item_id)?;
    episodes.get(index + 1)
}

/// Build the Up Next payload for `session`.
///
/// Returns `Ok(None)` when the item is not an episode with show context, or
/// when it is the last episode. `total_time` is the host's duration in whole
/// seconds; without it no trigger time is attached.
pub async fn plan_next_episode(session: &Session, total_time: Option<i64>) -> Result<Option<UpNextInfo>> {
    let current = match session.current_episode() {
        Some(current) if session.item_type() == Some("Episode") => current,
        _ => {
            debug!(item_id = %session.item_id(), "Not an episode with show context");
            return Ok(None);
        }
    };

    let api = session.api();
    let adjacent = api
        .get_adjacent_episodes(&current.tvshowid, session.item_id())
        .await?;

    let next = match next_after(&adjacent.items, session.item_id()) {
        Some(next) => next,
        None => {
            warn!(item_id = %session.item_id(), "No next up episode.");
            return Ok(None);
        }
    };

    let next_episode = map_episode(api.server_address(), next);
    let notification_time = total_time
        .map(|total| get_outro(session.edl(), total))
        .filter(|outro| *outro > 0);

    let info = UpNextInfo {
        play_info: PlayInfo {
            item_ids: vec![next_episode.episodeid.clone()],
            server_id: session.server_id().map(str::to_string),
            play_command: PLAY_NOW.to_string(),
        },
        current_episode: current.clone(),
        next_episode,
        notification_time,
    };

    info!(
        item_id = %session.item_id(),
        next_id = %info.next_episode.episodeid,
        notification_time = ?info.notification_time,
        "Next up planned"
    );

    Ok(Some(info))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(id: &str) -> RemoteItem {
        RemoteItem {
            id: id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_next_after() {
        let episodes = vec![episode("a"), episode("b"), episode("c")];
        assert_eq!(next_after(&episodes, "a").unwrap().id, "b");
        assert!(next_after(&episodes, "c").is_none());
        assert!(next_after(&episodes, "z").is_none());
    }

    #[test]
    fn test_artwork() {
        let server = Url::parse("http://jf.local:8096/").unwrap();
        let mut item = episode("ep2");
        item.series_id = Some("show".into());
        item.series_primary_image_tag = Some("st".into());
        item.parent_backdrop_item_id = Some("show".into());
        item.parent_backdrop_image_tags = vec!["bt".into()];
        item.image_tags.insert("Primary".into(), "pt".into());

        let art = episode_art(&server, &item);
        assert_eq!(
            art.tvshow_poster.as_deref(),
            Some("http://jf.local:8096/Items/show/Images/Primary/0?format=original&Tag=st")
        );
        assert_eq!(
            art.tvshow_fanart.as_deref(),
            Some("http://jf.local:8096/Items/show/Images/Backdrop/0?format=original&Tag=bt")
        );
        assert!(art.thumb.unwrap().contains("/Items/ep2/Images/Primary/0"));
    }

    #[test]
    fn test_map_episode() {
        let server = Url::parse("http://jf.local:8096/").unwrap();
        let mut item = episode("ep2");
        item.name = Some("Second".into());
        item.series_id = Some("show".into());
        item.parent_index_number = Some(1);
        item.index_number = Some(2);
        item.run_time_ticks = Some(1_500 * TICKS_PER_SECOND);

        let mapped = map_episode(&server, &item);
        assert_eq!(mapped.episodeid, "ep2");
        assert_eq!(mapped.tvshowid, "show");
        assert_eq!(mapped.episode, Some(2));
        assert_eq!(mapped.runtime, Some(1_500));
        assert!(mapped.art.tvshow_fanart.is_none());
    }
}
