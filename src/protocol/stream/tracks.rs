//! Channel to track routing table.
//!
//! Every descriptor carries a fixed table of [`MAX_CHANNELS`] slots. Slot
//! `i` names the hardware track channel `i` reads from (TX) or writes to
//! (RX); [`TRACK_NULL`] leaves the channel unrouted. Slots beyond the
//! stream's channel count are transmitted but ignored by the hardware.

use super::types::{MAX_CHANNELS, MAX_TRACKS, TRACK_NULL};
use crate::error::RavennaError;

/// Fixed-size channel to track table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackMap {
    tracks: [i16; MAX_CHANNELS],
}

impl Default for TrackMap {
    fn default() -> Self {
        Self::unmapped()
    }
}

fn check_channel_count(channels: u16) -> Result<usize, RavennaError> {
    let n = usize::from(channels);
    if n > MAX_CHANNELS {
        return Err(RavennaError::out_of_range(
            "num_channels",
            channels,
            0,
            MAX_CHANNELS as u32,
        ));
    }
    Ok(n)
}

fn check_track(track: i16, max_tracks: u32) -> Result<i16, RavennaError> {
    if track < TRACK_NULL || i64::from(track) >= i64::from(max_tracks) {
        return Err(RavennaError::out_of_range(
            "track",
            track,
            TRACK_NULL,
            i64::from(max_tracks) - 1,
        ));
    }
    Ok(track)
}

impl TrackMap {
    /// Table with every slot unrouted.
    #[must_use]
    pub fn unmapped() -> Self {
        Self {
            tracks: [TRACK_NULL; MAX_CHANNELS],
        }
    }

    /// One-to-one routing: channel `i` to track `i` for the first `channels` slots.
    ///
    /// # Errors
    /// Returns [`RavennaError::ProtocolRange`] if `channels` exceeds [`MAX_CHANNELS`].
    pub fn identity(channels: u16) -> Result<Self, RavennaError> {
        let n = check_channel_count(channels)?;
        let mut map = Self::unmapped();
        for (i, slot) in map.tracks.iter_mut().take(n).enumerate() {
            *slot = i16::try_from(i).unwrap_or(TRACK_NULL);
        }
        Ok(map)
    }

    /// Routing from a comma separated track list.
    ///
    /// Entries are assigned to channels in order; entries beyond
    /// `channels` are ignored. Empty entries, unparseable entries and
    /// indices outside `[-1, max_tracks)` leave the channel unrouted, as
    /// do channels the list is too short to reach.
    ///
    /// # Errors
    /// Returns [`RavennaError::ProtocolRange`] if `channels` exceeds [`MAX_CHANNELS`].
    pub fn parse(list: &str, channels: u16, max_tracks: u32) -> Result<Self, RavennaError> {
        let n = check_channel_count(channels)?;
        let max_tracks = max_tracks.min(MAX_TRACKS);
        let mut map = Self::unmapped();

        for (slot, token) in map.tracks.iter_mut().take(n).zip(list.split(',')) {
            *slot = token
                .trim()
                .parse::<i16>()
                .ok()
                .and_then(|t| check_track(t, max_tracks).ok())
                .unwrap_or(TRACK_NULL);
        }

        Ok(map)
    }

    /// Apply the default routing policy: [`identity`](Self::identity)
    /// without a list, [`parse`](Self::parse) with one.
    ///
    /// # Errors
    /// Returns [`RavennaError::ProtocolRange`] if `channels` exceeds [`MAX_CHANNELS`].
    pub fn for_channels(
        list: Option<&str>,
        channels: u16,
        max_tracks: u32,
    ) -> Result<Self, RavennaError> {
        match list {
            None => Self::identity(channels),
            Some(list) => Self::parse(list, channels, max_tracks),
        }
    }

    /// Routing from explicit per-channel tracks; remaining slots stay unrouted.
    ///
    /// # Errors
    /// Returns [`RavennaError::ProtocolRange`] for more than [`MAX_CHANNELS`]
    /// entries or any track outside `[-1, max_tracks)`.
    pub fn from_tracks(tracks: &[i16], max_tracks: u32) -> Result<Self, RavennaError> {
        if tracks.len() > MAX_CHANNELS {
            return Err(RavennaError::out_of_range(
                "num_channels",
                u32::try_from(tracks.len()).unwrap_or(u32::MAX),
                0,
                MAX_CHANNELS as u32,
            ));
        }
        let mut map = Self::unmapped();
        for (slot, &track) in map.tracks.iter_mut().zip(tracks) {
            *slot = check_track(track, max_tracks)?;
        }
        Ok(map)
    }

    /// Route `channel` to `track`.
    ///
    /// # Errors
    /// Returns [`RavennaError::ProtocolRange`] for a channel outside the
    /// table or a track outside `[-1, max_tracks)`.
    pub fn set(&mut self, channel: usize, track: i16, max_tracks: u32) -> Result<(), RavennaError> {
        let track = check_track(track, max_tracks)?;
        let slot = self.tracks.get_mut(channel).ok_or_else(|| {
            RavennaError::out_of_range(
                "channel",
                u32::try_from(channel).unwrap_or(u32::MAX),
                0,
                MAX_CHANNELS as u32 - 1,
            )
        })?;
        *slot = track;
        Ok(())
    }

    /// Track routed to `channel`, if the channel is inside the table.
    #[must_use]
    pub fn get(&self, channel: usize) -> Option<i16> {
        self.tracks.get(channel).copied()
    }

    /// The whole table.
    #[must_use]
    pub fn as_array(&self) -> &[i16; MAX_CHANNELS] {
        &self.tracks
    }

    /// The slots of the first `channels` channels.
    #[must_use]
    pub fn channels(&self, channels: u16) -> &[i16] {
        &self.tracks[..usize::from(channels).min(MAX_CHANNELS)]
    }

    /// Check every slot against `[-1, max_tracks)`.
    ///
    /// # Errors
    /// Returns [`RavennaError::ProtocolRange`] naming the first bad track.
    pub fn validate(&self, max_tracks: u32) -> Result<(), RavennaError> {
        for &track in &self.tracks {
            check_track(track, max_tracks)?;
        }
        Ok(())
    }

    /// First track routed from more than one of the first `channels` channels.
    #[must_use]
    pub fn first_duplicate(&self, channels: u16) -> Option<i16> {
        let mut seen = [false; MAX_TRACKS as usize];
        for &track in self.channels(channels) {
            let Ok(idx) = usize::try_from(track) else {
                continue;
            };
            let Some(flag) = seen.get_mut(idx) else {
                continue;
            };
            if *flag {
                return Some(track);
            }
            *flag = true;
        }
        None
    }
}
