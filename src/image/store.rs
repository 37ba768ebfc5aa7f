/// Sector store: every track of a volume, addressable by absolute sector index

use crate::image::sector::Sector;
use crate::image::track::Track;

/// Ordered collection of tracks whose sectors are addressed track-major
///
/// Absolute sector `i` lives on track `i / sectors_per_track` with sector
/// number `i % sectors_per_track + 1`.
#[derive(Debug, Clone)]
pub struct SectorStore {
    sectors_per_track: usize,
    tracks: Vec<Track>,
}

impl SectorStore {
    /// Create an empty store
    pub fn new(sectors_per_track: usize) -> Self {
        Self {
            sectors_per_track: sectors_per_track.max(1),
            tracks: Vec::new(),
        }
    }

    /// Create an empty store with preallocated tracks
    pub fn with_capacity(sectors_per_track: usize, num_tracks: usize) -> Self {
        Self {
            sectors_per_track: sectors_per_track.max(1),
            tracks: Vec::with_capacity(num_tracks),
        }
    }

    /// Sectors per track used for absolute addressing
    pub fn sectors_per_track(&self) -> usize {
        self.sectors_per_track
    }

    /// Add a track at the next logical index
    pub fn add_track(&mut self, track: Track) {
        self.tracks.push(track);
    }

    /// Place a track at a logical index, growing the store if necessary
    pub fn set_track(&mut self, index: usize, track: Track) {
        self.ensure_track_count(index + 1);
        self.tracks[index] = track;
    }

    /// Get a reference to all tracks
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Get a mutable reference to all tracks
    pub fn tracks_mut(&mut self) -> &mut [Track] {
        &mut self.tracks
    }

    /// Get a track by logical index
    pub fn get_track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Get the number of tracks
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Check if the store has any tracks
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Number of addressable sector positions
    pub fn capacity(&self) -> usize {
        self.tracks.len() * self.sectors_per_track
    }

    /// Ensure the store has at least the specified number of tracks
    /// Creates empty tracks if necessary
    pub fn ensure_track_count(&mut self, num_tracks: usize) {
        while self.tracks.len() < num_tracks {
            self.tracks.push(Track::new(0, 0));
        }
    }

    fn locate(&self, index: usize) -> (usize, u8) {
        let track = index / self.sectors_per_track;
        let sector = (index % self.sectors_per_track + 1) as u8;
        (track, sector)
    }

    /// Get a sector by absolute index
    pub fn get(&self, index: usize) -> Option<&Sector> {
        let (track, sector) = self.locate(index);
        self.tracks.get(track)?.get_sector(sector)
    }

    /// Get a mutable sector by absolute index
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Sector> {
        let (track, sector) = self.locate(index);
        self.tracks.get_mut(track)?.get_sector_mut(sector)
    }

    /// Iterate over every sector in stream order
    pub fn sectors(&self) -> impl Iterator<Item = &Sector> {
        self.tracks.iter().flat_map(|t| t.sectors().iter())
    }

    /// Total number of sectors actually present
    pub fn sector_count(&self) -> usize {
        self.tracks.iter().map(|t| t.sector_count()).sum()
    }

    /// Highest track index containing a dirty sector
    pub fn highest_dirty_track(&self) -> Option<usize> {
        self.tracks.iter().rposition(|t| t.is_dirty())
    }

    /// Highest track index whose stream position is known
    pub fn last_known_track(&self) -> Option<usize> {
        self.tracks.iter().rposition(|t| t.stream_offset().is_some())
    }

    /// Check if any sector is dirty
    pub fn is_dirty(&self) -> bool {
        self.tracks.iter().any(|t| t.is_dirty())
    }

    /// Clear every sector's dirty flag
    pub fn clear_dirty(&mut self) {
        for track in &mut self.tracks {
            for sector in track.sectors_mut() {
                sector.clear_dirty();
            }
        }
    }

    /// Forget every recorded stream position
    pub fn clear_offsets(&mut self) {
        for track in &mut self.tracks {
            track.set_stream_offset(None);
            for sector in track.sectors_mut() {
                sector.set_stream_offset(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::sector::SectorId;

    fn store(tracks: u8, spt: u8) -> SectorStore {
        let mut store = SectorStore::new(spt as usize);
        for t in 0..tracks {
            let mut track = Track::new(t / 2, t % 2);
            for s in 1..=spt {
                let id = SectorId::new(t / 2, t % 2, s, 1);
                track.add_sector(Sector::new(id, spt as u16, t));
            }
            store.add_track(track);
        }
        store
    }

    #[test]
    fn test_absolute_addressing() {
        let store = store(4, 16);
        assert_eq!(store.capacity(), 64);
        assert_eq!(store.sector_count(), 64);

        let sector = store.get(17).unwrap();
        assert_eq!(sector.id.sector, 2);
        assert_eq!(sector.data()[0], 1);

        assert!(store.get(64).is_none());
    }

    #[test]
    fn test_set_track_grows() {
        let mut store = SectorStore::new(16);
        store.set_track(3, Track::new(1, 1));
        assert_eq!(store.track_count(), 4);
        assert!(store.get_track(0).unwrap().is_empty());
        assert!(store.get(0).is_none());
    }

    #[test]
    fn test_dirty_and_known_tracks() {
        let mut store = store(4, 2);
        assert_eq!(store.highest_dirty_track(), None);
        assert_eq!(store.last_known_track(), None);

        store.get_mut(5).unwrap().mark_dirty();
        assert_eq!(store.highest_dirty_track(), Some(2));

        store.tracks_mut()[1].set_stream_offset(Some(0x2B0));
        assert_eq!(store.last_known_track(), Some(1));

        store.clear_dirty();
        assert!(!store.is_dirty());

        store.clear_offsets();
        assert_eq!(store.last_known_track(), None);
    }

    #[test]
    fn test_sectors_iterate_in_stream_order() {
        let store = store(2, 3);
        let ids: Vec<(u8, u8)> = store.sectors().map(|s| (s.id.side, s.id.sector)).collect();
        assert_eq!(ids, vec![(0, 1), (0, 2), (0, 3), (1, 1), (1, 2), (1, 3)]);
    }
}
