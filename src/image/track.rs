/// Track data structures

use crate::image::sector::Sector;
use std::collections::HashMap;

/// A disk track containing multiple sectors
#[derive(Debug, Clone)]
pub struct Track {
    /// Physical cylinder number
    pub cylinder: u8,
    /// Physical side number (0 or 1)
    pub side: u8,
    /// Sectors in this track, in stream order
    sectors: Vec<Sector>,
    /// Map from sector number to index in sectors vector for fast lookup
    sector_map: HashMap<u8, usize>,
    /// Stream position of the track's first sector, if known
    stream_offset: Option<usize>,
}

impl Track {
    /// Create a new track
    pub fn new(cylinder: u8, side: u8) -> Self {
        Self {
            cylinder,
            side,
            sectors: Vec::new(),
            sector_map: HashMap::new(),
            stream_offset: None,
        }
    }

    /// Add a sector to this track
    pub fn add_sector(&mut self, sector: Sector) {
        let sector_id = sector.id.sector;
        let index = self.sectors.len();
        self.sectors.push(sector);
        self.sector_map.insert(sector_id, index);
    }

    /// Get a reference to all sectors
    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    /// Get a mutable reference to all sectors
    pub fn sectors_mut(&mut self) -> &mut [Sector] {
        &mut self.sectors
    }

    /// Get a sector by its sector number
    pub fn get_sector(&self, sector_id: u8) -> Option<&Sector> {
        self.sector_map
            .get(&sector_id)
            .and_then(|&idx| self.sectors.get(idx))
    }

    /// Get a mutable reference to a sector by its sector number
    pub fn get_sector_mut(&mut self, sector_id: u8) -> Option<&mut Sector> {
        self.sector_map
            .get(&sector_id)
            .and_then(|&idx| self.sectors.get_mut(idx))
    }

    /// Get the number of sectors in this track
    pub fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    /// Check if this track has any sectors
    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    /// Get the total data size of all sectors in bytes
    pub fn total_data_size(&self) -> usize {
        self.sectors.iter().map(|s| s.data_size()).sum()
    }

    /// Check if any sector in the track was modified
    pub fn is_dirty(&self) -> bool {
        self.sectors.iter().any(|s| s.is_dirty())
    }

    /// Stream position of this track, if known
    pub fn stream_offset(&self) -> Option<usize> {
        self.stream_offset
    }

    /// Record the stream position of this track
    pub fn set_stream_offset(&mut self, offset: Option<usize>) {
        self.stream_offset = offset;
    }

    /// Get list of all sector numbers in this track
    pub fn sector_ids(&self) -> Vec<u8> {
        self.sectors.iter().map(|s| s.id.sector).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::sector::SectorId;

    fn filled_track(count: u8) -> Track {
        let mut track = Track::new(0, 0);
        for i in 1..=count {
            let id = SectorId::new(0, 0, i, 1);
            track.add_sector(Sector::new(id, count as u16, 0));
        }
        track
    }

    #[test]
    fn test_new_track() {
        let track = Track::new(3, 1);
        assert_eq!(track.cylinder, 3);
        assert_eq!(track.side, 1);
        assert_eq!(track.sector_count(), 0);
        assert!(track.is_empty());
        assert_eq!(track.stream_offset(), None);
    }

    #[test]
    fn test_get_sector() {
        let track = filled_track(16);
        assert_eq!(track.sector_count(), 16);

        let sector = track.get_sector(5);
        assert!(sector.is_some());
        assert_eq!(sector.unwrap().id.sector, 5);

        assert!(track.get_sector(0).is_none());
        assert!(track.get_sector(17).is_none());
    }

    #[test]
    fn test_out_of_order_sectors() {
        let mut track = Track::new(0, 0);
        for i in [3u8, 1, 2] {
            track.add_sector(Sector::new(SectorId::new(0, 0, i, 1), 3, i));
        }
        assert_eq!(track.sector_ids(), vec![3, 1, 2]);
        assert_eq!(track.get_sector(1).unwrap().data()[0], 1);
    }

    #[test]
    fn test_total_data_size() {
        let track = filled_track(16);
        assert_eq!(track.total_data_size(), 16 * 256);
    }

    #[test]
    fn test_dirty_tracking() {
        let mut track = filled_track(4);
        assert!(!track.is_dirty());
        track.get_sector_mut(2).unwrap().mark_dirty();
        assert!(track.is_dirty());
    }
}
