/// Raw sector dump reader and writer
///
/// Raw images have no header: sectors are concatenated in track-major order
/// (cylinder, side, sector) and every sector has the media's fixed size.
/// Only two-sided media are supported in this container.

use crate::error::{DiskError, Result};
use crate::format::constants::bytes_to_fdc_size;
use crate::format::{Geometry, MediaKind};
use crate::image::{Sector, SectorId, SectorStore, Track};
use crate::io::{DecodedImage, VolumeHeader};
use log::debug;

/// Check that a media kind can be stored in a raw image
pub fn check_media(media: MediaKind) -> Result<()> {
    match media {
        MediaKind::OneD | MediaKind::OneDD => Err(DiskError::unsupported(format!(
            "{} media cannot be stored as a raw image",
            media
        ))),
        _ => Ok(()),
    }
}

/// Build one formatted track for `geometry`
pub(crate) fn format_track(geometry: &Geometry, track_index: usize, fill: u8) -> Track {
    let (cylinder, side) = geometry.track_address(track_index);
    let size_code = bytes_to_fdc_size(geometry.sector_size as usize).unwrap_or(1);
    let mut track = Track::new(cylinder, side);
    for r in 1..=geometry.sectors_per_track {
        let id = SectorId::new(cylinder, side, r as u8, size_code);
        let sector = Sector::new(id, geometry.sectors_per_track, fill).with_density(geometry.density);
        track.add_sector(sector);
    }
    track
}

/// Decode a raw image of the given media
///
/// Images shorter than the full media are accepted as long as they hold
/// whole tracks; the missing tracks are formatted in memory and have no
/// stream position yet.
pub fn decode(data: &[u8], media: MediaKind) -> Result<DecodedImage> {
    check_media(media)?;

    let geometry = Geometry::for_media(media);
    let track_size = geometry.track_size();
    let sector_size = geometry.sector_size as usize;

    if data.is_empty() || data.len() % track_size != 0 {
        return Err(DiskError::invalid_format(format!(
            "Raw {} image must hold whole tracks of {} bytes, got {} bytes",
            media,
            track_size,
            data.len()
        )));
    }
    let tracks_present = data.len() / track_size;
    if tracks_present > geometry.tracks_total() {
        return Err(DiskError::invalid_format(format!(
            "Raw {} image holds {} tracks, media has {}",
            media,
            tracks_present,
            geometry.tracks_total()
        )));
    }

    let mut store = SectorStore::with_capacity(
        geometry.sectors_per_track as usize,
        geometry.tracks_total(),
    );

    let mut offset = 0usize;
    for t in 0..geometry.tracks_total() {
        let mut track = format_track(&geometry, t, 0);
        if t < tracks_present {
            track.set_stream_offset(Some(offset));
            for sector in track.sectors_mut() {
                sector.data_mut().copy_from_slice(&data[offset..offset + sector_size]);
                sector.set_stream_offset(Some(offset));
                offset += sector_size;
            }
        }
        store.add_track(track);
    }

    debug!("Decoded raw {} image: {} of {} tracks present", media, tracks_present, geometry.tracks_total());

    Ok(DecodedImage {
        header: VolumeHeader {
            name: Vec::new(),
            write_protected: false,
            media,
            header_size: 0,
        },
        store,
    })
}

/// Encode a raw image
pub fn encode(header: &mut VolumeHeader, store: &mut SectorStore) -> Result<Vec<u8>> {
    check_media(header.media)?;

    let geometry = Geometry::for_media(header.media);
    let sector_size = geometry.sector_size as usize;
    let mut out = Vec::with_capacity(geometry.total_capacity());

    for track in store.tracks_mut() {
        track.set_stream_offset(Some(out.len()));
        for r in 1..=geometry.sectors_per_track {
            let pos = out.len();
            match track.get_sector_mut(r as u8) {
                Some(sector) => {
                    let data = sector.data();
                    let len = data.len().min(sector_size);
                    out.extend_from_slice(&data[..len]);
                    out.resize(pos + sector_size, 0);
                    sector.set_stream_offset(Some(pos));
                }
                None => out.resize(pos + sector_size, 0),
            }
        }
    }

    header.header_size = 0;
    Ok(out)
}
