/// D88 container reader and writer
///
/// Layout:
/// - 0x000-0x010 volume name, NUL terminated at 0x010
/// - 0x01A write protect (0x00/0x10), 0x01B media type, 0x01C image size (u32 LE)
/// - 0x020-0x2AF 164 track offsets (u32 LE, 0 = absent), slot = cylinder * 2 + side
/// - each sector: 16-byte header followed by its payload

use crate::cursor::ByteCursor;
use crate::error::{DiskError, Result};
use crate::format::constants::*;
use crate::format::{Geometry, MediaKind};
use crate::image::{Sector, SectorId, SectorStore, Track};
use crate::io::{DecodedImage, VolumeHeader};
use log::debug;

/// Work out the header size from the first track slot
///
/// Some writers emit a shorter track table; the first track then starts
/// right where the table ends.
fn header_size(data: &[u8]) -> Result<usize> {
    let mut cursor = ByteCursor::at(data, D88_TRACK_TABLE_OFFSET);
    let first = cursor.read_u32()? as usize;
    if first != 0
        && first >= D88_TRACK_TABLE_OFFSET + 4
        && first < D88_HEADER_SIZE
        && (first - D88_TRACK_TABLE_OFFSET) % 4 == 0
    {
        Ok(first)
    } else {
        Ok(D88_HEADER_SIZE)
    }
}

/// Decode a D88 image
pub fn decode(data: &[u8]) -> Result<DecodedImage> {
    if data.len() < D88_TRACK_TABLE_OFFSET + 4 {
        return Err(DiskError::invalid_format("D88 image too small for a header"));
    }
    let header_size = header_size(data)?;
    if data.len() < header_size {
        return Err(DiskError::parse(data.len(), "Truncated D88 header"));
    }

    if data[D88_NAME_LENGTH - 1] != 0 {
        return Err(DiskError::invalid_format("Volume name is not NUL terminated"));
    }
    let name_end = data[..D88_NAME_LENGTH]
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(D88_NAME_LENGTH - 1);
    let name = data[..name_end].to_vec();

    let write_protected = data[D88_WRITE_PROTECT_OFFSET] != 0;
    let media_code = data[D88_MEDIA_OFFSET];
    let media = MediaKind::from_code(media_code).ok_or_else(|| {
        DiskError::unsupported(format!("Media type 0x{:02X}", media_code))
    })?;

    let mut cursor = ByteCursor::at(data, D88_DISK_SIZE_OFFSET);
    let disk_size = cursor.read_u32()? as usize;
    if disk_size < data.len() {
        return Err(DiskError::invalid_format(format!(
            "Declared image size {} is smaller than the stream ({} bytes)",
            disk_size,
            data.len()
        )));
    }

    let slots = (header_size - D88_TRACK_TABLE_OFFSET) / 4;
    let mut offsets = Vec::with_capacity(slots);
    for slot in 0..slots {
        let offset = cursor.read_u32()? as usize;
        if offset != 0 && (offset < header_size || offset >= disk_size) {
            return Err(DiskError::parse(
                D88_TRACK_TABLE_OFFSET + slot * 4,
                format!("Track {} offset 0x{:X} out of range", slot, offset),
            ));
        }
        offsets.push(offset);
    }

    let geometry = Geometry::for_media(media);
    let mut store = SectorStore::with_capacity(
        geometry.sectors_per_track as usize,
        geometry.tracks_total(),
    );
    store.ensure_track_count(geometry.tracks_total());

    for (slot, &offset) in offsets.iter().enumerate() {
        if offset == 0 {
            continue;
        }
        let cylinder = (slot / 2) as u8;
        let side = (slot % 2) as u8;
        if side >= geometry.sides {
            return Err(DiskError::parse(
                D88_TRACK_TABLE_OFFSET + slot * 4,
                format!("Track {} uses side {} on single-sided media", slot, side),
            ));
        }
        let track = read_track(data, offset, cylinder, side)?;
        store.set_track(geometry.logical_track(cylinder, side), track);
    }

    debug!(
        "Decoded D88 image: media {}, {} tracks, header {} bytes",
        media,
        offsets.iter().filter(|&&o| o != 0).count(),
        header_size
    );

    Ok(DecodedImage {
        header: VolumeHeader {
            name,
            write_protected,
            media,
            header_size,
        },
        store,
    })
}

/// Read every sector of the track starting at `offset`
fn read_track(data: &[u8], offset: usize, cylinder: u8, side: u8) -> Result<Track> {
    let mut track = Track::new(cylinder, side);
    track.set_stream_offset(Some(offset));

    let mut cursor = ByteCursor::at(data, offset);
    let mut expected = 1usize;
    let mut read = 0usize;

    while read < expected {
        let record_offset = cursor.position();
        let c = cursor.read_u8()?;
        let h = cursor.read_u8()?;
        let r = cursor.read_u8()?;
        let n = cursor.read_u8()?;
        let sectors_in_track = cursor.read_u16()?;
        let density = cursor.read_u8()?;
        let deleted = cursor.read_u8()?;
        let status = cursor.read_u8()?;
        cursor.skip(D88_SECTOR_DATA_SIZE_OFFSET - 9);
        let data_size = cursor.read_u16()? as usize;

        if c != cylinder {
            return Err(DiskError::parse(
                record_offset,
                format!(
                    "Sector header cylinder {} does not match track {} (expected {})",
                    c,
                    cylinder as usize * 2 + side as usize,
                    cylinder
                ),
            ));
        }

        let payload = cursor.read_bytes(data_size)?.to_vec();

        let mut sector = Sector::with_data(SectorId::new(c, h, r, n), sectors_in_track, payload)
            .with_density(density);
        sector.deleted = deleted != 0;
        sector.status = status;
        sector.set_stream_offset(Some(record_offset));
        track.add_sector(sector);

        if read == 0 {
            expected = (sectors_in_track as usize).max(1);
        }
        read += 1;
    }

    Ok(track)
}

/// Serialize one sector's 16-byte header and payload
pub fn sector_record(sector: &Sector) -> Vec<u8> {
    let mut record = vec![0u8; D88_SECTOR_HEADER_SIZE + sector.data_size()];
    record[0] = sector.id.cylinder;
    record[1] = sector.id.side;
    record[2] = sector.id.sector;
    record[3] = sector.id.size_code;
    record[4..6].copy_from_slice(&sector.sectors_in_track.to_le_bytes());
    record[6] = sector.density;
    record[7] = if sector.deleted { DELETED_DATA_MARK } else { 0 };
    record[8] = sector.status;
    record[D88_SECTOR_DATA_SIZE_OFFSET..D88_SECTOR_HEADER_SIZE]
        .copy_from_slice(&(sector.data_size() as u16).to_le_bytes());
    record[D88_SECTOR_HEADER_SIZE..].copy_from_slice(sector.data());
    record
}

/// Encode a D88 image
///
/// Always writes a full-size header. Track offsets are only known after the
/// sectors are laid out, so the header is composed last.
pub fn encode(header: &mut VolumeHeader, store: &mut SectorStore) -> Result<Vec<u8>> {
    let mut out = vec![0u8; D88_HEADER_SIZE];
    let mut track_offsets = [0u32; D88_TRACK_SLOTS];

    for track in store.tracks_mut() {
        if track.is_empty() {
            track.set_stream_offset(None);
            continue;
        }
        let slot = track.cylinder as usize * 2 + track.side as usize;
        if slot >= D88_TRACK_SLOTS {
            return Err(DiskError::invalid_format(format!(
                "Track slot {} exceeds the D88 track table",
                slot
            )));
        }

        // The slot points at the track's first record, which is sector 1 for
        // every track this crate lays out.
        let mut track_start = None;
        for sector in track.sectors_mut() {
            let pos = out.len();
            track_start.get_or_insert(pos);
            sector.set_stream_offset(Some(pos));
            out.extend_from_slice(&sector_record(sector));
        }
        track.set_stream_offset(track_start);
        track_offsets[slot] = track_start.unwrap_or(0) as u32;
    }

    let total = out.len() as u32;
    compose_header(&mut out[..D88_HEADER_SIZE], header, total, &track_offsets)?;
    header.header_size = D88_HEADER_SIZE;
    Ok(out)
}

fn compose_header(
    buf: &mut [u8],
    header: &VolumeHeader,
    total: u32,
    track_offsets: &[u32; D88_TRACK_SLOTS],
) -> Result<()> {
    let name_len = header.name.len().min(D88_NAME_LENGTH - 1);
    let mut cursor = ByteCursor::new(buf);
    cursor.write_bytes(&header.name[..name_len])?;
    cursor.seek(D88_WRITE_PROTECT_OFFSET);
    cursor.write_u8(if header.write_protected { D88_PROTECTED } else { 0 })?;
    cursor.write_u8(header.media.code())?;
    cursor.write_u32(total)?;
    for &offset in track_offsets {
        cursor.write_u32(offset)?;
    }
    Ok(())
}
