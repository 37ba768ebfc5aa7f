/// Sector and cluster map visualization

use crate::error::SosResult;
use crate::filesystem::{ChainLink, FileSystemDriver};
use crate::image::{DiskVolume, SectorStatus};

/// ANSI color codes for maps
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BRIGHT_WHITE: &str = "\x1b[97m";
    pub const DARK_WHITE: &str = "\x1b[37m";
    pub const BRIGHT_YELLOW: &str = "\x1b[93m";
    pub const DARK_YELLOW: &str = "\x1b[2;33m";
    pub const BRIGHT_CYAN: &str = "\x1b[96m";
}

const BLOCK_NO_DATA: &str = "\u{2591}"; // ░
const BLOCK_HAS_DATA: &str = "\u{2593}"; // ▓
const BLOCK_RESERVED: &str = "\u{2588}"; // █

/// State of one cluster in the allocation map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterState {
    /// Boot area, allocation table or root directory
    Reserved,
    /// Unallocated
    Free,
    /// Part of a chain
    Used,
    /// Last cluster of a chain
    Last,
}

/// Classify every cluster of a filesystem
pub fn cluster_states(driver: &FileSystemDriver) -> SosResult<Vec<ClusterState>> {
    let layout = driver.layout();
    let fat = driver.allocation_table();
    (0..layout.max_cluster)
        .map(|cluster| {
            if cluster < layout.reserved_clusters() {
                return Ok(ClusterState::Reserved);
            }
            Ok(match fat.link(driver.volume(), cluster)? {
                ChainLink::Free => ClusterState::Free,
                ChainLink::Next(_) => ClusterState::Used,
                ChainLink::Last { .. } => ClusterState::Last,
            })
        })
        .collect()
}

/// Draw the allocation table, 32 clusters per row
pub fn draw_cluster_map(driver: &FileSystemDriver) -> SosResult<()> {
    let states = cluster_states(driver)?;

    println!("=== Cluster Map ===");
    println!(
        "Legend: {}{}{} Reserved {}{}{} Used {}{}{} Last {}{}{} Free",
        colors::BRIGHT_CYAN, BLOCK_RESERVED, colors::RESET,
        colors::BRIGHT_WHITE, BLOCK_HAS_DATA, colors::RESET,
        colors::BRIGHT_YELLOW, BLOCK_HAS_DATA, colors::RESET,
        colors::DARK_WHITE, BLOCK_NO_DATA, colors::RESET
    );
    println!();

    for (row, chunk) in states.chunks(32).enumerate() {
        print!("{:>3} ", row * 32);
        for state in chunk {
            let (color, block) = match state {
                ClusterState::Reserved => (colors::BRIGHT_CYAN, BLOCK_RESERVED),
                ClusterState::Used => (colors::BRIGHT_WHITE, BLOCK_HAS_DATA),
                ClusterState::Last => (colors::BRIGHT_YELLOW, BLOCK_HAS_DATA),
                ClusterState::Free => (colors::DARK_WHITE, BLOCK_NO_DATA),
            };
            print!("{}{}{}", color, block, colors::RESET);
        }
        println!();
    }

    let free = states.iter().filter(|&&s| s == ClusterState::Free).count();
    println!();
    println!("{} of {} clusters free", free, states.len());
    Ok(())
}

/// Draw a sector map: one column per track, one row per sector position
pub fn draw_sector_map(volume: &DiskVolume, fill_byte: u8) {
    let store = volume.store();
    let max_sectors = store.tracks().iter().map(|t| t.sector_count()).max().unwrap_or(0);
    if max_sectors == 0 {
        println!("No sectors found.");
        return;
    }

    let num_tracks = store.track_count();

    println!("=== Sector Map ===");
    println!(
        "Legend: {}In Use{} {}Blank{} {}Deleted{}",
        colors::BRIGHT_WHITE, colors::RESET,
        colors::DARK_WHITE, colors::RESET,
        colors::BRIGHT_YELLOW, colors::RESET
    );
    println!();

    // Sector 1 at the bottom
    for position in (0..max_sectors).rev() {
        print!("{:>2} ", position + 1);
        for track_num in 0..num_tracks {
            let sector = store
                .get_track(track_num)
                .and_then(|t| t.sectors().get(position));
            match sector {
                Some(sector) => {
                    let in_use = sector.classify(fill_byte) == SectorStatus::InUse;
                    let block = if in_use { BLOCK_HAS_DATA } else { BLOCK_NO_DATA };
                    let color = match (sector.deleted, in_use) {
                        (true, true) => colors::BRIGHT_YELLOW,
                        (true, false) => colors::DARK_YELLOW,
                        (false, true) => colors::BRIGHT_WHITE,
                        (false, false) => colors::DARK_WHITE,
                    };
                    print!("{}{}{}", color, block, colors::RESET);
                }
                None => print!(" "),
            }
        }
        println!();
    }

    print!("   ");
    let mut printed_cols = vec![false; num_tracks];
    for track_num in 0..num_tracks {
        if track_num % 10 == 0 && !printed_cols[track_num] {
            for (i, digit) in track_num.to_string().chars().enumerate() {
                let col = track_num + i;
                if col < num_tracks {
                    print!("{}", digit);
                    printed_cols[col] = true;
                }
            }
        } else if !printed_cols[track_num] {
            print!(" ");
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::{DriverOptions, FileMode, FileName};
    use crate::format::{ImageFormat, MediaKind};

    #[test]
    fn test_cluster_states() {
        let mut fs =
            FileSystemDriver::format(MediaKind::TwoD, ImageFormat::D88, DriverOptions::default())
                .unwrap();
        let root = fs.root_sector();
        fs.write_file(root, &FileName::parse("A.BIN"), &[0; 5000], 0, 0, FileMode::binary())
            .unwrap();

        let states = cluster_states(&fs).unwrap();
        assert_eq!(states.len(), 80);
        assert_eq!(&states[..5], &[
            ClusterState::Reserved,
            ClusterState::Reserved,
            ClusterState::Used,
            ClusterState::Last,
            ClusterState::Free,
        ]);
    }
}
