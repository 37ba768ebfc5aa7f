/// Interactive S-OS disk console application

use dez80::Instruction;

use sosdisk::map::{draw_cluster_map, draw_sector_map};
use sosdisk::*;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

/// Command completer for the REPL
struct CommandCompleter {
    commands: Vec<&'static str>,
}

impl CommandCompleter {
    fn new() -> Self {
        Self {
            commands: vec![
                "dasm",
                "dir",
                "drive",
                "exit",
                "export",
                "files",
                "format",
                "help",
                "import",
                "info",
                "kill",
                "ls",
                "map",
                "mount",
                "protect",
                "quit",
                "record",
                "rename",
                "save",
                "type",
                "unmount",
                "unprotect",
            ],
        }
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        // Only complete the first word (command name)
        let line_to_cursor = &line[..pos];
        if line_to_cursor.contains(' ') {
            return Ok((pos, vec![]));
        }

        let prefix = line_to_cursor.to_lowercase();
        let matches: Vec<Pair> = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(&prefix))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        Ok((0, matches))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}
impl Validator for CommandCompleter {}
impl Helper for CommandCompleter {}

/// Get the path to the history file
fn history_path() -> Option<std::path::PathBuf> {
    dirs::home_dir().map(|mut p| {
        p.push(".sosdisk_history");
        p
    })
}

fn save_history(rl: &mut Editor<CommandCompleter, rustyline::history::DefaultHistory>) {
    if let Some(history_path) = history_path() {
        let _ = rl.save_history(&history_path);
    }
}

fn main() {
    env_logger::init();

    println!("=== S-OS Disk ===");
    println!("Interactive console for D88 and raw S-OS disk images.");
    println!("Type 'help' for available commands\n");

    let mut rl = Editor::new().expect("Failed to create editor");
    rl.set_helper(Some(CommandCompleter::new()));

    if let Some(history_path) = history_path() {
        let _ = rl.load_history(&history_path);
    }

    let mut service = DiskService::new();
    let mut drive = 'A';

    loop {
        let readline = rl.readline(&format!("{}> ", drive));
        let input = match readline {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                save_history(&mut rl);
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let _ = rl.add_history_entry(input);

        let parts = parse_command_line(input);
        if parts.is_empty() {
            continue;
        }
        let command = parts[0].to_lowercase();

        match command.as_str() {
            "help" => print_help(),
            "quit" | "exit" => {
                save_history(&mut rl);
                println!("Goodbye!");
                break;
            }
            "drive" => {
                let Some(letter) = parts.get(1).and_then(|p| p.chars().next()) else {
                    println!("Current drive: {}", drive);
                    continue;
                };
                match DeviceLetter::from_char(letter) {
                    Ok(letter) => drive = letter.as_char(),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "mount" => {
                if parts.len() < 2 {
                    println!("Usage: mount <path>");
                    continue;
                }
                match service.mount_path(drive, &parts[1]) {
                    Ok(()) => println!("Mounted {} on {}:", parts[1], drive),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "format" => {
                let media = parts
                    .get(1)
                    .map(|m| MediaKind::from_name(m))
                    .unwrap_or(Some(MediaKind::TwoD));
                let Some(media) = media else {
                    println!("Usage: format [2d|2dd|2hd|1d|1dd] [d88|raw]");
                    continue;
                };
                let format = match parts.get(2).map(|f| f.to_lowercase()) {
                    Some(f) if f == "raw" => ImageFormat::Raw(media),
                    _ => ImageFormat::D88,
                };
                match service.format(drive, media, format) {
                    Ok(()) => println!("Formatted {} {} volume on {}:", media, format, drive),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "unmount" => match service.unmount(drive) {
                Ok(volume) => {
                    if volume.is_changed() {
                        println!("Warning: unsaved changes discarded");
                    }
                    println!("Unmounted {}:", drive);
                }
                Err(e) => println!("Error: {}", e),
            },
            "info" => match service.driver(drive) {
                Ok(driver) => print_info(driver),
                Err(e) => println!("Error: {}", e),
            },
            "files" | "dir" | "ls" => {
                let dir_sector = match dir_argument(&service, drive, parts.get(1)) {
                    Ok(sector) => sector,
                    Err(e) => {
                        println!("Error: {}", e);
                        continue;
                    }
                };
                match service.files(drive, dir_sector) {
                    Ok(records) => print_files(&records),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "type" => {
                if parts.len() < 2 {
                    println!("Usage: type <file>");
                    continue;
                }
                match read_root_file(&service, drive, &parts[1]) {
                    Ok((_, data)) => {
                        println!("File: {} ({} bytes)", parts[1], data.len());
                        print_hex_dump(&data, 256);
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "export" => {
                if parts.len() < 2 {
                    println!("Usage: export <file> [output_path]");
                    continue;
                }
                let output_path = parts.get(2).unwrap_or(&parts[1]);
                match read_root_file(&service, drive, &parts[1]) {
                    Ok((_, data)) => match std::fs::write(output_path, &data) {
                        Ok(()) => println!("Exported {} bytes to {}", data.len(), output_path),
                        Err(e) => println!("Error writing {}: {}", output_path, e),
                    },
                    Err(e) => println!("Error: {}", e),
                }
            }
            "import" => {
                if parts.len() < 2 {
                    println!("Usage: import <host_path> [name] [load] [exec] [bin|asc|bas]");
                    continue;
                }
                let data = match std::fs::read(&parts[1]) {
                    Ok(data) => data,
                    Err(e) => {
                        println!("Error reading {}: {}", parts[1], e);
                        continue;
                    }
                };
                let name = parts.get(2).map(|s| s.as_str()).unwrap_or_else(|| {
                    std::path::Path::new(&parts[1])
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or(parts[1].as_str())
                });
                let load = parts.get(3).and_then(|s| parse_hex_or_dec(s)).unwrap_or(0);
                let exec = parts.get(4).and_then(|s| parse_hex_or_dec(s)).unwrap_or(load);
                let mode = match parts.get(5).map(|m| m.to_lowercase()).as_deref() {
                    Some("asc") => FileMode::ascii(),
                    Some("bas") => FileMode(FileMode::BASIC),
                    _ => FileMode::binary(),
                };
                let root = match service.driver(drive) {
                    Ok(driver) => driver.root_sector(),
                    Err(e) => {
                        println!("Error: {}", e);
                        continue;
                    }
                };
                let request = WriteRequest {
                    dir_sector: root,
                    name: FileName::parse(name),
                    data: &data,
                    load_addr: load,
                    end_addr: load.saturating_add(data.len().saturating_sub(1).min(0xFFFF) as u16),
                    exec_addr: exec,
                    mode,
                };
                match service.write_file(drive, &request) {
                    Ok(record) => println!(
                        "Imported {} ({} bytes) at cluster {}",
                        record.entry.name,
                        data.len(),
                        record.entry.start_cluster
                    ),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "kill" | "protect" | "unprotect" => {
                if parts.len() < 2 {
                    println!("Usage: {} <file>", command);
                    continue;
                }
                let result = root_sector(&service, drive).and_then(|root| {
                    let name = FileName::parse(&parts[1]);
                    match command.as_str() {
                        "kill" => service.kill(drive, root, &name),
                        "protect" => service.set_protect(drive, root, &name),
                        _ => service.reset_protect(drive, root, &name),
                    }
                });
                match result {
                    Ok(()) => println!("OK"),
                    Err(e) => println!("Error {}: {}", e.code(), e),
                }
            }
            "rename" => {
                if parts.len() < 3 {
                    println!("Usage: rename <old> <new>");
                    continue;
                }
                let result = root_sector(&service, drive).and_then(|root| {
                    service.rename(
                        drive,
                        root,
                        &FileName::parse(&parts[1]),
                        &FileName::parse(&parts[2]),
                    )
                });
                match result {
                    Ok(()) => println!("Renamed {} to {}", parts[1], parts[2]),
                    Err(e) => println!("Error {}: {}", e.code(), e),
                }
            }
            "record" => {
                let Some(index) = parts.get(1).and_then(|s| parse_index(s)) else {
                    println!("Usage: record <index>");
                    continue;
                };
                match service.read_record(drive, index) {
                    Ok(data) => {
                        println!("Record {} ({} bytes):", index, data.len());
                        print_hex_dump(&data, 256);
                    }
                    Err(e) => println!("Error {}: {}", e.code(), e),
                }
            }
            "dasm" => {
                if parts.len() < 2 {
                    println!("Usage: dasm <file> [bytes]");
                    continue;
                }
                let limit = parts.get(2).and_then(|s| parse_index(s)).unwrap_or(256);
                match read_root_file(&service, drive, &parts[1]) {
                    Ok((entry, data)) => {
                        let len = data.len().min(limit);
                        println!(
                            "Disassembly of {} at {:04X}h (exec {:04X}h):",
                            entry.name, entry.load_addr, entry.exec_addr
                        );
                        disassemble_z80(&data[..len], entry.load_addr);
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "map" => {
                let sectors = parts.get(1).map(|s| s == "sectors").unwrap_or(false);
                match service.driver(drive) {
                    Ok(driver) if sectors => draw_sector_map(driver.volume(), 0),
                    Ok(driver) => {
                        if let Err(e) = draw_cluster_map(driver) {
                            println!("Error: {}", e);
                        }
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "save" => {
                let path = match parts.get(1) {
                    Some(path) => path.clone(),
                    None => match service
                        .driver(drive)
                        .ok()
                        .and_then(|d| d.volume().filename().map(|f| f.to_string()))
                    {
                        Some(path) => path,
                        None => {
                            println!("Usage: save <path>");
                            continue;
                        }
                    },
                };
                match service.save(drive, &path) {
                    Ok(WriteMode::Rebuilt) => println!("Saved to {}", path),
                    Ok(WriteMode::Patched { runs, sectors }) => {
                        println!("Saved to {} ({} sectors in {} runs)", path, sectors, runs)
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            _ => {
                println!("Unknown command: {}. Type 'help' for available commands.", command);
            }
        }
    }
}

fn parse_command_line(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
            }
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() {
                    parts.push(current.clone());
                    current.clear();
                }
            }
            _ => {
                current.push(ch);
            }
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

fn print_help() {
    println!("Available commands:");
    println!("  drive [A-D]                    - Show or switch the current drive");
    println!("  mount <path>                   - Mount a .d88/.d77/.2d/.2dd/.2hd image");
    println!("  format [media] [d88|raw]       - Mount a new empty volume (2d, 2dd, 2hd, 1d, 1dd)");
    println!("  unmount                        - Remove the volume from the current drive");
    println!("  info                           - Show volume and filesystem information");
    println!("  files [dir_sector]             - List files (dir, ls)");
    println!("  type <file>                    - Hex dump a file");
    println!("  export <file> [output_path]    - Copy a file to the host filesystem");
    println!("  import <path> [name] [load] [exec] [bin|asc|bas] - Copy a host file onto the disk");
    println!("  kill <file>                    - Delete a file");
    println!("  rename <old> <new>             - Rename a file");
    println!("  protect <file>                 - Set the read-only mark");
    println!("  unprotect <file>               - Clear the read-only mark");
    println!("  record <index>                 - Hex dump one sector");
    println!("  dasm <file> [bytes]            - Disassemble Z80 code at the file's load address");
    println!("  map [sectors]                  - Cluster map, or sector map with 'sectors'");
    println!("  save [path]                    - Save the image (patches in place when possible)");
    println!("  help                           - Show this help");
    println!("  quit, exit                     - Exit");
}

fn print_info(driver: &FileSystemDriver) {
    let volume = driver.volume();
    if let Some(filename) = volume.filename() {
        println!("Filename: {}", filename);
    }
    let geometry = volume.geometry();
    println!("Format: {}", volume.image_format());
    println!("Media: {}", volume.media());
    if !volume.name().is_empty() {
        println!("Volume name: {}", volume.name());
    }
    println!("Cylinders: {}  Sides: {}", geometry.cylinders, geometry.sides);
    println!("Sectors per track: {}", geometry.sectors_per_track);
    println!("Sector size: {} bytes", geometry.sector_size);
    println!("Total capacity: {} KB", geometry.total_capacity() / 1024);
    println!("Write protected: {}", if volume.is_write_protected() { "Yes" } else { "No" });
    println!("Changed: {}", if volume.is_changed() { "Yes" } else { "No" });

    match driver.info() {
        Ok(info) => {
            println!("{} filesystem", info.fs_type);
            println!("Cluster size: {} bytes", info.cluster_size);
            println!("Total clusters: {} ({} reserved)", info.total_clusters, info.reserved_clusters);
            println!("Free clusters: {}", info.free_clusters);
            println!("Free space: {} KB", info.free_bytes() / 1024);
        }
        Err(e) => println!("Filesystem error: {}", e),
    }
}

fn print_files(records: &[DirectoryRecord]) {
    if records.is_empty() {
        println!("No files found.");
        return;
    }

    println!(
        "{:<18} {:>4} {:>5} {:>4} {:>4} {:>4} {:>3} {}",
        "Name", "Type", "Size", "Load", "Exec", "Clus", "Att", "Date"
    );
    println!("{}", "-".repeat(66));
    for record in records {
        let entry = &record.entry;
        let attrs = format!(
            "{}{}",
            if entry.mode.is_read_only() { "R" } else { "-" },
            if entry.mode.is_hidden() { "H" } else { "-" }
        );
        println!(
            "{:<18} {:>4} {:>5} {:04X} {:04X} {:>4} {:>3} {}",
            entry.name.to_string(),
            entry.mode.type_name(),
            entry.size,
            entry.load_addr,
            entry.exec_addr,
            entry.start_cluster,
            attrs,
            entry.timestamp
        );
    }
}

fn root_sector(service: &DiskService, drive: char) -> SosResult<usize> {
    Ok(service.driver(drive)?.root_sector())
}

fn dir_argument(service: &DiskService, drive: char, arg: Option<&String>) -> SosResult<usize> {
    match arg {
        Some(s) => parse_index(s).ok_or(SosError::SyntaxError),
        None => root_sector(service, drive),
    }
}

fn read_root_file(service: &DiskService, drive: char, name: &str) -> SosResult<(DirEntry, Vec<u8>)> {
    let root = root_sector(service, drive)?;
    service.read_file(drive, root, &FileName::parse(name))
}

fn print_hex_dump(data: &[u8], max_bytes: usize) {
    let len = data.len().min(max_bytes);

    for (i, chunk) in data[..len].chunks(16).enumerate() {
        print!("{:04X}: ", i * 16);

        for (j, byte) in chunk.iter().enumerate() {
            print!("{:02X} ", byte);
            if j == 7 {
                print!(" ");
            }
        }

        for j in chunk.len()..16 {
            print!("   ");
            if j == 7 {
                print!(" ");
            }
        }

        print!(" |");
        for byte in chunk {
            let c = if (32..127).contains(byte) { *byte as char } else { '.' };
            print!("{}", c);
        }
        println!("|");
    }

    if data.len() > max_bytes {
        println!("... ({} more bytes)", data.len() - max_bytes);
    }
}

fn parse_hex_or_dec(s: &str) -> Option<u16> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).ok()
    } else if let Some(hex) = s.strip_suffix('h').or_else(|| s.strip_suffix('H')) {
        u16::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

fn parse_index(s: &str) -> Option<usize> {
    parse_hex_or_dec(s).map(|v| v as usize)
}

fn disassemble_z80(data: &[u8], origin: u16) {
    let mut slice: &[u8] = data;
    let mut offset = 0usize;

    while !slice.is_empty() {
        let start_len = slice.len();
        let address = origin.wrapping_add(offset as u16);

        match Instruction::decode_one(&mut slice) {
            Ok(instruction) => {
                let bytes_consumed = start_len - slice.len();
                let bytes: Vec<String> = data[offset..offset + bytes_consumed]
                    .iter()
                    .map(|b| format!("{:02X}", b))
                    .collect();

                println!("{:04X}  {:<12} {}", address, bytes.join(" "), instruction);
                offset += bytes_consumed;
            }
            Err(_) => {
                // Truncated instruction at the end of the data
                let byte = data[offset];
                println!("{:04X}  {:02X}           DB {:02X}h", address, byte, byte);
                offset += 1;
                slice = &data[offset..];
            }
        }
    }
}
