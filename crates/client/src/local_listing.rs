//! `LOCAL_LS`: list the client's current working directory, formatted as
//! `TYPE SIZE DATE NAME` rows, mirroring `handle_local_ls` in the original
//! client. Uses only `std::fs`/`std::path` — no platform-specific path
//! handling.

use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// One row of a local directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub is_dir: bool,
    pub size: u64,
    pub modified: String,
    pub name: String,
}

/// Lists `dir`, sorted by name.
pub fn list(dir: &Path) -> io::Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for item in fs::read_dir(dir)? {
        let item = item?;
        let metadata = item.metadata()?;
        let modified = metadata
            .modified()
            .map(format_timestamp)
            .unwrap_or_else(|_| "unknown".to_string());
        entries.push(Entry {
            is_dir: metadata.is_dir(),
            size: metadata.len(),
            modified,
            name: item.file_name().to_string_lossy().into_owned(),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Renders entries the way the original client prints them:
/// `TYPE   SIZE bytes      DATE NAME`.
#[must_use]
pub fn render(entries: &[Entry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let kind = if entry.is_dir { "DIR" } else { "FILE" };
            format!(
                "{kind:<6} {size} bytes{pad} {date} {name}",
                size = entry.size,
                pad = " ".repeat(8usize.saturating_sub(entry.size.to_string().len())),
                date = entry.modified,
                name = entry.name,
            )
        })
        .collect()
}

fn format_timestamp(time: SystemTime) -> String {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let (y, m, d) = civil_from_days((secs / 86_400) as i64);
    let rem = secs % 86_400;
    format!(
        "{y:04}-{m:02}-{d:02} {h:02}:{min:02}:{s:02}",
        h = rem / 3600,
        min = (rem % 3600) / 60,
        s = rem % 60,
    )
}

/// Howard Hinnant's `civil_from_days`: converts a day count since the Unix
/// epoch into a `(year, month, day)` triple, without pulling in a calendar
/// dependency for a client-local display helper.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lists_files_and_directories_sorted_by_name() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("b.txt"), b"hello").expect("write b");
        fs::create_dir(dir.path().join("a_dir")).expect("mkdir");

        let entries = list(dir.path()).expect("list");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a_dir");
        assert!(entries[0].is_dir);
        assert_eq!(entries[1].name, "b.txt");
        assert_eq!(entries[1].size, 5);
    }

    #[test]
    fn render_includes_type_and_name() {
        let entries = vec![Entry {
            is_dir: false,
            size: 3,
            modified: "2026-01-01 00:00:00".to_string(),
            name: "x.bin".to_string(),
        }];
        let lines = render(&entries);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("FILE"));
        assert!(lines[0].ends_with("x.bin"));
    }

    #[test]
    fn civil_from_days_matches_known_epoch_dates() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(19_723), (2024, 1, 1));
    }
}
