//! Content-type enrichment from `file *` probe output.
//!
//! The probe prints one `name: description` line per entry in the working
//! directory, e.g.
//!
//! ```text
//! ./base.apk:      Zip archive data
//! 'my file.txt':   ASCII text
//! ```
//!
//! Only regular files are enriched. Enrichment is additive: a probe block
//! that fails to parse leaves the listing exactly as it was.

use super::types::{FileEntry, FileKind};
use std::collections::HashMap;

/// Parse probe output into a `name -> description` map.
///
/// Later lines for the same name win.
pub fn parse_probe_output(output: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in output.lines() {
        let line = line.trim();
        let Some((name, description)) = line.split_once(": ") else {
            continue;
        };
        map.insert(normalize_probe_name(name), description.trim().to_string());
    }
    map
}

/// Strip one leading `./` and surrounding quote characters.
fn normalize_probe_name(name: &str) -> String {
    let name = name.trim();
    let name = name.strip_prefix("./").unwrap_or(name);
    name.trim_matches('\'').trim_matches('"').to_string()
}

/// Attach probe descriptions to the regular files of a listing.
pub fn enrich_entries(entries: &mut [FileEntry], probe_output: &str) {
    let hints = parse_probe_output(probe_output);
    for entry in entries.iter_mut().filter(|e| e.kind == FileKind::Regular) {
        if let Some(hint) = hints.get(&entry.name) {
            entry.content_hint = Some(hint.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::listing::parse_listing;

    fn sample_entries() -> Vec<FileEntry> {
        parse_listing(
            "\
drwxrwx--x 2 u0_a1 sdcard_rw 4096 2023-05-01 10:00 Download
-rw-rw---- 1 u0_a1 sdcard_rw 1024 2023-05-01 10:00 my file.txt
-rw-rw---- 1 u0_a1 sdcard_rw 2048 2023-05-01 10:00 base.apk
-rw-rw---- 1 u0_a1 sdcard_rw 12 2023-05-01 10:00 notes.md
lrwxrwxrwx 1 root root 7 2023-05-01 10:00 link -> base.apk
",
        )
    }

    #[test]
    fn test_parse_probe_output() {
        let map = parse_probe_output(
            "./base.apk: Zip archive data\n'my file.txt':   ASCII text\nno separator here\n",
        );
        assert_eq!(map.get("base.apk").unwrap(), "Zip archive data");
        assert_eq!(map.get("my file.txt").unwrap(), "ASCII text");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_description_may_contain_separator() {
        let map = parse_probe_output("a.sh: POSIX shell script: text executable");
        assert_eq!(map.get("a.sh").unwrap(), "POSIX shell script: text executable");
    }

    #[test]
    fn test_double_quoted_names() {
        let map = parse_probe_output("\"odd name\": data");
        assert_eq!(map.get("odd name").unwrap(), "data");
    }

    #[test]
    fn test_enrich_regular_files_only() {
        let mut entries = sample_entries();
        enrich_entries(
            &mut entries,
            "./Download: directory\n./base.apk: Zip archive data\n'my file.txt': ASCII text\n./link -> base.apk: symbolic link",
        );

        let by_name = |n: &str| entries.iter().find(|e| e.name == n).unwrap();
        assert!(by_name("Download").content_hint.is_none());
        assert_eq!(
            by_name("base.apk").content_hint.as_deref(),
            Some("Zip archive data")
        );
        assert_eq!(by_name("my file.txt").content_hint.as_deref(), Some("ASCII text"));
        assert!(by_name("notes.md").content_hint.is_none());
        assert!(by_name("link -> base.apk").content_hint.is_none());
    }

    #[test]
    fn test_garbage_probe_leaves_entries_untouched() {
        let original = sample_entries();
        let mut entries = original.clone();
        enrich_entries(&mut entries, "\u{FFFD}\u{FFFD}\nfile: cannot open `*'\n");
        assert_eq!(entries, original);
    }
}
