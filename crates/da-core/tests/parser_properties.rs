//! Property-based tests for the dump parsers.

use da_core::collect::{
    analyze_package, decode_blob, extract_content, parse_app_links, parse_devices, parse_listing,
    parse_package_list, parse_package_timestamps, parse_probe_output, FileKind, Severity, UNKNOWN,
};
use proptest::prelude::*;

fn mode_strategy() -> impl Strategy<Value = String> {
    ("[dl\\-cbps]", "[rwx\\-]{9}").prop_map(|(kind, rest)| format!("{}{}", kind, rest))
}

fn name_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[A-Za-z0-9_.]{1,12}", 1..4).prop_map(|parts| parts.join(" "))
}

fn listing_line_strategy() -> impl Strategy<Value = (String, String, String)> {
    (
        mode_strategy(),
        1u32..100_000,
        "(19|20)[0-9]{2}-[01][0-9]-[0-3][0-9]",
        "[0-2][0-9]:[0-5][0-9]",
        name_strategy(),
    )
        .prop_map(|(mode, size, date, time, name)| {
            let line = format!("{} 1 u0_a123 sdcard_rw {} {} {} {}", mode, size, date, time, name);
            (line, mode, name)
        })
}

fn domain_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,10}\\.(com|org|net)"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1_000))]

    #[test]
    fn listing_kind_matches_permission_prefix(text in "\\PC{0,400}") {
        for entry in parse_listing(&text) {
            prop_assert_eq!(entry.kind, FileKind::from_mode(&entry.permissions));
        }
    }

    #[test]
    fn listing_rows_keep_names_and_kinds(rows in prop::collection::vec(listing_line_strategy(), 0..20)) {
        let text = rows.iter().map(|(line, _, _)| line.as_str()).collect::<Vec<_>>().join("\n");
        let entries = parse_listing(&text);
        prop_assert_eq!(entries.len(), rows.len());
        for (entry, (_, mode, name)) in entries.iter().zip(&rows) {
            prop_assert_eq!(&entry.name, name);
            prop_assert_eq!(&entry.permissions, mode);
            let expected = match mode.chars().next() {
                Some('d') => FileKind::Directory,
                Some('l') => FileKind::Symlink,
                _ => FileKind::Regular,
            };
            prop_assert_eq!(entry.kind, expected);
        }
    }

    #[test]
    fn encoded_blob_round_trips(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let content = extract_content("/data/local/tmp/blob", &bytes);
        prop_assert_eq!(content.byte_length, bytes.len());
        prop_assert_eq!(decode_blob(&content.encoded_blob).unwrap(), bytes);
    }

    #[test]
    fn printable_runs_are_long_and_printable(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let content = extract_content("/x", &bytes);
        for run in &content.printable_runs {
            prop_assert!(run.chars().count() >= 4, "short run {:?}", run);
            prop_assert!(run.chars().all(|c| (' '..='~').contains(&c)), "non-printable in {:?}", run);
        }
    }

    #[test]
    fn disabled_domains_are_always_blocked(domain in domain_strategy(), code in any::<u64>()) {
        let text = format!(
            "com.example.app:\n  Domain verification state:\n    {}: {}\n  User 0:\n    Selection state:\n      Disabled:\n        {}\n",
            domain, code, domain
        );
        let report = parse_app_links(&text);
        prop_assert_eq!(report.domains.len(), 1);
        let state = &report.domains[0];
        prop_assert_eq!(&state.domain, &domain);
        prop_assert_eq!(state.code, code);
        prop_assert_eq!(state.severity, Severity::Blocked);
        prop_assert!(state.user_disabled);
        prop_assert!(state.description.ends_with(" [USER DISABLED]"));
    }

    #[test]
    fn severity_without_override_follows_code(domain in domain_strategy(), code in any::<u64>()) {
        let text = format!("Domain verification state:\n  {}: {}\n", domain, code);
        let report = parse_app_links(&text);
        prop_assert_eq!(report.domains.len(), 1);
        let expected = match code {
            1 | 2 => Severity::Ok,
            1024 => Severity::Caution,
            _ => Severity::Blocked,
        };
        prop_assert_eq!(report.domains[0].severity, expected);
        prop_assert!(!report.domains[0].user_disabled);
    }

    #[test]
    fn package_without_markers_takes_defaults(text in "[A-Za-z0-9 :\\n]{0,300}") {
        let profile = analyze_package(&text);
        prop_assert_eq!(profile.version_name.as_str(), UNKNOWN);
        prop_assert_eq!(profile.version_code.as_str(), UNKNOWN);
        prop_assert_eq!(profile.user_id.as_str(), UNKNOWN);
        prop_assert_eq!(profile.data_dir.as_str(), UNKNOWN);
        prop_assert!(profile.requested_permissions.is_empty());
        prop_assert!(profile.granted_permissions.is_empty());
        prop_assert!(profile.uri_schemes.is_empty());
        prop_assert!(profile.content_providers.is_empty());
    }

    #[test]
    fn parsers_are_total(text in "\\PC{0,500}") {
        let _ = parse_listing(&text);
        let _ = parse_probe_output(&text);
        let _ = parse_app_links(&text);
        let _ = analyze_package(&text);
        let _ = parse_devices(&text);
        let _ = parse_package_list(&text);
        let _ = parse_package_timestamps(&text);
    }

    #[test]
    fn package_sets_are_sorted(perms in prop::collection::vec("[a-z]{1,8}", 1..10)) {
        let mut dump = String::from("requested permissions:\n");
        for p in perms.iter().rev() {
            dump.push_str(&format!("  android.permission.{}\n", p.to_uppercase()));
        }
        dump.push_str("install permissions:\n");
        let profile = analyze_package(&dump);
        let listed: Vec<&String> = profile.requested_permissions.iter().collect();
        let mut sorted = listed.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(listed, sorted);
    }
}
