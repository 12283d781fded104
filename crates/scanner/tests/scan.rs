use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use mmbake_common::error::MmbakeError;
use mmbake_scanner::{Definition, DefinitionScanner, ScanOptions};
use proptest::prelude::*;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn scan_all(root: &Path, options: ScanOptions) -> Vec<Definition> {
    DefinitionScanner::new(root, options)
        .expect("root should be scannable")
        .collect::<Result<Vec<_>, _>>()
        .expect("scan should succeed")
}

#[test]
fn empty_tree_yields_nothing() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("a/b/c")).unwrap();
    assert!(scan_all(dir.path(), ScanOptions::default()).is_empty());
}

#[test]
fn finds_nested_definitions_and_skips_other_files() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "flow.mermaid", "graph TD; A-->B");
    write(dir.path(), "readme.txt", "not a diagram");
    write(dir.path(), "nested/deeper/seq.mermaid", "sequenceDiagram\nA->>B: hi");
    write(dir.path(), "nested/flow.mermaid.bak", "graph TD; X-->Y");

    let defs = scan_all(dir.path(), ScanOptions::default());
    let names: BTreeSet<_> = defs.iter().map(|d| d.output_name().to_string()).collect();
    assert_eq!(
        names,
        BTreeSet::from(["flow".to_string(), "seq".to_string()])
    );

    let seq = defs.iter().find(|d| d.output_name() == "seq").unwrap();
    assert_eq!(seq.text(), "sequenceDiagram\nA->>B: hi");
    assert!(seq.source_file().ends_with("nested/deeper/seq.mermaid"));
}

#[test]
fn custom_extension_is_honoured() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.mmd", "graph TD; A-->B");
    write(dir.path(), "b.mermaid", "graph TD; A-->B");

    let defs = scan_all(
        dir.path(),
        ScanOptions {
            extension: "mmd".to_string(),
            shortcodes: false,
        },
    );
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].output_name(), "a");
}

#[test]
fn markdown_is_only_scanned_with_shortcodes_enabled() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "docs/guide.md",
        "{{< mermaid context=\"login\" >}}graph TD; A-->B{{< /mermaid >}}",
    );

    assert!(scan_all(dir.path(), ScanOptions::default()).is_empty());

    let defs = scan_all(
        dir.path(),
        ScanOptions {
            shortcodes: true,
            ..ScanOptions::default()
        },
    );
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].output_name(), "login");
}

#[test]
fn non_utf8_definition_is_decoded_lossily() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "good.mermaid", "graph TD; A-->B");
    fs::write(dir.path().join("latin1.mermaid"), b"graph TD; A[Caf\xe9]-->B").unwrap();

    let defs = scan_all(dir.path(), ScanOptions::default());
    assert_eq!(defs.len(), 2);

    let latin1 = defs.iter().find(|d| d.output_name() == "latin1").unwrap();
    assert_eq!(latin1.text(), "graph TD; A[Caf\u{FFFD}]-->B");
}

#[test]
fn non_utf8_markdown_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.mermaid", "graph TD; A-->B");
    fs::write(dir.path().join("notes.md"), b"\xff\xfe# UTF-16 notes").unwrap();
    write(
        dir.path(),
        "guide.md",
        "{{< mermaid context=\"login\" >}}graph TD; A-->B{{< /mermaid >}}",
    );

    let defs = scan_all(
        dir.path(),
        ScanOptions {
            shortcodes: true,
            ..ScanOptions::default()
        },
    );
    let names: BTreeSet<_> = defs.iter().map(|d| d.output_name().to_string()).collect();
    assert_eq!(
        names,
        BTreeSet::from(["a".to_string(), "login".to_string()])
    );
}

#[cfg(unix)]
#[test]
fn unreadable_definition_aborts_the_scan() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "bad.mermaid", "graph TD; A-->B");
    let bad = dir.path().join("bad.mermaid");
    fs::set_permissions(&bad, fs::Permissions::from_mode(0o000)).unwrap();

    // Root can read anything; nothing to assert in that environment.
    if fs::read_to_string(&bad).is_ok() {
        return;
    }

    let mut scanner = DefinitionScanner::new(dir.path(), ScanOptions::default()).unwrap();
    match scanner.next() {
        Some(Err(MmbakeError::Filesystem { path, .. })) => assert_eq!(path, bad),
        other => panic!("expected filesystem error, got {other:?}"),
    }
    assert!(scanner.next().is_none());
}

fn tree_strategy() -> impl Strategy<Value = Vec<(String, bool)>> {
    let segment = "[a-z]{1,6}";
    let entry = (
        prop::collection::vec(segment, 0..3),
        "[a-z]{1,8}",
        any::<bool>(),
    )
        .prop_map(|(dirs, stem, is_definition)| {
            let ext = if is_definition { "mermaid" } else { "txt" };
            let mut path = dirs.join("/");
            if !path.is_empty() {
                path.push('/');
            }
            path.push_str(&format!("{stem}.{ext}"));
            (path, is_definition)
        });
    prop::collection::vec(entry, 0..24)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn one_record_per_matching_file(entries in tree_strategy()) {
        let dir = tempfile::tempdir().unwrap();
        let mut expected = BTreeSet::new();
        for (relative, is_definition) in &entries {
            // A generated file path may collide with a generated directory.
            let path = dir.path().join(relative);
            if path.is_dir() || path.ancestors().skip(1).any(|a| a.is_file()) {
                continue;
            }
            write(dir.path(), relative, "graph TD; A-->B");
            if *is_definition {
                expected.insert(path);
            }
        }

        let found: BTreeSet<_> = scan_all(dir.path(), ScanOptions::default())
            .into_iter()
            .map(|d| d.source_file().to_path_buf())
            .collect();
        prop_assert_eq!(found, expected);
    }
}
