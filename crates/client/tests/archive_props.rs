//! Property tests for root confinement of the submission archive.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use proptest::prelude::*;

use nelson_client::{build_archive, NelsonError};

fn rel_path() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,6}", 1..4)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn files_under_root_keep_relative_names(paths in prop::collection::vec(rel_path(), 1..6)) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir(&root).unwrap();

        // A path can't be both a file and a parent directory; keep the first
        // one that fits.
        let mut declared = Vec::new();
        let mut expected = BTreeSet::new();
        for parts in &paths {
            let rel: PathBuf = parts.iter().collect();
            let abs = root.join(&rel);
            let blocked = abs.ancestors().skip(1).any(|a| a.is_file()) || abs.is_dir();
            if blocked {
                continue;
            }
            fs::create_dir_all(abs.parent().unwrap()).unwrap();
            fs::write(&abs, parts.join("-")).unwrap();
            declared.push(abs);
            expected.insert(parts.join("/"));
        }

        let archive = dir.path().join("student.zip");
        build_archive(&root, &declared, 8 << 20, &archive).unwrap();

        let zip = zip::ZipArchive::new(fs::File::open(&archive).unwrap()).unwrap();
        let names: BTreeSet<String> = zip.file_names().map(String::from).collect();
        prop_assert_eq!(names, expected);
    }

    #[test]
    fn parent_traversal_always_escapes(name in "[a-z]{1,8}", depth in 1usize..4) {
        let dir = tempfile::tempdir().unwrap();
        let mut root = dir.path().join("top");
        for i in 0..depth {
            root = root.join(format!("d{}", i));
        }
        fs::create_dir_all(&root).unwrap();

        let outside = dir.path().join(format!("{}.txt", name));
        fs::write(&outside, b"outside").unwrap();

        let mut sneaky = root.clone();
        for _ in 0..=depth {
            sneaky = sneaky.join("..");
        }
        let sneaky = sneaky.join(format!("{}.txt", name));

        let archive = dir.path().join("student.zip");
        let result = build_archive(&root, &[sneaky], 8 << 20, &archive);
        let is_path_escape = matches!(result, Err(NelsonError::PathEscape { .. }));
        prop_assert!(is_path_escape);
        prop_assert!(!archive.exists());
    }
}
