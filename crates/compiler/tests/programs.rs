//! Runs the committed .tau corpus through the manifest harness.

use std::path::Path;

use tauc::{TestManifest, TestRunner};

#[test]
fn test_program_corpus() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/programs");
    let manifest = TestManifest::load(&dir.join("manifest.toml")).unwrap();
    assert!(!manifest.cases.is_empty());

    let summary = TestRunner::new(false).run(&manifest, &dir);
    let failures: Vec<String> = summary
        .results
        .iter()
        .filter(|r| !r.passed)
        .map(|r| {
            format!(
                "{}: {}",
                r.file,
                r.detail.as_deref().unwrap_or("<no detail>")
            )
        })
        .collect();
    assert_eq!(
        summary.failed,
        0,
        "{} of {} case(s) failed:\n{}",
        summary.failed,
        summary.total,
        failures.join("\n")
    );
}
