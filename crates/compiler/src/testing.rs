//! Whole-program test harness
//!
//! Runs `.tau` programs end to end (compile, execute, capture stdout)
//! against a TOML manifest of expectations:
//!
//! ```toml
//! [[case]]
//! file = "fact.tau"
//! stdout = "120\n"
//!
//! [[case]]
//! file = "undefined.tau"
//! error = "Undefined identifier"
//! ```
//!
//! A case with `stdout` must compile, run, balance the stack pointer, and
//! match its output byte for byte. A case with `error` must fail to
//! compile with a message containing the given text. File paths are
//! relative to the manifest's directory.

use std::fs;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TestManifest {
    #[serde(rename = "case", default)]
    pub cases: Vec<TestCase>,
}

#[derive(Debug, Deserialize)]
pub struct TestCase {
    /// Program path, relative to the manifest.
    pub file: String,
    /// Positional integer arguments for the program.
    #[serde(default)]
    pub args: Vec<String>,
    /// Expected stdout, byte for byte.
    #[serde(default)]
    pub stdout: Option<String>,
    /// Expected compile-error fragment.
    #[serde(default)]
    pub error: Option<String>,
}

impl TestManifest {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
    }
}

/// Outcome of one case.
#[derive(Debug)]
pub struct CaseResult {
    pub file: String,
    pub passed: bool,
    /// Failure description when `passed` is false.
    pub detail: Option<String>,
}

/// Outcome of a whole manifest run.
#[derive(Debug, Default)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<CaseResult>,
}

pub struct TestRunner {
    pub verbose: bool,
}

impl TestRunner {
    pub fn new(verbose: bool) -> Self {
        TestRunner { verbose }
    }

    /// Run every case in `manifest`, resolving files against `base_dir`.
    pub fn run(&self, manifest: &TestManifest, base_dir: &Path) -> TestSummary {
        let mut summary = TestSummary::default();
        for case in &manifest.cases {
            let outcome = self.run_case(case, base_dir);
            summary.total += 1;
            match outcome {
                Ok(()) => {
                    summary.passed += 1;
                    if self.verbose {
                        eprintln!("PASS {}", case.file);
                    }
                    summary.results.push(CaseResult {
                        file: case.file.clone(),
                        passed: true,
                        detail: None,
                    });
                }
                Err(detail) => {
                    summary.failed += 1;
                    if self.verbose {
                        eprintln!("FAIL {}: {}", case.file, detail);
                    }
                    summary.results.push(CaseResult {
                        file: case.file.clone(),
                        passed: false,
                        detail: Some(detail),
                    });
                }
            }
        }
        summary
    }

    fn run_case(&self, case: &TestCase, base_dir: &Path) -> Result<(), String> {
        let path = base_dir.join(&case.file);
        let source = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        match crate::compile(&source) {
            Err(e) => {
                let rendered = e.to_string();
                match &case.error {
                    Some(want) if rendered.contains(want.as_str()) => Ok(()),
                    Some(want) => Err(format!(
                        "expected error containing {:?}, got {:?}",
                        want, rendered
                    )),
                    None => Err(format!("compile error: {}", rendered)),
                }
            }
            Ok(insns) => {
                if let Some(want) = &case.error {
                    return Err(format!(
                        "expected error containing {:?}, but compilation succeeded",
                        want
                    ));
                }
                let mut out = Vec::new();
                tau_vm::invoke(insns, &case.args, false, &mut out)
                    .map_err(|e| format!("runtime error: {}", e))?;
                let got = String::from_utf8_lossy(&out).into_owned();
                let want = case.stdout.clone().unwrap_or_default();
                if got == want {
                    Ok(())
                } else {
                    Err(format!("stdout mismatch: expected {:?}, got {:?}", want, got))
                }
            }
        }
    }
}
