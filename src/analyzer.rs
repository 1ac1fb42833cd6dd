//! Static module-tree scanner.
//!
//! Walks a directory of front-end modules (any directory containing an
//! `index.js`), extracts imports, exports and test statements with text
//! patterns, counts code lines, and flags structural issues. Produces the
//! data behind the JSON report in [`crate::report`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ignore::WalkBuilder;
use regex::Regex;

use crate::report::{AnalysisReport, FilePresence, ModuleReport, Summary};

static IMPORT_REGEX: OnceLock<Regex> = OnceLock::new();
static REQUIRE_REGEX: OnceLock<Regex> = OnceLock::new();
static EXPORT_REGEXES: OnceLock<Vec<Regex>> = OnceLock::new();
static TEST_CASE_REGEXES: OnceLock<Vec<Regex>> = OnceLock::new();

fn import_regex() -> &'static Regex {
    IMPORT_REGEX.get_or_init(|| {
        Regex::new(r#"import\s+.*?\s+from\s+['"]([^'"]+)['"]"#)
            .expect("Failed to compile import regex")
    })
}

fn require_regex() -> &'static Regex {
    REQUIRE_REGEX.get_or_init(|| {
        Regex::new(r#"require\(['"]([^'"]+)['"]\)"#).expect("Failed to compile require regex")
    })
}

fn export_regexes() -> &'static [Regex] {
    EXPORT_REGEXES.get_or_init(|| {
        [
            r"export\s+(?:default\s+)?(?:function\s+)?(\w+)",
            r"export\s+\{\s*([^}]+)\s*\}",
            r"module\.exports\s*=\s*(\w+)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("Failed to compile export regex"))
        .collect()
    })
}

fn test_case_regexes() -> &'static [Regex] {
    TEST_CASE_REGEXES.get_or_init(|| {
        [r"it\s*\(", r"test\s*\(", r"describe\s*\("]
            .iter()
            .map(|p| Regex::new(p).expect("Failed to compile test-case regex"))
            .collect()
    })
}

/// Scanner for a directory tree of front-end modules.
#[derive(Debug, Clone)]
pub struct ModuleAnalyzer {
    features_dir: PathBuf,
}

impl ModuleAnalyzer {
    pub fn new(features_dir: impl Into<PathBuf>) -> Self {
        Self {
            features_dir: features_dir.into(),
        }
    }

    /// Locate all module directories: any directory under the features root
    /// containing an `index.js` entry file. Returned sorted for a stable
    /// report order.
    pub fn find_modules(&self) -> Vec<PathBuf> {
        let mut modules = Vec::new();
        if !self.features_dir.exists() {
            return modules;
        }

        for entry in WalkBuilder::new(&self.features_dir)
            .standard_filters(false)
            .build()
            .flatten()
        {
            if entry.file_name() == "index.js"
                && entry.file_type().is_some_and(|t| t.is_file())
                && let Some(parent) = entry.path().parent()
            {
                modules.push(parent.to_path_buf());
            }
        }

        modules.sort();
        modules.dedup();
        modules
    }

    /// Analyze one module directory. Only direct children are inspected;
    /// nested modules are discovered and analyzed separately.
    pub fn analyze_module(&self, module_path: &Path) -> ModuleReport {
        let name = module_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let version = module_version(module_path);

        let mut report = ModuleReport {
            name,
            version,
            path: module_path.display().to_string(),
            files: FilePresence::default(),
            lines_of_code: 0,
            test_coverage: 0,
            dependencies: Vec::new(),
            exports: Vec::new(),
            issues: Vec::new(),
        };

        let entries = match fs::read_dir(module_path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %module_path.display(), error = %e, "failed to read module directory");
                report.issues.push("Module directory unreadable".to_string());
                return report;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let file_name = entry.file_name().to_string_lossy().into_owned();

            if file_name == "index.js" {
                report.files.index = true;
                if let Some(content) = read_source(&path) {
                    report.lines_of_code += count_code_lines(&content);
                    report.dependencies.extend(extract_dependencies(&content));
                    report.exports.extend(extract_exports(&content));
                }
            } else if file_name.ends_with(".test.js") {
                report.files.test = true;
                if let Some(content) = read_source(&path) {
                    report.test_coverage = estimate_test_coverage(&content);
                }
            } else if file_name.ends_with(".js") {
                report.files.component = true;
                if let Some(content) = read_source(&path) {
                    report.lines_of_code += count_code_lines(&content);
                    report.dependencies.extend(extract_dependencies(&content));
                }
            } else if file_name.eq_ignore_ascii_case("readme.md") {
                report.files.readme = true;
            } else if file_name == "config.json" {
                report.files.config = true;
            }
        }

        report.dependencies.sort();
        report.dependencies.dedup();
        report.exports.sort();
        report.exports.dedup();

        if !report.files.index {
            report.issues.push("Missing index.js".to_string());
        }
        if !report.files.test {
            report.issues.push("Missing tests".to_string());
        }
        if !report.files.readme {
            report.issues.push("Missing README documentation".to_string());
        }
        if report.lines_of_code == 0 {
            report.issues.push("No code".to_string());
        }

        report
    }

    /// Run the full analysis and assemble the report.
    pub fn run(&self) -> AnalysisReport {
        let modules: Vec<ModuleReport> = self
            .find_modules()
            .iter()
            .map(|path| self.analyze_module(path))
            .collect();

        let summary = Summary::from_modules(&modules);
        AnalysisReport {
            timestamp: chrono::Local::now().to_rfc3339(),
            total_modules: modules.len(),
            modules,
            summary,
        }
    }
}

/// Module version from the directory layout `feature/<version>/<module>`:
/// the parent directory name when it looks like a version, else "unknown".
fn module_version(module_path: &Path) -> String {
    module_path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| n.starts_with("0.") || n.starts_with("1.") || n.starts_with('v'))
        .unwrap_or_else(|| "unknown".to_string())
}

fn read_source(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read source file");
            None
        }
    }
}

/// Count code lines, skipping blanks, `//` comments and `/* */` blocks.
pub fn count_code_lines(content: &str) -> usize {
    let mut code_lines = 0;
    let mut in_block_comment = false;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.contains("/*") {
            in_block_comment = true;
        }
        if line.contains("*/") {
            in_block_comment = false;
            continue;
        }
        if in_block_comment {
            continue;
        }
        if line.starts_with("//") {
            continue;
        }

        code_lines += 1;
    }

    code_lines
}

/// Extract imported module paths from `import ... from '...'` and
/// `require('...')` statements.
pub fn extract_dependencies(content: &str) -> Vec<String> {
    let mut dependencies = Vec::new();
    for caps in import_regex().captures_iter(content) {
        dependencies.push(caps[1].to_string());
    }
    for caps in require_regex().captures_iter(content) {
        dependencies.push(caps[1].to_string());
    }
    dependencies
}

/// Extract exported names from `export` / `module.exports` statements.
pub fn extract_exports(content: &str) -> Vec<String> {
    let mut exports = Vec::new();
    for regex in export_regexes() {
        for caps in regex.captures_iter(content) {
            exports.push(caps[1].trim().to_string());
        }
    }
    exports
}

/// Rough coverage estimate tiered by the number of test cases found.
pub fn estimate_test_coverage(content: &str) -> u32 {
    let total_tests: usize = test_case_regexes()
        .iter()
        .map(|regex| regex.find_iter(content).count())
        .sum();

    match total_tests {
        t if t > 20 => 90,
        t if t > 10 => 70,
        t if t > 5 => 50,
        t if t > 0 => 30,
        _ => 0,
    }
}
