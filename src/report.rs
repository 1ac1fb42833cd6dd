//! Analyzer report types and rendering.
//!
//! The JSON artifact is the analyzer's one output: a timestamped list of
//! per-module results plus aggregate statistics. The human-readable summary
//! printed to the terminal is a convenience view over the same data.

use serde::{Deserialize, Serialize};

/// Which of the expected files a module directory contains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePresence {
    pub index: bool,
    pub component: bool,
    pub test: bool,
    pub readme: bool,
    pub config: bool,
}

/// Analysis result for a single module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleReport {
    pub name: String,
    pub version: String,
    pub path: String,
    pub files: FilePresence,
    pub lines_of_code: usize,
    pub test_coverage: u32,
    pub dependencies: Vec<String>,
    pub exports: Vec<String>,
    pub issues: Vec<String>,
}

/// Aggregate statistics over all analyzed modules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    pub total_modules: usize,
    pub modules_with_tests: usize,
    pub modules_with_docs: usize,
    pub test_coverage_percentage: f64,
    pub documentation_percentage: f64,
    pub total_lines_of_code: usize,
    pub average_test_coverage: f64,
    pub modules_with_issues: usize,
}

impl Summary {
    pub fn from_modules(modules: &[ModuleReport]) -> Self {
        let total_modules = modules.len();
        let modules_with_tests = modules.iter().filter(|m| m.files.test).count();
        let modules_with_docs = modules.iter().filter(|m| m.files.readme).count();
        let total_lines_of_code = modules.iter().map(|m| m.lines_of_code).sum();
        let coverage_sum: u32 = modules.iter().map(|m| m.test_coverage).sum();
        let denominator = total_modules.max(1) as f64;

        Self {
            total_modules,
            modules_with_tests,
            modules_with_docs,
            test_coverage_percentage: round1(modules_with_tests as f64 / denominator * 100.0),
            documentation_percentage: round1(modules_with_docs as f64 / denominator * 100.0),
            total_lines_of_code,
            average_test_coverage: round1(coverage_sum as f64 / denominator),
            modules_with_issues: modules.iter().filter(|m| !m.issues.is_empty()).count(),
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// The complete report written to disk as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub timestamp: String,
    pub total_modules: usize,
    pub modules: Vec<ModuleReport>,
    pub summary: Summary,
}

/// Terminal renderer for the report; colors are enabled only on a TTY.
pub struct ReportPrinter {
    show_colors: bool,
}

impl ReportPrinter {
    pub fn new() -> Self {
        Self {
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    #[cfg(test)]
    fn plain() -> Self {
        Self { show_colors: false }
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_module_line(&self, module: &ModuleReport) -> String {
        let marker = if module.issues.is_empty() {
            self.colorize("ok", "32")
        } else {
            self.colorize("!!", "33")
        };
        let mut line = format!(
            "  [{}] {} v{} ({} LOC)",
            marker, module.name, module.version, module.lines_of_code
        );
        for issue in &module.issues {
            line.push_str(&format!("\n       {}", self.colorize(issue, "33")));
        }
        line
    }

    pub fn format_summary(&self, summary: &Summary) -> String {
        let mut out = String::new();
        out.push_str("Analysis Summary:\n");
        out.push_str(&format!("  Total modules: {}\n", summary.total_modules));
        out.push_str(&format!(
            "  {} {} ({:.1}%)\n",
            self.colorize("With tests:", "32"),
            summary.modules_with_tests,
            summary.test_coverage_percentage
        ));
        out.push_str(&format!(
            "  {} {} ({:.1}%)\n",
            self.colorize("With docs:", "32"),
            summary.modules_with_docs,
            summary.documentation_percentage
        ));
        out.push_str(&format!(
            "  Total lines of code: {}\n",
            summary.total_lines_of_code
        ));
        out.push_str(&format!(
            "  Average test coverage: {:.1}%\n",
            summary.average_test_coverage
        ));
        if summary.modules_with_issues > 0 {
            out.push_str(&format!(
                "  {} {}\n",
                self.colorize("With issues:", "31"),
                summary.modules_with_issues
            ));
        }

        let recommendations = self.recommendations(summary);
        if !recommendations.is_empty() {
            out.push_str("\nRecommendations:\n");
            for recommendation in recommendations {
                out.push_str(&format!("  - {}\n", self.colorize(&recommendation, "33")));
            }
        }

        out
    }

    fn recommendations(&self, summary: &Summary) -> Vec<String> {
        let mut recommendations = Vec::new();
        if summary.test_coverage_percentage < 80.0 {
            recommendations.push("Add tests to modules without them".to_string());
        }
        if summary.documentation_percentage < 90.0 {
            recommendations.push("Add README documentation to modules".to_string());
        }
        if summary.modules_with_issues > 0 {
            recommendations.push("Fix flagged module issues".to_string());
        }
        recommendations
    }
}

impl Default for ReportPrinter {
    fn default() -> Self {
        Self::new()
    }
}
