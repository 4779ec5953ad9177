use crate::config::{ConfigError, Profile};
use crate::core::AgentResult;
use crate::memory::ScratchpadEntry;
use colored::Colorize;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_ITERATIONS: u8 = 3;
pub const EXIT_GATEWAY: u8 = 4;
pub const EXIT_TOOL: u8 = 5;

const CODE_BANNERS: (&str, &str) = ("--- GENERATED CODE ---", "--- END OF GENERATED CODE ---");
const COMPONENT_BANNERS: (&str, &str) = (
    "=== Generated Component Code ===",
    "================================",
);
const PROGRESS_PREVIEW_CHARS: usize = 80;

pub fn exit_code(result: &AgentResult) -> u8 {
    match result {
        AgentResult::Success(_) => EXIT_SUCCESS,
        AgentResult::BoundedIterationFailure { .. } => EXIT_ITERATIONS,
        AgentResult::GatewayError(_) => EXIT_GATEWAY,
        AgentResult::ToolError { .. } => EXIT_TOOL,
    }
}

/// Strips `<result>` wrappers some models put around their answer.
pub fn clean_output(text: &str) -> String {
    text.replace("<result>", "")
        .replace("</result>", "")
        .trim()
        .to_string()
}

/// Rendered output of a run, ready to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub exit_code: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct ResultReporter {
    color: bool,
    banners: (&'static str, &'static str),
}

impl ResultReporter {
    pub fn new(color: bool) -> Self {
        Self {
            color,
            banners: CODE_BANNERS,
        }
    }

    /// Design-system output is framed as a component rather than plain code.
    pub fn for_profile(mut self, profile: Profile) -> Self {
        self.banners = match profile {
            Profile::DesignSystem => COMPONENT_BANNERS,
            Profile::Codegen | Profile::Plain => CODE_BANNERS,
        };
        self
    }

    fn heading(&self, text: &str) -> String {
        if self.color {
            text.green().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn error_label(&self) -> String {
        if self.color {
            "Error:".red().bold().to_string()
        } else {
            "Error:".to_string()
        }
    }

    fn failure(&self, message: String, exit_code: u8) -> Report {
        Report {
            stdout: None,
            stderr: Some(format!("{} {}", self.error_label(), message)),
            exit_code,
        }
    }

    pub fn render(&self, result: &AgentResult) -> Report {
        let code = exit_code(result);
        match result {
            AgentResult::Success(text) => Report {
                stdout: Some(format!(
                    "\n{}\n\n{}\n\n{}",
                    self.heading(self.banners.0),
                    clean_output(text),
                    self.heading(self.banners.1)
                )),
                stderr: None,
                exit_code: code,
            },
            AgentResult::BoundedIterationFailure { max_iterations } => self.failure(
                format!(
                    "agent stopped after {} iterations without a final answer.",
                    max_iterations
                ),
                code,
            ),
            AgentResult::GatewayError(cause) => {
                self.failure(format!("model request failed: {}", cause), code)
            }
            AgentResult::ToolError { tool, cause } => {
                self.failure(format!("tool {} failed: {}", tool, cause), code)
            }
        }
    }

    pub fn render_config_error(&self, error: &ConfigError) -> Report {
        let mut report = self.failure(error.to_string(), EXIT_CONFIG);
        if matches!(error, ConfigError::EmptyQuery) {
            if let Some(stderr) = report.stderr.as_mut() {
                stderr.push_str("\nExample: codegen-agent \"create a simple login form in react\"");
            }
        }
        report
    }

    /// One line describing a finished tool call.
    pub fn progress_line(&self, entry: &ScratchpadEntry) -> String {
        let observation = entry.observation_text().replace('\n', " ");
        let preview: String = observation.chars().take(PROGRESS_PREVIEW_CHARS).collect();
        let ellipsis = if observation.chars().count() > PROGRESS_PREVIEW_CHARS {
            "..."
        } else {
            ""
        };
        let marker = match (entry.is_failure(), self.color) {
            (true, true) => "[tool failed]".yellow().to_string(),
            (true, false) => "[tool failed]".to_string(),
            (false, true) => "[tool]".cyan().to_string(),
            (false, false) => "[tool]".to_string(),
        };

        format!(
            "{} {}({}) -> {}{}",
            marker, entry.tool, entry.arguments, preview, ellipsis
        )
    }

    pub fn emit(&self, report: &Report) {
        if let Some(stdout) = &report.stdout {
            println!("{}", stdout);
        }
        if let Some(stderr) = &report.stderr {
            eprintln!("{}", stderr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{FailureKind, ToolOutcome};
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(AgentResult::Success(String::new()), EXIT_SUCCESS)]
    #[case(AgentResult::BoundedIterationFailure { max_iterations: 5 }, EXIT_ITERATIONS)]
    #[case(AgentResult::GatewayError("down".to_string()), EXIT_GATEWAY)]
    #[case(AgentResult::ToolError { tool: "t".to_string(), cause: "c".to_string() }, EXIT_TOOL)]
    fn test_exit_codes_are_distinct(#[case] result: AgentResult, #[case] expected: u8) {
        assert_eq!(exit_code(&result), expected);
        assert_eq!(ResultReporter::new(false).render(&result).exit_code, expected);
    }

    #[test]
    fn test_clean_output() {
        assert_eq!(clean_output("  <result>\nconst a = 1;\n</result>\n"), "const a = 1;");
    }

    #[test]
    fn test_render_success_prints_banners_to_stdout() {
        let report = ResultReporter::new(false).render(&AgentResult::Success(
            "<result>export default App;</result>".to_string(),
        ));

        assert_eq!(
            report.stdout.as_deref(),
            Some("\n--- GENERATED CODE ---\n\nexport default App;\n\n--- END OF GENERATED CODE ---")
        );
        assert!(report.stderr.is_none());
    }

    #[test]
    fn test_design_system_uses_component_banners() {
        let result = AgentResult::Success("export default Screen;".to_string());

        let report = ResultReporter::new(false)
            .for_profile(Profile::DesignSystem)
            .render(&result);
        assert_eq!(
            report.stdout.as_deref(),
            Some("\n=== Generated Component Code ===\n\nexport default Screen;\n\n================================")
        );

        let report = ResultReporter::new(false).for_profile(Profile::Plain).render(&result);
        assert!(report.stdout.unwrap().starts_with("\n--- GENERATED CODE ---"));
    }

    #[test]
    fn test_render_failures_go_to_stderr() {
        let reporter = ResultReporter::new(false);

        let report = reporter.render(&AgentResult::BoundedIterationFailure { max_iterations: 30 });
        assert!(report.stdout.is_none());
        assert_eq!(
            report.stderr.as_deref(),
            Some("Error: agent stopped after 30 iterations without a final answer.")
        );

        let report = reporter.render(&AgentResult::GatewayError("Rate limited: slow".to_string()));
        assert_eq!(
            report.stderr.as_deref(),
            Some("Error: model request failed: Rate limited: slow")
        );
    }

    #[test]
    fn test_render_config_error() {
        let reporter = ResultReporter::new(false);

        let report = reporter.render_config_error(&ConfigError::MissingCredential {
            var: "OPENAI_API_KEY",
        });
        assert_eq!(report.exit_code, EXIT_CONFIG);
        assert_eq!(
            report.stderr.as_deref(),
            Some("Error: OPENAI_API_KEY environment variable is not set.")
        );

        let report = reporter.render_config_error(&ConfigError::EmptyQuery);
        assert!(report.stderr.unwrap().contains("Example:"));
    }

    #[test]
    fn test_progress_line() {
        let reporter = ResultReporter::new(false);
        let mut entry = ScratchpadEntry {
            iteration: 0,
            call_id: "call_0_0".to_string(),
            tool: "getWeather".to_string(),
            arguments: json!({"location": "Delhi"}),
            outcome: ToolOutcome::Observation("sunny, 35°C".to_string()),
        };

        assert_eq!(
            reporter.progress_line(&entry),
            r#"[tool] getWeather({"location":"Delhi"}) -> sunny, 35°C"#
        );

        entry.outcome = ToolOutcome::Failure {
            kind: FailureKind::Execution,
            message: "x".repeat(100),
        };
        let line = reporter.progress_line(&entry);
        assert!(line.starts_with("[tool failed] getWeather"));
        assert!(line.ends_with("..."));
    }
}
