//! Rendering a validated form for the terminal.

use serde::Serialize;
use trellis_form::{FormNode, ValidationReport};

#[derive(Debug, Serialize)]
pub struct ErrorEntry {
    /// Node the error is attached to.
    pub form: String,
    /// Property path the evaluator reported.
    pub path: String,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct Outcome {
    pub valid: bool,
    pub errors: Vec<ErrorEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ValidationReport>,
}

impl Outcome {
    pub fn from_form(form: &FormNode) -> Self {
        let mut errors = Vec::new();
        collect(form, &mut errors);
        Self {
            valid: form.is_valid(),
            errors,
            report: form.validation_report().cloned(),
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for error in &self.errors {
            let path = if error.path.is_empty() { "-" } else { &error.path };
            out.push_str(&format!("{}: {} ({}) [{}]\n", error.form, error.message, error.code, path));
        }
        if self.valid {
            out.push_str("valid\n");
        } else {
            let unmapped = self.report.as_ref().map_or(0, |r| r.unmapped);
            out.push_str(&format!("invalid: {} error(s), {unmapped} unmapped\n", self.errors.len()));
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn collect(node: &FormNode, out: &mut Vec<ErrorEntry>) {
    for violation in node.get_errors(false) {
        out.push(ErrorEntry {
            form: node.path_display(),
            path: violation.property_path.to_string(),
            code: violation.cause.code.to_string(),
            message: violation.message.to_string(),
        });
    }
    for child in node.children() {
        collect(child, out);
    }
}
