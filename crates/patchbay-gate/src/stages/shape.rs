use patchbay_types::{field_path, is_root_field, ChangeType, FieldIssue};

use crate::error::GateError;
use crate::stage::{Candidate, GateStage, StageDecision};

/// Structural validation stage.
///
/// Checks that identifiers are present and safe to use as path components,
/// that the field path parses, and that the change representation is
/// internally consistent. Reports every problem it finds, not just the first.
pub struct ShapeStage;

/// Issues for an identifier that ends up as a file or directory name.
fn name_issues(field: &str, value: &str, issues: &mut Vec<FieldIssue>) {
    if value.trim().is_empty() {
        issues.push(FieldIssue::new(field, "must not be empty"));
        return;
    }
    if value.contains('/') || value.contains('\\') {
        issues.push(FieldIssue::new(field, "must not contain path separators"));
    }
    if value.contains("..") {
        issues.push(FieldIssue::new(field, "must not contain '..'"));
    }
}

fn field_issues(field: &str, issues: &mut Vec<FieldIssue>) {
    if let Err(e) = field_path(field) {
        issues.push(FieldIssue::new("field", e.to_string()));
    }
}

impl GateStage for ShapeStage {
    fn name(&self) -> &str {
        "shape"
    }

    fn evaluate(&self, candidate: &Candidate<'_>) -> Result<StageDecision, GateError> {
        let mut issues = Vec::new();
        match candidate {
            Candidate::Snapshot(change) => {
                name_issues("target_id", &change.target_id, &mut issues);
                name_issues("category", &change.category, &mut issues);
                field_issues(&change.field, &mut issues);
                if change.old.is_none() && change.new.is_none() {
                    issues.push(FieldIssue::new("new", "old and new cannot both be absent"));
                }
            }
            Candidate::Slim(change) => {
                name_issues("target_id", &change.target_id, &mut issues);
                name_issues("category", &change.category, &mut issues);
                field_issues(&change.field, &mut issues);
                let whole_document = is_root_field(&change.field)
                    && matches!(change.change_type, ChangeType::Add | ChangeType::Delete);
                if whole_document && !change.diffs.is_empty() {
                    issues.push(FieldIssue::new(
                        "diffs",
                        format!("must be empty for a whole-document {}", change.change_type),
                    ));
                }
            }
            Candidate::Document { category, value } => {
                name_issues("category", category, &mut issues);
                if value.is_null() {
                    issues.push(FieldIssue::new("", "document must not be null"));
                }
            }
        }
        Ok(StageDecision::from_issues(issues))
    }
}
