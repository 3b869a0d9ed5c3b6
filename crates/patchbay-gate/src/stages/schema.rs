use std::sync::Arc;

use patchbay_types::is_root_field;
use tracing::debug;

use crate::error::GateError;
use crate::schema::Validator;
use crate::stage::{Candidate, GateStage, StageDecision};

/// Validates whole documents against the schema registered for their
/// category.
///
/// Applies to [`Candidate::Document`] and to queued root-field changes that
/// carry a next document. Slim changes and partial-field edits are skipped.
pub struct SchemaStage {
    validator: Arc<dyn Validator>,
}

impl SchemaStage {
    pub fn new(validator: Arc<dyn Validator>) -> Self {
        Self { validator }
    }
}

impl GateStage for SchemaStage {
    fn name(&self) -> &str {
        "schema"
    }

    fn evaluate(&self, candidate: &Candidate<'_>) -> Result<StageDecision, GateError> {
        let document = match candidate {
            Candidate::Document { value, .. } => *value,
            Candidate::Snapshot(change) if is_root_field(&change.field) => match &change.new {
                Some(value) => value,
                None => return Ok(StageDecision::Pass),
            },
            _ => return Ok(StageDecision::Pass),
        };

        let category = candidate.category();
        let Some(schema) = self.validator.schema_for(category) else {
            debug!(category, "no schema registered");
            return Ok(StageDecision::Pass);
        };

        match schema.parse(document) {
            Ok(_) => Ok(StageDecision::Pass),
            Err(issues) => Ok(StageDecision::Fail { issues }),
        }
    }
}
