//! Stage domain model and selection

use crate::core::condition::Condition;
use crate::core::context::RunContext;
use std::collections::HashSet;
use tracing::debug;

/// A single stage of the pipeline being prefetched for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Stage name (not unique)
    pub name: String,

    /// Image reference the stage runs in
    pub container_image: String,

    /// When-clause source; empty means the stage never runs
    pub when: String,
}

impl Stage {
    pub fn new(
        name: impl Into<String>,
        container_image: impl Into<String>,
        when: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            container_image: container_image.into(),
            when: when.into(),
        }
    }

    /// Whether the stage's when-clause passes for this run
    ///
    /// Any compile or evaluation error counts as "does not run".
    pub fn will_run(&self, ctx: &RunContext) -> bool {
        match Condition::compile(&self.when).and_then(|c| c.evaluate(ctx)) {
            Ok(result) => {
                if !result {
                    debug!(stage = %self.name, when = %self.when, "Stage skipped, condition is false");
                }
                result
            }
            Err(e) => {
                debug!(stage = %self.name, when = %self.when, error = %e, "Stage skipped, condition did not evaluate");
                false
            }
        }
    }
}

/// Select the stages that will run, keeping the first stage for each image
///
/// Relative order of the input is preserved.
pub fn select_stages(stages: &[Stage], ctx: &RunContext) -> Vec<Stage> {
    let mut seen_images = HashSet::new();
    let mut selected = Vec::new();

    for stage in stages {
        if !stage.will_run(ctx) {
            continue;
        }

        if stage.container_image.is_empty() {
            debug!(stage = %stage.name, "Stage has no container image, nothing to prefetch");
            continue;
        }

        if seen_images.insert(stage.container_image.as_str()) {
            selected.push(stage.clone());
        } else {
            debug!(stage = %stage.name, image = %stage.container_image, "Image already selected by an earlier stage");
        }
    }

    selected
}

/// Image references of a stage list, in order
pub fn container_images(stages: &[Stage]) -> Vec<String> {
    stages.iter().map(|s| s.container_image.clone()).collect()
}
