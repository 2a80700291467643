// src/config/assemble.rs

//! Turn a validated model file into a model class of [`CommandTask`]s.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::model::{ModelFile, TaskConfig};
use crate::dag::Dependency;
use crate::errors::{Result, TaskdagError};
use crate::model::{ModelBuilder, ModelClass};
use crate::task::{CommandTask, TaskCore};

fn command_task(name: &str, tc: &TaskConfig) -> CommandTask {
    let core = TaskCore::new(name).with_repeat(tc.repeat_policy());
    let mut task = CommandTask::new(core, tc.cmd.clone()).with_env(tc.env.clone());
    if let Some(undo) = &tc.undo {
        task = task.with_undo(undo.clone());
    }
    task
}

impl ModelFile {
    /// Register every task (expanding `roles` templates) and turn each
    /// `after` list into `group(after...) | task`.
    pub fn to_model_class(&self) -> Result<ModelClass> {
        let mut builder = ModelBuilder::new(self.model.name.clone());
        let mut handles: BTreeMap<&str, Dependency> = BTreeMap::new();

        for (name, tc) in self.task.iter() {
            let task = command_task(name, tc);
            let handle = match &tc.roles {
                Some(roles) => builder.add_template(&task, roles.as_slice()),
                None => builder.add_task(task),
            };
            handles.insert(name.as_str(), handle);
        }

        for (name, tc) in self.task.iter() {
            if tc.after.is_empty() {
                continue;
            }
            let lookup = |n: &str| {
                handles
                    .get(n)
                    .cloned()
                    .ok_or_else(|| TaskdagError::UnknownTask(n.to_string()))
            };
            let before = tc
                .after
                .iter()
                .map(|dep| lookup(dep.as_str()))
                .collect::<Result<Vec<_>>>()?;
            builder.add_dependency(Dependency::group(before) | lookup(name.as_str())?);
        }

        debug!(model = %self.model.name, "assembled model class from file");
        builder.build()
    }
}
