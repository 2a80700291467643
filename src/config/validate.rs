// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ModelFile, RawModelFile};
use crate::errors::{Result, TaskdagError};

impl TryFrom<RawModelFile> for ModelFile {
    type Error = TaskdagError;

    fn try_from(raw: RawModelFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ModelFile::new_unchecked(raw.model, raw.engine, raw.task))
    }
}

/// Semantic checks on a freshly parsed model file.
pub fn validate_config(cfg: &RawModelFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_engine(cfg)?;
    validate_tasks(cfg)?;
    validate_task_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawModelFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(TaskdagError::ConfigError(
            "model must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_engine(cfg: &RawModelFile) -> Result<()> {
    if cfg.engine.num_threads == 0 {
        return Err(TaskdagError::ConfigError(
            "[engine].num_threads must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_tasks(cfg: &RawModelFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if task.repeat_count == 0 {
            return Err(TaskdagError::ConfigError(format!(
                "task '{}' has repeat_count = 0 (must be >= 1)",
                name
            )));
        }
        if let Some(roles) = &task.roles {
            if roles.is_empty() {
                return Err(TaskdagError::ConfigError(format!(
                    "task '{}' has an empty `roles` list",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawModelFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if !cfg.task.contains_key(dep) {
                return Err(TaskdagError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(TaskdagError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawModelFile) -> Result<()> {
    // Edge direction: dep -> task
    // For:
    //   [task.B]
    //   after = ["A"]
    // we add edge A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(TaskdagError::DagCycle(format!(
                "cycle detected in task graph involving task '{}'",
                node
            )))
        }
    }
}
