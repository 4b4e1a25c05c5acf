use anyhow::{Context, Result};

use crate::config::AppConfig;
use crate::model::{DeleteResult, TaskId};
use crate::services::TasksService;
use crate::storage::FileStore;

/// Open the task list stored in the configured data directory.
pub fn open_tasks(config: &AppConfig) -> Result<TasksService<FileStore>> {
    let store = FileStore::open(config.store_path()).with_context(|| {
        format!(
            "Failed to open task store at {}",
            config.store_path().display()
        )
    })?;
    Ok(TasksService::open(store))
}

/// Delete the tasks with the provided ids and return per-id results.
pub fn delete_tasks(config: &AppConfig, ids: &[TaskId]) -> Result<Vec<DeleteResult>> {
    let mut service = open_tasks(config)?;
    let mut results = Vec::with_capacity(ids.len());
    for id in ids {
        results.push(service.delete(*id)?);
    }
    Ok(results)
}
