use chrono::Utc;

use crate::model::{AddOutcome, DeleteResult, StatusUpdate, Task, TaskFilter, TaskId};
use crate::storage::{KeyValueStore, StoreError, TaskStore};

/// Filtered view of the collection handed to the shell after every action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub filter: TaskFilter,
    pub tasks: Vec<Task>,
    pub total: usize,
    pub pending: usize,
}

impl ViewSnapshot {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn empty_message(&self) -> &'static str {
        self.filter.empty_message()
    }
}

/// In-memory task list plus the current filter, written through to the store on
/// every mutation.
#[derive(Debug)]
pub struct TasksService<S> {
    store: TaskStore<S>,
    tasks: Vec<Task>,
    filter: TaskFilter,
}

impl<S: KeyValueStore> TasksService<S> {
    pub fn open(backend: S) -> Self {
        let store = TaskStore::new(backend);
        let tasks = store.load();
        tracing::debug!(count = tasks.len(), "loaded tasks");
        Self {
            store,
            tasks,
            filter: TaskFilter::All,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn filter(&self) -> TaskFilter {
        self.filter
    }

    pub fn find(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Adds a task at the front of the list. Blank text is ignored.
    pub fn add(&mut self, text: &str) -> Result<Option<AddOutcome>, StoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let id = self.fresh_id();
        self.tasks.insert(0, Task::new(id, text));
        if let Err(err) = self.persist() {
            self.tasks.remove(0);
            return Err(err);
        }
        tracing::debug!(task_id = %id, "task added");

        Ok(Some(AddOutcome {
            id,
            text: text.to_string(),
        }))
    }

    pub fn toggle(&mut self, id: TaskId) -> Result<StatusUpdate, StoreError> {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            return Ok(StatusUpdate {
                id,
                changed: false,
                completed: false,
            });
        };

        task.completed = !task.completed;
        let completed = task.completed;
        if let Err(err) = self.persist() {
            if let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) {
                task.completed = !completed;
            }
            return Err(err);
        }
        tracing::debug!(task_id = %id, completed, "task toggled");

        Ok(StatusUpdate {
            id,
            changed: true,
            completed,
        })
    }

    pub fn delete(&mut self, id: TaskId) -> Result<DeleteResult, StoreError> {
        let Some(index) = self.tasks.iter().position(|task| task.id == id) else {
            return Ok(DeleteResult { id, deleted: false });
        };
        let removed = self.tasks.remove(index);
        if let Err(err) = self.persist() {
            self.tasks.insert(index, removed);
            return Err(err);
        }
        tracing::debug!(task_id = %id, "task deleted");
        Ok(DeleteResult { id, deleted: true })
    }

    pub fn set_filter(&mut self, filter: TaskFilter) -> ViewSnapshot {
        self.filter = filter;
        self.snapshot()
    }

    pub fn visible_tasks(&self) -> Vec<Task> {
        self.visible_for(self.filter)
    }

    pub fn visible_for(&self, filter: TaskFilter) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.iter().filter(|task| !task.completed).count()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            filter: self.filter,
            tasks: self.visible_tasks(),
            total: self.tasks.len(),
            pending: self.pending_count(),
        }
    }

    /// Writes the whole collection. Callers undo their in-memory change on error so
    /// the list never runs ahead of the store.
    fn persist(&mut self) -> Result<(), StoreError> {
        self.store.save(&self.tasks).map_err(|err| {
            tracing::error!(error = %err, "failed to persist tasks");
            err
        })
    }

    fn fresh_id(&self) -> TaskId {
        let now = Utc::now().timestamp_millis();
        match self.tasks.iter().map(|task| task.id.value()).max() {
            Some(max) if max >= now => match max.checked_add(1) {
                Some(next) => TaskId(next),
                None => self.unused_id_below(now),
            },
            _ => TaskId(now),
        }
    }

    /// Highest free id at or below `start`, for when ids have run up to `i64::MAX`.
    fn unused_id_below(&self, start: i64) -> TaskId {
        let mut candidate = start;
        while self.find(TaskId(candidate)).is_some() {
            candidate -= 1;
        }
        TaskId(candidate)
    }
}
