//! Reading tasks, newest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PagePauseError, Result};
use crate::host::Host;
use crate::store::keys;
use crate::utils::ids::IdGenerator;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_debug;

pub type TaskId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingTask {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct TaskList {
    tasks: Vec<ReadingTask>,
    ids: IdGenerator,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[ReadingTask] {
        &self.tasks
    }

    pub fn active_count(&self) -> usize {
        self.tasks.iter().filter(|task| !task.completed).count()
    }

    pub fn add(&mut self, host: &mut Host<'_>, text: &str) -> Result<TaskId> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PagePauseError::InvalidInput("task text must not be empty".into()));
        }
        let now = host.now();
        let task = ReadingTask {
            id: self.ids.next(now),
            text: text.to_string(),
            completed: false,
            created_at: now,
        };
        let id = task.id;
        self.tasks.insert(0, task);
        self.persist(host);
        log_debug!("task {id} added");
        Ok(id)
    }

    /// Flip completion; returns the new state.
    pub fn toggle(&mut self, host: &mut Host<'_>, id: TaskId) -> Result<bool> {
        let task = self
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or(PagePauseError::NotFound(id))?;
        task.completed = !task.completed;
        let completed = task.completed;
        self.persist(host);
        Ok(completed)
    }

    pub fn delete(&mut self, host: &mut Host<'_>, id: TaskId) -> Result<()> {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        if self.tasks.len() == before {
            return Err(PagePauseError::NotFound(id));
        }
        self.persist(host);
        Ok(())
    }

    pub fn restore(&mut self, host: &mut Host<'_>) {
        if let Some(saved) = host.storage.load::<Vec<ReadingTask>>(keys::TASKS) {
            self.replace(saved);
        }
    }

    /// Adopt a list written elsewhere, last write wins.
    pub fn replace(&mut self, tasks: Vec<ReadingTask>) {
        for task in &tasks {
            self.ids.observe(task.id);
        }
        self.tasks = tasks;
    }

    fn persist(&self, host: &mut Host<'_>) {
        host.storage.save(keys::TASKS, &self.tasks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::Rig;

    #[test]
    fn newest_first_and_trimmed() {
        let mut rig = Rig::new();
        let mut list = TaskList::new();
        let first = list.add(&mut rig.host(), "Chapter 1").unwrap();
        let second = list.add(&mut rig.host(), "  Chapter 2  ").unwrap();
        assert!(second > first);
        let texts: Vec<&str> = list.tasks().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Chapter 2", "Chapter 1"]);
        assert_eq!(
            list.add(&mut rig.host(), " "),
            Err(PagePauseError::InvalidInput("task text must not be empty".into()))
        );
    }

    #[test]
    fn toggle_delete_and_counts_persist() {
        let mut rig = Rig::new();
        let mut list = TaskList::new();
        let a = list.add(&mut rig.host(), "a").unwrap();
        let b = list.add(&mut rig.host(), "b").unwrap();

        assert!(list.toggle(&mut rig.host(), a).unwrap());
        assert_eq!(list.active_count(), 1);
        list.delete(&mut rig.host(), b).unwrap();
        assert_eq!(list.delete(&mut rig.host(), b), Err(PagePauseError::NotFound(b)));
        assert_eq!(list.toggle(&mut rig.host(), b), Err(PagePauseError::NotFound(b)));

        let mut reloaded = TaskList::new();
        reloaded.restore(&mut rig.host());
        assert_eq!(reloaded.tasks(), list.tasks());
        assert_eq!(reloaded.active_count(), 0);
    }
}
