//! Daily priority list use-case service.
//!
//! # Responsibility
//! - Add, edit, complete, annotate, reorder and delete the day's tasks.
//!
//! # Invariants
//! - Task `order` values stay dense (`0..n`) after every mutation.
//! - Every read and write sees the snapshot rolled over to today.
//! - `completed_at` is set exactly while `completed == true`.

use crate::clock::Clock;
use crate::model::day::{DayData, Task, TaskId, TaskValidationError};
use crate::store::{ReminderStore, StoreError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for priority list use-cases.
#[derive(Debug)]
pub enum PriorityServiceError {
    TaskNotFound(TaskId),
    /// Reorder index outside the list.
    InvalidIndex { index: usize, len: usize },
    Validation(TaskValidationError),
    Store(StoreError),
}

impl Display for PriorityServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::InvalidIndex { index, len } => {
                write!(f, "task index {index} out of range for list of {len}")
            }
            Self::Validation(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PriorityServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for PriorityServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<TaskValidationError> for PriorityServiceError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type PriorityResult<T> = Result<T, PriorityServiceError>;

/// Priority list service over a snapshot store.
pub struct PriorityService<S: ReminderStore, C: Clock> {
    store: S,
    clock: C,
}

impl<S: ReminderStore, C: Clock> PriorityService<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// Today's tasks in display order.
    pub fn list(&self) -> PriorityResult<Vec<Task>> {
        Ok(self.load()?.tasks)
    }

    /// Appends a task at the end of today's list.
    pub fn add(&self, text: impl Into<String>) -> PriorityResult<Task> {
        let now = self.clock.now();
        self.mutate(|data| {
            let task = Task::new(text, data.tasks.len() as u32, now);
            task.validate()?;
            data.tasks.push(task.clone());
            info!("event=task_create module=priority_service status=ok task_id={}", task.id);
            Ok(task)
        })
    }

    pub fn update_text(&self, id: TaskId, text: impl Into<String>) -> PriorityResult<Task> {
        let text = text.into().trim().to_string();
        self.mutate(|data| {
            let task = find_task(data, id)?;
            task.text = text;
            task.validate()?;
            Ok(task.clone())
        })
    }

    /// Flips completion, stamping or clearing `completed_at`.
    pub fn toggle_complete(&self, id: TaskId) -> PriorityResult<Task> {
        let now = self.clock.now();
        self.mutate(|data| {
            let task = find_task(data, id)?;
            task.completed = !task.completed;
            task.completed_at = task.completed.then_some(now);
            Ok(task.clone())
        })
    }

    pub fn set_subnote(&self, id: TaskId, subnote: impl Into<String>) -> PriorityResult<Task> {
        let subnote = subnote.into().trim().to_string();
        self.mutate(|data| {
            let task = find_task(data, id)?;
            task.subnote = subnote;
            Ok(task.clone())
        })
    }

    /// Moves the task at `from` to position `to`.
    pub fn reorder(&self, from: usize, to: usize) -> PriorityResult<Vec<Task>> {
        self.mutate(|data| {
            let len = data.tasks.len();
            for index in [from, to] {
                if index >= len {
                    return Err(PriorityServiceError::InvalidIndex { index, len });
                }
            }
            let moved = data.tasks.remove(from);
            data.tasks.insert(to, moved);
            data.renumber_tasks();
            Ok(data.tasks.clone())
        })
    }

    pub fn delete(&self, id: TaskId) -> PriorityResult<()> {
        self.mutate(|data| {
            let before = data.tasks.len();
            data.tasks.retain(|task| task.id != id);
            if data.tasks.len() == before {
                return Err(PriorityServiceError::TaskNotFound(id));
            }
            data.renumber_tasks();
            Ok(())
        })
    }

    fn load(&self) -> PriorityResult<DayData> {
        Ok(self.store.load_day(self.clock.today())?)
    }

    fn mutate<T, F>(&self, apply: F) -> PriorityResult<T>
    where
        F: FnOnce(&mut DayData) -> PriorityResult<T>,
    {
        let mut data = self.load()?;
        let value = apply(&mut data)?;
        self.store.save(&data)?;
        Ok(value)
    }
}

fn find_task(data: &mut DayData, id: TaskId) -> PriorityResult<&mut Task> {
    data.tasks
        .iter_mut()
        .find(|task| task.id == id)
        .ok_or(PriorityServiceError::TaskNotFound(id))
}

#[cfg(test)]
mod tests {
    use super::{PriorityService, PriorityServiceError};
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone, Utc};

    fn service() -> (PriorityService<MemoryStore, ManualClock>, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 10, 5, 8, 0, 0).unwrap());
        (PriorityService::new(MemoryStore::new(), clock.clone()), clock)
    }

    #[test]
    fn add_appends_with_dense_order() {
        let (service, _) = service();
        service.add("first").unwrap();
        service.add("  second  ").unwrap();
        let tasks = service.list().unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].text, "second");
        assert_eq!(tasks[1].order, 1);
    }

    #[test]
    fn add_rejects_blank_text() {
        let (service, _) = service();
        let err = service.add("   ").unwrap_err();
        assert!(matches!(err, PriorityServiceError::Validation(_)));
        assert!(service.list().unwrap().is_empty());
    }

    #[test]
    fn toggle_complete_sets_and_clears_timestamp() {
        let (service, _) = service();
        let task = service.add("write report").unwrap();
        let done = service.toggle_complete(task.id).unwrap();
        assert!(done.completed);
        assert!(done.completed_at.is_some());
        let undone = service.toggle_complete(task.id).unwrap();
        assert!(!undone.completed);
        assert_eq!(undone.completed_at, None);
    }

    #[test]
    fn reorder_moves_and_renumbers() {
        let (service, _) = service();
        let a = service.add("a").unwrap();
        let b = service.add("b").unwrap();
        let c = service.add("c").unwrap();

        let tasks = service.reorder(2, 0).unwrap();
        let ids: Vec<_> = tasks.iter().map(|task| task.id).collect();
        assert_eq!(ids, vec![c.id, a.id, b.id]);
        assert!(tasks.iter().enumerate().all(|(i, t)| t.order == i as u32));

        let err = service.reorder(0, 3).unwrap_err();
        assert!(matches!(err, PriorityServiceError::InvalidIndex { index: 3, len: 3 }));
    }

    #[test]
    fn delete_renumbers_remaining_tasks() {
        let (service, _) = service();
        let a = service.add("a").unwrap();
        service.add("b").unwrap();
        service.delete(a.id).unwrap();
        let tasks = service.list().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].order, 0);
        assert!(matches!(
            service.delete(a.id),
            Err(PriorityServiceError::TaskNotFound(_))
        ));
    }

    #[test]
    fn subnote_is_trimmed() {
        let (service, _) = service();
        let task = service.add("call").unwrap();
        let updated = service.set_subnote(task.id, "  ask about **invoice**  ").unwrap();
        assert_eq!(updated.subnote, "ask about **invoice**");
    }

    #[test]
    fn new_day_starts_with_empty_list() {
        let (service, clock) = service();
        service.add("yesterday's task").unwrap();
        clock.advance(Duration::days(1));
        assert!(service.list().unwrap().is_empty());
    }
}
