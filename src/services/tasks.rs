// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Task store: single source of truth for the task collection.
//!
//! Screens subscribe to the store and dispatch intents through its methods;
//! no screen keeps its own copy of the collection. Mutations patch the local
//! snapshot in place from the representation the backend returns, and
//! `refresh` re-reads the whole collection for reconciliation.
//!
//! Mutations are serialized per task id so a rapid toggle-then-delete cannot
//! race its completions; the final local state matches the order the user
//! acted in.

use crate::db::postgrest::eq;
use crate::db::{tables, TableClient};
use crate::error::AppError;
use crate::models::{Category, CategoryFilter, NewTask, Task, TaskPatch};
use crate::notify::Notifier;
use chrono::NaiveDate;
use dashmap::DashMap;
use serde::Deserialize;
use std::sync::{Arc, RwLock};
use tokio::sync::{watch, Mutex};

/// Per-task mutation locks, keyed by task id.
type TaskLocks = Arc<DashMap<i64, Arc<Mutex<()>>>>;

/// A task row as listed on the settings screen (id and title only).
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyingTask {
    pub id: i64,
    pub text: String,
}

struct StoreState {
    filter: RwLock<CategoryFilter>,
    tasks: RwLock<Vec<Task>>,
}

/// Remote-backed task collection with optimistic local patching.
#[derive(Clone)]
pub struct TaskStore {
    db: TableClient,
    state: Arc<StoreState>,
    tasks_tx: Arc<watch::Sender<Vec<Task>>>,
    locks: TaskLocks,
    notifier: Notifier,
}

impl TaskStore {
    pub fn new(db: TableClient, notifier: Notifier) -> Self {
        let (tasks_tx, _rx) = watch::channel(Vec::new());
        Self {
            db,
            state: Arc::new(StoreState {
                filter: RwLock::new(CategoryFilter::All),
                tasks: RwLock::new(Vec::new()),
            }),
            tasks_tx: Arc::new(tasks_tx),
            locks: Arc::new(DashMap::new()),
            notifier,
        }
    }

    // ─── Reads ───────────────────────────────────────────────────────────

    /// The current snapshot, in server-provided order.
    pub fn tasks(&self) -> Vec<Task> {
        self.read_tasks().clone()
    }

    /// The filter the snapshot was last fetched under.
    pub fn current_filter(&self) -> CategoryFilter {
        *self
            .state
            .filter
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Task>> {
        self.tasks_tx.subscribe()
    }

    /// Tasks whose deadline falls on `date` (calendar view lookup).
    pub fn tasks_on(&self, date: NaiveDate) -> Vec<Task> {
        self.read_tasks()
            .iter()
            .filter(|task| task.deadline == Some(date))
            .cloned()
            .collect()
    }

    /// Fetch the collection, optionally constrained to one category.
    ///
    /// Success replaces the snapshot wholesale, preserving server ordering.
    /// Failure leaves the previous snapshot untouched (stale-but-present).
    pub async fn fetch_tasks(&self, filter: CategoryFilter) -> Result<(), AppError> {
        let mut filters = Vec::new();
        if let CategoryFilter::Only(category) = filter {
            filters.push(eq("category", category.as_str()));
        }

        let rows = self.reported(
            "fetch_tasks",
            self.db.select::<Task>(tables::TASKS, &filters).await,
        )?;

        *self
            .state
            .filter
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = filter;
        let snapshot = {
            let mut tasks = self.write_tasks();
            *tasks = rows;
            tasks.clone()
        };
        self.publish(snapshot);
        Ok(())
    }

    /// Re-fetch under the current filter.
    pub async fn refresh(&self) -> Result<(), AppError> {
        self.fetch_tasks(self.current_filter()).await
    }

    /// Remote read of tasks flagged for notifications (settings screen).
    pub async fn tasks_with_notifications(&self) -> Result<Vec<NotifyingTask>, AppError> {
        self.reported(
            "tasks_with_notifications",
            self.db
                .select_columns(tables::TASKS, "id,text", &[eq("notification", true)])
                .await,
        )
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Create a task with `completed=false`.
    ///
    /// Empty or whitespace-only text is a validation error and issues no
    /// remote call. The stored representation is returned (and appended to
    /// the snapshot when it matches the current filter), so the caller knows
    /// the new task's id.
    pub async fn add_task(
        &self,
        text: &str,
        category: Option<Category>,
    ) -> Result<Task, AppError> {
        if text.trim().is_empty() {
            return Err(AppError::Validation(
                "task text must not be empty".to_string(),
            ));
        }

        let new_task = NewTask {
            text: text.to_string(),
            category,
            completed: false,
        };

        let task = self.reported(
            "add_task",
            self.db.insert::<Task, _>(tables::TASKS, &new_task).await,
        )?;

        if self.current_filter().matches(&task) {
            let snapshot = {
                let mut tasks = self.write_tasks();
                tasks.push(task.clone());
                tasks.clone()
            };
            self.publish(snapshot);
        }

        tracing::debug!(task_id = task.id, "Task added");
        Ok(task)
    }

    /// Update a task's fields, patching the matching snapshot record.
    pub async fn update_task(&self, id: i64, patch: TaskPatch) -> Result<(), AppError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut rows = self.reported(
            "update_task",
            self.db
                .update::<Task, _>(tables::TASKS, &[eq("id", id)], &patch)
                .await,
        )?;

        if let Some(updated) = rows.pop() {
            let filter = self.current_filter();
            let snapshot = {
                let mut tasks = self.write_tasks();
                if filter.matches(&updated) {
                    if let Some(existing) = tasks.iter_mut().find(|t| t.id == id) {
                        *existing = updated;
                    }
                } else {
                    // Recategorized out of the current filter
                    tasks.retain(|t| t.id != id);
                }
                tasks.clone()
            };
            self.publish(snapshot);
        }

        tracing::debug!(task_id = id, "Task updated");
        Ok(())
    }

    /// Delete one task by id, removing exactly that record locally.
    pub async fn delete_task(&self, id: i64) -> Result<(), AppError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        self.reported(
            "delete_task",
            self.db.delete(tables::TASKS, &[eq("id", id)]).await,
        )?;

        let snapshot = {
            let mut tasks = self.write_tasks();
            tasks.retain(|t| t.id != id);
            tasks.clone()
        };
        self.publish(snapshot);

        tracing::debug!(task_id = id, "Task deleted");
        Ok(())
    }

    /// Bulk delete every completed task.
    pub async fn delete_all_completed(&self) -> Result<(), AppError> {
        self.reported(
            "delete_all_completed",
            self.db
                .delete(tables::TASKS, &[eq("completed", true)])
                .await,
        )?;

        let snapshot = {
            let mut tasks = self.write_tasks();
            tasks.retain(|t| !t.completed);
            tasks.clone()
        };
        self.publish(snapshot);

        tracing::debug!("Completed tasks deleted");
        Ok(())
    }

    /// Invert a task's completed flag and mirror the inversion locally.
    ///
    /// Returns the new value.
    pub async fn toggle_completed(&self, id: i64) -> Result<bool, AppError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let current = self
            .read_tasks()
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.completed)
            .ok_or_else(|| AppError::NotFound(format!("task {id}")))?;

        let patch = TaskPatch {
            completed: Some(!current),
            ..Default::default()
        };

        self.reported(
            "toggle_completed",
            self.db
                .update::<Task, _>(tables::TASKS, &[eq("id", id)], &patch)
                .await,
        )?;

        let snapshot = {
            let mut tasks = self.write_tasks();
            if let Some(task) = tasks.iter_mut().find(|t| t.id == id) {
                task.completed = !current;
            }
            tasks.clone()
        };
        self.publish(snapshot);

        Ok(!current)
    }

    // ─── Internal helpers ────────────────────────────────────────────────

    fn lock_for(&self, id: i64) -> Arc<Mutex<()>> {
        self.locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn read_tasks(&self) -> std::sync::RwLockReadGuard<'_, Vec<Task>> {
        self.state
            .tasks
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_tasks(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Task>> {
        self.state
            .tasks
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn publish(&self, snapshot: Vec<Task>) {
        self.tasks_tx.send_replace(snapshot);
    }

    /// Pass remote failures through the notice channel before returning them.
    fn reported<T>(&self, operation: &'static str, result: Result<T, AppError>) -> Result<T, AppError> {
        if let Err(e) = &result {
            self.notifier.report(operation, e);
        }
        result
    }
}
