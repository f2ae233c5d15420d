//! Local JSON persistence. Each storage key maps to one file in the data
//! directory and every mutation rewrites the whole collection.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::core::expense::{budget_usage, total_spent, BudgetUsage, Expense, ExpenseError};
use crate::core::task::Task;
use crate::core::validate::{TaskForm, ValidationError};

pub const TASKS_KEY: &str = "droidplan_tasks";
pub const EXPENSES_KEY: &str = "droidplan_expenses";
pub const MONTHLY_LIMIT_KEY: &str = "droidplan_monthly_limit";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("invalid expense: {0}")]
    Expense(#[from] ExpenseError),
    #[error("expense {0} is confirmed and cannot be deleted")]
    Locked(Uuid),
    #[error("no record with id {0}")]
    NotFound(Uuid),
}

/// A directory of JSON files, one per storage key.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Read a key. A missing file yields `None`.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrite a key with `value`.
    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(self.path_for(key), json)?;
        log::debug!("Saved {}", key);
        Ok(())
    }

    pub fn load_tasks(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.read(TASKS_KEY)?.unwrap_or_default())
    }

    pub fn save_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        self.write(TASKS_KEY, tasks)
    }

    /// Stored expenses. A record with a bad amount fails the whole load.
    pub fn load_expenses(&self) -> Result<Vec<Expense>, StoreError> {
        let expenses: Vec<Expense> = self.read(EXPENSES_KEY)?.unwrap_or_default();
        for expense in &expenses {
            if let Err(e) = expense.check() {
                log::warn!("Rejecting stored expense {}: {}", expense.id, e);
                return Err(e.into());
            }
        }
        Ok(expenses)
    }

    pub fn save_expenses(&self, expenses: &[Expense]) -> Result<(), StoreError> {
        self.write(EXPENSES_KEY, expenses)
    }

    pub fn load_monthly_limit(&self, default: f64) -> Result<f64, StoreError> {
        Ok(self.read(MONTHLY_LIMIT_KEY)?.unwrap_or(default))
    }

    pub fn save_monthly_limit(&self, limit: f64) -> Result<(), StoreError> {
        self.write(MONTHLY_LIMIT_KEY, &limit)
    }
}

/// The task collection plus the store it is written back to.
#[derive(Debug)]
pub struct TaskBook {
    store: JsonStore,
    tasks: Vec<Task>,
}

impl TaskBook {
    pub fn open(store: JsonStore) -> Result<Self, StoreError> {
        let tasks = store.load_tasks()?;
        log::info!("Loaded {} tasks from {}", tasks.len(), store.dir().display());
        Ok(Self { store, tasks })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Validate `form` and append a new task.
    pub fn add(&mut self, form: &TaskForm) -> Result<Uuid, StoreError> {
        let task = Task::from_fields(form.validate()?);
        self.insert(task)
    }

    /// Append a task that was built elsewhere (e.g. an accepted suggestion).
    pub fn insert(&mut self, task: Task) -> Result<Uuid, StoreError> {
        let id = task.id;
        self.tasks.push(task);
        self.persist()?;
        Ok(id)
    }

    /// Validate `form` and apply it to an existing task.
    pub fn edit(&mut self, id: Uuid, form: &TaskForm) -> Result<(), StoreError> {
        let fields = form.validate()?;
        self.replace_with(id, |t| t.edited(fields))
    }

    pub fn toggle(&mut self, id: Uuid) -> Result<(), StoreError> {
        self.replace_with(id, Task::toggled)
    }

    pub fn add_subtask(&mut self, id: Uuid, content: &str) -> Result<(), StoreError> {
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyFields.into());
        }
        let content = content.trim().to_string();
        self.replace_with(id, |t| t.with_subtask(content))
    }

    pub fn remove_subtask(&mut self, id: Uuid, subtask_id: Uuid) -> Result<(), StoreError> {
        self.replace_with(id, |t| t.without_subtask(subtask_id))
    }

    pub fn toggle_subtask(&mut self, id: Uuid, subtask_id: Uuid) -> Result<(), StoreError> {
        self.replace_with(id, |t| t.with_subtask_toggled(subtask_id))
    }

    pub fn delete(&mut self, id: Uuid) -> Result<(), StoreError> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            return Err(StoreError::NotFound(id));
        }
        self.persist()
    }

    fn replace_with(&mut self, id: Uuid, f: impl FnOnce(Task) -> Task) -> Result<(), StoreError> {
        let pos = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;
        let current = self.tasks[pos].clone();
        self.tasks[pos] = f(current);
        self.persist()
    }

    fn persist(&self) -> Result<(), StoreError> {
        self.store.save_tasks(&self.tasks)
    }
}

/// Expense records and the monthly limit setting.
#[derive(Debug)]
pub struct ExpenseBook {
    store: JsonStore,
    expenses: Vec<Expense>,
    monthly_limit: f64,
}

impl ExpenseBook {
    pub fn open(store: JsonStore, default_limit: f64) -> Result<Self, StoreError> {
        let expenses = store.load_expenses()?;
        let monthly_limit = store.load_monthly_limit(default_limit)?;
        log::info!("Loaded {} expenses", expenses.len());
        Ok(Self {
            store,
            expenses,
            monthly_limit,
        })
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn monthly_limit(&self) -> f64 {
        self.monthly_limit
    }

    pub fn usage(&self) -> BudgetUsage {
        budget_usage(total_spent(&self.expenses), self.monthly_limit)
    }

    pub fn add(&mut self, expense: Expense) -> Result<Uuid, StoreError> {
        expense.check()?;
        let id = expense.id;
        self.expenses.push(expense);
        self.persist()?;
        Ok(id)
    }

    /// Delete an expense unless it is confirmed.
    pub fn remove(&mut self, id: Uuid) -> Result<(), StoreError> {
        let pos = self.position(id)?;
        if !self.expenses[pos].can_delete() {
            log::warn!("Refusing to delete confirmed expense {}", id);
            return Err(StoreError::Locked(id));
        }
        self.expenses.remove(pos);
        self.persist()
    }

    pub fn set_confirmed(&mut self, id: Uuid, confirmed: bool) -> Result<(), StoreError> {
        let pos = self.position(id)?;
        self.expenses[pos] = self.expenses[pos].clone().confirmed(confirmed);
        self.persist()
    }

    pub fn set_received(&mut self, id: Uuid, received: bool) -> Result<(), StoreError> {
        let pos = self.position(id)?;
        self.expenses[pos] = self.expenses[pos].clone().received(received);
        self.persist()
    }

    pub fn set_monthly_limit(&mut self, limit: f64) -> Result<(), StoreError> {
        self.monthly_limit = if limit.is_finite() { limit.max(0.0) } else { 0.0 };
        self.store.save_monthly_limit(self.monthly_limit)
    }

    fn position(&self, id: Uuid) -> Result<usize, StoreError> {
        self.expenses
            .iter()
            .position(|e| e.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    fn persist(&self) -> Result<(), StoreError> {
        self.store.save_expenses(&self.expenses)
    }
}
