use super::task::Task;

/// Completion summary for the stats view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskStats {
    pub completed: usize,
    pub pending: usize,
    /// `completed / total`, or 0 for an empty collection.
    pub completion_ratio: f64,
}

impl TaskStats {
    pub fn total(&self) -> usize {
        self.completed + self.pending
    }

    pub fn completion_percent(&self) -> u32 {
        (self.completion_ratio * 100.0).round() as u32
    }
}

pub fn stats(tasks: &[Task]) -> TaskStats {
    let completed = tasks.iter().filter(|t| t.is_completed).count();
    let pending = tasks.len() - completed;
    let completion_ratio = if tasks.is_empty() {
        0.0
    } else {
        completed as f64 / tasks.len() as f64
    };
    TaskStats {
        completed,
        pending,
        completion_ratio,
    }
}
