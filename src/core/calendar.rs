use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};

use super::task::Task;

/// Local midnight at the start of `day`.
pub fn start_of_day(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

/// Last millisecond of `day` (23:59:59.999).
pub fn end_of_day(day: NaiveDate) -> NaiveDateTime {
    day.and_hms_milli_opt(23, 59, 59, 999)
        .unwrap_or_else(|| start_of_day(day))
}

/// True if the task's execution window touches any part of `day`.
pub fn overlaps_day(task: &Task, day: NaiveDate) -> bool {
    task.execution_start <= end_of_day(day) && task.execution_end >= start_of_day(day)
}

/// Tasks whose execution window intersects `day`, in input order.
pub fn tasks_overlapping_day(tasks: &[Task], day: NaiveDate) -> Vec<Task> {
    tasks
        .iter()
        .filter(|t| overlaps_day(t, day))
        .cloned()
        .collect()
}

/// Stable sort by execution start, earliest first.
pub fn sort_by_start(tasks: &mut [Task]) {
    tasks.sort_by_key(|t| t.execution_start);
}

/// The selected day's list: overlapping tasks ordered by start.
pub fn agenda_for_day(tasks: &[Task], day: NaiveDate) -> Vec<Task> {
    let mut agenda = tasks_overlapping_day(tasks, day);
    sort_by_start(&mut agenda);
    agenda
}

/// Dots drawn under a calendar cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayMarkers {
    pub has_tasks: bool,
    pub has_completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    /// False for the leading/trailing days borrowed from adjacent months.
    pub in_month: bool,
    pub is_today: bool,
    pub is_selected: bool,
}

impl CalendarDay {
    pub fn markers(&self, tasks: &[Task]) -> DayMarkers {
        let mut markers = DayMarkers::default();
        for task in tasks.iter().filter(|t| overlaps_day(t, self.date)) {
            markers.has_tasks = true;
            if task.is_completed {
                markers.has_completed = true;
                break;
            }
        }
        markers
    }
}

/// First day of the month containing `date`.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn last_of_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date)
        .checked_add_months(chrono::Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Every day from the Sunday on or before the 1st of `month` through the
/// Saturday on or after its last day, row by row. At the ends of the
/// representable calendar the padding is cut short.
pub fn month_grid(month: NaiveDate, today: NaiveDate, selected: Option<NaiveDate>) -> Vec<CalendarDay> {
    let first = first_of_month(month);
    let last = last_of_month(month);

    let lead = Days::new(first.weekday().num_days_from_sunday().into());
    let trail = Days::new((6 - last.weekday().num_days_from_sunday()).into());
    let grid_start = first.checked_sub_days(lead).unwrap_or(first);
    let grid_end = last.checked_add_days(trail).unwrap_or(last);

    std::iter::successors(Some(grid_start), |d| d.succ_opt().filter(|next| *next <= grid_end))
        .map(|date| CalendarDay {
            date,
            in_month: date.month() == first.month() && date.year() == first.year(),
            is_today: date == today,
            is_selected: selected == Some(date),
        })
        .collect()
}

/// Navigation state for the month view.
#[derive(Debug, Clone)]
pub struct MonthCalendarState {
    /// First day of the displayed month.
    pub displayed_month: NaiveDate,
    pub selected_day: Option<NaiveDate>,
}

impl MonthCalendarState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            displayed_month: first_of_month(today),
            selected_day: Some(today),
        }
    }

    pub fn prev_month(&mut self) {
        self.displayed_month = self
            .displayed_month
            .checked_sub_months(chrono::Months::new(1))
            .unwrap_or(self.displayed_month);
    }

    pub fn next_month(&mut self) {
        self.displayed_month = self
            .displayed_month
            .checked_add_months(chrono::Months::new(1))
            .unwrap_or(self.displayed_month);
    }

    /// Select `date`. Selecting the current day again keeps it selected.
    pub fn select_day(&mut self, date: NaiveDate) {
        self.selected_day = Some(date);
    }

    pub fn grid(&self, today: NaiveDate) -> Vec<CalendarDay> {
        month_grid(self.displayed_month, today, self.selected_day)
    }
}
