use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseCategory {
    Food,
    Essential,
    Entertainment,
    Supplies,
}

impl ExpenseCategory {
    pub const ALL: [Self; 4] = [Self::Food, Self::Essential, Self::Entertainment, Self::Supplies];

    pub fn as_keyword(&self) -> &'static str {
        match self {
            Self::Food => "FOOD",
            Self::Essential => "ESSENTIAL",
            Self::Entertainment => "ENTERTAINMENT",
            Self::Supplies => "SUPPLIES",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FOOD" => Some(Self::Food),
            "ESSENTIAL" => Some(Self::Essential),
            "ENTERTAINMENT" | "FUN" => Some(Self::Entertainment),
            "SUPPLIES" => Some(Self::Supplies),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpenseError {
    #[error("amount must be a non-negative number, got {0}")]
    InvalidAmount(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub amount: f64,
    pub category: ExpenseCategory,
    pub date: NaiveDate,
    pub note: String,
    /// Locked: a confirmed expense may not be deleted.
    pub is_confirmed: bool,
    pub is_received: bool,
}

impl Expense {
    pub fn new(
        amount: f64,
        category: ExpenseCategory,
        date: NaiveDate,
        note: impl Into<String>,
    ) -> Result<Self, ExpenseError> {
        let expense = Self {
            id: Uuid::new_v4(),
            amount,
            category,
            date,
            note: note.into(),
            is_confirmed: false,
            is_received: false,
        };
        expense.check()?;
        Ok(expense)
    }

    /// Amounts must be finite and non-negative, however the record was built.
    pub fn check(&self) -> Result<(), ExpenseError> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(ExpenseError::InvalidAmount(self.amount));
        }
        Ok(())
    }

    pub fn confirmed(self, is_confirmed: bool) -> Self {
        Self { is_confirmed, ..self }
    }

    pub fn received(self, is_received: bool) -> Self {
        Self { is_received, ..self }
    }

    pub fn can_delete(&self) -> bool {
        !self.is_confirmed
    }

    /// Grouping key, `YYYY-MM`.
    pub fn month_key(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }
}

/// Group by `YYYY-MM`. Each group keeps input order.
pub fn group_expenses_by_month(expenses: &[Expense]) -> BTreeMap<String, Vec<Expense>> {
    let mut groups: BTreeMap<String, Vec<Expense>> = BTreeMap::new();
    for expense in expenses {
        groups
            .entry(expense.month_key())
            .or_default()
            .push(expense.clone());
    }
    groups
}

/// Month keys, most recent first.
pub fn sorted_months(groups: &BTreeMap<String, Vec<Expense>>) -> Vec<&str> {
    groups.keys().rev().map(|k| k.as_str()).collect()
}

pub fn total_spent(expenses: &[Expense]) -> f64 {
    expenses.iter().map(|e| e.amount).sum()
}

pub fn month_total(groups: &BTreeMap<String, Vec<Expense>>, month: &str) -> f64 {
    groups.get(month).map(|g| total_spent(g)).unwrap_or(0.0)
}

/// Spend against the monthly limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetUsage {
    /// Width of the progress bar, clamped to 100.
    pub bar_percent: f64,
    /// Unclamped percentage; may exceed 100.
    pub raw_percent: f64,
    pub over_limit: bool,
}

impl BudgetUsage {
    /// The number shown next to the bar.
    pub fn rounded_percent(&self) -> i64 {
        self.raw_percent.round() as i64
    }
}

/// Limits below 1 are treated as 1 so the ratio stays finite.
pub fn budget_usage(total_spent: f64, monthly_limit: f64) -> BudgetUsage {
    let raw_percent = total_spent / monthly_limit.max(1.0) * 100.0;
    BudgetUsage {
        bar_percent: raw_percent.min(100.0),
        raw_percent,
        over_limit: total_spent > monthly_limit,
    }
}
