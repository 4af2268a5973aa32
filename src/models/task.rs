// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Task model and category filtering.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Fixed category set.
///
/// Categories are an in-code list, not a remote table; the wire value is the
/// capitalized label and is matched case-sensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Work,
    Personal,
    Shopping,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: [Category; 3] = [Category::Work, Category::Personal, Category::Shopping];

    /// The wire/display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Work => "Work",
            Category::Personal => "Personal",
            Category::Shopping => "Shopping",
        }
    }
}

/// Category filter for task fetches: everything, or exactly one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    /// Whether a task belongs in a collection filtered by `self`.
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => task.category == Some(*category),
        }
    }
}

/// A task row from the remote `tasks` table.
///
/// The local copy is a cache with no version column; concurrent writers are
/// last-write-wins on the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Server-assigned identifier, unique within the owning user's table
    pub id: i64,
    /// Task title
    pub text: String,
    /// Optional longer description
    #[serde(default)]
    pub description: Option<String>,
    /// Category bucket; unset tasks only show under the All filter
    #[serde(default)]
    pub category: Option<Category>,
    /// Deadline date, used by the calendar lookup
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    /// Completion flag
    pub completed: bool,
    /// Per-task notification flag (no delivery mechanism is wired up)
    #[serde(default)]
    pub notification: bool,
}

/// Insert payload for a new task.
#[derive(Debug, Clone, Serialize)]
pub struct NewTask {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub completed: bool,
}

/// Partial update for an existing task. Unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<bool>,
}
