use std::collections::BTreeMap;
use std::fmt;

use sea_orm::entity::prelude::*;

/// One `(assignment, user)` row of reminder flags.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "reminder_state")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub assignment_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub sent_long: bool,
    pub sent_short: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Reminder boundary before a deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Window {
    Long,
    Short,
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Window::Long => write!(f, "long"),
            Window::Short => write!(f, "short"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReminderFlags {
    pub sent_long: bool,
    pub sent_short: bool,
}

impl ReminderFlags {
    pub fn is_sent(&self, window: Window) -> bool {
        match window {
            Window::Long => self.sent_long,
            Window::Short => self.sent_short,
        }
    }

    pub fn mark(&mut self, window: Window) {
        match window {
            Window::Long => self.sent_long = true,
            Window::Short => self.sent_short = true,
        }
    }
}

/// `assignment id -> user id -> flags`.
///
/// Flags only go from unset to set. The one way back is removing the user's
/// whole entry once they become compliant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReminderState(BTreeMap<String, BTreeMap<String, ReminderFlags>>);

impl ReminderState {
    pub fn flags(&self, assignment_id: &str, user_id: &str) -> ReminderFlags {
        self.0
            .get(assignment_id)
            .and_then(|users| users.get(user_id))
            .copied()
            .unwrap_or_default()
    }

    pub fn mark(&mut self, assignment_id: &str, user_id: &str, window: Window) {
        self.0
            .entry(assignment_id.to_string())
            .or_default()
            .entry(user_id.to_string())
            .or_default()
            .mark(window);
    }

    /// Removes one user's entry. Returns whether anything was removed.
    pub fn clear_user(&mut self, assignment_id: &str, user_id: &str) -> bool {
        let Some(users) = self.0.get_mut(assignment_id) else {
            return false;
        };
        let removed = users.remove(user_id).is_some();
        if users.is_empty() {
            self.0.remove(assignment_id);
        }
        removed
    }

    pub fn clear_assignment(&mut self, assignment_id: &str) -> bool {
        self.0.remove(assignment_id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = Model> + '_ {
        self.0.iter().flat_map(|(assignment_id, users)| {
            users.iter().map(move |(user_id, flags)| Model {
                assignment_id: assignment_id.clone(),
                user_id: user_id.clone(),
                sent_long: flags.sent_long,
                sent_short: flags.sent_short,
            })
        })
    }
}

impl FromIterator<Model> for ReminderState {
    fn from_iter<I: IntoIterator<Item = Model>>(rows: I) -> Self {
        let mut state = ReminderState::default();
        for row in rows {
            state.0.entry(row.assignment_id).or_default().insert(
                row.user_id,
                ReminderFlags {
                    sent_long: row.sent_long,
                    sent_short: row.sent_short,
                },
            );
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_default_to_unsent() {
        let state = ReminderState::default();
        assert_eq!(state.flags("bt_1000", "u1"), ReminderFlags::default());
    }

    #[test]
    fn clearing_last_user_drops_assignment() {
        let mut state = ReminderState::default();
        state.mark("bt_1000", "u1", Window::Long);
        assert!(state.flags("bt_1000", "u1").is_sent(Window::Long));
        assert!(!state.flags("bt_1000", "u1").is_sent(Window::Short));

        assert!(state.clear_user("bt_1000", "u1"));
        assert!(!state.clear_user("bt_1000", "u1"));
        assert!(state.is_empty());
    }

    #[test]
    fn rows_round_trip_through_from_iter() {
        let mut state = ReminderState::default();
        state.mark("bt_1000", "u1", Window::Long);
        state.mark("bt_1000", "u2", Window::Short);
        state.mark("bt_2000", "u1", Window::Short);

        let rebuilt: ReminderState = state.rows().collect();
        assert_eq!(rebuilt, state);
    }
}
