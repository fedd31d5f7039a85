//! Loan (borrow) model and the fine rules applied on return

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Circulation record binding one copy to one patron
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "bookcopy_id")]
    pub book_copy_id: Uuid,
    /// Zero while open; set once on return
    pub fine: i64,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}

/// A loan is open until it is returned; there is no other transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanState {
    Open,
    Closed,
}

/// Fixed lending rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanRules {
    pub loan_period: Duration,
    pub fine_per_day: i64,
}

impl Default for LoanRules {
    fn default() -> Self {
        Self {
            loan_period: Duration::days(7),
            fine_per_day: 2000,
        }
    }
}

impl LoanRules {
    /// Fine owed for a copy returned at `returned_at`.
    ///
    /// Only whole days count: 10 days and 3 hours late is 10 days.
    pub fn overdue_fine(&self, due_date: DateTime<Utc>, returned_at: DateTime<Utc>) -> i64 {
        if returned_at <= due_date {
            return 0;
        }
        let days_late = (returned_at - due_date).num_hours() / 24;
        days_late * self.fine_per_day
    }
}

impl Loan {
    /// Open a new loan starting at `now`
    pub fn open(user_id: Uuid, book_copy_id: Uuid, now: DateTime<Utc>, rules: &LoanRules) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            book_copy_id,
            fine: 0,
            borrowed_at: now,
            due_date: now + rules.loan_period,
            returned_at: None,
        }
    }

    pub fn state(&self) -> LoanState {
        match self.returned_at {
            None => LoanState::Open,
            Some(_) => LoanState::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == LoanState::Open
    }

    /// Close the loan at `now` and compute its fine. Returns the fine.
    pub fn close(&mut self, now: DateTime<Utc>, rules: &LoanRules) -> i64 {
        self.returned_at = Some(now);
        self.fine = rules.overdue_fine(self.due_date, now);
        self.fine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_open_loan_due_after_period() {
        let rules = LoanRules::default();
        let loan = Loan::open(Uuid::new_v4(), Uuid::new_v4(), start(), &rules);
        assert_eq!(loan.due_date, start() + Duration::days(7));
        assert_eq!(loan.fine, 0);
        assert_eq!(loan.state(), LoanState::Open);
    }

    #[test]
    fn test_on_time_return_has_no_fine() {
        let rules = LoanRules::default();
        let mut loan = Loan::open(Uuid::new_v4(), Uuid::new_v4(), start(), &rules);
        assert_eq!(loan.close(start() + Duration::days(7), &rules), 0);
        assert_eq!(loan.state(), LoanState::Closed);
    }

    #[test]
    fn test_fine_counts_whole_days_only() {
        let rules = LoanRules::default();
        let due = start();
        let late = due + Duration::days(10) + Duration::hours(3);
        assert_eq!(rules.overdue_fine(due, late), 20000);

        // Less than a day late is still free
        assert_eq!(rules.overdue_fine(due, due + Duration::hours(23)), 0);
        assert_eq!(rules.overdue_fine(due, due + Duration::hours(24)), 2000);
    }

    #[test]
    fn test_nine_days_out_is_two_days_late() {
        let rules = LoanRules::default();
        let mut loan = Loan::open(Uuid::new_v4(), Uuid::new_v4(), start(), &rules);
        assert_eq!(loan.close(start() + Duration::days(9), &rules), 4000);
        assert_eq!(loan.fine, 4000);
    }
}
