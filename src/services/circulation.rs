//! Circulation: borrowing and returning copies

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::loan::{Loan, LoanRules},
    repository::Repository,
};

use super::{clock::Clock, StoreTimeout};

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
    clock: Arc<dyn Clock>,
    rules: LoanRules,
    timeout: StoreTimeout,
}

impl CirculationService {
    pub fn new(
        repository: Repository,
        clock: Arc<dyn Clock>,
        rules: LoanRules,
        timeout: StoreTimeout,
    ) -> Self {
        Self {
            repository,
            clock,
            rules,
            timeout,
        }
    }

    async fn patron_id(&self, handle: &str) -> AppResult<Uuid> {
        self.timeout
            .run(self.repository.patrons.id_by_handle(handle))
            .await?
            .ok_or_else(|| AppError::UnknownPatron(handle.to_string()))
    }

    /// Lend a copy to the patron behind `handle`
    pub async fn borrow(&self, handle: &str, copy_id: Uuid) -> AppResult<Loan> {
        let user_id = self.patron_id(handle).await?;

        self.timeout
            .run(self.repository.catalog.find_copy(copy_id))
            .await?
            .ok_or(AppError::UnknownCopy(copy_id))?;

        if self.check_open(copy_id).await? {
            tracing::debug!(%copy_id, handle, "Borrow refused, copy is out");
            return Err(AppError::CopyAlreadyBorrowed(copy_id));
        }

        // The store rejects the insert if another borrow won the race since the check
        let loan = Loan::open(user_id, copy_id, self.clock.now(), &self.rules);
        let loan = self.timeout.run(self.repository.loans.insert(&loan)).await?;

        tracing::info!(
            loan_id = %loan.id,
            %user_id,
            %copy_id,
            due_date = %loan.due_date,
            "Copy borrowed"
        );
        Ok(loan)
    }

    /// Close the patron's open loan of a copy, charging any overdue fine
    pub async fn return_copy(&self, handle: &str, copy_id: Uuid) -> AppResult<Loan> {
        let user_id = self.patron_id(handle).await?;

        let mut loan = self
            .timeout
            .run(
                self.repository
                    .loans
                    .find_open_by_user_and_copy(user_id, copy_id),
            )
            .await?
            .ok_or(AppError::NoMatchingLoan { copy_id })?;

        let fine = loan.close(self.clock.now(), &self.rules);

        // Closing and charging happen together, and only while the loan is still open
        let loan = self
            .timeout
            .run(self.repository.loans.close(&loan))
            .await?
            .ok_or(AppError::NoMatchingLoan { copy_id })?;

        if fine > 0 {
            tracing::info!(loan_id = %loan.id, %user_id, fine, "Overdue fine charged");
        }
        tracing::info!(loan_id = %loan.id, %user_id, %copy_id, "Copy returned");
        Ok(loan)
    }

    /// Get loan by ID
    pub async fn get(&self, loan_id: Uuid) -> AppResult<Loan> {
        self.timeout
            .run(self.repository.loans.find(loan_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))
    }

    /// Open loan of a copy held by a given patron
    pub async fn get_by_user_and_copy(&self, user_id: Uuid, copy_id: Uuid) -> AppResult<Loan> {
        self.timeout
            .run(
                self.repository
                    .loans
                    .find_open_by_user_and_copy(user_id, copy_id),
            )
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No open loan of copy {} for user {}",
                    copy_id, user_id
                ))
            })
    }

    /// Whether the copy is currently lent out
    pub async fn check_open(&self, copy_id: Uuid) -> AppResult<bool> {
        self.timeout
            .run(self.repository.loans.is_open(copy_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::book_copy::{BookCopy, CreateBookCopy},
        repository::{books::MockCatalogStore, loans::MockLoanStore, users::MockPatronStore},
        services::clock::ManualClock,
    };
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
    }

    fn service(
        catalog: MockCatalogStore,
        patrons: MockPatronStore,
        loans: MockLoanStore,
        clock: Arc<ManualClock>,
    ) -> CirculationService {
        let repository = Repository::new(Arc::new(catalog), Arc::new(patrons), Arc::new(loans));
        CirculationService::new(
            repository,
            clock,
            LoanRules::default(),
            StoreTimeout::from_millis(1000),
        )
    }

    fn known_patron(id: Uuid) -> MockPatronStore {
        let mut patrons = MockPatronStore::new();
        patrons
            .expect_id_by_handle()
            .returning(move |handle| Ok((handle == "alice").then_some(id)));
        patrons
    }

    fn known_copy() -> MockCatalogStore {
        let mut catalog = MockCatalogStore::new();
        catalog.expect_find_copy().returning(|id| {
            let mut copy = BookCopy::new(Uuid::new_v4(), CreateBookCopy::default(), start());
            copy.id = id;
            Ok(Some(copy))
        });
        catalog
    }

    #[tokio::test]
    async fn test_borrow_opens_loan_due_in_seven_days() {
        let user_id = Uuid::new_v4();
        let copy_id = Uuid::new_v4();
        let mut loans = MockLoanStore::new();
        loans.expect_is_open().returning(|_| Ok(false));
        loans
            .expect_insert()
            .times(1)
            .returning(|loan| Ok(loan.clone()));

        let clock = Arc::new(ManualClock::new(start()));
        let loan = service(known_copy(), known_patron(user_id), loans, clock)
            .borrow("alice", copy_id)
            .await
            .unwrap();

        assert_eq!(loan.user_id, user_id);
        assert_eq!(loan.book_copy_id, copy_id);
        assert_eq!(loan.fine, 0);
        assert_eq!(loan.borrowed_at, start());
        assert_eq!(loan.due_date, start() + Duration::days(7));
        assert!(loan.returned_at.is_none());
    }

    #[tokio::test]
    async fn test_borrow_of_lent_copy_conflicts_without_insert() {
        let mut loans = MockLoanStore::new();
        loans.expect_is_open().returning(|_| Ok(true));
        loans.expect_insert().never();

        let clock = Arc::new(ManualClock::new(start()));
        let copy_id = Uuid::new_v4();
        let err = service(known_copy(), known_patron(Uuid::new_v4()), loans, clock)
            .borrow("alice", copy_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CopyAlreadyBorrowed(id) if id == copy_id));
    }

    #[tokio::test]
    async fn test_borrow_losing_race_at_store_conflicts() {
        let mut loans = MockLoanStore::new();
        loans.expect_is_open().returning(|_| Ok(false));
        loans
            .expect_insert()
            .returning(|loan| Err(AppError::CopyAlreadyBorrowed(loan.book_copy_id)));

        let clock = Arc::new(ManualClock::new(start()));
        let err = service(known_copy(), known_patron(Uuid::new_v4()), loans, clock)
            .borrow("alice", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CopyAlreadyBorrowed(_)));
    }

    #[tokio::test]
    async fn test_borrow_unknown_patron_or_copy() {
        let clock = Arc::new(ManualClock::new(start()));

        let mut loans = MockLoanStore::new();
        loans.expect_insert().never();
        let err = service(
            known_copy(),
            known_patron(Uuid::new_v4()),
            loans,
            clock.clone(),
        )
        .borrow("mallory", Uuid::new_v4())
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::UnknownPatron(handle) if handle == "mallory"));

        let mut catalog = MockCatalogStore::new();
        catalog.expect_find_copy().returning(|_| Ok(None));
        let mut loans = MockLoanStore::new();
        loans.expect_insert().never();
        let err = service(catalog, known_patron(Uuid::new_v4()), loans, clock)
            .borrow("alice", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownCopy(_)));
    }

    #[tokio::test]
    async fn test_late_return_charges_whole_days() {
        let user_id = Uuid::new_v4();
        let copy_id = Uuid::new_v4();
        let open = Loan::open(user_id, copy_id, start(), &LoanRules::default());

        let mut loans = MockLoanStore::new();
        loans
            .expect_find_open_by_user_and_copy()
            .returning(move |_, _| Ok(Some(open.clone())));
        loans
            .expect_close()
            .withf(|loan| loan.fine == 20000 && loan.returned_at.is_some())
            .times(1)
            .returning(|loan| Ok(Some(loan.clone())));

        let clock = Arc::new(ManualClock::new(start()));
        clock.advance(Duration::days(17) + Duration::hours(3));
        let loan = service(known_copy(), known_patron(user_id), loans, clock)
            .return_copy("alice", copy_id)
            .await
            .unwrap();
        assert_eq!(loan.fine, 20000);
    }

    #[tokio::test]
    async fn test_immediate_return_has_no_fine() {
        let user_id = Uuid::new_v4();
        let copy_id = Uuid::new_v4();
        let open = Loan::open(user_id, copy_id, start(), &LoanRules::default());

        let mut loans = MockLoanStore::new();
        loans
            .expect_find_open_by_user_and_copy()
            .returning(move |_, _| Ok(Some(open.clone())));
        loans
            .expect_close()
            .withf(|loan| loan.fine == 0)
            .returning(|loan| Ok(Some(loan.clone())));

        let clock = Arc::new(ManualClock::new(start()));
        let loan = service(known_copy(), known_patron(user_id), loans, clock.clone())
            .return_copy("alice", copy_id)
            .await
            .unwrap();
        assert_eq!(loan.fine, 0);
        assert_eq!(loan.returned_at, Some(clock.now()));
    }

    #[tokio::test]
    async fn test_return_without_open_loan_mutates_nothing() {
        let user_id = Uuid::new_v4();
        let copy_id = Uuid::new_v4();
        let mut loans = MockLoanStore::new();
        loans
            .expect_find_open_by_user_and_copy()
            .withf(move |user, copy| *user == user_id && *copy == copy_id)
            .times(1)
            .returning(|_, _| Ok(None));
        loans.expect_close().never();

        let clock = Arc::new(ManualClock::new(start()));
        let err = service(known_copy(), known_patron(user_id), loans, clock)
            .return_copy("alice", copy_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoMatchingLoan { copy_id: id } if id == copy_id));
    }

    #[tokio::test]
    async fn test_return_racing_another_return_is_no_matching_loan() {
        let user_id = Uuid::new_v4();
        let open = Loan::open(user_id, Uuid::new_v4(), start(), &LoanRules::default());

        let mut loans = MockLoanStore::new();
        loans
            .expect_find_open_by_user_and_copy()
            .returning(move |_, _| Ok(Some(open.clone())));
        loans.expect_close().returning(|_| Ok(None));

        let clock = Arc::new(ManualClock::new(start() + Duration::days(30)));
        let err = service(known_copy(), known_patron(user_id), loans, clock)
            .return_copy("alice", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoMatchingLoan { .. }));
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_retryable() {
        let mut loans = MockLoanStore::new();
        loans
            .expect_is_open()
            .returning(|_| Err(AppError::Database(sqlx::Error::PoolTimedOut)));
        loans.expect_insert().never();

        let clock = Arc::new(ManualClock::new(start()));
        let err = service(known_copy(), known_patron(Uuid::new_v4()), loans, clock)
            .borrow("alice", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_get_missing_loan_is_not_found() {
        let mut loans = MockLoanStore::new();
        loans.expect_find().returning(|_| Ok(None));
        loans
            .expect_find_open_by_user_and_copy()
            .returning(|_, _| Ok(None));

        let clock = Arc::new(ManualClock::new(start()));
        let service = service(MockCatalogStore::new(), MockPatronStore::new(), loans, clock);
        assert!(matches!(
            service.get(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.get_by_user_and_copy(Uuid::new_v4(), Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }
}
