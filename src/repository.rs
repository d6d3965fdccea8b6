use std::collections::HashMap;

use uuid::Uuid;

use crate::errors::{AmortizationError, Result};
use crate::loan::Loan;
use crate::state::LoanSnapshot;
use crate::types::LoanId;

/// persistence seam for loans, supplied by the caller
pub trait LoanRepository {
    /// store the loan, assigning an id first if it has none
    fn save(&mut self, loan: &mut Loan) -> Result<LoanId>;

    fn find(&self, id: LoanId) -> Result<Option<Loan>>;

    fn delete(&mut self, id: LoanId) -> Result<bool>;

    fn ids(&self) -> Vec<LoanId>;

    /// keep a snapshot for reporting; repositories without history may ignore it
    fn record_snapshot(&mut self, _snapshot: &LoanSnapshot) -> Result<()> {
        Ok(())
    }

    fn get(&self, id: LoanId) -> Result<Loan> {
        self.find(id)?.ok_or(AmortizationError::LoanNotFound { id })
    }
}

/// map-backed repository for tests and demos
#[derive(Debug, Default)]
pub struct InMemoryLoanRepository {
    loans: HashMap<LoanId, Loan>,
    snapshots: HashMap<LoanId, Vec<LoanSnapshot>>,
}

impl InMemoryLoanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.loans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loans.is_empty()
    }

    pub fn snapshots(&self, id: LoanId) -> &[LoanSnapshot] {
        self.snapshots.get(&id).map(Vec::as_slice).unwrap_or_default()
    }
}

impl LoanRepository for InMemoryLoanRepository {
    fn save(&mut self, loan: &mut Loan) -> Result<LoanId> {
        let id = match loan.id() {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4();
                loan.assign_id(id)?;
                id
            }
        };
        self.loans.insert(id, loan.clone());
        Ok(id)
    }

    fn find(&self, id: LoanId) -> Result<Option<Loan>> {
        Ok(self.loans.get(&id).cloned())
    }

    fn delete(&mut self, id: LoanId) -> Result<bool> {
        self.snapshots.remove(&id);
        Ok(self.loans.remove(&id).is_some())
    }

    fn ids(&self) -> Vec<LoanId> {
        self.loans.keys().copied().collect()
    }

    fn record_snapshot(&mut self, snapshot: &LoanSnapshot) -> Result<()> {
        let id = snapshot
            .loan_id
            .ok_or_else(|| AmortizationError::logic("cannot record a snapshot of an unsaved loan"))?;
        self.snapshots.entry(id).or_default().push(snapshot.clone());
        Ok(())
    }
}
