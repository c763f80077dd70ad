use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::model::loan::Loan;
use crate::model::payslip::LoanDeductionLine;
use crate::utils::calendar::PayPeriod;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanPayment {
    pub loan_id: u64,
    pub name: String,
    pub payment: Decimal,
    pub remaining_balance: Decimal,
}

impl From<&LoanPayment> for LoanDeductionLine {
    fn from(p: &LoanPayment) -> Self {
        LoanDeductionLine {
            loan_id: p.loan_id,
            name: p.name.clone(),
            amount: p.payment,
            remaining_balance: p.remaining_balance,
        }
    }
}

/// Loan payments due in one pay period.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoanCycle {
    pub payments: Vec<LoanPayment>,
    pub total: Decimal,
}

/// Computes this period's installment of every open loan that has started.
///
/// Balances are not touched here; the caller persists `remaining_balance`.
/// When the period month could not be resolved nothing is due.
pub fn amortize(period: Option<PayPeriod>, loans: &[Loan]) -> LoanCycle {
    let Some(period) = period else {
        if !loans.is_empty() {
            warn!(loans = loans.len(), "Unresolvable pay period, no loan installments taken");
        }
        return LoanCycle::default();
    };

    let mut cycle = LoanCycle::default();

    for loan in loans.iter().filter(|l| l.is_open()) {
        match loan.start_period() {
            Some(start) if start <= period => {}
            Some(start) => {
                debug!(loan_id = loan.id, %start, %period, "Loan has not started yet");
                continue;
            }
            None => {
                warn!(loan_id = loan.id, start_month = loan.start_month, "Loan has an invalid start month");
                continue;
            }
        }

        let payment = loan.installment().min(loan.balance);
        let remaining_balance = (loan.balance - payment).max(Decimal::ZERO);

        cycle.total += payment;
        cycle.payments.push(LoanPayment {
            loan_id: loan.id,
            name: loan.name.clone(),
            payment,
            remaining_balance,
        });
    }

    cycle
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Month;
    use rust_decimal_macros::dec;

    fn salary_loan() -> Loan {
        Loan::new(7, 1, "Salary Loan", dec!(1200), 12, 1, 2026).unwrap()
    }

    fn apply(loan: &mut Loan, cycle: &LoanCycle) {
        if let Some(p) = cycle.payments.iter().find(|p| p.loan_id == loan.id) {
            loan.balance = p.remaining_balance;
        }
    }

    #[test]
    fn pays_off_in_twelve_cycles() {
        let mut loan = salary_loan();
        let first = PayPeriod::new(Month::January, 2026);

        let cycle = amortize(Some(first), std::slice::from_ref(&loan));
        assert_eq!(cycle.total, dec!(100.00));
        assert_eq!(cycle.payments[0].remaining_balance, dec!(1100.00));
        apply(&mut loan, &cycle);

        let mut period = first;
        for _ in 1..12 {
            period = PayPeriod::new(period.month.succ(), 2026);
            let cycle = amortize(Some(period), std::slice::from_ref(&loan));
            apply(&mut loan, &cycle);
        }
        assert_eq!(loan.balance, Decimal::ZERO);

        let thirteenth = amortize(Some(PayPeriod::new(Month::January, 2027)), &[loan]);
        assert!(thirteenth.payments.is_empty());
        assert_eq!(thirteenth.total, Decimal::ZERO);
    }

    #[test]
    fn last_payment_is_capped_at_balance() {
        let mut loan = Loan::new(1, 1, "Emergency", dec!(1000), 3, 1, 2026).unwrap();
        loan.balance = dec!(0.02);
        let cycle = amortize(Some(PayPeriod::new(Month::June, 2026)), &[loan]);
        assert_eq!(cycle.payments[0].payment, dec!(0.02));
        assert_eq!(cycle.payments[0].remaining_balance, Decimal::ZERO);
    }

    #[test]
    fn future_loans_are_skipped() {
        let later = Loan::new(2, 1, "Housing", dec!(6000), 6, 3, 2026).unwrap();
        let previous_year = Loan::new(3, 1, "Car", dec!(600), 6, 11, 2025).unwrap();

        let cycle = amortize(Some(PayPeriod::new(Month::February, 2026)), &[later, previous_year]);
        let ids: Vec<u64> = cycle.payments.iter().map(|p| p.loan_id).collect();
        assert_eq!(ids, vec![3]);
        assert_eq!(cycle.total, dec!(100.00));
    }

    #[test]
    fn unresolved_period_takes_nothing() {
        let cycle = amortize(None, &[salary_loan()]);
        assert_eq!(cycle, LoanCycle::default());
    }
}
