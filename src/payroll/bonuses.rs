use rust_decimal::Decimal;

use crate::model::bonus::{Bonus, BonusFrequency};
use crate::model::payslip::BonusLine;
use crate::payroll::rules::PayrollRules;
use crate::utils::calendar::PayPeriod;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BonusCycle {
    pub lines: Vec<BonusLine>,
    pub total: Decimal,
}

/// Monthly bonuses always apply; yearly ones only in the rules' year-end month.
pub fn resolve(period: Option<PayPeriod>, rules: &PayrollRules, bonuses: &[Bonus]) -> BonusCycle {
    let year_end = period.is_some_and(|p| rules.is_year_end(p.month_number()));

    let lines: Vec<BonusLine> = bonuses
        .iter()
        .filter(|b| match b.frequency {
            BonusFrequency::Monthly => true,
            BonusFrequency::Yearly => year_end,
        })
        .map(|b| BonusLine {
            name: b.name.clone(),
            amount: b.amount,
        })
        .collect();

    let total = lines.iter().map(|l| l.amount).sum();
    BonusCycle { lines, total }
}
