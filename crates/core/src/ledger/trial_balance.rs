//! Trial balance over all ledgers of a year.

use chrono::NaiveDate;
use devalaya_shared::types::{AccountingYearId, LedgerId};
use rust_decimal::Decimal;
use serde::Serialize;

use super::balance::{BalanceSnapshot, NormalBalance};
use crate::chart::types::{AccountNature, Ledger};

/// One ledger row of a trial balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrialBalanceRow {
    /// Ledger ID.
    pub ledger_id: LedgerId,
    /// Ledger code.
    pub code: String,
    /// Ledger name.
    pub name: String,
    /// Ledger nature.
    pub nature: AccountNature,
    /// Opening balance.
    pub opening: Decimal,
    /// Sum of approved debits.
    pub debit_total: Decimal,
    /// Sum of approved credits.
    pub credit_total: Decimal,
    /// Closing balance shown in the debit column.
    pub debit: Decimal,
    /// Closing balance shown in the credit column.
    pub credit: Decimal,
}

/// Trial balance report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrialBalance {
    /// The year.
    pub year_id: AccountingYearId,
    /// Cut-off date, `None` for the whole year.
    pub as_of: Option<NaiveDate>,
    /// Rows ordered by ledger code.
    pub rows: Vec<TrialBalanceRow>,
    /// Sum of the debit column.
    pub total_debit: Decimal,
    /// Sum of the credit column.
    pub total_credit: Decimal,
    /// Whether both columns agree.
    pub is_balanced: bool,
}

impl TrialBalance {
    /// Builds the trial balance from each ledger's snapshot.
    ///
    /// A closing balance goes to the column of the ledger's normal side, or
    /// to the opposite column when it is negative. Ledgers with no opening
    /// and no activity are left out.
    #[must_use]
    pub fn build(
        year_id: AccountingYearId,
        as_of: Option<NaiveDate>,
        balances: &[(Ledger, BalanceSnapshot)],
    ) -> Self {
        let mut rows: Vec<TrialBalanceRow> = balances
            .iter()
            .filter(|(_, s)| !(s.opening.is_zero() && s.debit_total.is_zero() && s.credit_total.is_zero()))
            .map(|(ledger, snapshot)| {
                let (debit, credit) = columns(ledger.nature.normal_balance(), snapshot.closing);
                TrialBalanceRow {
                    ledger_id: ledger.id,
                    code: ledger.code.clone(),
                    name: ledger.name.clone(),
                    nature: ledger.nature,
                    opening: snapshot.opening,
                    debit_total: snapshot.debit_total,
                    credit_total: snapshot.credit_total,
                    debit,
                    credit,
                }
            })
            .collect();
        rows.sort_by(|a, b| a.code.cmp(&b.code));

        let total_debit: Decimal = rows.iter().map(|r| r.debit).sum();
        let total_credit: Decimal = rows.iter().map(|r| r.credit).sum();

        Self {
            year_id,
            as_of,
            rows,
            total_debit,
            total_credit,
            is_balanced: total_debit == total_credit,
        }
    }
}

fn columns(normal: NormalBalance, closing: Decimal) -> (Decimal, Decimal) {
    match (normal, closing.is_sign_negative()) {
        (NormalBalance::Debit, false) => (closing, Decimal::ZERO),
        (NormalBalance::Debit, true) => (Decimal::ZERO, -closing),
        (NormalBalance::Credit, false) => (Decimal::ZERO, closing),
        (NormalBalance::Credit, true) => (-closing, Decimal::ZERO),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devalaya_shared::types::GroupId;
    use rust_decimal_macros::dec;

    use crate::chart::types::LedgerType;
    use crate::ledger::balance::BalanceEngine;

    fn ledger(code: &str, ledger_type: LedgerType, nature: AccountNature) -> Ledger {
        Ledger {
            id: LedgerId::new(),
            code: code.to_string(),
            name: code.to_string(),
            group_id: GroupId::new(),
            ledger_type,
            nature,
            opening_balance: Decimal::ZERO,
            opening_year_id: None,
            is_active: true,
        }
    }

    #[test]
    fn test_receipt_and_payment_balance() {
        let bank = ledger("1100", LedgerType::Bank, AccountNature::Asset);
        let hundi = ledger("4100", LedgerType::Income, AccountNature::Income);
        let office = ledger("5100", LedgerType::Expense, AccountNature::Expense);
        let idle = ledger("5200", LedgerType::Expense, AccountNature::Expense);

        // Receipt 1000 into bank, payment 300 for office expense.
        let balances = vec![
            (hundi.clone(), BalanceEngine::snapshot(hundi.nature, Decimal::ZERO, Decimal::ZERO, dec!(1000))),
            (bank.clone(), BalanceEngine::snapshot(bank.nature, Decimal::ZERO, dec!(1000), dec!(300))),
            (office.clone(), BalanceEngine::snapshot(office.nature, Decimal::ZERO, dec!(300), Decimal::ZERO)),
            (idle.clone(), BalanceEngine::snapshot(idle.nature, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)),
        ];

        let tb = TrialBalance::build(AccountingYearId::new(), None, &balances);

        assert_eq!(tb.rows.len(), 3);
        assert_eq!(tb.rows[0].code, "1100");
        assert_eq!(tb.rows[0].debit, dec!(700));
        assert_eq!(tb.rows[1].credit, dec!(1000));
        assert_eq!(tb.rows[2].debit, dec!(300));
        assert_eq!(tb.total_debit, dec!(1000));
        assert_eq!(tb.total_credit, dec!(1000));
        assert!(tb.is_balanced);
    }

    #[test]
    fn test_overdrawn_bank_moves_to_credit_column() {
        assert_eq!(columns(NormalBalance::Debit, dec!(-50)), (Decimal::ZERO, dec!(50)));
        assert_eq!(columns(NormalBalance::Credit, dec!(-50)), (dec!(50), Decimal::ZERO));
    }
}
