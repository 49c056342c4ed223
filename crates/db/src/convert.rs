//! Conversions between stored rows and core domain types.

use chrono::Utc;
use devalaya_core::budget::{Budget, BudgetStatus as CoreBudgetStatus};
use devalaya_core::chart::{AccountGroup, AccountNature as CoreNature, Ledger, LedgerType as CoreLedgerType};
use devalaya_core::closing::LedgerClosing;
use devalaya_core::fiscal::{AccountingYear, YearStatus as CoreYearStatus};
use devalaya_core::ledger::{Entry, EntryKind as CoreEntryKind, EntryLine};
use devalaya_core::reconciliation::{ItemStatus, ReconciliationItem, ReconciliationSession, SessionStatus};
use devalaya_core::workflow::EntryStatus as CoreEntryStatus;
use devalaya_shared::types::{
    AccountingYearId, ActorId, BudgetId, EntryId, EntryLineId, GroupId, LedgerId, ReconciliationId,
    ReconciliationItemId,
};

use crate::entities::sea_orm_active_enums::{
    AccountNature, BudgetStatus, EntryKind, EntryStatus, LedgerType, ReconciliationItemStatus, ReconciliationStatus,
    YearStatus,
};
use crate::entities::{
    account_groups, accounting_years, budgets, entries, entry_lines, ledger_closings, ledgers, reconciliation_items,
    reconciliation_sessions,
};

macro_rules! enum_mapping {
    ($db:ident, $core:ident, { $($variant:ident => $core_variant:ident),+ $(,)? }) => {
        impl From<$db> for $core {
            fn from(value: $db) -> Self {
                match value {
                    $($db::$variant => $core::$core_variant,)+
                }
            }
        }

        impl From<$core> for $db {
            fn from(value: $core) -> Self {
                match value {
                    $($core::$core_variant => $db::$variant,)+
                }
            }
        }
    };
}

enum_mapping!(AccountNature, CoreNature, {
    Asset => Asset,
    Liability => Liability,
    Equity => Equity,
    Income => Income,
    Expense => Expense,
});

enum_mapping!(LedgerType, CoreLedgerType, {
    Normal => Normal,
    Bank => Bank,
    Cash => Cash,
    Inventory => Inventory,
    Receivable => Receivable,
    Payable => Payable,
    Expense => Expense,
    Income => Income,
    Tax => Tax,
});

enum_mapping!(YearStatus, CoreYearStatus, {
    Open => Open,
    Closing => Closing,
    Closed => Closed,
});

enum_mapping!(EntryKind, CoreEntryKind, {
    Receipt => Receipt,
    Payment => Payment,
    Journal => Journal,
    Contra => Contra,
    CreditNote => CreditNote,
    DebitNote => DebitNote,
    InventoryJournal => InventoryJournal,
});

enum_mapping!(EntryStatus, CoreEntryStatus, {
    Pending => Pending,
    Approved => Approved,
    Rejected => Rejected,
    Cancelled => Cancelled,
});

enum_mapping!(BudgetStatus, CoreBudgetStatus, {
    Draft => Draft,
    Submitted => Submitted,
    Approved => Approved,
    Closed => Closed,
});

enum_mapping!(ReconciliationStatus, SessionStatus, {
    InProgress => InProgress,
    Finalized => Finalized,
    Locked => Locked,
});

enum_mapping!(ReconciliationItemStatus, ItemStatus, {
    Matched => Matched,
    Unmatched => Unmatched,
});

impl From<account_groups::Model> for AccountGroup {
    fn from(m: account_groups::Model) -> Self {
        Self {
            id: GroupId::from_uuid(m.id),
            code: m.code,
            name: m.name,
            parent_id: m.parent_id.map(GroupId::from_uuid),
            nature: m.nature.into(),
        }
    }
}

impl From<ledgers::Model> for Ledger {
    fn from(m: ledgers::Model) -> Self {
        Self {
            id: LedgerId::from_uuid(m.id),
            code: m.code,
            name: m.name,
            group_id: GroupId::from_uuid(m.group_id),
            ledger_type: m.ledger_type.into(),
            nature: m.nature.into(),
            opening_balance: m.opening_balance,
            opening_year_id: m.opening_year_id.map(AccountingYearId::from_uuid),
            is_active: m.is_active,
        }
    }
}

impl From<accounting_years::Model> for AccountingYear {
    fn from(m: accounting_years::Model) -> Self {
        Self {
            id: AccountingYearId::from_uuid(m.id),
            name: m.name,
            start_date: m.start_date,
            end_date: m.end_date,
            status: m.status.into(),
            is_active: m.is_active,
        }
    }
}

impl From<budgets::Model> for Budget {
    fn from(m: budgets::Model) -> Self {
        Self {
            id: BudgetId::from_uuid(m.id),
            ledger_id: LedgerId::from_uuid(m.ledger_id),
            year_id: AccountingYearId::from_uuid(m.year_id),
            allocated: m.allocated,
            status: m.status.into(),
            notes: m.notes,
        }
    }
}

impl From<reconciliation_sessions::Model> for ReconciliationSession {
    fn from(m: reconciliation_sessions::Model) -> Self {
        Self {
            id: ReconciliationId::from_uuid(m.id),
            ledger_id: LedgerId::from_uuid(m.ledger_id),
            year_id: AccountingYearId::from_uuid(m.year_id),
            period_from: m.period_from,
            period_to: m.period_to,
            statement_balance: m.statement_balance,
            status: m.status.into(),
            created_by: ActorId::from_uuid(m.created_by),
            finalized_at: m.finalized_at.map(|t| t.with_timezone(&Utc)),
            locked_by: m.locked_by.map(ActorId::from_uuid),
        }
    }
}

impl From<reconciliation_items::Model> for ReconciliationItem {
    fn from(m: reconciliation_items::Model) -> Self {
        Self {
            id: ReconciliationItemId::from_uuid(m.id),
            session_id: ReconciliationId::from_uuid(m.session_id),
            entry_id: EntryId::from_uuid(m.entry_id),
            line_id: EntryLineId::from_uuid(m.line_id),
            entry_date: m.entry_date,
            debit: m.debit,
            credit: m.credit,
            status: m.status.into(),
            statement_date: m.statement_date,
            statement_reference: m.statement_reference,
            note: m.note,
            is_adjustment: m.is_adjustment,
        }
    }
}

impl From<ledger_closings::Model> for LedgerClosing {
    fn from(m: ledger_closings::Model) -> Self {
        Self {
            year_id: AccountingYearId::from_uuid(m.year_id),
            ledger_id: LedgerId::from_uuid(m.ledger_id),
            closing_balance: m.closing_balance,
            carried_forward: m.carried_forward,
            next_year_id: AccountingYearId::from_uuid(m.next_year_id),
        }
    }
}

impl From<entry_lines::Model> for EntryLine {
    fn from(m: entry_lines::Model) -> Self {
        Self {
            id: EntryLineId::from_uuid(m.id),
            line_no: u32::try_from(m.line_no).unwrap_or_default(),
            ledger_id: LedgerId::from_uuid(m.ledger_id),
            debit: m.debit,
            credit: m.credit,
            narration: m.narration,
            cost_center: m.cost_center,
            reference_number: m.reference_number,
        }
    }
}

/// Assembles an entry from its header and lines, lines ordered by number.
pub(crate) fn entry_from_models(header: entries::Model, lines: Vec<entry_lines::Model>) -> Entry {
    let mut lines: Vec<EntryLine> = lines.into_iter().map(EntryLine::from).collect();
    lines.sort_by_key(|l| l.line_no);

    Entry {
        id: EntryId::from_uuid(header.id),
        kind: header.kind.into(),
        entry_date: header.entry_date,
        year_id: AccountingYearId::from_uuid(header.year_id),
        status: header.status.into(),
        narration: header.narration,
        original_reference: header.original_reference,
        created_by: ActorId::from_uuid(header.created_by),
        approved_by: header.approved_by.map(ActorId::from_uuid),
        decision_note: header.decision_note,
        decided_at: header.decided_at.map(|t| t.with_timezone(&Utc)),
        replaces: header.replaces.map(EntryId::from_uuid),
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_is_symmetric() {
        for status in CoreEntryStatus::ALL {
            let stored: EntryStatus = status.into();
            assert_eq!(CoreEntryStatus::from(stored), status);
        }
    }

    #[test]
    fn test_kind_mapping_is_symmetric() {
        for kind in CoreEntryKind::ALL {
            let stored: EntryKind = kind.into();
            assert_eq!(CoreEntryKind::from(stored), kind);
        }
    }
}
