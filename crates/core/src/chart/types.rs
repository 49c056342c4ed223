//! Chart of accounts domain types.

use devalaya_shared::types::{AccountingYearId, GroupId, LedgerId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ledger::balance::NormalBalance;

/// Accounting nature of a group and every ledger beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountNature {
    /// Resources owned by the temple.
    Asset,
    /// Amounts owed to others.
    Liability,
    /// Corpus and accumulated surplus.
    Equity,
    /// Donations, offerings, and other revenue.
    Income,
    /// Costs incurred.
    Expense,
}

impl AccountNature {
    /// Returns the string representation of the nature.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "ASSET",
            Self::Liability => "LIABILITY",
            Self::Equity => "EQUITY",
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
        }
    }

    /// Parses a nature from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ASSET" => Some(Self::Asset),
            "LIABILITY" => Some(Self::Liability),
            "EQUITY" => Some(Self::Equity),
            "INCOME" => Some(Self::Income),
            "EXPENSE" => Some(Self::Expense),
            _ => None,
        }
    }

    /// Side on which balances of this nature increase.
    #[must_use]
    pub fn normal_balance(self) -> NormalBalance {
        match self {
            Self::Asset | Self::Expense => NormalBalance::Debit,
            Self::Liability | Self::Equity | Self::Income => NormalBalance::Credit,
        }
    }

    /// Income and expense balances reset every year.
    #[must_use]
    pub fn is_nominal(self) -> bool {
        matches!(self, Self::Income | Self::Expense)
    }
}

impl fmt::Display for AccountNature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ledger classification driving entry-kind and budget rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerType {
    /// No special behaviour.
    Normal,
    /// Bank account; reconciled against statements.
    Bank,
    /// Cash in hand (hundi, counter cash).
    Cash,
    /// Stock valued by the inventory collaborator.
    Inventory,
    /// Amounts due from devotees, tenants, and other parties.
    Receivable,
    /// Amounts due to suppliers.
    Payable,
    /// Expense head, subject to budgets.
    Expense,
    /// Income head.
    Income,
    /// Tax payable or receivable.
    Tax,
}

impl LedgerType {
    /// Returns the string representation of the type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Bank => "BANK",
            Self::Cash => "CASH",
            Self::Inventory => "INVENTORY",
            Self::Receivable => "RECEIVABLE",
            Self::Payable => "PAYABLE",
            Self::Expense => "EXPENSE",
            Self::Income => "INCOME",
            Self::Tax => "TAX",
        }
    }

    /// Parses a ledger type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "NORMAL" => Some(Self::Normal),
            "BANK" => Some(Self::Bank),
            "CASH" => Some(Self::Cash),
            "INVENTORY" => Some(Self::Inventory),
            "RECEIVABLE" => Some(Self::Receivable),
            "PAYABLE" => Some(Self::Payable),
            "EXPENSE" => Some(Self::Expense),
            "INCOME" => Some(Self::Income),
            "TAX" => Some(Self::Tax),
            _ => None,
        }
    }

    /// Bank and cash ledgers are the money side of receipts, payments, and contras.
    #[must_use]
    pub fn is_bank_or_cash(self) -> bool {
        matches!(self, Self::Bank | Self::Cash)
    }

    /// Receivable and payable ledgers carry party balances for notes.
    #[must_use]
    pub fn is_party(self) -> bool {
        matches!(self, Self::Receivable | Self::Payable)
    }

    /// Returns true if a ledger of this type may live under a group of `nature`.
    #[must_use]
    pub fn allows_nature(self, nature: AccountNature) -> bool {
        match self {
            Self::Normal => true,
            Self::Bank | Self::Cash | Self::Inventory | Self::Receivable => {
                nature == AccountNature::Asset
            }
            Self::Payable => nature == AccountNature::Liability,
            Self::Expense => nature == AccountNature::Expense,
            Self::Income => nature == AccountNature::Income,
            Self::Tax => matches!(nature, AccountNature::Asset | AccountNature::Liability),
        }
    }
}

impl fmt::Display for LedgerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A node of the group hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountGroup {
    /// Unique identifier.
    pub id: GroupId,
    /// Code, unique per temple.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Parent group, `None` for a root.
    pub parent_id: Option<GroupId>,
    /// Nature shared by the whole subtree.
    pub nature: AccountNature,
}

/// A postable account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    /// Unique identifier.
    pub id: LedgerId,
    /// Code, unique per temple.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Owning group.
    pub group_id: GroupId,
    /// Classification.
    pub ledger_type: LedgerType,
    /// Nature, always equal to the owning group's nature.
    pub nature: AccountNature,
    /// Opening balance in the ledger's normal direction.
    pub opening_balance: Decimal,
    /// Accounting year the opening balance applies to.
    pub opening_year_id: Option<AccountingYearId>,
    /// Inactive ledgers reject new postings.
    pub is_active: bool,
}

impl Ledger {
    /// Expense-classified ledgers are subject to budget checks.
    #[must_use]
    pub fn is_expense_classified(&self) -> bool {
        self.ledger_type == LedgerType::Expense || self.nature == AccountNature::Expense
    }

    /// Opening balance for the given year when no carry-forward row exists.
    #[must_use]
    pub fn own_opening_for(&self, year_id: AccountingYearId) -> Decimal {
        if self.opening_year_id == Some(year_id) {
            self.opening_balance
        } else {
            Decimal::ZERO
        }
    }
}
