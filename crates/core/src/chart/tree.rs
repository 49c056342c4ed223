//! Arena-backed chart of accounts.

use std::collections::HashMap;

use devalaya_shared::types::{GroupId, LedgerId};
use rust_decimal::Decimal;
use serde::Serialize;

use super::error::ChartError;
use super::types::{AccountGroup, AccountNature, Ledger};

/// The chart of accounts of one temple.
///
/// Groups and ledgers live in flat maps; hierarchy is expressed only through
/// `parent_id` and `group_id` references. Every mutation validates the
/// invariants before touching the maps, so a failed call leaves the chart
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct ChartOfAccounts {
    groups: HashMap<GroupId, AccountGroup>,
    ledgers: HashMap<LedgerId, Ledger>,
}

/// A group with its nested children and ledgers.
#[derive(Debug, Clone, Serialize)]
pub struct GroupNode {
    /// The group.
    pub group: AccountGroup,
    /// Child groups, ordered by code.
    pub children: Vec<GroupNode>,
    /// Ledgers owned directly by the group, ordered by code.
    pub ledgers: Vec<Ledger>,
}

/// Aggregated balance of a group subtree.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    /// Group ID.
    pub group_id: GroupId,
    /// Group code.
    pub code: String,
    /// Group name.
    pub name: String,
    /// Group nature.
    pub nature: AccountNature,
    /// Sum of the ledgers owned directly by this group.
    pub own_total: Decimal,
    /// Sum over the whole subtree.
    pub total: Decimal,
    /// Child group summaries, ordered by code.
    pub children: Vec<GroupSummary>,
}

impl ChartOfAccounts {
    /// Creates an empty chart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a chart from stored rows.
    ///
    /// Stored rows are trusted: they were validated when written.
    #[must_use]
    pub fn from_parts(
        groups: impl IntoIterator<Item = AccountGroup>,
        ledgers: impl IntoIterator<Item = Ledger>,
    ) -> Self {
        Self {
            groups: groups.into_iter().map(|g| (g.id, g)).collect(),
            ledgers: ledgers.into_iter().map(|l| (l.id, l)).collect(),
        }
    }

    /// Looks up a group.
    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&AccountGroup> {
        self.groups.get(&id)
    }

    /// Looks up a ledger.
    #[must_use]
    pub fn ledger(&self, id: LedgerId) -> Option<&Ledger> {
        self.ledgers.get(&id)
    }

    /// Iterates over all groups in arbitrary order.
    pub fn groups(&self) -> impl Iterator<Item = &AccountGroup> {
        self.groups.values()
    }

    /// Iterates over all ledgers in arbitrary order.
    pub fn ledgers(&self) -> impl Iterator<Item = &Ledger> {
        self.ledgers.values()
    }

    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    /// Adds a group.
    ///
    /// A child group must share its parent's nature.
    pub fn add_group(&mut self, group: AccountGroup) -> Result<(), ChartError> {
        self.ensure_group_code_free(&group.code, None)?;
        if let Some(parent_id) = group.parent_id {
            let parent = self.require_group(parent_id)?;
            if parent.nature != group.nature {
                return Err(ChartError::NatureMismatch {
                    expected: parent.nature,
                    actual: group.nature,
                });
            }
        }
        self.groups.insert(group.id, group);
        Ok(())
    }

    /// Renames a group or changes its code.
    pub fn update_group(&mut self, id: GroupId, code: String, name: String) -> Result<&AccountGroup, ChartError> {
        self.require_group(id)?;
        self.ensure_group_code_free(&code, Some(id))?;
        let group = self.groups.get_mut(&id).ok_or(ChartError::GroupNotFound(id))?;
        group.code = code;
        group.name = name;
        Ok(group)
    }

    /// Re-parents a group, or makes it a root when `new_parent` is `None`.
    ///
    /// Walks the ancestors of the new parent before linking; finding `id`
    /// among them means the move would close a cycle.
    pub fn move_group(&mut self, id: GroupId, new_parent: Option<GroupId>) -> Result<(), ChartError> {
        let nature = self.require_group(id)?.nature;

        if let Some(parent_id) = new_parent {
            let parent = self.require_group(parent_id)?;
            if parent.nature != nature {
                return Err(ChartError::NatureMismatch {
                    expected: parent.nature,
                    actual: nature,
                });
            }
            if parent_id == id || self.ancestors(parent_id).contains(&id) {
                return Err(ChartError::CycleDetected {
                    group: id,
                    parent: parent_id,
                });
            }
        }

        if let Some(group) = self.groups.get_mut(&id) {
            group.parent_id = new_parent;
        }
        Ok(())
    }

    /// Removes an empty group.
    pub fn remove_group(&mut self, id: GroupId) -> Result<AccountGroup, ChartError> {
        self.require_group(id)?;
        let has_children = self.groups.values().any(|g| g.parent_id == Some(id))
            || self.ledgers.values().any(|l| l.group_id == id);
        if has_children {
            return Err(ChartError::GroupNotEmpty(id));
        }
        self.groups.remove(&id).ok_or(ChartError::GroupNotFound(id))
    }

    /// Returns the ancestors of a group, nearest first.
    ///
    /// The walk is bounded by the number of groups, so corrupted data can
    /// never loop forever.
    #[must_use]
    pub fn ancestors(&self, id: GroupId) -> Vec<GroupId> {
        let mut ancestors = Vec::new();
        let mut current = self.groups.get(&id).and_then(|g| g.parent_id);
        while let Some(parent_id) = current {
            if ancestors.len() > self.groups.len() || ancestors.contains(&parent_id) {
                break;
            }
            ancestors.push(parent_id);
            current = self.groups.get(&parent_id).and_then(|g| g.parent_id);
        }
        ancestors
    }

    // ------------------------------------------------------------------
    // Ledgers
    // ------------------------------------------------------------------

    /// Adds a ledger under its group.
    pub fn add_ledger(&mut self, ledger: Ledger) -> Result<(), ChartError> {
        self.ensure_ledger_code_free(&ledger.code, None)?;
        self.ensure_ledger_fits_group(&ledger, ledger.group_id)?;
        self.ledgers.insert(ledger.id, ledger);
        Ok(())
    }

    /// Renames a ledger or changes its code.
    ///
    /// Entry lines keep only the ledger reference, so history follows the rename.
    pub fn update_ledger(&mut self, id: LedgerId, code: String, name: String) -> Result<&Ledger, ChartError> {
        self.require_ledger(id)?;
        self.ensure_ledger_code_free(&code, Some(id))?;
        let ledger = self.ledgers.get_mut(&id).ok_or(ChartError::LedgerNotFound(id))?;
        ledger.code = code;
        ledger.name = name;
        Ok(ledger)
    }

    /// Moves a ledger to another group of the same nature.
    pub fn move_ledger(&mut self, id: LedgerId, group_id: GroupId) -> Result<(), ChartError> {
        let ledger = self.require_ledger(id)?;
        self.ensure_ledger_fits_group(ledger, group_id)?;
        if let Some(ledger) = self.ledgers.get_mut(&id) {
            ledger.group_id = group_id;
        }
        Ok(())
    }

    /// Activates or deactivates a ledger.
    pub fn set_ledger_active(&mut self, id: LedgerId, is_active: bool) -> Result<(), ChartError> {
        let ledger = self.ledgers.get_mut(&id).ok_or(ChartError::LedgerNotFound(id))?;
        ledger.is_active = is_active;
        Ok(())
    }

    /// Removes a ledger that nothing references.
    ///
    /// `references` counts entry lines, budgets, reconciliation sessions,
    /// carried-forward openings, and closing markers pointing at the ledger.
    pub fn remove_ledger(&mut self, id: LedgerId, references: u64) -> Result<Ledger, ChartError> {
        self.require_ledger(id)?;
        if references > 0 {
            return Err(ChartError::ReferencedEntity {
                ledger: id,
                references,
            });
        }
        self.ledgers.remove(&id).ok_or(ChartError::LedgerNotFound(id))
    }

    /// Returns every ledger in the subtree rooted at `group_id`.
    #[must_use]
    pub fn ledgers_in_subtree(&self, group_id: GroupId) -> Vec<LedgerId> {
        let mut ids: Vec<LedgerId> = self
            .ledgers
            .values()
            .filter(|l| l.group_id == group_id || self.ancestors(l.group_id).contains(&group_id))
            .map(|l| l.id)
            .collect();
        ids.sort_by_key(|id| id.into_inner());
        ids
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Builds the hierarchical tree, roots and children ordered by code.
    #[must_use]
    pub fn tree(&self) -> Vec<GroupNode> {
        let mut roots: Vec<&AccountGroup> =
            self.groups.values().filter(|g| g.parent_id.is_none()).collect();
        roots.sort_by(|a, b| a.code.cmp(&b.code));
        roots.into_iter().map(|g| self.build_node(g)).collect()
    }

    fn build_node(&self, group: &AccountGroup) -> GroupNode {
        let mut children: Vec<&AccountGroup> = self
            .groups
            .values()
            .filter(|g| g.parent_id == Some(group.id))
            .collect();
        children.sort_by(|a, b| a.code.cmp(&b.code));

        let mut ledgers: Vec<Ledger> = self
            .ledgers
            .values()
            .filter(|l| l.group_id == group.id)
            .cloned()
            .collect();
        ledgers.sort_by(|a, b| a.code.cmp(&b.code));

        GroupNode {
            group: group.clone(),
            children: children.into_iter().map(|g| self.build_node(g)).collect(),
            ledgers,
        }
    }

    /// Aggregates ledger balances recursively over the group tree.
    ///
    /// Ledgers missing from `balances` count as zero.
    #[must_use]
    pub fn summarize(&self, balances: &HashMap<LedgerId, Decimal>) -> Vec<GroupSummary> {
        self.tree()
            .iter()
            .map(|node| Self::summarize_node(node, balances))
            .collect()
    }

    fn summarize_node(node: &GroupNode, balances: &HashMap<LedgerId, Decimal>) -> GroupSummary {
        let own_total: Decimal = node
            .ledgers
            .iter()
            .map(|l| balances.get(&l.id).copied().unwrap_or_default())
            .sum();
        let children: Vec<GroupSummary> = node
            .children
            .iter()
            .map(|child| Self::summarize_node(child, balances))
            .collect();
        let total = own_total + children.iter().map(|c| c.total).sum::<Decimal>();

        GroupSummary {
            group_id: node.group.id,
            code: node.group.code.clone(),
            name: node.group.name.clone(),
            nature: node.group.nature,
            own_total,
            total,
            children,
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn require_group(&self, id: GroupId) -> Result<&AccountGroup, ChartError> {
        self.groups.get(&id).ok_or(ChartError::GroupNotFound(id))
    }

    fn require_ledger(&self, id: LedgerId) -> Result<&Ledger, ChartError> {
        self.ledgers.get(&id).ok_or(ChartError::LedgerNotFound(id))
    }

    fn ensure_group_code_free(&self, code: &str, except: Option<GroupId>) -> Result<(), ChartError> {
        if self
            .groups
            .values()
            .any(|g| g.code == code && Some(g.id) != except)
        {
            return Err(ChartError::DuplicateCode(code.to_string()));
        }
        Ok(())
    }

    fn ensure_ledger_code_free(&self, code: &str, except: Option<LedgerId>) -> Result<(), ChartError> {
        if self
            .ledgers
            .values()
            .any(|l| l.code == code && Some(l.id) != except)
        {
            return Err(ChartError::DuplicateCode(code.to_string()));
        }
        Ok(())
    }

    fn ensure_ledger_fits_group(&self, ledger: &Ledger, group_id: GroupId) -> Result<(), ChartError> {
        let group = self.require_group(group_id)?;
        if group.nature != ledger.nature {
            return Err(ChartError::NatureMismatch {
                expected: group.nature,
                actual: ledger.nature,
            });
        }
        if !ledger.ledger_type.allows_nature(group.nature) {
            return Err(ChartError::IncompatibleLedgerType {
                ledger_type: ledger.ledger_type,
                nature: group.nature,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::types::LedgerType;
    use rust_decimal_macros::dec;

    fn group(code: &str, parent: Option<GroupId>, nature: AccountNature) -> AccountGroup {
        AccountGroup {
            id: GroupId::new(),
            code: code.to_string(),
            name: format!("Group {code}"),
            parent_id: parent,
            nature,
        }
    }

    fn ledger(code: &str, group: &AccountGroup, ledger_type: LedgerType) -> Ledger {
        Ledger {
            id: LedgerId::new(),
            code: code.to_string(),
            name: format!("Ledger {code}"),
            group_id: group.id,
            ledger_type,
            nature: group.nature,
            opening_balance: Decimal::ZERO,
            opening_year_id: None,
            is_active: true,
        }
    }

    /// Assets > Current Assets > Bank Accounts
    fn sample_chart() -> (ChartOfAccounts, AccountGroup, AccountGroup, AccountGroup) {
        let mut chart = ChartOfAccounts::new();
        let assets = group("1", None, AccountNature::Asset);
        let current = group("11", Some(assets.id), AccountNature::Asset);
        let banks = group("111", Some(current.id), AccountNature::Asset);
        chart.add_group(assets.clone()).unwrap();
        chart.add_group(current.clone()).unwrap();
        chart.add_group(banks.clone()).unwrap();
        (chart, assets, current, banks)
    }

    #[test]
    fn test_child_group_must_share_nature() {
        let (mut chart, assets, _, _) = sample_chart();
        let err = chart
            .add_group(group("19", Some(assets.id), AccountNature::Income))
            .unwrap_err();
        assert!(matches!(
            err,
            ChartError::NatureMismatch { expected: AccountNature::Asset, actual: AccountNature::Income }
        ));
    }

    #[test]
    fn test_duplicate_group_code_rejected() {
        let (mut chart, _, _, _) = sample_chart();
        let err = chart.add_group(group("11", None, AccountNature::Asset)).unwrap_err();
        assert!(matches!(err, ChartError::DuplicateCode(code) if code == "11"));
    }

    #[test]
    fn test_move_under_descendant_is_cycle() {
        let (mut chart, assets, _, banks) = sample_chart();
        let err = chart.move_group(assets.id, Some(banks.id)).unwrap_err();
        assert!(matches!(err, ChartError::CycleDetected { .. }));

        let err = chart.move_group(banks.id, Some(banks.id)).unwrap_err();
        assert!(matches!(err, ChartError::CycleDetected { .. }));

        // Chart untouched after the failed moves.
        assert_eq!(chart.group(assets.id).unwrap().parent_id, None);
    }

    #[test]
    fn test_move_to_root_and_back() {
        let (mut chart, assets, current, banks) = sample_chart();
        chart.move_group(banks.id, None).unwrap();
        assert!(chart.ancestors(banks.id).is_empty());
        chart.move_group(banks.id, Some(assets.id)).unwrap();
        assert_eq!(chart.ancestors(banks.id), vec![assets.id]);
        assert_eq!(chart.ancestors(current.id), vec![assets.id]);
    }

    #[test]
    fn test_move_group_across_natures_rejected() {
        let (mut chart, _, _, banks) = sample_chart();
        let income = group("4", None, AccountNature::Income);
        chart.add_group(income.clone()).unwrap();
        assert!(matches!(
            chart.move_group(banks.id, Some(income.id)),
            Err(ChartError::NatureMismatch { .. })
        ));
    }

    #[test]
    fn test_ledger_nature_and_type_validated() {
        let (mut chart, _, _, banks) = sample_chart();
        let income = group("4", None, AccountNature::Income);
        chart.add_group(income.clone()).unwrap();

        chart.add_ledger(ledger("1111", &banks, LedgerType::Bank)).unwrap();

        let mut wrong_nature = ledger("1112", &banks, LedgerType::Bank);
        wrong_nature.nature = AccountNature::Liability;
        assert!(matches!(
            chart.add_ledger(wrong_nature),
            Err(ChartError::NatureMismatch { .. })
        ));

        assert!(matches!(
            chart.add_ledger(ledger("4001", &income, LedgerType::Bank)),
            Err(ChartError::IncompatibleLedgerType { .. })
        ));
    }

    #[test]
    fn test_move_ledger_requires_matching_nature() {
        let (mut chart, _, current, banks) = sample_chart();
        let expenses = group("5", None, AccountNature::Expense);
        chart.add_group(expenses.clone()).unwrap();
        let sbi = ledger("1111", &banks, LedgerType::Bank);
        chart.add_ledger(sbi.clone()).unwrap();

        chart.move_ledger(sbi.id, current.id).unwrap();
        assert_eq!(chart.ledger(sbi.id).unwrap().group_id, current.id);

        assert!(chart.move_ledger(sbi.id, expenses.id).is_err());
        assert_eq!(chart.ledger(sbi.id).unwrap().group_id, current.id);
    }

    #[test]
    fn test_referenced_ledger_cannot_be_removed() {
        let (mut chart, _, _, banks) = sample_chart();
        let sbi = ledger("1111", &banks, LedgerType::Bank);
        chart.add_ledger(sbi.clone()).unwrap();

        let err = chart.remove_ledger(sbi.id, 3).unwrap_err();
        assert!(matches!(err, ChartError::ReferencedEntity { references: 3, .. }));
        assert!(chart.ledger(sbi.id).is_some());

        chart.remove_ledger(sbi.id, 0).unwrap();
        assert!(chart.ledger(sbi.id).is_none());
    }

    #[test]
    fn test_non_empty_group_cannot_be_removed() {
        let (mut chart, assets, current, banks) = sample_chart();
        assert!(matches!(chart.remove_group(assets.id), Err(ChartError::GroupNotEmpty(_))));
        chart.remove_group(banks.id).unwrap();
        chart.remove_group(current.id).unwrap();
        chart.remove_group(assets.id).unwrap();
        assert_eq!(chart.groups().count(), 0);
    }

    #[test]
    fn test_tree_and_recursive_summary() {
        let (mut chart, assets, current, banks) = sample_chart();
        let cash = ledger("1101", &current, LedgerType::Cash);
        let sbi = ledger("1111", &banks, LedgerType::Bank);
        let canara = ledger("1112", &banks, LedgerType::Bank);
        chart.add_ledger(cash.clone()).unwrap();
        chart.add_ledger(sbi.clone()).unwrap();
        chart.add_ledger(canara.clone()).unwrap();

        let tree = chart.tree();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].group.id, assets.id);
        assert_eq!(tree[0].children[0].ledgers[0].code, "1101");
        assert_eq!(tree[0].children[0].children[0].ledgers.len(), 2);

        let balances = HashMap::from([
            (cash.id, dec!(250.00)),
            (sbi.id, dec!(1000.00)),
            (canara.id, dec!(-100.00)),
        ]);
        let summary = chart.summarize(&balances);
        assert_eq!(summary[0].total, dec!(1150.00));
        assert_eq!(summary[0].own_total, Decimal::ZERO);
        assert_eq!(summary[0].children[0].own_total, dec!(250.00));
        assert_eq!(summary[0].children[0].children[0].total, dec!(900.00));

        assert_eq!(chart.ledgers_in_subtree(current.id).len(), 3);
        assert_eq!(chart.ledgers_in_subtree(banks.id).len(), 2);
    }
}
