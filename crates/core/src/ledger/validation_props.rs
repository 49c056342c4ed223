//! Property-based tests for structural line validation.

use devalaya_shared::types::LedgerId;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::EntryLineInput;
use super::validation::validate_lines;

/// Strategy to generate a valid positive amount (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|paise| Decimal::new(paise, 2))
}

/// Strategy for a set of debit amounts, each later split across credits.
fn debit_amounts() -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec(positive_amount(), 1..6)
}

/// Builds debit lines plus one credit line per debit with the same amount.
fn mirrored_lines(amounts: &[Decimal]) -> Vec<EntryLineInput> {
    let mut lines: Vec<EntryLineInput> = amounts
        .iter()
        .map(|a| EntryLineInput::debit(LedgerId::new(), *a))
        .collect();
    lines.extend(amounts.iter().map(|a| EntryLineInput::credit(LedgerId::new(), *a)));
    lines
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 3.1: Mirrored entries are always accepted**
    ///
    /// *For any* set of positive amounts, debiting each and crediting each
    /// yields a balanced entry whose totals equal the sum of amounts.
    #[test]
    fn prop_mirrored_lines_balance(amounts in debit_amounts()) {
        let lines = mirrored_lines(&amounts);
        let expected: Decimal = amounts.iter().copied().sum();

        let totals = validate_lines(&lines).unwrap();
        prop_assert!(totals.is_balanced);
        prop_assert_eq!(totals.debit, expected);
        prop_assert_eq!(totals.credit, expected);
    }

    /// **Property 3.2: Any drift breaks the balance**
    ///
    /// *For any* balanced entry, nudging one credit by a single paisa makes it
    /// unbalanced; there is no rounding tolerance.
    #[test]
    fn prop_single_paisa_drift_rejected(amounts in debit_amounts(), up in any::<bool>()) {
        let mut lines = mirrored_lines(&amounts);
        let last = lines.len() - 1;
        let paisa = Decimal::new(1, 2);
        if up {
            lines[last].credit += paisa;
        } else if lines[last].credit > paisa {
            lines[last].credit -= paisa;
        } else {
            lines[last].credit += paisa;
        }

        let result = validate_lines(&lines);
        let unbalanced = matches!(result, Err(LedgerError::Unbalanced { .. }));
        prop_assert!(unbalanced, "expected Unbalanced, got {:?}", result);
    }

    /// **Property 3.3: A negative amount is always rejected**
    #[test]
    fn prop_negative_amount_rejected(amounts in debit_amounts(), idx in any::<prop::sample::Index>()) {
        let mut lines = mirrored_lines(&amounts);
        let i = idx.index(lines.len());
        if lines[i].debit > Decimal::ZERO {
            lines[i].debit = -lines[i].debit;
        } else {
            lines[i].credit = -lines[i].credit;
        }

        let result = validate_lines(&lines);
        let negative = matches!(result, Err(LedgerError::NegativeAmount { .. }));
        prop_assert!(negative, "expected NegativeAmount, got {:?}", result);
    }
}
