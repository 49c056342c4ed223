//! Property-based tests for accounting year overlap rules.

use chrono::{Duration, NaiveDate};
use devalaya_shared::types::AccountingYearId;
use proptest::prelude::*;

use super::service::YearService;
use super::year::{AccountingYear, YearStatus};

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

/// Strategy for a (start offset, length) pair in days.
fn arb_range() -> impl Strategy<Value = (i64, i64)> {
    (0i64..3_000, 1i64..800)
}

fn make_year(offset: i64, len: i64) -> AccountingYear {
    let start = base() + Duration::days(offset);
    AccountingYear {
        id: AccountingYearId::new(),
        name: format!("Y{offset}"),
        start_date: start,
        end_date: start + Duration::days(len),
        status: YearStatus::Open,
        is_active: false,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 1.1: Overlap check agrees with interval intersection**
    ///
    /// *For any* existing year and candidate range, the candidate is rejected
    /// exactly when the two closed intervals intersect.
    #[test]
    fn prop_overlap_matches_interval_intersection(
        (a_off, a_len) in arb_range(),
        (b_off, b_len) in arb_range(),
    ) {
        let existing = make_year(a_off, a_len);
        let candidate = make_year(b_off, b_len);

        let intersects = a_off <= b_off + b_len && b_off <= a_off + a_len;
        let result = YearService::check_overlap(
            candidate.start_date,
            candidate.end_date,
            std::slice::from_ref(&existing),
        );

        prop_assert_eq!(result.is_err(), intersects);
    }

    /// **Property 1.2: Accepted years never overlap each other**
    ///
    /// *For any* sequence of candidate ranges, adding only the accepted ones
    /// yields a set of pairwise disjoint years.
    #[test]
    fn prop_accepted_years_are_disjoint(ranges in prop::collection::vec(arb_range(), 1..15)) {
        let mut accepted: Vec<AccountingYear> = Vec::new();
        for (off, len) in ranges {
            let candidate = make_year(off, len);
            if YearService::check_overlap(candidate.start_date, candidate.end_date, &accepted).is_ok() {
                accepted.push(candidate);
            }
        }

        for (i, a) in accepted.iter().enumerate() {
            for b in accepted.iter().skip(i + 1) {
                prop_assert!(!a.overlaps(b.start_date, b.end_date));
            }
        }
    }
}
