//! FEFO allocation planning.
//!
//! Pure decision step: no storage access, no mutation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{AllocationError, AllocationResult};
use crate::models::{Batch, PlannedDraw};

/// Which batches to draw from, in order, and how much is left unmet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub medicine_id: String,
    pub requested: u32,
    pub draws: Vec<PlannedDraw>,
    pub shortfall: u32,
}

impl AllocationPlan {
    /// Units the plan will supply.
    pub fn allocated(&self) -> u32 {
        self.requested.saturating_sub(self.shortfall)
    }

    pub fn is_complete(&self) -> bool {
        self.shortfall == 0
    }
}

/// Plan a draw of `requested` units against a medicine's batches.
///
/// Eligible batches (same medicine, stock on hand, expiry after `today`) are
/// walked in FEFO order and each supplies `min(remaining, available)`.
pub fn plan_allocation(
    medicine_id: &str,
    requested: u32,
    batches: &[Batch],
    today: NaiveDate,
) -> AllocationResult<AllocationPlan> {
    if requested == 0 {
        return Err(AllocationError::InvalidQuantity);
    }

    let mut eligible: Vec<&Batch> = batches
        .iter()
        .filter(|b| b.medicine_id == medicine_id && b.is_eligible(today))
        .collect();
    eligible.sort_by(|a, b| a.fefo_cmp(b));

    let mut remaining = requested;
    let mut draws = Vec::new();
    for batch in eligible {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(batch.quantity_available);
        draws.push(PlannedDraw {
            batch_id: batch.batch_id.clone(),
            quantity: take,
        });
        remaining -= take;
    }

    Ok(AllocationPlan {
        medicine_id: medicine_id.to_string(),
        requested,
        draws,
        shortfall: remaining,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewBatch;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn batch(id: &str, qty: u32, expiry: NaiveDate, received: NaiveDate) -> Batch {
        NewBatch::new("med-1", qty, expiry, received)
            .with_batch_id(id)
            .into_batch()
    }

    fn draws(plan: &AllocationPlan) -> Vec<(&str, u32)> {
        plan.draws
            .iter()
            .map(|d| (d.batch_id.as_str(), d.quantity))
            .collect()
    }

    #[test]
    fn test_plan_with_oversized_shortfall_allocates_nothing() {
        let plan = AllocationPlan {
            medicine_id: "med-1".into(),
            requested: 4,
            draws: Vec::new(),
            shortfall: 9,
        };
        assert_eq!(plan.allocated(), 0);
    }

    #[test]
    fn test_fefo_draws_earliest_first() {
        let today = date(2024, 12, 1);
        let batches = vec![
            batch("B2", 5, date(2025, 2, 1), date(2024, 1, 1)),
            batch("B1", 5, date(2025, 1, 1), date(2024, 1, 1)),
        ];

        let plan = plan_allocation("med-1", 7, &batches, today).unwrap();
        assert_eq!(draws(&plan), vec![("B1", 5), ("B2", 2)]);
        assert_eq!(plan.allocated(), 7);
        assert!(plan.is_complete());
    }

    #[test]
    fn test_same_expiry_uses_received_date() {
        let today = date(2024, 12, 1);
        let batches = vec![
            batch("A", 4, date(2025, 1, 1), date(2024, 5, 1)),
            batch("Z", 4, date(2025, 1, 1), date(2024, 3, 1)),
        ];

        for _ in 0..3 {
            let plan = plan_allocation("med-1", 6, &batches, today).unwrap();
            assert_eq!(draws(&plan), vec![("Z", 4), ("A", 2)]);
        }
    }

    #[test]
    fn test_full_tie_uses_batch_id() {
        let today = date(2024, 12, 1);
        let batches = vec![
            batch("B", 4, date(2025, 1, 1), date(2024, 3, 1)),
            batch("A", 4, date(2025, 1, 1), date(2024, 3, 1)),
        ];

        let plan = plan_allocation("med-1", 5, &batches, today).unwrap();
        assert_eq!(draws(&plan), vec![("A", 4), ("B", 1)]);
    }

    #[test]
    fn test_expired_batches_never_drawn() {
        let today = date(2025, 1, 1);
        let batches = vec![
            batch("EXPIRED", 100, date(2024, 12, 31), date(2024, 1, 1)),
            batch("TODAY", 100, date(2025, 1, 1), date(2024, 1, 1)),
            batch("GOOD", 3, date(2025, 6, 1), date(2024, 1, 1)),
        ];

        let plan = plan_allocation("med-1", 10, &batches, today).unwrap();
        assert_eq!(draws(&plan), vec![("GOOD", 3)]);
        assert_eq!(plan.shortfall, 7);
    }

    #[test]
    fn test_partial_drains_everything_eligible() {
        let today = date(2024, 12, 1);
        let batches = vec![
            batch("B1", 5, date(2025, 1, 1), date(2024, 1, 1)),
            batch("B2", 7, date(2025, 2, 1), date(2024, 1, 1)),
            batch("EMPTY", 0, date(2024, 12, 15), date(2024, 1, 1)),
        ];

        let plan = plan_allocation("med-1", 20, &batches, today).unwrap();
        assert_eq!(draws(&plan), vec![("B1", 5), ("B2", 7)]);
        assert_eq!(plan.allocated(), 12);
        assert_eq!(plan.shortfall, 8);
    }

    #[test]
    fn test_no_eligible_batches() {
        let plan = plan_allocation("med-1", 4, &[], date(2024, 12, 1)).unwrap();
        assert!(plan.draws.is_empty());
        assert_eq!(plan.shortfall, 4);
        assert_eq!(plan.allocated(), 0);
    }

    #[test]
    fn test_other_medicine_batches_ignored() {
        let today = date(2024, 12, 1);
        let mut foreign = batch("X", 50, date(2025, 1, 1), date(2024, 1, 1));
        foreign.medicine_id = "med-2".into();

        let plan = plan_allocation("med-1", 5, &[foreign], today).unwrap();
        assert_eq!(plan.shortfall, 5);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let result = plan_allocation("med-1", 0, &[], date(2024, 12, 1));
        assert!(matches!(result, Err(AllocationError::InvalidQuantity)));
    }

    fn arb_batches() -> impl Strategy<Value = Vec<Batch>> {
        prop::collection::vec((0u32..20, 0i64..60, 0i64..30), 0..8).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (qty, expiry_offset, received_offset))| {
                    let base = date(2025, 1, 1);
                    batch(
                        &format!("B{i:02}"),
                        qty,
                        base + chrono::Duration::days(expiry_offset),
                        base - chrono::Duration::days(received_offset),
                    )
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_plan_conserves_and_never_overdraws(
            batches in arb_batches(),
            requested in 1u32..120,
            today_offset in 0i64..40,
        ) {
            let today = date(2025, 1, 1) + chrono::Duration::days(today_offset);
            let plan = plan_allocation("med-1", requested, &batches, today).unwrap();

            let eligible_total: u32 = batches
                .iter()
                .filter(|b| b.is_eligible(today))
                .map(|b| b.quantity_available)
                .sum();
            prop_assert_eq!(plan.allocated(), requested.min(eligible_total));
            prop_assert_eq!(
                plan.draws.iter().map(|d| d.quantity).sum::<u32>(),
                plan.allocated()
            );

            for draw in &plan.draws {
                let source = batches.iter().find(|b| b.batch_id == draw.batch_id).unwrap();
                prop_assert!(draw.quantity > 0);
                prop_assert!(draw.quantity <= source.quantity_available);
                prop_assert!(!source.is_expired(today));
            }
        }

        #[test]
        fn prop_only_last_draw_is_partial(
            batches in arb_batches(),
            requested in 1u32..120,
        ) {
            let today = date(2025, 1, 1);
            let plan = plan_allocation("med-1", requested, &batches, today).unwrap();

            // Every draw but the last empties its batch, and draws follow FEFO order
            let sources: Vec<&Batch> = plan
                .draws
                .iter()
                .map(|d| batches.iter().find(|b| b.batch_id == d.batch_id).unwrap())
                .collect();
            for (draw, source) in plan.draws.iter().zip(&sources).rev().skip(1) {
                prop_assert_eq!(draw.quantity, source.quantity_available);
            }
            for pair in sources.windows(2) {
                prop_assert!(pair[0].fefo_cmp(pair[1]).is_lt());
            }
        }

        #[test]
        fn prop_plan_is_order_independent(
            batches in arb_batches(),
            requested in 1u32..120,
        ) {
            let today = date(2025, 1, 1);
            let mut reversed = batches.clone();
            reversed.reverse();
            prop_assert_eq!(
                plan_allocation("med-1", requested, &batches, today).unwrap(),
                plan_allocation("med-1", requested, &reversed, today).unwrap()
            );
        }
    }
}
