pub mod adjustments;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::session::AnswerStore;

pub use adjustments::{
    load_adjustments, parse_adjustments, Adjustment, AdjustmentKind, AdjustmentLoadError,
    Predicate,
};

/// One line of the applied-adjustment breakdown on a quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedAdjustment {
    pub description: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub total: Decimal,
    pub applied: Vec<AppliedAdjustment>,
}

/// Runs the adjustment pipeline over a base price in declared order.
///
/// All arithmetic stays in fixed-point decimals; monetary contributions are
/// rounded to two places as they accrue. Given identical inputs the outcome
/// is identical on every run, which is what makes quotes auditable.
pub fn apply(
    base_price: Decimal,
    answers: &AnswerStore,
    adjustments: &[Adjustment],
) -> PipelineOutcome {
    let mut total = base_price;
    let mut applied = Vec::new();

    for adjustment in adjustments {
        if !adjustment.applies_when.evaluate(answers) {
            continue;
        }

        let amount = match adjustment.kind {
            AdjustmentKind::FixedAmount => adjustment.value,
            AdjustmentKind::PercentageOfBase { compounding } => {
                let basis = if compounding { total } else { base_price };
                (adjustment.value / Decimal::ONE_HUNDRED * basis).round_dp(2)
            }
        };

        total += amount;
        applied.push(AppliedAdjustment { description: adjustment.description.clone(), amount });
    }

    PipelineOutcome { total: total.round_dp(2), applied }
}
