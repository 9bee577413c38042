use super::error::PlannerError;
use super::types::Horizon;

const RATE_EPSILON: f64 = 1e-12;

fn is_zero_rate(rate: f64) -> bool {
    rate.abs() < RATE_EPSILON
}

pub(super) fn check_rate(rate: f64) -> Result<(), PlannerError> {
    if !rate.is_finite() || rate <= -1.0 {
        return Err(PlannerError::RateAtOrBelowTotalLoss { rate });
    }
    Ok(())
}

pub fn monthly_rate(annual_rate: f64) -> f64 {
    (1.0 + annual_rate).powf(1.0 / 12.0) - 1.0
}

pub fn future_value(present_value: f64, rate: f64, years: f64) -> f64 {
    present_value * (1.0 + rate).powf(years)
}

pub fn present_value(future_value: f64, rate: f64, years: f64) -> Result<f64, PlannerError> {
    check_rate(rate)?;
    Ok(future_value / (1.0 + rate).powf(years))
}

pub fn annuity_future_value(payment: f64, rate: f64, periods: f64) -> f64 {
    if is_zero_rate(rate) {
        return payment * periods;
    }
    payment * ((1.0 + rate).powf(periods) - 1.0) / rate
}

pub fn monthly_savings_future_value(monthly_payment: f64, annual_rate: f64, years: f64) -> f64 {
    annuity_future_value(monthly_payment, monthly_rate(annual_rate), years * 12.0)
}

/// Years to double money. Takes a percentage (6 for 6%), not a fraction.
/// `None` at 0%, where money never doubles.
pub fn rule_of_72(rate_percent: f64) -> Option<f64> {
    if rate_percent == 0.0 {
        return None;
    }
    Some(72.0 / rate_percent)
}

pub fn monthly_payment_needed(
    target: f64,
    annual_rate: f64,
    years: f64,
) -> Result<f64, PlannerError> {
    check_rate(annual_rate)?;
    let months = years * 12.0;
    if months <= 0.0 {
        return Err(PlannerError::EmptyHorizon);
    }

    let m = monthly_rate(annual_rate);
    if is_zero_rate(m) {
        return Ok(target / months);
    }
    Ok(target * m / ((1.0 + m).powf(months) - 1.0))
}

pub fn withdrawal_duration(
    starting_amount: f64,
    monthly_withdrawal: f64,
    annual_rate: f64,
) -> Result<Horizon, PlannerError> {
    check_rate(annual_rate)?;
    if starting_amount <= 0.0 {
        return Ok(Horizon::Finite(0.0));
    }
    if monthly_withdrawal <= 0.0 {
        return Ok(Horizon::Unbounded);
    }

    if is_zero_rate(annual_rate) {
        return Ok(Horizon::Finite(starting_amount / monthly_withdrawal / 12.0));
    }

    let m = monthly_rate(annual_rate);
    // Interest alone covers the withdrawal, so the balance never falls.
    if monthly_withdrawal <= starting_amount * m {
        return Ok(Horizon::Unbounded);
    }

    let months = -(1.0 - starting_amount * m / monthly_withdrawal).ln() / (1.0 + m).ln();
    Ok(Horizon::Finite(months / 12.0))
}

/// Number of periods for an investment to reach `future_value`, with the
/// spreadsheet NPER sign convention: money paid in (deposits, the opening
/// balance) is negative, money received is positive. The result may be
/// negative when the target is already behind the starting point.
pub fn periods_needed(rate: f64, payment: f64, present_value: f64, future_value: f64) -> Horizon {
    if !rate.is_finite() || rate <= -1.0 {
        return Horizon::Unbounded;
    }

    if is_zero_rate(rate) {
        if payment == 0.0 {
            return Horizon::Unbounded;
        }
        return Horizon::Finite(-(future_value + present_value) / payment);
    }

    let annuity = payment / rate;
    let ratio = (annuity - future_value) / (present_value + annuity);
    if !ratio.is_finite() || ratio <= 0.0 {
        return Horizon::Unbounded;
    }
    Horizon::Finite(ratio.ln() / (1.0 + rate).ln())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    #[test]
    fn future_value_matches_textbook_example() {
        assert_approx_tol(future_value(1000.0, 0.06, 10.0), 1790.85, 1.0);
    }

    #[test]
    fn future_value_with_zero_years_returns_principal() {
        assert_approx(future_value(2500.0, 0.07, 0.0), 2500.0);
    }

    #[test]
    fn rule_of_72_is_exact_for_six_percent() {
        assert_eq!(rule_of_72(6.0), Some(12.0));
        assert_eq!(rule_of_72(0.0), None);
    }

    #[test]
    fn present_value_rejects_total_loss_rate() {
        let err = present_value(1000.0, -1.0, 5.0).expect_err("rate of -100% is undefined");
        assert!(matches!(err, PlannerError::RateAtOrBelowTotalLoss { .. }));
    }

    #[test]
    fn annuity_future_value_with_zero_rate_is_sum_of_payments() {
        assert_approx(annuity_future_value(250.0, 0.0, 8.0), 2000.0);
    }

    #[test]
    fn annuity_future_value_matches_hand_calculation() {
        // 100 at end of each of 3 years at 10%: 100*1.21 + 100*1.1 + 100
        assert_approx(annuity_future_value(100.0, 0.10, 3.0), 331.0);
    }

    #[test]
    fn monthly_savings_of_500_for_30_years_at_7_percent() {
        let result = monthly_savings_future_value(500.0, 0.07, 30.0);
        assert!(600_000.0 < result && result < 700_000.0, "got {result}");
    }

    #[test]
    fn monthly_rate_compounds_back_to_annual_rate() {
        let m = monthly_rate(0.07);
        assert_approx((1.0 + m).powi(12) - 1.0, 0.07);
    }

    #[test]
    fn monthly_payment_for_a_million_over_30_years() {
        let payment = monthly_payment_needed(1_000_000.0, 0.07, 30.0).expect("valid inputs");
        assert!(1_500.0 < payment && payment < 2_000.0, "got {payment}");
    }

    #[test]
    fn monthly_payment_with_zero_rate_spreads_target_evenly() {
        let payment = monthly_payment_needed(120_000.0, 0.0, 10.0).expect("valid inputs");
        assert_approx(payment, 1_000.0);
    }

    #[test]
    fn monthly_payment_rejects_zero_years() {
        let err = monthly_payment_needed(10_000.0, 0.05, 0.0).expect_err("no months to save in");
        assert_eq!(err, PlannerError::EmptyHorizon);
    }

    #[test]
    fn withdrawal_of_3000_from_500k_at_5_percent_lasts_about_20_years() {
        let years = withdrawal_duration(500_000.0, 3_000.0, 0.05)
            .expect("valid inputs")
            .finite()
            .expect("finite duration");
        assert!(15.0 < years && years < 25.0, "got {years}");
    }

    #[test]
    fn withdrawal_with_zero_rate_divides_balance() {
        let horizon = withdrawal_duration(120_000.0, 1_000.0, 0.0).expect("valid inputs");
        assert_eq!(horizon, Horizon::Finite(10.0));
    }

    #[test]
    fn withdrawal_below_interest_income_lasts_forever() {
        let horizon = withdrawal_duration(1_000_000.0, 2_000.0, 0.05).expect("valid inputs");
        assert_eq!(horizon, Horizon::Unbounded);
    }

    #[test]
    fn withdrawal_from_empty_fund_is_immediate() {
        let horizon = withdrawal_duration(0.0, 1_000.0, 0.05).expect("valid inputs");
        assert_eq!(horizon, Horizon::Finite(0.0));
    }

    #[test]
    fn periods_needed_zero_rate_is_linear() {
        // Deposit 100 per period from nothing to reach 1,000.
        assert_eq!(periods_needed(0.0, -100.0, 0.0, 1_000.0), Horizon::Finite(10.0));
        assert_eq!(periods_needed(0.0, 0.0, 0.0, 1_000.0), Horizon::Unbounded);
    }

    #[test]
    fn periods_needed_inverts_annuity_accumulation() {
        let rate = 0.005;
        let periods = 240.0;
        let target = annuity_future_value(500.0, rate, periods);
        let solved = periods_needed(rate, -500.0, 0.0, target)
            .finite()
            .expect("reachable target");
        assert_approx_tol(solved, periods, 1e-6);
    }

    #[test]
    fn periods_needed_is_unbounded_when_withdrawing_toward_a_target() {
        // Receiving money each period never builds a positive balance.
        assert_eq!(periods_needed(0.01, 100.0, 0.0, 10_000.0), Horizon::Unbounded);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_zero_rate_future_value_is_identity(
            pv in 0u32..5_000_000,
            years in 0u32..80
        ) {
            let pv = pv as f64;
            prop_assert!((future_value(pv, 0.0, years as f64) - pv).abs() <= EPS);
        }

        #[test]
        fn prop_present_value_round_trips_future_value(
            pv_cents in 1u64..100_000_000,
            rate_bp in -9_900i32..9_900,
            years in 0u32..60
        ) {
            let pv = pv_cents as f64 / 100.0;
            let rate = rate_bp as f64 / 10_000.0;
            let years = years as f64;
            let fv = future_value(pv, rate, years);
            prop_assert!(fv.is_finite());
            let back = present_value(fv, rate, years).expect("rate above -100%");
            prop_assert!((back - pv).abs() <= pv * 1e-9 + 1e-9, "pv {pv}, back {back}");
        }

        #[test]
        fn prop_monthly_payment_reconstructs_target(
            target in 1_000u32..5_000_000,
            rate_bp in 0u32..1_500,
            years in 1u32..50
        ) {
            let target = target as f64;
            let rate = rate_bp as f64 / 10_000.0;
            let years = years as f64;
            let payment = monthly_payment_needed(target, rate, years).expect("valid inputs");
            let rebuilt = monthly_savings_future_value(payment, rate, years);
            prop_assert!(
                (rebuilt - target).abs() <= target * 1e-9,
                "target {target}, rebuilt {rebuilt}"
            );
        }

        #[test]
        fn prop_withdrawal_is_unbounded_iff_interest_covers_withdrawal(
            amount in 1_000u32..5_000_000,
            withdrawal in 1u32..50_000,
            rate_bp in 0u32..1_500
        ) {
            let amount = amount as f64;
            let withdrawal = withdrawal as f64;
            let rate = rate_bp as f64 / 10_000.0;
            let horizon = withdrawal_duration(amount, withdrawal, rate).expect("valid inputs");
            let covered = withdrawal <= amount * monthly_rate(rate);
            prop_assert!(horizon.is_unbounded() == covered);
            if let Horizon::Finite(years) = horizon {
                prop_assert!(years.is_finite() && years >= 0.0);
            }
        }
    }
}
