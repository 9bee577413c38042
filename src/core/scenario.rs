use super::error::PlannerError;
use super::formulas::{
    check_rate, future_value, monthly_payment_needed, monthly_savings_future_value, present_value,
    rule_of_72, withdrawal_duration,
};
use super::types::{
    GrowthPoint, Horizon, RETIREMENT_YEARS, RetirementAgeWhatIf, RetirementAnalysis,
    ReturnRateWhatIf, SavingsWhatIf, ScenarioResult, UserProfile, WhatIfResult,
    WithdrawalAnalysis,
};

const EXTRA_MONTHLY_SAVINGS: f64 = 200.0;
const LATER_RETIREMENT_YEARS: u32 = 2;
const CONSERVATIVE_RETURN: f64 = 0.05;
const AGGRESSIVE_RETURN: f64 = 0.09;

fn retirement_months() -> f64 {
    f64::from(RETIREMENT_YEARS) * 12.0
}

fn projected_total(current_savings: f64, monthly_savings: f64, rate: f64, years: u32) -> f64 {
    let years = f64::from(years);
    future_value(current_savings, rate, years)
        + monthly_savings_future_value(monthly_savings, rate, years)
}

pub fn monthly_income_estimate(total: f64) -> f64 {
    total / retirement_months()
}

pub fn growth_series(profile: &UserProfile) -> Vec<GrowthPoint> {
    (0..=profile.years_to_retirement())
        .map(|year| {
            let elapsed = f64::from(year);
            let from_existing_savings =
                future_value(profile.current_savings, profile.expected_return, elapsed);
            let from_monthly_savings = monthly_savings_future_value(
                profile.monthly_savings,
                profile.expected_return,
                elapsed,
            );
            GrowthPoint {
                age: profile.age + year,
                from_existing_savings,
                from_monthly_savings,
                total: from_existing_savings + from_monthly_savings,
            }
        })
        .collect()
}

pub fn scenario_table(profile: &UserProfile) -> Vec<ScenarioResult> {
    let base_years = profile.years_to_retirement();
    let menu = [
        (
            "Current Plan".to_string(),
            profile.monthly_savings,
            base_years,
            profile.expected_return,
        ),
        (
            format!("Save ${EXTRA_MONTHLY_SAVINGS:.0} More"),
            profile.monthly_savings + EXTRA_MONTHLY_SAVINGS,
            base_years,
            profile.expected_return,
        ),
        (
            format!("Retire {LATER_RETIREMENT_YEARS} Years Later"),
            profile.monthly_savings,
            base_years + LATER_RETIREMENT_YEARS,
            profile.expected_return,
        ),
        (
            format!("Conservative ({:.0}%)", CONSERVATIVE_RETURN * 100.0),
            profile.monthly_savings,
            base_years,
            CONSERVATIVE_RETURN,
        ),
        (
            format!("Aggressive ({:.0}%)", AGGRESSIVE_RETURN * 100.0),
            profile.monthly_savings,
            base_years,
            AGGRESSIVE_RETURN,
        ),
    ];

    menu.into_iter()
        .map(|(label, monthly_savings, years, return_rate)| {
            let total_at_retirement =
                projected_total(profile.current_savings, monthly_savings, return_rate, years);
            ScenarioResult {
                label,
                monthly_savings,
                years,
                return_rate,
                total_at_retirement,
                monthly_income_estimate: monthly_income_estimate(total_at_retirement),
            }
        })
        .collect()
}

pub fn what_if_savings(profile: &UserProfile, extra_monthly: f64) -> SavingsWhatIf {
    let years = profile.years_to_retirement();
    let new_monthly_savings = profile.monthly_savings + extra_monthly;
    let original_total = projected_total(
        profile.current_savings,
        profile.monthly_savings,
        profile.expected_return,
        years,
    );
    let new_total = projected_total(
        profile.current_savings,
        new_monthly_savings,
        profile.expected_return,
        years,
    );
    let difference = new_total - original_total;

    SavingsWhatIf {
        extra_monthly,
        new_monthly_savings,
        outcome: WhatIfResult {
            original_total,
            new_total,
            difference,
        },
        extra_monthly_income: monthly_income_estimate(difference),
    }
}

pub fn what_if_retirement_age(
    profile: &UserProfile,
    years_delta: i32,
) -> Result<RetirementAgeWhatIf, PlannerError> {
    let new_retirement_age = i64::from(profile.retirement_age) + i64::from(years_delta);
    if new_retirement_age <= i64::from(profile.age) {
        return Err(PlannerError::InvalidRetirementAge {
            current_age: profile.age,
            retirement_age: new_retirement_age,
        });
    }
    let new_retirement_age = u32::try_from(new_retirement_age).map_err(|_| {
        PlannerError::invalid_profile("retirementAge", "adjusted age is out of range")
    })?;

    let original_total = projected_total(
        profile.current_savings,
        profile.monthly_savings,
        profile.expected_return,
        profile.years_to_retirement(),
    );
    let new_total = projected_total(
        profile.current_savings,
        profile.monthly_savings,
        profile.expected_return,
        new_retirement_age - profile.age,
    );

    Ok(RetirementAgeWhatIf {
        years_delta,
        original_retirement_age: profile.retirement_age,
        new_retirement_age,
        outcome: WhatIfResult {
            original_total,
            new_total,
            difference: new_total - original_total,
        },
    })
}

pub fn what_if_return_rate(
    profile: &UserProfile,
    new_rate: f64,
) -> Result<ReturnRateWhatIf, PlannerError> {
    check_rate(new_rate)?;
    let years = profile.years_to_retirement();
    let original_total = projected_total(
        profile.current_savings,
        profile.monthly_savings,
        profile.expected_return,
        years,
    );
    let new_total = projected_total(
        profile.current_savings,
        profile.monthly_savings,
        new_rate,
        years,
    );
    let difference = new_total - original_total;
    let rate_points = (new_rate - profile.expected_return) * 100.0;
    let difference_per_point = (rate_points.abs() > 1e-12).then(|| difference / rate_points);

    Ok(ReturnRateWhatIf {
        original_rate: profile.expected_return,
        new_rate,
        outcome: WhatIfResult {
            original_total,
            new_total,
            difference,
        },
        difference_per_point,
    })
}

pub fn retirement_analysis(profile: &UserProfile) -> Result<RetirementAnalysis, PlannerError> {
    let years_to_retirement = profile.years_to_retirement();
    let years = f64::from(years_to_retirement);

    let current_savings_future =
        future_value(profile.current_savings, profile.expected_return, years);
    let monthly_savings_future =
        monthly_savings_future_value(profile.monthly_savings, profile.expected_return, years);
    let total_retirement_fund = current_savings_future + monthly_savings_future;

    let retirement_needs = profile.monthly_expenses * retirement_months();
    let retirement_needs_present_value =
        present_value(retirement_needs, profile.expected_return, years)?;

    let monthly_income_from_savings = monthly_income_estimate(total_retirement_fund);
    let on_track = monthly_income_from_savings >= profile.monthly_expenses;
    let monthly_shortfall = (profile.monthly_expenses - monthly_income_from_savings).max(0.0);
    let additional_monthly_needed = if on_track {
        0.0
    } else {
        monthly_payment_needed(
            monthly_shortfall * retirement_months(),
            profile.expected_return,
            years,
        )?
    };

    Ok(RetirementAnalysis {
        years_to_retirement,
        current_savings_future,
        monthly_savings_future,
        total_retirement_fund,
        retirement_needs,
        retirement_needs_present_value,
        surplus_deficit: total_retirement_fund - retirement_needs_present_value,
        monthly_income_from_savings,
        on_track,
        monthly_shortfall,
        additional_monthly_needed,
        // rule_of_72 takes a percentage, the profile holds a fraction.
        doubling_years: rule_of_72(profile.expected_return * 100.0),
    })
}

pub fn withdrawal_analysis(
    profile: &UserProfile,
    starting_amount: f64,
    monthly_withdrawal: f64,
) -> Result<WithdrawalAnalysis, PlannerError> {
    let duration_years =
        withdrawal_duration(starting_amount, monthly_withdrawal, profile.expected_return)?;
    let depleted_at_age = match duration_years {
        Horizon::Finite(years) => Some(f64::from(profile.retirement_age) + years),
        Horizon::Unbounded => None,
    };

    Ok(WithdrawalAnalysis {
        starting_amount,
        monthly_withdrawal,
        annual_rate: profile.expected_return,
        duration_years,
        monthly_interest_income: starting_amount * profile.expected_return / 12.0,
        depleted_at_age,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_profile() -> UserProfile {
        UserProfile {
            name: "John".to_string(),
            age: 30,
            annual_income: 60_000.0,
            current_savings: 15_000.0,
            monthly_savings: 800.0,
            retirement_age: 65,
            expected_return: 0.07,
            monthly_expenses: 4_000.0,
        }
    }

    #[test]
    fn growth_series_spans_current_age_to_retirement_age() {
        let series = growth_series(&sample_profile());
        assert_eq!(series.len(), 36);

        let first = series.first().expect("non-empty series");
        assert_eq!(first.age, 30);
        assert_approx(first.total, 15_000.0);
        assert_approx(first.from_monthly_savings, 0.0);

        let last = series.last().expect("non-empty series");
        assert_eq!(last.age, 65);
        assert!(series.windows(2).all(|w| w[1].age == w[0].age + 1));
    }

    #[test]
    fn growth_series_last_point_matches_current_plan_scenario() {
        let profile = sample_profile();
        let series = growth_series(&profile);
        let table = scenario_table(&profile);
        let last = series.last().expect("non-empty series");
        assert_approx(last.total, table[0].total_at_retirement);
    }

    #[test]
    fn scenario_table_lists_the_five_variants_in_order() {
        let table = scenario_table(&sample_profile());
        let labels: Vec<&str> = table.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Current Plan",
                "Save $200 More",
                "Retire 2 Years Later",
                "Conservative (5%)",
                "Aggressive (9%)",
            ]
        );
        assert_approx(table[1].monthly_savings, 1_000.0);
        assert_eq!(table[2].years, 37);
        assert_approx(table[3].return_rate, 0.05);
        assert_approx(table[4].return_rate, 0.09);
    }

    #[test]
    fn scenario_income_estimate_spreads_total_over_retirement_period() {
        for scenario in scenario_table(&sample_profile()) {
            assert_approx(
                scenario.monthly_income_estimate,
                scenario.total_at_retirement / 25.0 / 12.0,
            );
        }
    }

    #[test]
    fn scenario_variants_rank_as_expected() {
        let table = scenario_table(&sample_profile());
        let current = table[0].total_at_retirement;
        assert!(table[1].total_at_retirement > current);
        assert!(table[2].total_at_retirement > current);
        assert!(table[3].total_at_retirement < current);
        assert!(table[4].total_at_retirement > current);
    }

    #[test]
    fn what_if_savings_difference_is_growth_of_extra_deposits() {
        let profile = sample_profile();
        let result = what_if_savings(&profile, 200.0);
        let expected = monthly_savings_future_value(200.0, 0.07, 35.0);
        assert!((result.outcome.difference - expected).abs() < 1e-4);
        assert_approx(result.extra_monthly_income, result.outcome.difference / 300.0);
        assert_approx(result.new_monthly_savings, 1_000.0);
    }

    #[test]
    fn what_if_retirement_age_later_grows_total() {
        let result = what_if_retirement_age(&sample_profile(), 2).expect("valid delta");
        assert_eq!(result.new_retirement_age, 67);
        assert!(result.outcome.difference > 0.0);
    }

    #[test]
    fn what_if_retirement_age_earlier_shrinks_total() {
        let result = what_if_retirement_age(&sample_profile(), -5).expect("valid delta");
        assert_eq!(result.new_retirement_age, 60);
        assert!(result.outcome.difference < 0.0);
    }

    #[test]
    fn what_if_retirement_age_rejects_age_at_or_below_current() {
        let err = what_if_retirement_age(&sample_profile(), -35).expect_err("65 - 35 == 30");
        assert_eq!(
            err,
            PlannerError::InvalidRetirementAge {
                current_age: 30,
                retirement_age: 30,
            }
        );
        assert!(what_if_retirement_age(&sample_profile(), -60).is_err());
    }

    #[test]
    fn what_if_return_rate_reports_per_point_sensitivity() {
        let result = what_if_return_rate(&sample_profile(), 0.08).expect("valid rate");
        assert!(result.outcome.difference > 0.0);
        let per_point = result.difference_per_point.expect("rates differ");
        assert!((per_point - result.outcome.difference).abs() < 1e-3);
    }

    #[test]
    fn what_if_return_rate_with_same_rate_has_no_sensitivity() {
        let result = what_if_return_rate(&sample_profile(), 0.07).expect("valid rate");
        assert_approx(result.outcome.difference, 0.0);
        assert_eq!(result.difference_per_point, None);
    }

    #[test]
    fn what_if_return_rate_rejects_total_loss_rate() {
        for new_rate in [-1.0, -1.5, f64::NAN] {
            let err = what_if_return_rate(&sample_profile(), new_rate)
                .expect_err("rate at or below -100% has no defined growth");
            assert!(matches!(err, PlannerError::RateAtOrBelowTotalLoss { .. }));
        }
    }

    #[test]
    fn retirement_analysis_flags_shortfall_and_closes_gap() {
        let analysis = retirement_analysis(&sample_profile()).expect("valid profile");
        assert_eq!(analysis.years_to_retirement, 35);
        assert_approx(analysis.retirement_needs, 1_200_000.0);
        assert_approx(
            analysis.total_retirement_fund,
            analysis.current_savings_future + analysis.monthly_savings_future,
        );

        if analysis.on_track {
            assert_approx(analysis.additional_monthly_needed, 0.0);
        } else {
            assert!(analysis.monthly_shortfall > 0.0);
            let closed =
                monthly_savings_future_value(analysis.additional_monthly_needed, 0.07, 35.0);
            assert!((closed - analysis.monthly_shortfall * 300.0).abs() < 1e-3);
        }
        let doubling = analysis.doubling_years.expect("non-zero return");
        assert!((doubling - 72.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn retirement_analysis_on_track_when_income_covers_expenses() {
        let mut profile = sample_profile();
        profile.monthly_expenses = 1_000.0;
        let analysis = retirement_analysis(&profile).expect("valid profile");
        assert!(analysis.on_track);
        assert_approx(analysis.monthly_shortfall, 0.0);
        assert!(analysis.surplus_deficit > 0.0);
    }

    #[test]
    fn withdrawal_analysis_reports_depletion_age() {
        let mut profile = sample_profile();
        profile.expected_return = 0.05;
        let analysis = withdrawal_analysis(&profile, 500_000.0, 4_000.0).expect("valid inputs");
        let years = analysis.duration_years.finite().expect("finite");
        assert_approx(analysis.depleted_at_age.expect("finite"), 65.0 + years);
    }

    #[test]
    fn withdrawal_analysis_forever_has_no_depletion_age() {
        let analysis =
            withdrawal_analysis(&sample_profile(), 500_000.0, 1_000.0).expect("valid inputs");
        assert_eq!(analysis.duration_years, Horizon::Unbounded);
        assert_eq!(analysis.depleted_at_age, None);
        assert!(analysis.monthly_interest_income > 1_000.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_growth_series_is_one_point_per_year_and_non_decreasing(
            age in 18u32..70,
            span in 1u32..30,
            savings in 0u32..1_000_000,
            monthly in 0u32..10_000,
            rate_bp in 0u32..1_500
        ) {
            let mut profile = sample_profile();
            profile.age = age;
            profile.retirement_age = age + span;
            profile.current_savings = savings as f64;
            profile.monthly_savings = monthly as f64;
            profile.expected_return = rate_bp as f64 / 10_000.0;

            let series = growth_series(&profile);
            prop_assert_eq!(series.len() as u32, span + 1);
            prop_assert_eq!(series[0].age, age);
            prop_assert_eq!(series[series.len() - 1].age, age + span);
            for pair in series.windows(2) {
                prop_assert_eq!(pair[1].age, pair[0].age + 1);
                prop_assert!(pair[1].total + 1e-9 >= pair[0].total);
            }
        }
    }
}
