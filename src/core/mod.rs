mod dispatcher;
mod error;
mod formulas;
mod scenario;
mod types;

pub use dispatcher::{
    answer_question, classify, dollar_amounts, format_money, format_percent, percentages,
    stated_age, target_amount, years_clause,
};
pub use error::PlannerError;
pub use formulas::{
    annuity_future_value, future_value, monthly_payment_needed, monthly_rate,
    monthly_savings_future_value, periods_needed, present_value, rule_of_72, withdrawal_duration,
};
pub use scenario::{
    growth_series, monthly_income_estimate, retirement_analysis, scenario_table,
    what_if_retirement_age, what_if_return_rate, what_if_savings, withdrawal_analysis,
};
pub use types::{
    AnswerResult, GrowthPoint, Horizon, Intent, RETIREMENT_YEARS, RetirementAgeWhatIf,
    RetirementAnalysis, ReturnRateWhatIf, SavingsWhatIf, ScenarioResult, UserProfile,
    WhatIfResult, WithdrawalAnalysis,
};
