use serde::Serialize;

use super::error::PlannerError;

pub const RETIREMENT_YEARS: u32 = 25;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub age: u32,
    pub annual_income: f64,
    pub current_savings: f64,
    pub monthly_savings: f64,
    pub retirement_age: u32,
    // 0.07 = 7%
    pub expected_return: f64,
    pub monthly_expenses: f64,
}

impl UserProfile {
    pub fn years_to_retirement(&self) -> u32 {
        self.retirement_age.saturating_sub(self.age)
    }

    pub fn validate(&self) -> Result<(), PlannerError> {
        if !(18..=100).contains(&self.age) {
            return Err(PlannerError::invalid_profile(
                "age",
                "must be between 18 and 100",
            ));
        }
        if self.retirement_age <= self.age {
            return Err(PlannerError::InvalidRetirementAge {
                current_age: self.age,
                retirement_age: i64::from(self.retirement_age),
            });
        }
        if self.retirement_age > 100 {
            return Err(PlannerError::invalid_profile(
                "retirementAge",
                "must be <= 100",
            ));
        }
        for (field, value) in [
            ("annualIncome", self.annual_income),
            ("currentSavings", self.current_savings),
            ("monthlySavings", self.monthly_savings),
            ("monthlyExpenses", self.monthly_expenses),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PlannerError::invalid_profile(field, "must be >= 0"));
            }
        }
        if !self.expected_return.is_finite() || self.expected_return <= -1.0 {
            return Err(PlannerError::RateAtOrBelowTotalLoss {
                rate: self.expected_return,
            });
        }
        if self.expected_return > 1.0 {
            return Err(PlannerError::invalid_profile(
                "expectedReturn",
                "must be <= 100%",
            ));
        }
        Ok(())
    }
}

/// Outcome of a duration or period-count solve. `Unbounded` means the target
/// is never reached (or the fund is never exhausted) and carries no number so
/// it cannot leak into later arithmetic.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Horizon {
    Finite(f64),
    Unbounded,
}

impl Horizon {
    pub fn finite(self) -> Option<f64> {
        match self {
            Horizon::Finite(value) => Some(value),
            Horizon::Unbounded => None,
        }
    }

    pub fn is_unbounded(self) -> bool {
        matches!(self, Horizon::Unbounded)
    }

    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Horizon {
        match self {
            Horizon::Finite(value) => Horizon::Finite(f(value)),
            Horizon::Unbounded => Horizon::Unbounded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub label: String,
    pub monthly_savings: f64,
    pub years: u32,
    pub return_rate: f64,
    pub total_at_retirement: f64,
    pub monthly_income_estimate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthPoint {
    pub age: u32,
    pub from_existing_savings: f64,
    pub from_monthly_savings: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatIfResult {
    pub original_total: f64,
    pub new_total: f64,
    pub difference: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsWhatIf {
    pub extra_monthly: f64,
    pub new_monthly_savings: f64,
    #[serde(flatten)]
    pub outcome: WhatIfResult,
    pub extra_monthly_income: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementAgeWhatIf {
    pub years_delta: i32,
    pub original_retirement_age: u32,
    pub new_retirement_age: u32,
    #[serde(flatten)]
    pub outcome: WhatIfResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRateWhatIf {
    pub original_rate: f64,
    pub new_rate: f64,
    #[serde(flatten)]
    pub outcome: WhatIfResult,
    // None when both rates are equal.
    pub difference_per_point: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementAnalysis {
    pub years_to_retirement: u32,
    pub current_savings_future: f64,
    pub monthly_savings_future: f64,
    pub total_retirement_fund: f64,
    pub retirement_needs: f64,
    pub retirement_needs_present_value: f64,
    pub surplus_deficit: f64,
    pub monthly_income_from_savings: f64,
    pub on_track: bool,
    pub monthly_shortfall: f64,
    pub additional_monthly_needed: f64,
    pub doubling_years: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalAnalysis {
    pub starting_amount: f64,
    pub monthly_withdrawal: f64,
    pub annual_rate: f64,
    pub duration_years: Horizon,
    pub monthly_interest_income: f64,
    pub depleted_at_age: Option<f64>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Intent {
    RetirementAge,
    MoneyDuration,
    SavingsTarget,
    WhatIf,
    MortgageVsInvest,
    General,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub intent: Intent,
    pub summary: String,
    pub formula: Option<String>,
    pub work_steps: Option<Vec<String>>,
}

impl AnswerResult {
    pub fn headline(intent: Intent, summary: impl Into<String>) -> Self {
        Self {
            intent,
            summary: summary.into(),
            formula: None,
            work_steps: None,
        }
    }

    pub fn with_work(
        intent: Intent,
        summary: impl Into<String>,
        formula: &str,
        steps: Vec<String>,
    ) -> Self {
        Self {
            intent,
            summary: summary.into(),
            formula: Some(formula.to_string()),
            work_steps: Some(steps),
        }
    }

    pub fn render_markdown(&self) -> String {
        let Some(steps) = &self.work_steps else {
            return self.summary.clone();
        };
        let mut out = format!("**{}**\n", self.summary);
        if let Some(formula) = &self.formula {
            out.push_str(&format!("\n**Formula Used:** {formula}\n"));
        }
        out.push_str("\n**Step-by-step calculation:**\n");
        for step in steps {
            out.push_str(&format!("• {step}\n"));
        }
        out
    }
}
