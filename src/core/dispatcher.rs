//! Keyword dispatcher for free-text financial questions.
//!
//! Rules are checked in a fixed order and the first match wins; anything
//! unmatched falls through to a profile summary. Numbers are pulled out of the
//! question with regexes and override per-rule defaults when present.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use super::formulas::{
    future_value, monthly_payment_needed, monthly_rate, periods_needed, withdrawal_duration,
};
use super::types::{AnswerResult, Horizon, Intent, RETIREMENT_YEARS, UserProfile};

const DEFAULT_STARTING_AMOUNT: f64 = 400_000.0;
const DEFAULT_MONTHLY_WITHDRAWAL: f64 = 3_000.0;
const DEFAULT_WITHDRAWAL_RATE: f64 = 0.05;
const DEFAULT_SAVINGS_TARGET: f64 = 1_000_000.0;
const DEFAULT_SAVINGS_YEARS: u32 = 25;
const DEFAULT_INFLATION: f64 = 0.03;
const DEFAULT_MORTGAGE_RATE: f64 = 0.03;
const DEFAULT_INVEST_RATE: f64 = 0.07;

static DOLLAR_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\s*(\d+(?:,\d{3})*)").expect("Invalid regex pattern"));

static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").expect("Invalid regex pattern"));

static TARGET_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\$\s*(\d+(?:,\d{3})*(?:\.\d+)?)(?:\s*(million|k)\b)?|(\d+(?:,\d{3})*(?:\.\d+)?)\s*(million|k)\b",
    )
    .expect("Invalid regex pattern")
});

static YEARS_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*years?\b").expect("Invalid regex pattern"));

static STATED_AGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bI(?:'|’)?m\s+(\d{1,3})\b|\bI am\s+(\d{1,3})\b")
        .expect("Invalid regex pattern")
});

struct Rule {
    intent: Intent,
    matches: fn(&str) -> bool,
}

/// Priority order matters: "what age can I retire if I save monthly" is a
/// retirement-age question even though it also mentions saving.
const RULES: [Rule; 5] = [
    Rule {
        intent: Intent::RetirementAge,
        matches: |q| q.contains("retire") && q.contains("age"),
    },
    Rule {
        intent: Intent::MoneyDuration,
        matches: |q| q.contains("how long") && q.contains("last"),
    },
    Rule {
        intent: Intent::SavingsTarget,
        matches: |q| q.contains("save") && (q.contains("month") || q.contains("target")),
    },
    Rule {
        intent: Intent::WhatIf,
        matches: |q| q.contains("what if"),
    },
    Rule {
        intent: Intent::MortgageVsInvest,
        matches: |q| q.contains("mortgage") && q.contains("invest"),
    },
];

pub fn classify(question: &str) -> Intent {
    let lowered = question.to_lowercase();
    RULES
        .iter()
        .find(|rule| (rule.matches)(&lowered))
        .map(|rule| rule.intent)
        .unwrap_or(Intent::General)
}

pub fn answer_question(question: &str, profile: &UserProfile, show_work: bool) -> AnswerResult {
    let intent = classify(question);
    debug!("question classified as {intent:?}");
    match intent {
        Intent::RetirementAge => retirement_age(question, profile, show_work),
        Intent::MoneyDuration => money_duration(question, show_work),
        Intent::SavingsTarget => savings_target(question, profile, show_work),
        Intent::WhatIf => what_if(question, profile, show_work),
        Intent::MortgageVsInvest => mortgage_vs_invest(question, show_work),
        Intent::General => general(profile),
    }
}

fn respond(
    intent: Intent,
    summary: String,
    show_work: bool,
    formula: &str,
    steps: impl FnOnce() -> Vec<String>,
) -> AnswerResult {
    if show_work {
        AnswerResult::with_work(intent, summary, formula, steps())
    } else {
        AnswerResult::headline(intent, summary)
    }
}

fn retirement_age(question: &str, profile: &UserProfile, show_work: bool) -> AnswerResult {
    let monthly_savings = dollar_amounts(question)
        .first()
        .copied()
        .unwrap_or(profile.monthly_savings);
    let expected_return = percentages(question)
        .first()
        .copied()
        .unwrap_or(profile.expected_return);
    let current_age = stated_age(question).unwrap_or(profile.age);
    let target = profile.monthly_expenses * 12.0 * f64::from(RETIREMENT_YEARS);
    debug!(
        "retirement age inputs: savings={monthly_savings} return={expected_return} age={current_age} target={target}"
    );

    // Nominal monthly rate; deposits and the opening balance are paid in.
    let months = periods_needed(
        expected_return / 12.0,
        -monthly_savings,
        -profile.current_savings,
        target,
    );
    let Horizon::Finite(months) = months else {
        return AnswerResult::headline(
            Intent::RetirementAge,
            "Unable to calculate retirement age with current parameters. \
             You may need to save more or adjust expectations.",
        );
    };

    let years_needed = (months / 12.0).max(0.0);
    let retirement_age = f64::from(current_age) + years_needed;
    let summary = format!(
        "Based on saving {}/month at {} return, you can retire at age {retirement_age:.0}.",
        format_money(monthly_savings),
        format_percent(expected_return),
    );

    respond(Intent::RetirementAge, summary, show_work, "NPER Formula", || {
        vec![
            format!("Monthly savings: {}", format_money(monthly_savings)),
            format!("Expected return: {}", format_percent(expected_return)),
            format!("Current savings: {}", format_money(profile.current_savings)),
            format!("Target amount: {}", format_money(target)),
            format!("Years needed: {years_needed:.1}"),
            format!("Retirement age: {current_age} + {years_needed:.1} = {retirement_age:.0}"),
        ]
    })
}

fn money_duration(question: &str, show_work: bool) -> AnswerResult {
    let amounts = dollar_amounts(question);
    let (starting_amount, monthly_withdrawal) = match amounts.as_slice() {
        [amount, withdrawal, ..] => (*amount, *withdrawal),
        _ => (DEFAULT_STARTING_AMOUNT, DEFAULT_MONTHLY_WITHDRAWAL),
    };
    let annual_rate = percentages(question)
        .first()
        .copied()
        .unwrap_or(DEFAULT_WITHDRAWAL_RATE);

    let duration = match withdrawal_duration(starting_amount, monthly_withdrawal, annual_rate) {
        Ok(duration) => duration,
        Err(e) => return AnswerResult::headline(Intent::MoneyDuration, e.to_string()),
    };

    let summary = match duration {
        Horizon::Unbounded => format!(
            "Great news! {} will last forever with {}/month withdrawals at {} return.",
            format_money(starting_amount),
            format_money(monthly_withdrawal),
            format_percent(annual_rate),
        ),
        Horizon::Finite(years) => format!(
            "{} will last {years:.1} years with {}/month withdrawals at {} return.",
            format_money(starting_amount),
            format_money(monthly_withdrawal),
            format_percent(annual_rate),
        ),
    };

    respond(
        Intent::MoneyDuration,
        summary,
        show_work,
        "Withdrawal Duration Formula",
        || {
            vec![
                format!("Starting amount: {}", format_money(starting_amount)),
                format!("Monthly withdrawal: {}", format_money(monthly_withdrawal)),
                format!("Annual return: {}", format_percent(annual_rate)),
                format!("Monthly return: {:.3}%", monthly_rate(annual_rate) * 100.0),
                match duration {
                    Horizon::Finite(years) => format!("Duration: {years:.1} years"),
                    Horizon::Unbounded => "Duration: never runs out".to_string(),
                },
            ]
        },
    )
}

fn savings_target(question: &str, profile: &UserProfile, show_work: bool) -> AnswerResult {
    let target = target_amount(question).unwrap_or(DEFAULT_SAVINGS_TARGET);
    let years = years_clause(question).unwrap_or(DEFAULT_SAVINGS_YEARS);
    let annual_rate = profile.expected_return;

    let payment = match monthly_payment_needed(target, annual_rate, f64::from(years)) {
        Ok(payment) => payment,
        Err(e) => return AnswerResult::headline(Intent::SavingsTarget, e.to_string()),
    };

    let summary = format!(
        "To reach {} in {years} years at {} return, save {} per month.",
        format_money(target),
        format_percent(annual_rate),
        format_money(payment),
    );

    respond(
        Intent::SavingsTarget,
        summary,
        show_work,
        "Payment (PMT) Formula",
        || {
            vec![
                format!("Target amount: {}", format_money(target)),
                format!("Time period: {years} years"),
                format!("Expected return: {}", format_percent(annual_rate)),
                format!("Required monthly payment: {}", format_money(payment)),
            ]
        },
    )
}

fn what_if(question: &str, profile: &UserProfile, show_work: bool) -> AnswerResult {
    if !question.to_lowercase().contains("inflation") {
        return AnswerResult::headline(
            Intent::WhatIf,
            "Please specify what scenario you'd like to analyze.",
        );
    }

    let inflation = percentages(question)
        .first()
        .copied()
        .unwrap_or(DEFAULT_INFLATION);
    let years_to_retirement = profile.years_to_retirement();
    let current_expenses = profile.monthly_expenses * 12.0;
    let future_expenses = future_value(current_expenses, inflation, f64::from(years_to_retirement));

    let summary = format!(
        "With {} inflation, your current {}/year expenses will become {}/year by retirement.",
        format_percent(inflation),
        format_money(current_expenses),
        format_money(future_expenses),
    );

    respond(
        Intent::WhatIf,
        summary,
        show_work,
        "Future Value with Inflation",
        || {
            vec![
                format!("Current annual expenses: {}", format_money(current_expenses)),
                format!("Inflation rate: {}", format_percent(inflation)),
                format!("Years to retirement: {years_to_retirement}"),
                "Formula: FV = PV × (1 + inflation)^years".to_string(),
                format!(
                    "Future expenses: {} × ({:.3})^{years_to_retirement} = {}",
                    format_money(current_expenses),
                    1.0 + inflation,
                    format_money(future_expenses),
                ),
            ]
        },
    )
}

fn mortgage_vs_invest(question: &str, show_work: bool) -> AnswerResult {
    let rates = percentages(question);
    let mortgage_rate = rates.first().copied().unwrap_or(DEFAULT_MORTGAGE_RATE);
    let invest_rate = rates.get(1).copied().unwrap_or(DEFAULT_INVEST_RATE);
    let difference = invest_rate - mortgage_rate;
    let invest = difference > 0.0;

    let summary = if invest {
        format!(
            "Invest! At {} return vs {} mortgage, you'll earn {} more by investing.",
            format_percent(invest_rate),
            format_percent(mortgage_rate),
            format_percent(difference),
        )
    } else {
        format!(
            "Pay down mortgage! At {} mortgage vs {} return, you'll save {} by paying down debt.",
            format_percent(mortgage_rate),
            format_percent(invest_rate),
            format_percent(difference.abs()),
        )
    };

    respond(
        Intent::MortgageVsInvest,
        summary,
        show_work,
        "Opportunity Cost Analysis",
        || {
            vec![
                format!("Mortgage rate: {}", format_percent(mortgage_rate)),
                format!("Investment return: {}", format_percent(invest_rate)),
                format!(
                    "Net benefit of investing: {} - {} = {:.1}%",
                    format_percent(invest_rate),
                    format_percent(mortgage_rate),
                    difference * 100.0,
                ),
                if invest {
                    "Recommendation: Invest (before tax considerations)".to_string()
                } else {
                    "Recommendation: Pay down the mortgage".to_string()
                },
            ]
        },
    )
}

fn general(profile: &UserProfile) -> AnswerResult {
    AnswerResult::headline(
        Intent::General,
        format!(
            "I can help with specific financial calculations. Try asking about retirement age, \
             savings targets, or withdrawal strategies. Your profile: Age: {}, Income: {}, \
             Savings: {}/month",
            profile.age,
            format_money(profile.annual_income),
            format_money(profile.monthly_savings),
        ),
    )
}

fn parse_grouped(digits: &str) -> Option<f64> {
    digits.replace(',', "").parse::<f64>().ok()
}

/// `$`-prefixed, comma-grouped amounts in order of appearance.
pub fn dollar_amounts(text: &str) -> Vec<f64> {
    DOLLAR_AMOUNT
        .captures_iter(text)
        .filter_map(|caps| parse_grouped(&caps[1]))
        .collect()
}

/// `N%` figures in order of appearance, as fractions.
pub fn percentages(text: &str) -> Vec<f64> {
    PERCENT
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse::<f64>().ok())
        .map(|percent| percent / 100.0)
        .collect()
}

/// First target amount, honouring "million" and "k" suffixes. A bare number
/// only counts when it carries a suffix, so "in 25 years" is never a target.
pub fn target_amount(text: &str) -> Option<f64> {
    let caps = TARGET_AMOUNT.captures(text)?;
    let (digits, suffix) = match caps.get(1) {
        Some(digits) => (digits, caps.get(2)),
        None => (caps.get(3)?, caps.get(4)),
    };
    let base = parse_grouped(digits.as_str())?;
    let multiplier = match suffix.map(|s| s.as_str().to_lowercase()).as_deref() {
        Some("million") => 1_000_000.0,
        Some("k") => 1_000.0,
        _ => 1.0,
    };
    Some(base * multiplier)
}

pub fn years_clause(text: &str) -> Option<u32> {
    YEARS_CLAUSE
        .captures(text)
        .and_then(|caps| caps[1].parse::<u32>().ok())
}

pub fn stated_age(text: &str) -> Option<u32> {
    let caps = STATED_AGE.captures(text)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

/// Whole dollars with thousands separators: `$1,234,567`, `-$500`.
pub fn format_money(amount: f64) -> String {
    if !amount.is_finite() {
        return "n/a".to_string();
    }
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

/// A fraction as a one-decimal percentage: 0.065 -> `6.5%`.
pub fn format_percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}
