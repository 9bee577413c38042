use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    AnswerResult, GrowthPoint, PlannerError, RetirementAgeWhatIf, RetirementAnalysis,
    ReturnRateWhatIf, SavingsWhatIf, ScenarioResult, UserProfile, WithdrawalAnalysis,
    answer_question, future_value, growth_series, retirement_analysis, rule_of_72,
    scenario_table, what_if_retirement_age, what_if_return_rate, what_if_savings,
    withdrawal_analysis,
};

const DEFAULT_WITHDRAWAL_AMOUNT: f64 = 500_000.0;
const DEFAULT_MONTHLY_WITHDRAWAL: f64 = 4_000.0;

#[derive(Debug, Parser)]
#[command(
    name = "finplan",
    about = "Retirement projections and financial Q&A from closed-form time-value-of-money formulas"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP JSON API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Print the retirement analysis, growth series and scenario table as JSON
    Analyze {
        #[command(flatten)]
        profile: ProfileArgs,
    },
    /// Answer a free-text financial question
    Ask {
        question: String,
        #[arg(long, help = "Include the formula and step-by-step calculation")]
        show_work: bool,
        #[command(flatten)]
        profile: ProfileArgs,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ProfileArgs {
    #[arg(long, default_value = "John")]
    name: String,
    #[arg(long, default_value_t = 30, help = "Current age")]
    age: u32,
    #[arg(long, default_value_t = 60_000.0)]
    annual_income: f64,
    #[arg(long, default_value_t = 15_000.0)]
    current_savings: f64,
    #[arg(long, default_value_t = 800.0)]
    monthly_savings: f64,
    #[arg(long, default_value_t = 65, help = "Target retirement age")]
    retirement_age: u32,
    #[arg(
        long,
        default_value_t = 7.0,
        help = "Expected annual return in percent, e.g. 7"
    )]
    expected_return: f64,
    #[arg(
        long,
        default_value_t = 4_000.0,
        help = "Expected monthly expenses in retirement"
    )]
    monthly_expenses: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProfilePayload {
    name: Option<String>,
    age: Option<u32>,
    annual_income: Option<f64>,
    current_savings: Option<f64>,
    monthly_savings: Option<f64>,
    retirement_age: Option<u32>,
    expected_return: Option<f64>,
    monthly_expenses: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AskPayload {
    question: String,
    show_work: bool,
    #[serde(flatten)]
    profile: ProfilePayload,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiWhatIfKind {
    #[serde(alias = "extraSavings", alias = "extra-savings")]
    Savings,
    #[serde(alias = "retirementAge", alias = "retirement_age")]
    RetirementAge,
    #[serde(alias = "returnRate", alias = "return_rate")]
    ReturnRate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WhatIfPayload {
    kind: ApiWhatIfKind,
    value: f64,
    #[serde(flatten)]
    profile: ProfilePayload,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WithdrawalPayload {
    amount: Option<f64>,
    monthly_withdrawal: Option<f64>,
    #[serde(flatten)]
    profile: ProfilePayload,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CalculatorQuery {
    rate: Option<f64>,
    present_value: Option<f64>,
    years: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    profile: UserProfile,
    analysis: RetirementAnalysis,
    growth_series: Vec<GrowthPoint>,
    scenarios: Vec<ScenarioResult>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AskResponse {
    #[serde(flatten)]
    answer: AnswerResult,
    rendered: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum WhatIfResponse {
    Savings(SavingsWhatIf),
    RetirementAge(RetirementAgeWhatIf),
    ReturnRate(ReturnRateWhatIf),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CalculatorResponse {
    rate_percent: f64,
    doubling_years: Option<f64>,
    present_value: f64,
    years: f64,
    future_value: f64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn build_profile(args: ProfileArgs) -> Result<UserProfile, PlannerError> {
    let name = args.name.trim().to_string();
    if name.is_empty() {
        return Err(PlannerError::invalid_profile("name", "must not be empty"));
    }

    let profile = UserProfile {
        name,
        age: args.age,
        annual_income: args.annual_income,
        current_savings: args.current_savings,
        monthly_savings: args.monthly_savings,
        retirement_age: args.retirement_age,
        expected_return: args.expected_return / 100.0,
        monthly_expenses: args.monthly_expenses,
    };
    profile.validate()?;
    Ok(profile)
}

pub fn analyze(profile: &UserProfile) -> Result<AnalyzeResponse, PlannerError> {
    Ok(AnalyzeResponse {
        profile: profile.clone(),
        analysis: retirement_analysis(profile)?,
        growth_series: growth_series(profile),
        scenarios: scenario_table(profile),
    })
}

pub fn analyze_json(args: ProfileArgs) -> Result<String, String> {
    let profile = build_profile(args).map_err(|e| e.to_string())?;
    let response = analyze(&profile).map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&response).map_err(|e| format!("Failed to encode analysis: {e}"))
}

pub fn ask_text(question: &str, show_work: bool, args: ProfileArgs) -> Result<String, String> {
    let profile = build_profile(args).map_err(|e| e.to_string())?;
    Ok(answer_question(question, &profile, show_work).render_markdown())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/analyze",
            get(analyze_get_handler).post(analyze_post_handler),
        )
        .route("/api/ask", post(ask_handler))
        .route("/api/what-if", post(what_if_handler))
        .route("/api/withdrawal", post(withdrawal_handler))
        .route("/api/calculators", get(calculators_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!("finplan HTTP API listening on http://{addr}");
    info!("Local access: http://127.0.0.1:{port}/api/analyze");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn analyze_get_handler(Query(payload): Query<ProfilePayload>) -> Response {
    analyze_handler_impl(payload)
}

async fn analyze_post_handler(Json(payload): Json<ProfilePayload>) -> Response {
    analyze_handler_impl(payload)
}

fn analyze_handler_impl(payload: ProfilePayload) -> Response {
    match profile_from_payload(payload).and_then(|profile| analyze(&profile)) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(e) => bad_request(e),
    }
}

async fn ask_handler(Json(payload): Json<AskPayload>) -> Response {
    match ask_from_payload(payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(e) => bad_request(e),
    }
}

async fn what_if_handler(Json(payload): Json<WhatIfPayload>) -> Response {
    match what_if_from_payload(payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(e) => bad_request(e),
    }
}

async fn withdrawal_handler(Json(payload): Json<WithdrawalPayload>) -> Response {
    match withdrawal_from_payload(payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(e) => bad_request(e),
    }
}

async fn calculators_handler(Query(query): Query<CalculatorQuery>) -> Response {
    match calculators(query) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(e) => bad_request(e),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn bad_request(err: PlannerError) -> Response {
    warn!("rejected request: {err}");
    error_response(StatusCode::BAD_REQUEST, &err.to_string())
}

fn default_profile_args_for_api() -> ProfileArgs {
    ProfileArgs {
        name: "John".to_string(),
        age: 30,
        annual_income: 60_000.0,
        current_savings: 15_000.0,
        monthly_savings: 800.0,
        retirement_age: 65,
        expected_return: 7.0,
        monthly_expenses: 4_000.0,
    }
}

fn profile_from_payload(payload: ProfilePayload) -> Result<UserProfile, PlannerError> {
    let mut args = default_profile_args_for_api();

    if let Some(v) = payload.name {
        args.name = v;
    }
    if let Some(v) = payload.age {
        args.age = v;
    }
    if let Some(v) = payload.annual_income {
        args.annual_income = v;
    }
    if let Some(v) = payload.current_savings {
        args.current_savings = v;
    }
    if let Some(v) = payload.monthly_savings {
        args.monthly_savings = v;
    }
    if let Some(v) = payload.retirement_age {
        args.retirement_age = v;
    }
    if let Some(v) = payload.expected_return {
        args.expected_return = v;
    }
    if let Some(v) = payload.monthly_expenses {
        args.monthly_expenses = v;
    }

    build_profile(args)
}

fn ask_from_payload(payload: AskPayload) -> Result<AskResponse, PlannerError> {
    let question = payload.question.trim();
    if question.is_empty() {
        return Err(PlannerError::invalid_profile("question", "must not be empty"));
    }
    let profile = profile_from_payload(payload.profile)?;
    let answer = answer_question(question, &profile, payload.show_work);
    let rendered = answer.render_markdown();
    Ok(AskResponse { answer, rendered })
}

fn what_if_from_payload(payload: WhatIfPayload) -> Result<WhatIfResponse, PlannerError> {
    let profile = profile_from_payload(payload.profile)?;
    if !payload.value.is_finite() {
        return Err(PlannerError::invalid_profile("value", "must be a finite number"));
    }

    match payload.kind {
        ApiWhatIfKind::Savings => Ok(WhatIfResponse::Savings(what_if_savings(
            &profile,
            payload.value,
        ))),
        ApiWhatIfKind::RetirementAge => {
            if payload.value.fract() != 0.0 || payload.value.abs() > f64::from(i16::MAX) {
                return Err(PlannerError::invalid_profile(
                    "value",
                    "retirement age change must be a whole number of years",
                ));
            }
            let delta = payload.value as i32;
            what_if_retirement_age(&profile, delta).map(WhatIfResponse::RetirementAge)
        }
        ApiWhatIfKind::ReturnRate => {
            what_if_return_rate(&profile, payload.value / 100.0).map(WhatIfResponse::ReturnRate)
        }
    }
}

fn withdrawal_from_payload(payload: WithdrawalPayload) -> Result<WithdrawalAnalysis, PlannerError> {
    let profile = profile_from_payload(payload.profile)?;
    let amount = payload.amount.unwrap_or(DEFAULT_WITHDRAWAL_AMOUNT);
    let monthly_withdrawal = payload
        .monthly_withdrawal
        .unwrap_or(DEFAULT_MONTHLY_WITHDRAWAL);
    if amount < 0.0 || monthly_withdrawal < 0.0 {
        return Err(PlannerError::invalid_profile(
            "amount",
            "amounts must be >= 0",
        ));
    }
    withdrawal_analysis(&profile, amount, monthly_withdrawal)
}

fn calculators(query: CalculatorQuery) -> Result<CalculatorResponse, PlannerError> {
    let rate_percent = query.rate.unwrap_or(7.0);
    let present_value = query.present_value.unwrap_or(1_000.0);
    let years = query.years.unwrap_or(10.0);
    let rate = rate_percent / 100.0;
    if !rate.is_finite() || rate <= -1.0 {
        return Err(PlannerError::RateAtOrBelowTotalLoss { rate });
    }
    Ok(CalculatorResponse {
        rate_percent,
        doubling_years: rule_of_72(rate_percent),
        present_value,
        years,
        future_value: future_value(present_value, rate, years),
    })
}
