use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlannerError {
    #[error("retirement age {retirement_age} must be greater than current age {current_age}")]
    InvalidRetirementAge { current_age: u32, retirement_age: i64 },

    #[error("rate {rate} is at or below -100%")]
    RateAtOrBelowTotalLoss { rate: f64 },

    #[error("accumulation period must be longer than zero months")]
    EmptyHorizon,

    #[error("invalid {field}: {message}")]
    InvalidProfile { field: &'static str, message: String },
}

impl PlannerError {
    pub fn invalid_profile(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidProfile {
            field,
            message: message.into(),
        }
    }
}
