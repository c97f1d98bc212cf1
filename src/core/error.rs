use thiserror::Error;

pub const MAX_AGE: u32 = 150;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },

    #[error("{field} must be >= 0")]
    Negative { field: &'static str },

    #[error("{field} must be between 0 and {MAX_AGE}")]
    AgeOutOfRange { field: &'static str },

    #[error("salary_growth must be > -100")]
    SalaryGrowthOutOfRange,

    #[error("invalid market assumptions: {0}")]
    InvalidAssumptions(String),

    #[error("{0}")]
    InvalidOption(String),
}

pub type ProjectionResult<T> = Result<T, ProjectionError>;
