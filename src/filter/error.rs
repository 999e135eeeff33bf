use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid operator data: {0}")]
    InvalidOperatorData(String),
}
