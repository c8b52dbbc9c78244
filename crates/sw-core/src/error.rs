use thiserror::Error;

pub type SwResult<T> = Result<T, SwError>;

#[derive(Error, Debug)]
pub enum SwError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },
}
