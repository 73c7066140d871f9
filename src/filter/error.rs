use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Malformed filter: {0}")]
    MalformedFilter(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid value for '{field}': {value}")]
    InvalidValue { field: String, value: String },

    #[error("Operator '{operator}' is not supported on field '{field}'")]
    UnsupportedOperator { field: String, operator: String },
}

impl FilterError {
    pub fn malformed(message: impl Into<String>) -> Self {
        FilterError::MalformedFilter(message.into())
    }

    pub fn invalid_value(field: impl Into<String>, value: impl Into<String>) -> Self {
        FilterError::InvalidValue { field: field.into(), value: value.into() }
    }
}
