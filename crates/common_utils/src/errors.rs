//! Errors and error specific types for universal use

use crate::types::MinorUnit;

/// Custom Result
/// A custom datatype that wraps the error variant <E> into a report, allowing
/// error_stack::Report<E> specific extendability
///
/// Effectively, equivalent to `Result<T, error_stack::Report<E>>`
pub type CustomResult<T, E> = error_stack::Result<T, E>;

/// Parsing errors.
#[derive(Debug, thiserror::Error)]
pub enum ParsingError {
    /// Failed to parse a stored JSON document into the given type.
    #[error("Failed to parse struct: {0}")]
    StructParseFailure(&'static str),
    /// Failed to serialize a value to the given format.
    #[error("Failed to serialize to {0} format")]
    EncodeError(&'static str),
}

/// Validation errors.
#[allow(missing_docs)] // Only to prevent warnings about struct fields not being documented
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The provided input is missing a required field.
    #[error("Missing required field: {field_name}")]
    MissingRequiredField { field_name: String },

    /// An incorrect value was provided for the field specified by `field_name`.
    #[error("Incorrect value provided for field: {field_name}")]
    IncorrectValueProvided { field_name: &'static str },

    /// An invalid input was provided.
    #[error("{message}")]
    InvalidValue { message: String },
}

/// Percentage calculation errors.
#[derive(Debug, thiserror::Error)]
pub enum PercentageError {
    /// The percentage value is outside the representable range.
    #[error("Percentage value must be between 0 and 100")]
    InvalidPercentageValue,

    /// The percentage could not be applied to the given amount.
    #[error("Unable to apply percentage of {percentage} on {amount}")]
    UnableToApplyPercentage {
        /// Percentage that was being applied.
        percentage: f32,
        /// Amount the percentage was applied on.
        amount: MinorUnit,
    },
}
