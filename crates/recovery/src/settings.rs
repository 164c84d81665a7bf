use common_utils::errors::ValidationError;
use keepsake_domain_models::recovery::RetrySchedule;
use serde::Deserialize;

/// Configuration of the retry scheduler.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecoverySettings {
    /// Backoff offsets in hours, applied from the first failure date.
    pub retry_schedule_hours: Vec<i64>,
    /// Maximum number of records one sweep invocation processes.
    pub max_batch_size: usize,
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            retry_schedule_hours: vec![24, 72, 168],
            max_batch_size: 100,
        }
    }
}

impl RecoverySettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.retry_schedule_hours.is_empty() {
            return Err(ValidationError::MissingRequiredField {
                field_name: "retry_schedule_hours".to_string(),
            });
        }
        if self.retry_schedule_hours.iter().any(|hours| *hours <= 0) {
            return Err(ValidationError::InvalidValue {
                message: "retry schedule offsets must be positive".to_string(),
            });
        }
        if self
            .retry_schedule_hours
            .windows(2)
            .any(|pair| pair[1] <= pair[0])
        {
            return Err(ValidationError::InvalidValue {
                message: "retry schedule offsets must be strictly increasing".to_string(),
            });
        }
        if self.max_batch_size == 0 {
            return Err(ValidationError::InvalidValue {
                message: "sweep batch size must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn retry_schedule(&self) -> RetrySchedule {
        RetrySchedule::from_hours(&self.retry_schedule_hours)
    }
}
