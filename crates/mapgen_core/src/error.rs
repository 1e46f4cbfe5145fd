use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapgenError {
    #[error("invalid config for step `{step}`, field `{field}`: {message}")]
    Config {
        step: String,
        field: String,
        message: String,
    },
    #[error("unknown strategy `{strategy}` for step `{step}`")]
    UnknownStrategy { step: String, strategy: String },
    #[error("artifact `{artifact}` failed validation: {}", issues.join("; "))]
    Contract {
        artifact: &'static str,
        issues: Vec<String>,
    },
    #[error("artifact `{0}` was never declared")]
    Undeclared(&'static str),
    #[error("artifact `{0}` is already published")]
    AlreadyPublished(&'static str),
    #[error("artifact `{0}` has not been published")]
    Unpublished(&'static str),
    #[error("step `{step}` requires `{artifact}`, which no earlier step published")]
    MissingDependency {
        step: &'static str,
        artifact: &'static str,
    },
    #[error("stage buffer `{0}` is not initialized")]
    MissingBuffer(&'static str),
    #[error("host grid {width}x{height} is empty")]
    EmptyGrid { width: u32, height: u32 },
    #[error("host grid {found:?} does not match the generated grid {expected:?}")]
    HostGridMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },
}

impl MapgenError {
    pub fn config(step: &str, field: &str, message: impl Into<String>) -> Self {
        Self::Config {
            step: step.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MapgenError>;

/// Reject a config field unless `condition` holds.
pub fn check(condition: bool, step: &str, field: &str, message: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(MapgenError::config(step, field, message))
    }
}

/// Reject a config field outside the inclusive `[min, max]` range.
pub fn check_range(value: f64, min: f64, max: f64, step: &str, field: &str) -> Result<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(MapgenError::config(
            step,
            field,
            format!("{value} is outside [{min}, {max}]"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_names_step_and_field() {
        let err = check_range(1.5, 0.0, 1.0, "foundation/mesh", "continental_ratio").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("foundation/mesh"));
        assert!(message.contains("continental_ratio"));
    }

    #[test]
    fn contract_error_lists_every_issue() {
        let err = MapgenError::Contract {
            artifact: "hydrology.climate",
            issues: vec!["rainfall length 3".into(), "humidity length 2".into()],
        };
        let message = err.to_string();
        assert!(message.contains("rainfall length 3"));
        assert!(message.contains("humidity length 2"));
    }

    #[test]
    fn nan_is_out_of_range() {
        assert!(check_range(f64::NAN, 0.0, 1.0, "s", "f").is_err());
    }
}
