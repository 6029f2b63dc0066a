//! Structural project validation.
//!
//! Only shape problems are rejected here. Unparsable flows and values are
//! business-rule problems reported by the engine as warnings.

use crate::schema::{LATEST_VERSION, Project};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate name: {name} in {context}")]
    DuplicateName { name: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: String, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }
    if project.name.trim().is_empty() {
        return Err(invalid("name".into(), "", "project name is empty"));
    }
    if project.feed_streams.is_empty() {
        return Err(invalid("feed_streams".into(), "[]", "at least one feed stream is required"));
    }

    let mut feed_names = HashSet::new();
    for (i, feed) in project.feed_streams.iter().enumerate() {
        if let Some(name) = &feed.name {
            if !feed_names.insert(name.as_str()) {
                return Err(ValidationError::DuplicateName {
                    name: name.clone(),
                    context: "feed_streams".to_string(),
                });
            }
        }
        for key in feed.specs.keys() {
            if key.trim().is_empty() {
                return Err(invalid(format!("feed_streams[{i}].specs"), "", "empty analyte name"));
            }
        }
    }

    for (i, output) in project.outputs.iter().enumerate() {
        if output.name.trim().is_empty() {
            return Err(invalid(format!("outputs[{i}].name"), "", "empty target name"));
        }
    }

    for (path, value) in &project.overrides {
        if path.trim().is_empty() {
            return Err(invalid("overrides".into(), value, "empty field path"));
        }
        if !value.is_finite() {
            return Err(invalid(format!("overrides.{path}"), value, "must be finite"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FeedKind, FeedStreamDef, OutputTargetDef, RawValue};
    use std::collections::BTreeMap;

    fn feed(name: Option<&str>, flow: RawValue) -> FeedStreamDef {
        FeedStreamDef {
            name: name.map(str::to_string),
            kind: FeedKind::Liquid,
            flow,
            flow_unit: "m3/d".to_string(),
            specs: BTreeMap::new(),
        }
    }

    fn project() -> Project {
        let mut p = Project::new("Test WRRF");
        p.feed_streams.push(feed(Some("influent"), 4_000.0.into()));
        p
    }

    #[test]
    fn minimal_project_is_valid() {
        assert_eq!(validate_project(&project()), Ok(()));
    }

    #[test]
    fn garbage_flow_is_not_a_structural_error() {
        let mut p = project();
        p.feed_streams[0].flow = RawValue::from("lots of gas");
        assert_eq!(validate_project(&p), Ok(()));
    }

    #[test]
    fn empty_feed_list_is_rejected() {
        let mut p = project();
        p.feed_streams.clear();
        assert!(matches!(
            validate_project(&p),
            Err(ValidationError::InvalidValue { field, .. }) if field == "feed_streams"
        ));
    }

    #[test]
    fn duplicate_feed_names_are_rejected() {
        let mut p = project();
        p.feed_streams.push(feed(Some("influent"), 10.0.into()));
        assert!(matches!(
            validate_project(&p),
            Err(ValidationError::DuplicateName { .. })
        ));
    }

    #[test]
    fn non_finite_override_is_rejected() {
        let mut p = project();
        p.overrides.insert("solver.tolerance".into(), f64::INFINITY);
        assert!(validate_project(&p).is_err());
    }

    #[test]
    fn unnamed_target_is_rejected() {
        let mut p = project();
        p.outputs.push(OutputTargetDef {
            name: " ".into(),
            value: 10.0.into(),
            unit: "mg/L".into(),
            group: None,
        });
        assert!(validate_project(&p).is_err());
    }

    #[test]
    fn future_version_is_rejected() {
        let mut p = project();
        p.version = LATEST_VERSION + 1;
        assert_eq!(
            validate_project(&p),
            Err(ValidationError::UnsupportedVersion {
                version: LATEST_VERSION + 1
            })
        );
    }
}
