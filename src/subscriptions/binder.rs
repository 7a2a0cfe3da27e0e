//! Parameter binding and provider invocation.
//!
//! # Data Flow
//! ```text
//! InvocationDescriptor (path values) + QueryParameters (extra values)
//!     → merge (path values win on collision)
//!     → coerce each declared parameter in order
//!     → Provider::invoke(args)
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use uuid::Uuid;

use crate::subscriptions::context::RequestContext;
use crate::subscriptions::error::BindError;
use crate::subscriptions::matcher::InvocationDescriptor;
use crate::subscriptions::provider::{Argument, ParameterKind, ParameterSpec};
use crate::subscriptions::update::QueryParameters;

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Build the provider argument list for `descriptor`.
pub fn bind(
    descriptor: &InvocationDescriptor,
    query: &QueryParameters,
    context: &RequestContext,
) -> Result<Vec<Argument>, BindError> {
    let values = merge(descriptor.parameters(), query);

    descriptor
        .provider()
        .parameters()
        .iter()
        .map(|spec| bind_parameter(spec, &values, context))
        .collect()
}

/// Bind and call the descriptor's provider, returning its snapshot.
pub async fn invoke(
    descriptor: &InvocationDescriptor,
    query: &QueryParameters,
    context: &RequestContext,
) -> Result<Value, BindError> {
    let args = bind(descriptor, query, context)?;
    let provider = descriptor.provider();

    provider
        .invoke(args)
        .await
        .map_err(|source| BindError::ProviderInvocationFailed {
            provider: provider.name().to_string(),
            source,
        })
}

fn merge(path_values: &IndexMap<String, String>, query: &QueryParameters) -> IndexMap<String, String> {
    let mut values = path_values.clone();
    for (key, value) in query.iter() {
        values
            .entry(key.to_string())
            .or_insert_with(|| value.to_string());
    }
    values
}

fn bind_parameter(
    spec: &ParameterSpec,
    values: &IndexMap<String, String>,
    context: &RequestContext,
) -> Result<Argument, BindError> {
    if spec.kind == ParameterKind::Context {
        return Ok(Argument::Context(context.clone()));
    }

    match values.get(&spec.name) {
        Some(value) => coerce(spec.kind, value).map_err(|reason| BindError::InvalidParameterValue {
            name: spec.name.clone(),
            value: value.clone(),
            reason,
        }),
        None if spec.required => Err(BindError::MissingParameter {
            name: spec.name.clone(),
        }),
        None => Ok(Argument::Absent),
    }
}

/// Convert a string value to the declared parameter kind.
pub fn coerce(kind: ParameterKind, value: &str) -> Result<Argument, String> {
    match kind {
        ParameterKind::Guid => Uuid::parse_str(value)
            .map(Argument::Guid)
            .map_err(|_| "cannot be coerced to GUID".to_string()),
        ParameterKind::Integer => value
            .trim()
            .parse::<i64>()
            .map(Argument::Integer)
            .map_err(|_| "cannot be coerced to integer".to_string()),
        ParameterKind::Timestamp => parse_timestamp(value)
            .map(Argument::Timestamp)
            .ok_or_else(|| "cannot be coerced to timestamp".to_string()),
        ParameterKind::Text => Ok(Argument::Text(value.to_string())),
        ParameterKind::Context => Err("context parameters are not taken from the path".to_string()),
    }
}

/// Parse a timestamp, treating values without an offset as UTC.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriptions::error::ProviderError;
    use crate::subscriptions::provider::{FnProvider, Provider};
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::Arc;

    fn descriptor(specs: Vec<ParameterSpec>, values: &[(&str, &str)]) -> InvocationDescriptor {
        let provider: Arc<dyn Provider> = FnProvider::new("p", specs, |args| async move {
            Ok(json!(args.len()))
        })
        .shared();
        let parameters = values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        InvocationDescriptor::new(provider, parameters)
    }

    #[test]
    fn test_bind_in_declared_order() {
        let id = "d2cfbaf7-a83e-426d-825a-0e0994cbe076";
        let d = descriptor(
            vec![
                ParameterSpec::required("count", ParameterKind::Integer),
                ParameterSpec::context(),
                ParameterSpec::required("employerId", ParameterKind::Guid),
            ],
            &[("employerId", id)],
        );
        let query = QueryParameters::parse("count=25");
        let ctx = RequestContext::new("session-1");

        let args = bind(&d, &query, &ctx).unwrap();
        assert_eq!(args[0], Argument::Integer(25));
        assert_eq!(args[1].as_context(), Some(&ctx));
        assert_eq!(args[2].as_guid(), Some(Uuid::parse_str(id).unwrap()));
    }

    #[test]
    fn test_path_values_take_precedence() {
        let d = descriptor(
            vec![ParameterSpec::required("name", ParameterKind::Text)],
            &[("name", "from-path")],
        );
        let query = QueryParameters::parse("name=from-query");
        let args = bind(&d, &query, &RequestContext::default()).unwrap();
        assert_eq!(args[0].as_text(), Some("from-path"));
    }

    #[test]
    fn test_missing_parameters() {
        let d = descriptor(
            vec![
                ParameterSpec::optional("since", ParameterKind::Timestamp),
                ParameterSpec::required("employerId", ParameterKind::Guid),
            ],
            &[],
        );
        let err = bind(&d, &QueryParameters::default(), &RequestContext::default()).unwrap_err();
        assert!(matches!(err, BindError::MissingParameter { ref name } if name == "employerId"));

        let d = descriptor(vec![ParameterSpec::optional("since", ParameterKind::Timestamp)], &[]);
        let args = bind(&d, &QueryParameters::default(), &RequestContext::default()).unwrap();
        assert!(args[0].is_absent());
    }

    #[test]
    fn test_invalid_values() {
        let d = descriptor(
            vec![ParameterSpec::required("employerId", ParameterKind::Guid)],
            &[("employerId", "hampster")],
        );
        let err = bind(&d, &QueryParameters::default(), &RequestContext::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value 'hampster' for parameter 'employerId': cannot be coerced to GUID"
        );

        assert!(coerce(ParameterKind::Integer, "12x").is_err());
        assert!(coerce(ParameterKind::Timestamp, "yesterday").is_err());
    }

    #[test]
    fn test_timestamp_normalized_to_utc() {
        let expected = Utc.with_ymd_and_hms(2024, 6, 1, 10, 30, 0).unwrap();

        for input in [
            "2024-06-01T12:30:00+02:00",
            "2024-06-01T10:30:00Z",
            "2024-06-01T10:30:00",
            "2024-06-01 10:30:00",
        ] {
            assert_eq!(
                coerce(ParameterKind::Timestamp, input).unwrap(),
                Argument::Timestamp(expected),
                "input {}",
                input
            );
        }

        assert_eq!(
            coerce(ParameterKind::Timestamp, "2024-06-01").unwrap(),
            Argument::Timestamp(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_invoke_wraps_provider_failure() {
        let provider: Arc<dyn Provider> = FnProvider::new("broken", vec![], |_| async {
            Err(ProviderError::new("database unavailable"))
        })
        .shared();
        let d = InvocationDescriptor::new(provider, IndexMap::new());

        let err = invoke(&d, &QueryParameters::default(), &RequestContext::default())
            .await
            .unwrap_err();
        match err {
            BindError::ProviderInvocationFailed { provider, source } => {
                assert_eq!(provider, "broken");
                assert_eq!(source.to_string(), "database unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
