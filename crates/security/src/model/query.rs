//! Find parameters and the implicit "active rows only" filter.

use std::collections::BTreeMap;

use serde_json::Value;

use super::Model;

/// Bind name used for the injected active-flag placeholder.
pub const INJECTED_ACTIVE: &str = "injectedActive";

/// Criteria handed to the persistence layer's find operations.
///
/// `conditions` uses `:name:` placeholders resolved from `bind`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindParameters {
    /// Filter expression, e.g. `"users.email = :email:"`.
    pub conditions: Option<String>,
    /// Placeholder values.
    pub bind: BTreeMap<String, Value>,
    /// Ordering expression.
    pub order: Option<String>,
    /// Maximum number of rows.
    pub limit: Option<usize>,
}

impl FindParameters {
    /// Parameters with the given filter expression.
    pub fn with_conditions(conditions: impl Into<String>) -> Self {
        Self {
            conditions: Some(conditions.into()),
            ..Self::default()
        }
    }

    /// Bind a placeholder value.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bind.insert(name.into(), value.into());
        self
    }

    /// Set the ordering expression.
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    /// Set the row limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Restrict a find to live rows when `M` has an active column.
///
/// Conditions that already mention the column are left alone so callers can
/// ask for inactive rows explicitly. Otherwise
/// `<source>.<column> = :injectedActive:` is AND-ed onto the existing filter
/// and bound to [`Model::enabled_value`].
pub fn inject_active<M: Model>(params: Option<FindParameters>) -> FindParameters {
    let mut params = params.unwrap_or_default();
    let Some(column) = M::active_column() else {
        return params;
    };
    if params
        .conditions
        .as_deref()
        .is_some_and(|c| c.contains(column))
    {
        return params;
    }

    let clause = format!("{}.{} = :{}:", M::source(), column, INJECTED_ACTIVE);
    params.conditions = Some(match params.conditions.take() {
        Some(existing) if !existing.trim().is_empty() => format!("({existing}) AND {clause}"),
        _ => clause,
    });
    params
        .bind
        .insert(INJECTED_ACTIVE.to_owned(), Value::from(M::enabled_value()));
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::{Page, User};
    use serde_json::json;

    #[test]
    fn none_gets_active_filter() {
        let p = inject_active::<User>(None);
        assert_eq!(p.conditions.as_deref(), Some("users.active = :injectedActive:"));
        assert_eq!(p.bind[INJECTED_ACTIVE], json!(1));
    }

    #[test]
    fn existing_conditions_are_and_joined() {
        let p = inject_active::<User>(Some(
            FindParameters::with_conditions("email = :email: OR name = :name:")
                .bind("email", "a@example.com")
                .bind("name", "Alice"),
        ));
        assert_eq!(
            p.conditions.as_deref(),
            Some("(email = :email: OR name = :name:) AND users.active = :injectedActive:")
        );
        assert_eq!(p.bind.len(), 3);
    }

    #[test]
    fn explicit_active_condition_is_respected() {
        let original = FindParameters::with_conditions("active = :a:").bind("a", 0);
        let p = inject_active::<User>(Some(original.clone()));
        assert_eq!(p, original);
    }

    #[test]
    fn model_without_active_column_untouched() {
        let original = FindParameters::with_conditions("title = :t:").limit(5);
        assert_eq!(inject_active::<Page>(Some(original.clone())), original);
        assert_eq!(inject_active::<Page>(None), FindParameters::default());
    }

    #[test]
    fn builder_sets_order_and_limit() {
        let p = FindParameters::default().order("id DESC").limit(10);
        assert_eq!(p.order.as_deref(), Some("id DESC"));
        assert_eq!(p.limit, Some(10));
    }
}
