//! Check registry: the immutable catalog of checks and their param schemas.
//!
//! A registry is built once (from the builtin catalog or a YAML file) and
//! passed by reference into the codec, evaluator and validator. Lookups never
//! mutate it.

mod builtin;
mod param;

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RegistryError;

pub use param::{ParamParseError, ParamSpec, ParamType, ParamValue};

/// A named, parameterized predicate usable as a filter leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
}

impl Check {
    pub fn new(id: &str, name: &str, params: Vec<ParamSpec>) -> Self {
        Self {
            id: id.to_string(),
            name: Some(name.to_string()),
            params,
        }
    }

    /// Look up a value-carrying param. Label params are never returned.
    pub fn param(&self, param_id: &str) -> Option<&ParamSpec> {
        self.value_params().find(|p| p.id == param_id)
    }

    /// Params that carry a value, in declared order.
    pub fn value_params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(|p| p.param_type.carries_value())
    }

    /// Every value-carrying param at its default, as stored in a new leaf.
    pub fn default_params(&self) -> BTreeMap<String, ParamValue> {
        self.value_params()
            .filter_map(|p| p.resolved_default().map(|v| (p.id.clone(), v)))
            .collect()
    }

    /// Resolve a leaf's stored params against this schema.
    ///
    /// Unknown and label keys are dropped; missing or mistyped values fall back
    /// to the default. The result is in declared param order.
    pub fn resolve(&self, params: &BTreeMap<String, ParamValue>) -> ResolvedParams {
        let values = self
            .value_params()
            .filter_map(|spec| {
                let value = params
                    .get(&spec.id)
                    .and_then(|v| spec.param_type.coerce(v))
                    .or_else(|| spec.resolved_default())?;
                Some((spec.id.clone(), value))
            })
            .collect();
        ResolvedParams { values }
    }
}

/// A leaf's params after schema resolution, handed to predicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResolvedParams {
    values: IndexMap<String, ParamValue>,
}

impl ResolvedParams {
    pub fn get(&self, param_id: &str) -> Option<&ParamValue> {
        self.values.get(param_id)
    }

    pub fn text(&self, param_id: &str) -> Option<&str> {
        self.get(param_id).and_then(ParamValue::as_text)
    }

    pub fn number(&self, param_id: &str) -> Option<f64> {
        self.get(param_id).and_then(ParamValue::as_number)
    }

    /// List values; an absent param reads as an empty list.
    pub fn list(&self, param_id: &str) -> &[String] {
        self.get(param_id)
            .and_then(ParamValue::as_list)
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ResolvedParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    checks: Vec<Check>,
}

/// Immutable catalog of checks keyed by id, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct CheckRegistry {
    checks: IndexMap<String, Check>,
}

impl CheckRegistry {
    /// Build a registry, rejecting empty or duplicate ids and defaults that
    /// their own param type cannot represent.
    pub fn new(checks: Vec<Check>) -> Result<Self, RegistryError> {
        let mut map = IndexMap::with_capacity(checks.len());
        for check in checks {
            validate_check(&check)?;
            if map.contains_key(&check.id) {
                return Err(RegistryError::DuplicateCheck(check.id));
            }
            map.insert(check.id.clone(), check);
        }
        Ok(Self { checks: map })
    }

    /// The standard dashboard catalog. Pairs with
    /// [`PredicateSet::builtin`](crate::evaluator::PredicateSet::builtin).
    pub fn builtin() -> Self {
        let checks = builtin::checks()
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();
        Self { checks }
    }

    /// Parse a YAML catalog: a top-level `checks:` list.
    pub fn from_yaml(yaml: &str) -> Result<Self, RegistryError> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::new(file.checks)
    }

    /// Load a YAML catalog from disk.
    pub fn from_path(path: &Path) -> Result<Self, RegistryError> {
        let yaml = fs::read_to_string(path)?;
        let registry = Self::from_yaml(&yaml)?;
        info!(path = %path.display(), checks = registry.len(), "loaded check registry");
        Ok(registry)
    }

    pub fn lookup(&self, check_id: &str) -> Option<&Check> {
        self.checks.get(check_id)
    }

    pub fn contains(&self, check_id: &str) -> bool {
        self.checks.contains_key(check_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.checks.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Check> {
        self.checks.values()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

fn validate_check(check: &Check) -> Result<(), RegistryError> {
    if check.id.is_empty() {
        return Err(RegistryError::EmptyCheckId);
    }
    let mut seen = HashSet::new();
    for spec in &check.params {
        if spec.id.is_empty() {
            return Err(RegistryError::EmptyParamId {
                check_id: check.id.clone(),
            });
        }
        if !seen.insert(spec.id.as_str()) {
            return Err(RegistryError::DuplicateParam {
                check_id: check.id.clone(),
                param_id: spec.id.clone(),
            });
        }
        let bad_default = spec.param_type.carries_value()
            && spec.default_value.is_some()
            && spec.resolved_default().is_none();
        if bad_default {
            return Err(RegistryError::InvalidDefault {
                check_id: check.id.clone(),
                param_id: spec.id.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG_YAML: &str = r#"
checks:
  - id: latency
    name: Latency
    params:
      - id: label
        type: label
        label: Latency above
      - id: seconds
        type: number
        defaultValue: 5
        width: 60
  - id: models
    params:
      - id: models
        type: multi_select
        defaultValue: []
"#;

    #[test]
    fn yaml_catalog_loads_in_order() {
        let registry = CheckRegistry::from_yaml(CATALOG_YAML).unwrap();
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["latency", "models"]);

        let latency = registry.lookup("latency").unwrap();
        assert!(latency.param("label").is_none());
        assert_eq!(latency.param("seconds").unwrap().width, Some(60));
    }

    #[test]
    fn default_params_skip_labels() {
        let registry = CheckRegistry::from_yaml(CATALOG_YAML).unwrap();
        let params = registry.lookup("latency").unwrap().default_params();
        assert_eq!(params.len(), 1);
        assert_eq!(params["seconds"], ParamValue::Number(5.0));
    }

    #[test]
    fn resolve_fills_defaults_and_drops_unknown() {
        let registry = CheckRegistry::from_yaml(CATALOG_YAML).unwrap();
        let check = registry.lookup("latency").unwrap();

        let mut stored = BTreeMap::new();
        stored.insert("label".to_string(), ParamValue::from("ignored"));
        stored.insert("bogus".to_string(), ParamValue::from(1.0));
        let resolved = check.resolve(&stored);
        assert_eq!(resolved.number("seconds"), Some(5.0));
        assert!(resolved.get("label").is_none());
        assert!(resolved.get("bogus").is_none());

        stored.insert("seconds".to_string(), ParamValue::from("not a number"));
        assert_eq!(check.resolve(&stored).number("seconds"), Some(5.0));

        stored.insert("seconds".to_string(), ParamValue::from("2.5"));
        assert_eq!(check.resolve(&stored).number("seconds"), Some(2.5));
    }

    #[test]
    fn resolved_params_iterate_in_declaration_order() {
        let registry = CheckRegistry::builtin();
        let check = registry.lookup("duration").unwrap();
        let mut stored = BTreeMap::new();
        stored.insert("duration".to_string(), ParamValue::from(2.0));
        let resolved = check.resolve(&stored);
        let ids: Vec<&str> = resolved.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["operator", "duration"]);
        assert_eq!(resolved.iter().nth(1), Some(("duration", &ParamValue::Number(2.0))));
    }

    #[test]
    fn duplicate_check_rejected() {
        let check = Check::new("dup", "Dup", vec![]);
        let err = CheckRegistry::new(vec![check.clone(), check]).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateCheck(id) if id == "dup"));
    }

    #[test]
    fn duplicate_param_rejected() {
        let check = Check::new(
            "cost",
            "Cost",
            vec![
                ParamSpec::new("cost", ParamType::Number, 1.0),
                ParamSpec::new("cost", ParamType::Number, 2.0),
            ],
        );
        assert!(matches!(
            CheckRegistry::new(vec![check]),
            Err(RegistryError::DuplicateParam { .. })
        ));
    }

    #[test]
    fn mistyped_default_rejected() {
        let check = Check::new(
            "cost",
            "Cost",
            vec![ParamSpec::new("cost", ParamType::Number, "cheap")],
        );
        assert!(matches!(
            CheckRegistry::new(vec![check]),
            Err(RegistryError::InvalidDefault { .. })
        ));
    }

    #[test]
    fn empty_ids_rejected() {
        assert!(matches!(
            CheckRegistry::new(vec![Check::new("", "Blank", vec![])]),
            Err(RegistryError::EmptyCheckId)
        ));

        let check = Check::new(
            "cost",
            "Cost",
            vec![ParamSpec::new("", ParamType::Number, 1.0)],
        );
        match CheckRegistry::new(vec![check]) {
            Err(RegistryError::EmptyParamId { check_id }) => assert_eq!(check_id, "cost"),
            other => panic!("expected empty param id error, got {other:?}"),
        }

        let yaml = "checks:\n  - id: ''\n    name: Blank\n";
        assert!(matches!(
            CheckRegistry::from_yaml(yaml),
            Err(RegistryError::EmptyCheckId)
        ));
    }

    #[test]
    fn builtin_catalog_is_consistent() {
        let builtin = CheckRegistry::builtin();
        let rebuilt = CheckRegistry::new(builtin.iter().cloned().collect()).unwrap();
        assert_eq!(rebuilt.len(), builtin.len());
        assert!(builtin.contains("models"));
        assert!(!builtin.contains("ghost_check"));
    }
}
