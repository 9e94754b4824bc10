use std::collections::HashSet;

use async_graphql_value::{ConstValue, Name};
use indexmap::IndexMap;

use crate::context::FromConstValue;
use crate::error::{Error, Result};

pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// Render an internal snake_case argument name (or dotted path) with the
/// external camelCase spelling clients see.
pub fn to_external_name(internal: &str) -> String {
    let mut out = String::with_capacity(internal.len());
    let mut upper_next = false;
    for ch in internal.chars() {
        match ch {
            '_' => upper_next = true,
            '.' => {
                out.push('.');
                upper_next = false;
            }
            c if upper_next => {
                out.extend(c.to_uppercase());
                upper_next = false;
            }
            c => out.push(c),
        }
    }
    out
}

/// Translate an external camelCase name to the internal snake_case one.
pub fn to_internal_name(external: &str) -> String {
    let mut out = String::with_capacity(external.len() + 4);
    for ch in external.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Coerced, internally-named arguments for one field invocation.
#[derive(Debug, Clone, Default)]
pub struct Arguments(IndexMap<Name, ConstValue>);

impl Arguments {
    pub fn new(map: IndexMap<Name, ConstValue>) -> Self {
        Self(map)
    }

    pub fn insert(&mut self, name: &str, value: ConstValue) {
        self.0.insert(Name::new(name), value);
    }

    pub fn get(&self, name: &str) -> Option<&ConstValue> {
        self.0.get(name)
    }

    /// Look up a possibly nested value by dotted path, e.g.
    /// `hierarchy_filters.group_id`.
    pub fn lookup_path(&self, path: &str) -> Option<&ConstValue> {
        let mut segments = path.split('.');
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            match current {
                ConstValue::Object(obj) => current = obj.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Presence mirrors the original system: null, empty strings, empty
    /// lists, and empty objects all count as absent, so an empty filter
    /// never trips an exclusivity rule.
    pub fn is_present(&self, path: &str) -> bool {
        self.lookup_path(path).is_some_and(value_present)
    }

    /// Typed read. Absent and null both yield `Ok(None)`; a value of the
    /// wrong shape is an `ArgumentError` naming the external argument name.
    pub fn get_as<T: FromConstValue>(&self, name: &str) -> Result<Option<T>> {
        match self.get(name) {
            None | Some(ConstValue::Null) => Ok(None),
            Some(value) => T::from_const_value(value).map(Some).map_err(|msg| {
                Error::argument(format!(
                    "Invalid value for argument '{}': {}",
                    to_external_name(name),
                    msg
                ))
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, &ConstValue)> {
        self.0.iter()
    }
}

fn value_present(value: &ConstValue) -> bool {
    match value {
        ConstValue::Null => false,
        ConstValue::String(s) => !s.is_empty(),
        ConstValue::List(items) => !items.is_empty(),
        ConstValue::Object(obj) => obj.values().any(value_present),
        _ => true,
    }
}

/// Declaration of one argument: internal name, required flag, default, and
/// an optional feature gate. Gated arguments are silently dropped during
/// coercion when the toggle is off.
#[derive(Debug, Clone)]
pub struct ArgumentDef {
    pub name: &'static str,
    pub required: bool,
    pub default: Option<ConstValue>,
    pub feature_gate: Option<&'static str>,
}

impl ArgumentDef {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            required: false,
            default: None,
            feature_gate: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: ConstValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn feature_gate(mut self, feature: &'static str) -> Self {
        self.feature_gate = Some(feature);
        self
    }

    pub fn external_name(&self) -> String {
        to_external_name(self.name)
    }
}

/// Policy for `first`/`last` values exceeding the field's `max_page_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSizePolicy {
    #[default]
    Clamp,
    Reject,
}

/// Static metadata for one schema field: typed arguments, pagination
/// bounds, and an optional complexity override.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: &'static str,
    pub arguments: Vec<ArgumentDef>,
    pub max_page_size: u32,
    pub page_size_policy: PageSizePolicy,
    pub is_connection: bool,
    pub complexity_override: Option<usize>,
}

impl FieldDef {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            arguments: Vec::new(),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            page_size_policy: PageSizePolicy::default(),
            is_connection: false,
            complexity_override: None,
        }
    }

    pub fn argument(mut self, def: ArgumentDef) -> Self {
        debug_assert!(
            !self.arguments.iter().any(|a| a.name == def.name),
            "duplicate argument '{}' on field '{}'",
            def.name,
            self.name
        );
        self.arguments.push(def);
        self
    }

    pub fn connection(mut self, max_page_size: u32) -> Self {
        self.is_connection = true;
        self.max_page_size = max_page_size;
        self
    }

    pub fn page_size_policy(mut self, policy: PageSizePolicy) -> Self {
        self.page_size_policy = policy;
        self
    }

    pub fn complexity_override(mut self, cost: usize) -> Self {
        self.complexity_override = Some(cost);
        self
    }

    fn argument_def(&self, internal: &str) -> Option<&ArgumentDef> {
        self.arguments.iter().find(|a| a.name == internal)
    }

    /// Translate a client-supplied (externally-named) argument map into
    /// internal names, applying defaults, required checks, and feature
    /// gates. All error messages echo the external names.
    pub fn coerce_arguments(
        &self,
        external: &IndexMap<Name, ConstValue>,
        enabled_features: &HashSet<String>,
    ) -> Result<Arguments> {
        let mut coerced = Arguments::default();
        for (name, value) in external {
            let internal = to_internal_name(name.as_str());
            let Some(def) = self.argument_def(&internal) else {
                return Err(Error::argument(format!(
                    "Field '{}' doesn't accept argument '{}'",
                    self.name, name
                )));
            };
            if let Some(feature) = def.feature_gate {
                if !enabled_features.contains(feature) {
                    continue;
                }
            }
            coerced.insert(&internal, value.clone());
        }
        for def in &self.arguments {
            if coerced.get(def.name).is_none() {
                if let Some(default) = &def.default {
                    coerced.insert(def.name, default.clone());
                }
            }
            if def.required && !coerced.is_present(def.name) {
                return Err(Error::argument(format!(
                    "Argument '{}' on field '{}' is required",
                    def.external_name(),
                    self.name
                )));
            }
        }
        Ok(coerced)
    }
}
