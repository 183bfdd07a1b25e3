//! Textual `${name}` macro expansion over an explicit key-value context.
//!
//! Emitted classification identifiers may reference request attributes or
//! earlier-resolved identifiers (e.g. `peer-${snmp-peer-address}` or
//! `${snmp-credentials-id}-audited`). Expansion is purely textual; names
//! with no binding in the context are left in place, and inputs without
//! `${` are returned unchanged.

use std::collections::BTreeMap;
use std::fmt::Display;

// ---------------------------------------------------------------------------
// MacroContext
// ---------------------------------------------------------------------------

/// Key-value bindings available to `${name}` placeholders.
///
/// Populated incrementally during classification, so identifiers resolved
/// by a later axis can reference ones resolved earlier in the same pass.
#[derive(Debug, Clone, Default)]
pub struct MacroContext {
    bindings: BTreeMap<String, String>,
}

impl MacroContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to the display form of `value`.
    pub fn set(&mut self, name: &str, value: impl Display) {
        self.bindings.insert(name.to_string(), value.to_string());
    }

    /// Binds `name` only when `value` is present.
    pub fn set_opt(&mut self, name: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.bindings.insert(name.to_string(), value.to_string());
        }
    }

    /// Looks up a binding.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Expansion
// ---------------------------------------------------------------------------

/// Expands `${name}` placeholders in `input` against `ctx`.
///
/// A no-op (returns the input unchanged) when the input contains no `${`.
#[must_use]
pub fn expand_str(input: &str, ctx: &MacroContext) -> String {
    if !input.contains("${") {
        return input.to_string();
    }
    let mut expanded = input.to_string();
    for (name, value) in &ctx.bindings {
        let placeholder = format!("${{{name}}}");
        if expanded.contains(&placeholder) {
            expanded = expanded.replace(&placeholder, value);
        }
    }
    expanded
}

/// Expands an optional identifier; `None` passes through untouched.
#[must_use]
pub fn expand_macro(input: Option<String>, ctx: &MacroContext) -> Option<String> {
    input.map(|s| expand_str(&s, ctx))
}

/// Expands every entry of an option list in place.
#[must_use]
pub fn expand_macros(inputs: Vec<String>, ctx: &MacroContext) -> Vec<String> {
    inputs.into_iter().map(|s| expand_str(&s, ctx)).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
