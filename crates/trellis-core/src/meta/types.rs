//! Declared (unresolved) data types
//!
//! A `TypeSpec` is the type as written in the schema source: possibly a
//! typedef reference, possibly missing its terminal format. Finalization
//! collapses each spec through the typedef chain into the value domain's
//! resolved `Type`.

use trellis_core_types::Format;

/// Declared type with restrictions, before typedef-chain collapse
#[derive(Debug, Clone, Default)]
pub struct TypeSpec {
    /// Built-in type name or typedef reference
    pub ident: String,
    pub range: Option<String>,
    pub length: Option<String>,
    pub patterns: Vec<String>,
    /// Enumeration labels with optional explicit ids; unassigned ids are
    /// previous+1 starting at 0
    pub enumeration: Vec<(String, Option<i64>)>,
    pub union: Vec<TypeSpec>,
    pub leafref_path: Option<String>,
    pub identity_base: Option<String>,
    pub default_value: Option<String>,
    pub units: Option<String>,
}

impl TypeSpec {
    pub fn new(ident: impl Into<String>) -> Self {
        TypeSpec {
            ident: ident.into(),
            ..Default::default()
        }
    }

    /// Built-in format when the ident is not a typedef reference
    pub fn builtin_format(&self) -> Option<Format> {
        Format::from_builtin(&self.ident)
    }

    pub fn range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    pub fn length(mut self, length: impl Into<String>) -> Self {
        self.length = Some(length.into());
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Append an enumeration label with an implicitly assigned id
    pub fn enum_label(mut self, label: impl Into<String>) -> Self {
        self.enumeration.push((label.into(), None));
        self
    }

    /// Append an enumeration label with an explicit id
    pub fn enum_value(mut self, label: impl Into<String>, id: i64) -> Self {
        self.enumeration.push((label.into(), Some(id)));
        self
    }

    pub fn member(mut self, member: TypeSpec) -> Self {
        self.union.push(member);
        self
    }

    pub fn leafref(mut self, path: impl Into<String>) -> Self {
        self.ident = "leafref".to_string();
        self.leafref_path = Some(path.into());
        self
    }

    pub fn identity_base(mut self, base: impl Into<String>) -> Self {
        self.identity_base = Some(base.into());
        self
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default_value = Some(default.into());
        self
    }

    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_format() {
        assert_eq!(
            TypeSpec::new("int32").builtin_format(),
            Some(Format::Int32)
        );
        assert_eq!(TypeSpec::new("metric").builtin_format(), None);
    }

    #[test]
    fn test_fluent_restrictions() {
        let spec = TypeSpec::new("string")
            .length("1..64")
            .pattern("[a-z]+")
            .default_value("idle");
        assert_eq!(spec.length.as_deref(), Some("1..64"));
        assert_eq!(spec.patterns.len(), 1);
        assert_eq!(spec.default_value.as_deref(), Some("idle"));
    }
}
