//! Data format codes
//!
//! Every leaf type in a schema resolves to one of these terminal format
//! codes. Each scalar format has a list counterpart used by leaf-lists.

use serde::{Deserialize, Serialize};

/// Terminal format code for a resolved data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Format {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Decimal64,
    #[default]
    String,
    Binary,
    Bits,
    Enumeration,
    IdentityRef,
    InstanceIdentifier,
    LeafRef,
    Empty,
    Union,
    AnyData,

    BooleanList,
    Int8List,
    Int16List,
    Int32List,
    Int64List,
    UInt8List,
    UInt16List,
    UInt32List,
    UInt64List,
    Decimal64List,
    StringList,
    BinaryList,
    BitsList,
    EnumerationList,
    IdentityRefList,
    InstanceIdentifierList,
    LeafRefList,
    UnionList,
}

impl Format {
    /// True when this format holds a sequence of scalars
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            Format::BooleanList
                | Format::Int8List
                | Format::Int16List
                | Format::Int32List
                | Format::Int64List
                | Format::UInt8List
                | Format::UInt16List
                | Format::UInt32List
                | Format::UInt64List
                | Format::Decimal64List
                | Format::StringList
                | Format::BinaryList
                | Format::BitsList
                | Format::EnumerationList
                | Format::IdentityRefList
                | Format::InstanceIdentifierList
                | Format::LeafRefList
                | Format::UnionList
        )
    }

    /// The list counterpart of a scalar format. Idempotent for list
    /// formats; `Empty` and `AnyData` have no list counterpart and are
    /// returned unchanged.
    pub fn list_of(self) -> Format {
        match self {
            Format::Boolean => Format::BooleanList,
            Format::Int8 => Format::Int8List,
            Format::Int16 => Format::Int16List,
            Format::Int32 => Format::Int32List,
            Format::Int64 => Format::Int64List,
            Format::UInt8 => Format::UInt8List,
            Format::UInt16 => Format::UInt16List,
            Format::UInt32 => Format::UInt32List,
            Format::UInt64 => Format::UInt64List,
            Format::Decimal64 => Format::Decimal64List,
            Format::String => Format::StringList,
            Format::Binary => Format::BinaryList,
            Format::Bits => Format::BitsList,
            Format::Enumeration => Format::EnumerationList,
            Format::IdentityRef => Format::IdentityRefList,
            Format::InstanceIdentifier => Format::InstanceIdentifierList,
            Format::LeafRef => Format::LeafRefList,
            Format::Union => Format::UnionList,
            other => other,
        }
    }

    /// The scalar counterpart of a list format. Idempotent for scalars.
    pub fn scalar_of(self) -> Format {
        match self {
            Format::BooleanList => Format::Boolean,
            Format::Int8List => Format::Int8,
            Format::Int16List => Format::Int16,
            Format::Int32List => Format::Int32,
            Format::Int64List => Format::Int64,
            Format::UInt8List => Format::UInt8,
            Format::UInt16List => Format::UInt16,
            Format::UInt32List => Format::UInt32,
            Format::UInt64List => Format::UInt64,
            Format::Decimal64List => Format::Decimal64,
            Format::StringList => Format::String,
            Format::BinaryList => Format::Binary,
            Format::BitsList => Format::Bits,
            Format::EnumerationList => Format::Enumeration,
            Format::IdentityRefList => Format::IdentityRef,
            Format::InstanceIdentifierList => Format::InstanceIdentifier,
            Format::LeafRefList => Format::LeafRef,
            Format::UnionList => Format::Union,
            other => other,
        }
    }

    /// True for signed integer scalars
    pub fn is_signed(&self) -> bool {
        matches!(
            self.scalar_of(),
            Format::Int8 | Format::Int16 | Format::Int32 | Format::Int64
        )
    }

    /// True for unsigned integer scalars
    pub fn is_unsigned(&self) -> bool {
        matches!(
            self.scalar_of(),
            Format::UInt8 | Format::UInt16 | Format::UInt32 | Format::UInt64
        )
    }

    /// True for any numeric scalar including decimal64
    pub fn is_numeric(&self) -> bool {
        self.is_signed() || self.is_unsigned() || self.scalar_of() == Format::Decimal64
    }

    /// Resolve a built-in type name to its format code, `None` for
    /// typedef references that need scope resolution.
    pub fn from_builtin(ident: &str) -> Option<Format> {
        let f = match ident {
            "boolean" => Format::Boolean,
            "int8" => Format::Int8,
            "int16" => Format::Int16,
            "int32" => Format::Int32,
            "int64" => Format::Int64,
            "uint8" => Format::UInt8,
            "uint16" => Format::UInt16,
            "uint32" => Format::UInt32,
            "uint64" => Format::UInt64,
            "decimal64" => Format::Decimal64,
            "string" => Format::String,
            "binary" => Format::Binary,
            "bits" => Format::Bits,
            "enumeration" => Format::Enumeration,
            "identityref" => Format::IdentityRef,
            "instance-identifier" => Format::InstanceIdentifier,
            "leafref" => Format::LeafRef,
            "empty" => Format::Empty,
            "union" => Format::Union,
            "anydata" | "anyxml" => Format::AnyData,
            _ => return None,
        };
        Some(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_scalar_round_trip() {
        let scalars = [
            Format::Boolean,
            Format::Int32,
            Format::UInt64,
            Format::String,
            Format::Enumeration,
        ];
        for f in scalars {
            assert!(!f.is_list());
            assert!(f.list_of().is_list());
            assert_eq!(f.list_of().scalar_of(), f);
        }
    }

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(Format::from_builtin("int32"), Some(Format::Int32));
        assert_eq!(Format::from_builtin("string"), Some(Format::String));
        assert_eq!(Format::from_builtin("metric"), None);
    }

    #[test]
    fn test_numeric_queries() {
        assert!(Format::Int8.is_signed());
        assert!(Format::UInt64List.is_unsigned());
        assert!(Format::Decimal64.is_numeric());
        assert!(!Format::String.is_numeric());
    }
}
