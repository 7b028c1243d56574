use std::fmt;

use allocative::Allocative;

/// Logical types a column can hold.
/// These types define the structure of columns and the expected format of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Allocative)]
pub enum DataType {
    /// A 64-bit signed integer.
    Int,
    /// A 64-bit floating-point number.
    Float,
    /// A variable-length UTF-8 character string.
    Text,
    /// A boolean value (true or false).
    Bool,
}

impl DataType {
    /// Returns true for the types that take part in arithmetic.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }

    /// Finds the narrowest type able to hold values of both `self` and `other`.
    ///
    /// Identical types unify to themselves and `Int` widens into `Float`;
    /// anything else has no common type.
    pub fn unify(self, other: Self) -> Option<Self> {
        match (self, other) {
            (a, b) if a == b => Some(a),
            (a, b) if a.is_numeric() && b.is_numeric() => Some(Self::Float),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "INT",
            Self::Float => "FLOAT",
            Self::Text => "TEXT",
            Self::Bool => "BOOL",
        };
        f.write_str(name)
    }
}
