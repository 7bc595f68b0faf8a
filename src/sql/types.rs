//! Cast target types.
//!
//! Free-text EAV values are only ever cast into these types. Dialects decide
//! the spelling.

/// SQL-level data type used in `CAST(... AS type)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Arbitrary-precision number (REAL on SQLite).
    Numeric,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInt,
    /// Unbounded text.
    Text,
    /// Binary JSON (TEXT on SQLite).
    Jsonb,
}
