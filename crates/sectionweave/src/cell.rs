//! Cell content handed out by providers.

use std::any::Any;
use std::sync::Arc;

/// The content of one cell, or an object returned by object lookup.
///
/// Cloning is cheap: custom payloads are shared, not copied.
#[derive(Debug, Clone, Default)]
pub enum CellData {
    /// No data.
    #[default]
    None,
    /// String data.
    String(String),
    /// Integer data.
    Int(i64),
    /// Floating point data.
    Float(f64),
    /// Boolean data.
    Bool(bool),
    /// Custom data (type-erased, shared).
    Custom(Arc<dyn Any + Send + Sync>),
}

impl CellData {
    /// Creates custom data from any type.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        CellData::Custom(Arc::new(value))
    }

    /// Returns `true` if this is `CellData::None`.
    pub fn is_none(&self) -> bool {
        matches!(self, CellData::None)
    }

    /// Returns `true` if this contains some data.
    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// Attempts to get the data as a string slice.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            CellData::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Attempts to get the data as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CellData::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to get the data as a float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            CellData::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to get the data as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellData::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to downcast custom data to a concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            CellData::Custom(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }
}

/// Custom payloads compare by identity; everything else by value.
impl PartialEq for CellData {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellData::None, CellData::None) => true,
            (CellData::String(a), CellData::String(b)) => a == b,
            (CellData::Int(a), CellData::Int(b)) => a == b,
            (CellData::Float(a), CellData::Float(b)) => a == b,
            (CellData::Bool(a), CellData::Bool(b)) => a == b,
            (CellData::Custom(a), CellData::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<String> for CellData {
    fn from(s: String) -> Self {
        CellData::String(s)
    }
}

impl From<&str> for CellData {
    fn from(s: &str) -> Self {
        CellData::String(s.to_string())
    }
}

impl From<i64> for CellData {
    fn from(n: i64) -> Self {
        CellData::Int(n)
    }
}

impl From<i32> for CellData {
    fn from(n: i32) -> Self {
        CellData::Int(i64::from(n))
    }
}

impl From<f64> for CellData {
    fn from(n: f64) -> Self {
        CellData::Float(n)
    }
}

impl From<bool> for CellData {
    fn from(b: bool) -> Self {
        CellData::Bool(b)
    }
}

impl<T: Into<CellData>> From<Option<T>> for CellData {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => CellData::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(CellData::from("row"), CellData::String("row".into()));
        assert_eq!(CellData::from(3_i32).as_int(), Some(3));
        assert_eq!(CellData::from(Some(true)).as_bool(), Some(true));
        assert!(CellData::from(None::<i64>).is_none());
    }

    #[test]
    fn test_custom_identity_equality() {
        let a = CellData::new(vec![1, 2, 3]);
        let b = a.clone();
        let c = CellData::new(vec![1, 2, 3]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.downcast_ref::<Vec<i32>>(), Some(&vec![1, 2, 3]));
        assert!(a.downcast_ref::<String>().is_none());
    }
}
