//! Record and metadata types.
//!
//! The database is generic over the record type `O`. Components that need
//! per-dimension access (the preference-vector preprocessor, the bundled
//! distance functions) bound `O` by [`NumberVector`]; [`DataVector`] is the
//! bundled dense implementation.

/// Per-dimension coordinate access for vector-like records.
pub trait NumberVector {
    /// Number of dimensions.
    fn dimensionality(&self) -> usize;

    /// Coordinate along dimension `dim`. `dim` must be `< dimensionality()`.
    fn coordinate(&self, dim: usize) -> f64;
}

/// Dense feature vector with `f64` coordinates.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataVector {
    values: Vec<f64>,
}

impl DataVector {
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

impl From<Vec<f64>> for DataVector {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl NumberVector for DataVector {
    fn dimensionality(&self) -> usize {
        self.values.len()
    }

    fn coordinate(&self, dim: usize) -> f64 {
        self.values[dim]
    }
}

/// Domain-specific class label, a small value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassLabel(pub u32);

impl std::fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "class:{}", self.0)
    }
}

/// Optional per-record metadata columns.
///
/// Each column is sparse: the store allocates backing storage for a column
/// only when the first value is written to it.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metadata {
    /// Free-text object label.
    pub object_label: Option<String>,
    /// Class label, e.g. a ground-truth clustering assignment.
    pub class_label: Option<ClassLabel>,
    /// External identifier, e.g. a key in a source file.
    pub external_id: Option<String>,
}

impl Metadata {
    #[must_use]
    pub fn with_object_label(label: impl Into<String>) -> Self {
        Self {
            object_label: Some(label.into()),
            ..Self::default()
        }
    }

    /// True if no column carries a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.object_label.is_none() && self.class_label.is_none() && self.external_id.is_none()
    }
}
