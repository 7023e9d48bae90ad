//! Tensor types and the row-major codec.
//!
//! The v2 protocol carries every tensor as a flat `data` array plus a
//! `shape`. [`encode`] flattens a feature matrix into that layout and
//! [`decode_slice`] reads one sample's block back out of it.

use serde::de::Deserializer;
use serde::ser::{SerializeSeq, SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tensor element types defined by the v2 protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Datatype {
    Bool,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Fp16,
    Fp32,
    Fp64,
    Bytes,
}

impl Datatype {
    fn is_signed(self) -> bool {
        matches!(
            self,
            Datatype::Int8 | Datatype::Int16 | Datatype::Int32 | Datatype::Int64
        )
    }

    fn is_unsigned(self) -> bool {
        matches!(
            self,
            Datatype::Uint8 | Datatype::Uint16 | Datatype::Uint32 | Datatype::Uint64
        )
    }

    /// Inclusive range of values the type can represent exactly on the
    /// wire. The 64-bit integer maxima are the largest `f64` below 2^63 and
    /// 2^64, since those powers of two themselves do not fit.
    fn bounds(self) -> Option<(f64, f64)> {
        match self {
            Datatype::Int8 => Some((i8::MIN as f64, i8::MAX as f64)),
            Datatype::Int16 => Some((i16::MIN as f64, i16::MAX as f64)),
            Datatype::Int32 => Some((i32::MIN as f64, i32::MAX as f64)),
            Datatype::Int64 => Some((i64::MIN as f64, 9_223_372_036_854_774_784.0)),
            Datatype::Uint8 => Some((0.0, u8::MAX as f64)),
            Datatype::Uint16 => Some((0.0, u16::MAX as f64)),
            Datatype::Uint32 => Some((0.0, u32::MAX as f64)),
            Datatype::Uint64 => Some((0.0, 18_446_744_073_709_549_568.0)),
            Datatype::Fp16 => Some((-65504.0, 65504.0)),
            Datatype::Fp32 => Some((f32::MIN as f64, f32::MAX as f64)),
            _ => None,
        }
    }

    /// Check that `value` can be carried by a tensor of this type.
    fn check_value(self, value: f64) -> std::result::Result<(), &'static str> {
        if !value.is_finite() {
            return Err("is not finite");
        }
        if (self.is_signed() || self.is_unsigned()) && value.fract() != 0.0 {
            return Err("is not an integer");
        }
        if let Some((min, max)) = self.bounds() {
            if value < min || value > max {
                return Err("is out of range for the datatype");
            }
        }
        if self == Datatype::Bool && value != 0.0 && value != 1.0 {
            return Err("is not a boolean (0 or 1)");
        }
        Ok(())
    }
}

impl std::fmt::Display for Datatype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Datatype::Bool => "BOOL",
            Datatype::Uint8 => "UINT8",
            Datatype::Uint16 => "UINT16",
            Datatype::Uint32 => "UINT32",
            Datatype::Uint64 => "UINT64",
            Datatype::Int8 => "INT8",
            Datatype::Int16 => "INT16",
            Datatype::Int32 => "INT32",
            Datatype::Int64 => "INT64",
            Datatype::Fp16 => "FP16",
            Datatype::Fp32 => "FP32",
            Datatype::Fp64 => "FP64",
            Datatype::Bytes => "BYTES",
        };
        write!(f, "{}", name)
    }
}

/// An ordered sequence of numeric rows, one row per sample.
///
/// Rows are not validated on construction; [`encode`] rejects empty or
/// ragged matrices.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(transparent)]
pub struct FeatureMatrix {
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    /// Parse a JSON matrix such as `[[5.1, 3.5, 1.4, 0.2]]`.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::Encoding(format!("invalid JSON feature matrix: {}", e)))
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the first row, or `None` for an empty matrix.
    pub fn feature_count(&self) -> Option<usize> {
        self.rows.first().map(Vec::len)
    }
}

impl From<Vec<Vec<f64>>> for FeatureMatrix {
    fn from(rows: Vec<Vec<f64>>) -> Self {
        Self::new(rows)
    }
}

/// A named tensor: shape, element type and row-major data.
///
/// Fields are read-only once constructed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TensorDescriptor {
    name: String,
    shape: Vec<u64>,
    datatype: Datatype,
    #[serde(deserialize_with = "deserialize_scalars")]
    data: Vec<f64>,
}

impl TensorDescriptor {
    /// Build a tensor, checking that `shape` describes exactly `data.len()` elements.
    pub fn new(
        name: impl Into<String>,
        shape: Vec<u64>,
        datatype: Datatype,
        data: Vec<f64>,
    ) -> Result<Self> {
        let tensor = Self {
            name: name.into(),
            shape,
            datatype,
            data,
        };
        tensor.check_shape()?;
        Ok(tensor)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    pub fn datatype(&self) -> Datatype {
        self.datatype
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Number of elements the shape describes (`None` on overflow).
    pub fn element_count(&self) -> Option<u64> {
        self.shape
            .iter()
            .try_fold(1u64, |acc, &dim| acc.checked_mul(dim))
    }

    /// Verify `product(shape) == len(data)`.
    pub fn check_shape(&self) -> Result<()> {
        match self.element_count() {
            Some(count) if count == self.data.len() as u64 => Ok(()),
            count => Err(Error::ShapeMismatch {
                name: self.name.clone(),
                expected: count.unwrap_or(u64::MAX),
                actual: self.data.len(),
            }),
        }
    }
}

impl Serialize for TensorDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TensorDescriptor", 4)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("shape", &self.shape)?;
        state.serialize_field("datatype", &self.datatype)?;
        state.serialize_field(
            "data",
            &WireData {
                datatype: self.datatype,
                values: &self.data,
            },
        )?;
        state.end()
    }
}

/// Writes data with the JSON number form the datatype calls for: integers
/// for integer types, booleans for BOOL.
struct WireData<'a> {
    datatype: Datatype,
    values: &'a [f64],
}

impl Serialize for WireData<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.values.len()))?;
        for &value in self.values {
            if self.datatype.is_signed() {
                seq.serialize_element(&(value as i64))?;
            } else if self.datatype.is_unsigned() {
                seq.serialize_element(&(value as u64))?;
            } else if self.datatype == Datatype::Bool {
                seq.serialize_element(&(value != 0.0))?;
            } else {
                seq.serialize_element(&value)?;
            }
        }
        seq.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(f64),
    Bool(bool),
}

fn deserialize_scalars<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<f64>, D::Error> {
    let raw = Vec::<Scalar>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|scalar| match scalar {
            Scalar::Number(n) => n,
            Scalar::Bool(true) => 1.0,
            Scalar::Bool(false) => 0.0,
        })
        .collect())
}

/// Flatten `matrix` into a `[rows, features]` tensor named `input_name`.
pub fn encode(matrix: &FeatureMatrix, input_name: &str, datatype: Datatype) -> Result<TensorDescriptor> {
    if datatype == Datatype::Bytes {
        return Err(Error::Encoding(
            "BYTES tensors cannot be encoded from a numeric matrix".to_string(),
        ));
    }

    let width = matrix
        .feature_count()
        .ok_or_else(|| Error::Encoding("feature matrix is empty".to_string()))?;
    if width == 0 {
        return Err(Error::Encoding("feature matrix rows have no features".to_string()));
    }

    let mut data = Vec::with_capacity(matrix.row_count() * width);
    for (i, row) in matrix.rows().iter().enumerate() {
        if row.len() != width {
            return Err(Error::Encoding(format!(
                "row {} has {} features, expected {}",
                i,
                row.len(),
                width
            )));
        }
        for (j, &value) in row.iter().enumerate() {
            datatype.check_value(value).map_err(|reason| {
                Error::Encoding(format!("value {} at [{}, {}] {}", value, i, j, reason))
            })?;
        }
        data.extend_from_slice(row);
    }

    Ok(TensorDescriptor {
        name: input_name.to_string(),
        shape: vec![matrix.row_count() as u64, width as u64],
        datatype,
        data,
    })
}

/// Return sample `sample_index`'s block of `class_count` values from a
/// `[N, class_count]` tensor.
pub fn decode_slice(tensor: &TensorDescriptor, sample_index: usize, class_count: usize) -> Result<&[f64]> {
    let range = sample_index
        .checked_mul(class_count)
        .and_then(|start| start.checked_add(class_count).map(|end| start..end));

    match range {
        Some(range) if range.end <= tensor.data.len() => Ok(&tensor.data[range]),
        _ => Err(Error::IndexOutOfRange(format!(
            "sample {} with {} classes exceeds the {} values of tensor {}",
            sample_index,
            class_count,
            tensor.data.len(),
            tensor.name
        ))),
    }
}
