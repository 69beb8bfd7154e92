//! Data objects passed between algorithms.
//!
//! A [`DataObject`] is a cheap handle: the produced content sits behind an
//! `Arc`, so every consumer of a port can hold a copy without duplicating
//! the payload. The engine itself only looks at the attached information
//! record and the modification stamp.

use crate::pipeline::error::DataError;
use crate::pipeline::info::{keys, InfoRecord};
use crate::pipeline::stamp::Stamp;
use crate::types::Extent;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Coarse type of a payload, used for connection and input type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    /// Accepts or produces anything; concrete kinds are checked when data
    /// actually arrives.
    Any,
    Scalar,
    Tuple,
    Image,
    Opaque,
}

impl DataKind {
    /// Whether an input constrained to `self` accepts `produced`.
    pub fn accepts(self, produced: DataKind) -> bool {
        match (self, produced) {
            (DataKind::Any, _) | (_, DataKind::Any) => true,
            (DataKind::Tuple, DataKind::Scalar) => true,
            (want, got) => want == got,
        }
    }
}

/// Dense x-fastest grid of samples over an extent.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    extent: Extent,
    values: Vec<f64>,
}

impl ImageData {
    pub fn new(extent: Extent, values: Vec<f64>) -> Result<Self, DataError> {
        let expected = extent.num_points();
        if values.len() != expected {
            return Err(DataError::LengthMismatch {
                extent,
                expected,
                found: values.len(),
            });
        }
        Ok(Self { extent, values })
    }

    /// Sample `f(i, j, k)` at every point of `extent`.
    pub fn from_fn(extent: Extent, mut f: impl FnMut(i64, i64, i64) -> f64) -> Self {
        let values = extent.points().map(|(i, j, k)| f(i, j, k)).collect();
        Self { extent, values }
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn value_at(&self, i: i64, j: i64, k: i64) -> Option<f64> {
        self.extent.index_of(i, j, k).map(|idx| self.values[idx])
    }

    /// Same samples restricted to `extent ∩ self.extent()`.
    pub fn crop(&self, extent: &Extent) -> ImageData {
        let target = self.extent.intersect(extent);
        let values = target
            .points()
            .filter_map(|(i, j, k)| self.value_at(i, j, k))
            .collect();
        ImageData {
            extent: target,
            values,
        }
    }

    /// Place every piece into the union of their extents. Points no piece
    /// covers are zero; later pieces win where pieces overlap.
    pub fn assemble<'a>(pieces: impl IntoIterator<Item = &'a ImageData>) -> ImageData {
        let pieces: Vec<&ImageData> = pieces.into_iter().collect();
        let extent = pieces
            .iter()
            .fold(Extent::EMPTY, |acc, p| acc.union(&p.extent));
        let mut values = vec![0.0; extent.num_points()];
        for piece in pieces {
            for ((i, j, k), v) in piece.extent.points().zip(piece.values.iter()) {
                if let Some(idx) = extent.index_of(i, j, k) {
                    values[idx] = *v;
                }
            }
        }
        ImageData { extent, values }
    }
}

/// Produced content.
#[derive(Clone, Default)]
pub enum Payload {
    #[default]
    Empty,
    Scalar(f64),
    Tuple(Vec<f64>),
    Image(ImageData),
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl Payload {
    /// `None` for [`Payload::Empty`], which fits every input.
    pub fn kind(&self) -> Option<DataKind> {
        match self {
            Payload::Empty => None,
            Payload::Scalar(_) => Some(DataKind::Scalar),
            Payload::Tuple(_) => Some(DataKind::Tuple),
            Payload::Image(_) => Some(DataKind::Image),
            Payload::Opaque(_) => Some(DataKind::Opaque),
        }
    }

    /// Numeric samples of scalar, tuple and image payloads.
    pub fn as_values(&self) -> Option<&[f64]> {
        match self {
            Payload::Scalar(v) => Some(std::slice::from_ref(v)),
            Payload::Tuple(v) => Some(v),
            Payload::Image(img) => Some(img.values()),
            Payload::Empty | Payload::Opaque(_) => None,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Empty => write!(f, "Empty"),
            Payload::Scalar(v) => write!(f, "Scalar({})", v),
            Payload::Tuple(v) => f.debug_tuple("Tuple").field(v).finish(),
            Payload::Image(img) => write!(f, "Image({} points over {})", img.values.len(), img.extent),
            Payload::Opaque(_) => write!(f, "Opaque(..)"),
        }
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Payload::Empty, Payload::Empty) => true,
            (Payload::Scalar(a), Payload::Scalar(b)) => a == b,
            (Payload::Tuple(a), Payload::Tuple(b)) => a == b,
            (Payload::Image(a), Payload::Image(b)) => a == b,
            (Payload::Opaque(a), Payload::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Handle to produced content plus its information record.
#[derive(Debug, Clone)]
pub struct DataObject {
    payload: Arc<Payload>,
    info: InfoRecord,
    stamp: Stamp,
}

impl DataObject {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload: Arc::new(payload),
            info: InfoRecord::new(),
            stamp: Stamp::next(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Payload::Empty)
    }

    pub fn scalar(value: f64) -> Self {
        Self::new(Payload::Scalar(value))
    }

    pub fn tuple(values: impl Into<Vec<f64>>) -> Self {
        Self::new(Payload::Tuple(values.into()))
    }

    pub fn image(image: ImageData) -> Self {
        let extent = image.extent();
        let mut obj = Self::new(Payload::Image(image));
        obj.info.set(&keys::DATA_EXTENT, extent);
        obj
    }

    pub fn opaque(value: Arc<dyn Any + Send + Sync>) -> Self {
        Self::new(Payload::Opaque(value))
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Whether two objects share the same payload allocation.
    pub fn shares_payload(&self, other: &DataObject) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
    }

    pub fn kind(&self) -> Option<DataKind> {
        self.payload.kind()
    }

    pub fn is_empty(&self) -> bool {
        matches!(*self.payload, Payload::Empty)
    }

    pub fn information(&self) -> &InfoRecord {
        &self.info
    }

    pub fn information_mut(&mut self) -> &mut InfoRecord {
        &mut self.info
    }

    pub fn modification_stamp(&self) -> Stamp {
        self.stamp
    }

    /// Mark the content as changed.
    pub fn modified(&mut self) {
        self.stamp = Stamp::next();
    }

    pub(crate) fn set_modification_stamp(&mut self, stamp: Stamp) {
        self.stamp = stamp;
    }

    /// Share `other`'s payload and copy its information record.
    pub fn shallow_copy(&mut self, other: &DataObject) {
        self.payload = Arc::clone(&other.payload);
        self.info = other.info.clone();
        self.modified();
    }

    /// Drop the content and reset the information record.
    pub fn initialize(&mut self) {
        self.payload = Arc::new(Payload::Empty);
        self.info.clear();
        self.modified();
    }

    /// Restrict an image payload to `extent`. Other payloads are returned
    /// unchanged.
    pub fn crop(&self, extent: &Extent) -> DataObject {
        match &*self.payload {
            Payload::Image(img) if img.extent() != *extent => {
                let cropped = img.crop(extent);
                let mut info = self.info.clone();
                info.set(&keys::DATA_EXTENT, cropped.extent());
                DataObject {
                    payload: Arc::new(Payload::Image(cropped)),
                    info,
                    stamp: Stamp::next(),
                }
            }
            _ => self.clone(),
        }
    }

    /// Combine streamed pieces into one object.
    ///
    /// Image pieces are placed into the union of their extents; scalar and
    /// tuple pieces are concatenated in order. Empty pieces are skipped.
    pub fn concatenate(pieces: &[DataObject]) -> Result<DataObject, DataError> {
        let filled: Vec<&DataObject> = pieces.iter().filter(|p| !p.is_empty()).collect();
        let Some(first) = filled.first() else {
            return Ok(DataObject::empty());
        };

        let mut combined = if filled.iter().all(|p| p.kind() == Some(DataKind::Image)) {
            let images = filled.iter().filter_map(|p| match p.payload() {
                Payload::Image(img) => Some(img),
                _ => None,
            });
            DataObject::image(ImageData::assemble(images))
        } else if filled
            .iter()
            .all(|p| matches!(p.kind(), Some(DataKind::Scalar | DataKind::Tuple)))
        {
            let values: Vec<f64> = filled
                .iter()
                .filter_map(|p| p.payload().as_values())
                .flat_map(|v| v.iter().copied())
                .collect();
            DataObject::tuple(values)
        } else if filled.len() == 1 {
            (*first).clone()
        } else {
            let kinds: Vec<String> = filled.iter().map(|p| format!("{:?}", p.payload())).collect();
            return Err(DataError::IncompatiblePieces(kinds.join(", ")));
        };

        if let Ok(Some(t)) = first.information().lookup(&keys::DATA_TIME_STEP) {
            combined.info.set(&keys::DATA_TIME_STEP, t);
        }
        combined.info.set(&keys::DATA_PIECE, 0);
        combined.info.set(&keys::DATA_NUMBER_OF_PIECES, 1);
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_acceptance() {
        assert!(DataKind::Any.accepts(DataKind::Image));
        assert!(DataKind::Image.accepts(DataKind::Any));
        assert!(DataKind::Tuple.accepts(DataKind::Scalar));
        assert!(!DataKind::Scalar.accepts(DataKind::Tuple));
        assert!(!DataKind::Image.accepts(DataKind::Tuple));
        assert!(DataKind::Opaque.accepts(DataKind::Opaque));
    }

    #[test]
    fn test_image_length_checked() {
        let extent = Extent::new(0, 2, 0, 1, 0, 0);
        assert!(ImageData::new(extent, vec![0.0; 6]).is_ok());
        assert!(matches!(
            ImageData::new(extent, vec![0.0; 5]),
            Err(DataError::LengthMismatch { expected: 6, found: 5, .. })
        ));
    }

    #[test]
    fn test_image_crop() {
        let img = ImageData::from_fn(Extent::new(0, 4, 0, 1, 0, 0), |i, j, _| (i + 10 * j) as f64);
        let cropped = img.crop(&Extent::new(1, 2, 1, 1, 0, 0));
        assert_eq!(cropped.values(), &[11.0, 12.0]);
        assert_eq!(cropped.value_at(2, 1, 0), Some(12.0));
    }

    #[test]
    fn test_shallow_copy_shares_payload() {
        let src = DataObject::tuple(vec![1.0, 2.0]);
        let mut dst = DataObject::empty();
        dst.shallow_copy(&src);
        assert!(dst.shares_payload(&src));
        assert!(dst.modification_stamp() > src.modification_stamp());

        dst.initialize();
        assert!(dst.is_empty());
        assert!(dst.information().is_empty());
    }

    #[test]
    fn test_concatenate_images() {
        let whole = Extent::new(0, 9, 0, 0, 0, 0);
        let full = ImageData::from_fn(whole, |i, _, _| i as f64);
        let pieces: Vec<DataObject> = (0..5)
            .map(|p| DataObject::image(full.crop(&whole.split(p, 5))))
            .collect();
        let combined = DataObject::concatenate(&pieces).unwrap();
        assert_eq!(combined.payload(), &Payload::Image(full));
        assert_eq!(combined.information().get(&keys::DATA_EXTENT).unwrap(), whole);
    }

    #[test]
    fn test_concatenate_tuples_in_order() {
        let pieces = vec![
            DataObject::scalar(1.0),
            DataObject::empty(),
            DataObject::tuple(vec![2.0, 3.0]),
        ];
        let combined = DataObject::concatenate(&pieces).unwrap();
        assert_eq!(combined.payload(), &Payload::Tuple(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_concatenate_rejects_mixed_kinds() {
        let img = ImageData::from_fn(Extent::new(0, 1, 0, 0, 0, 0), |_, _, _| 0.0);
        let pieces = vec![DataObject::scalar(1.0), DataObject::image(img)];
        assert!(matches!(
            DataObject::concatenate(&pieces),
            Err(DataError::IncompatiblePieces(_))
        ));
    }
}
