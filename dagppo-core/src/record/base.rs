//! Base implementation of records for logging.
//!
//! A record is a flat map from string keys to values of a few types. Keys
//! follow the `name/phase` convention, e.g. `critic_mse/train` or
//! `ratio/test`.
use crate::error::DagPpoError;
use std::{
    collections::{hash_map::Iter, HashMap},
    convert::Into,
};

/// Represents possible types of values that can be stored in a [`Record`].
///
/// # Variants
///
/// * `Scalar(f32)` - A single floating-point value, typically used for metrics
/// * `Scalars(HashMap<String, f32>)` - A group of named scalars sharing one key
/// * `Step(usize)` - A step counter
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A single floating-point value, typically used for metrics like loss or reward.
    Scalar(f32),

    /// Scalars plotted together, like the mean and the extremes of a metric.
    Scalars(HashMap<String, f32>),

    /// A step counter. Kept as an integer, as step counts of long runs are
    /// not exactly representable in `f32`.
    Step(usize),
}

/// A container for storing key-value pairs of various data types.
///
/// # Examples
///
/// ```rust
/// use dagppo_core::record::{Record, RecordValue};
/// use std::collections::HashMap;
///
/// // Create a record with a scalar value
/// let mut record = Record::from_scalar("critic_mse/train", 0.5);
///
/// // Add a group of values
/// let ratio = HashMap::from([("mean".to_string(), 1.2), ("max".to_string(), 1.6)]);
/// record.insert("ratio", RecordValue::Scalars(ratio));
///
/// // Retrieve values
/// assert_eq!(record.get_scalar("critic_mse/train").unwrap(), 0.5);
/// assert_eq!(record.get_scalars("ratio").unwrap()["mean"], 1.2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates a record containing a single scalar value.
    ///
    /// # Arguments
    ///
    /// * `name` - The key for the scalar value
    /// * `value` - The scalar value to store
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from a slice of key-value pairs.
    ///
    /// # Arguments
    ///
    /// * `s` - A slice of tuples containing keys and values
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Inserts a key-value pair into the record.
    ///
    /// # Arguments
    ///
    /// * `k` - The key to insert
    /// * `v` - The value to insert
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns an iterator over the key-value pairs in the record.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Gets a reference to the value associated with the given key.
    ///
    /// # Arguments
    ///
    /// * `k` - The key to look up
    ///
    /// # Returns
    ///
    /// A reference to the value if the key exists, `None` otherwise
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Returns a record with every key suffixed by `/{suffix}`.
    pub fn with_key_suffix(self, suffix: &str) -> Self {
        Record(
            self.0
                .into_iter()
                .map(|(k, v)| (format!("{}/{}", k, suffix), v))
                .collect(),
        )
    }

    /// Gets a scalar value from the record.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The key does not exist
    /// - The value is not a scalar
    pub fn get_scalar(&self, k: &str) -> Result<f32, DagPpoError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(DagPpoError::RecordValueTypeError("Scalar".to_string())),
            None => Err(DagPpoError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a group of scalars from the record.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The key does not exist
    /// - The value is not a group of scalars
    pub fn get_scalars(&self, k: &str) -> Result<HashMap<String, f32>, DagPpoError> {
        match self.0.get(k) {
            Some(RecordValue::Scalars(v)) => Ok(v.clone()),
            Some(_) => Err(DagPpoError::RecordValueTypeError("Scalars".to_string())),
            None => Err(DagPpoError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a step counter from the record.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The key does not exist
    /// - The value is not a step counter
    pub fn get_step(&self, k: &str) -> Result<usize, DagPpoError> {
        match self.0.get(k) {
            Some(RecordValue::Step(v)) => Ok(*v),
            Some(_) => Err(DagPpoError::RecordValueTypeError("Step".to_string())),
            None => Err(DagPpoError::RecordKeyError(k.to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let record = Record::from_slice(&[
            ("loss", RecordValue::Scalar(0.5)),
            ("timesteps", RecordValue::Step(2000)),
        ]);

        assert_eq!(record.get_scalar("loss").unwrap(), 0.5);
        assert_eq!(record.get_step("timesteps").unwrap(), 2000);
        assert!(matches!(
            record.get_scalar("timesteps"),
            Err(DagPpoError::RecordValueTypeError(_))
        ));
        assert!(matches!(
            record.get_scalars("missing"),
            Err(DagPpoError::RecordKeyError(_))
        ));
    }

    #[test]
    fn test_step_beyond_f32_precision() {
        // 2^24 + 1 has no exact f32 representation
        let step = (1usize << 24) + 1;
        let record = Record::from_slice(&[("timesteps", RecordValue::Step(step))]);
        assert_eq!(record.get_step("timesteps").unwrap(), 16_777_217);
    }

    #[test]
    fn test_key_suffix() {
        let record = Record::from_slice(&[
            ("a", RecordValue::Scalar(2.0)),
            ("b", RecordValue::Scalar(3.0)),
        ])
        .with_key_suffix("test");

        assert_eq!(record.get_scalar("a/test").unwrap(), 2.0);
        assert_eq!(record.get_scalar("b/test").unwrap(), 3.0);
        assert!(record.get("a").is_none());
    }
}
