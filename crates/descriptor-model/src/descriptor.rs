use crate::error::DescriptorError;
use crate::timestamp::Timestamp;

/// An output record produced by a concrete descriptor implementation.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub id: String,
    pub start: Timestamp,
    pub end: Timestamp,
    pub history: Vec<Timestamp>,
    pub features: Vec<f64>,
}

impl Descriptor {
    /// Checks the invariants safety mode enforces on emission: non-empty id,
    /// start ≤ end, history length matching the inclusive frame range, and no
    /// NaN feature values.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.id.is_empty() {
            return Err(DescriptorError::Validation(
                "descriptor id is empty".to_string(),
            ));
        }
        if self.end < self.start {
            return Err(DescriptorError::Validation(format!(
                "descriptor {} has end before start",
                self.id
            )));
        }
        let expected_len = self.start.frames_between(self.end) + 1;
        if self.history.len() as u64 != expected_len {
            return Err(DescriptorError::Validation(format!(
                "descriptor {} history length {} does not match frame range {}",
                self.id,
                self.history.len(),
                expected_len
            )));
        }
        if self.features.iter().any(|f| f.is_nan()) {
            return Err(DescriptorError::Validation(format!(
                "descriptor {} contains a NaN feature",
                self.id
            )));
        }
        Ok(())
    }

    /// Appends a modality suffix to `id`, e.g. `"track_7" -> "track_7_rgb"`.
    pub fn tag_modality(&mut self, modality: &str) {
        self.id.push('_');
        self.id.push_str(modality);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(n: u64) -> Timestamp {
        Timestamp::new(n, n as i64 * 1000)
    }

    fn valid_descriptor() -> Descriptor {
        Descriptor {
            id: "x".to_string(),
            start: ts(1),
            end: ts(3),
            history: vec![ts(1), ts(2), ts(3)],
            features: vec![0.0, 1.5],
        }
    }

    #[test]
    fn valid_descriptor_passes() {
        assert!(valid_descriptor().validate().is_ok());
    }

    #[test]
    fn empty_id_is_rejected() {
        let mut d = valid_descriptor();
        d.id.clear();
        assert!(d.validate().is_err());
    }

    #[test]
    fn end_before_start_is_rejected() {
        let mut d = valid_descriptor();
        d.end = ts(0);
        assert!(d.validate().is_err());
    }

    #[test]
    fn short_history_is_rejected() {
        let mut d = valid_descriptor();
        d.history.pop();
        assert!(d.validate().is_err());
    }

    #[test]
    fn nan_feature_is_rejected() {
        let mut d = valid_descriptor();
        d.features.push(f64::NAN);
        assert!(d.validate().is_err());
    }

    #[test]
    fn modality_tag_is_appended() {
        let mut d = valid_descriptor();
        d.tag_modality("rgb");
        assert_eq!(d.id, "x_rgb");
    }
}
