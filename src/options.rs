use serde_derive::{Deserialize, Serialize};

/// Caller-controlled decode behavior.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Drop objects that fail to decode instead of aborting the whole list.
    pub skip_failed_objects: bool,
    /// Inputs longer than this are rejected before parsing.
    pub max_input_len: Option<usize>,
}

impl DecodeOptions {
    pub(crate) fn check_input_len(&self, len: usize) -> crate::Result<()> {
        if let Some(max) = self.max_input_len {
            crate::ensure_invariant!(len <= max, "input is {len} bytes, limit is {max}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let options: DecodeOptions = serde_json::from_str(r#"{"max_input_len": 4096}"#).unwrap();
        assert_eq!(options, DecodeOptions { skip_failed_objects: false, max_input_len: Some(4096) });
        let options: DecodeOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, DecodeOptions::default());
    }

    #[test]
    fn input_cap() {
        let options = DecodeOptions { max_input_len: Some(16), ..Default::default() };
        assert!(options.check_input_len(16).is_ok());
        assert_eq!(options.check_input_len(17).unwrap_err().kind(), crate::ErrorKind::Invariant);
        assert!(DecodeOptions::default().check_input_len(usize::MAX).is_ok());
    }
}
