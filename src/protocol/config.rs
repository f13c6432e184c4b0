//! Codec configuration

use super::{DEFAULT_CHUNK_SIZE, Error, MAX_CHUNK_SIZE, Result};

/// Environment variable overriding the chunk size
pub const CHUNK_SIZE_ENV: &str = "PRODWIRE_CHUNK_SIZE";

/// Chunked codec configuration options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Largest segment, in bytes, read from or written to a wrapper at once.
    pub chunk_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl CodecConfig {
    /// Replace the chunk size.
    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Check that the chunk size fits the host's string limit.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(Error::InvalidChunkSize {
                size: self.chunk_size,
                max: MAX_CHUNK_SIZE,
            });
        }
        Ok(())
    }

    /// Build from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup(CHUNK_SIZE_ENV) {
            config.chunk_size = raw.trim().parse().map_err(|err| Error::Config {
                key: CHUNK_SIZE_ENV,
                reason: format!("{raw:?} is not a byte count: {err}"),
            })?;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = CodecConfig::default();
        assert_eq!(config.chunk_size, 3 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_sizes() {
        let zero = CodecConfig::default().with_chunk_size(0);
        assert!(matches!(
            zero.validate(),
            Err(Error::InvalidChunkSize { size: 0, .. })
        ));

        let huge = CodecConfig::default().with_chunk_size(MAX_CHUNK_SIZE + 1);
        assert!(huge.validate().is_err());
    }

    #[test]
    fn test_lookup_override() {
        let config = CodecConfig::from_lookup(|_| Some(" 4096 ".to_owned())).unwrap();
        assert_eq!(config.chunk_size, 4096);

        let missing = CodecConfig::from_lookup(|_| None).unwrap();
        assert_eq!(missing, CodecConfig::default());
    }

    #[test]
    fn test_lookup_rejects_garbage() {
        let err = CodecConfig::from_lookup(|_| Some("lots".to_owned())).unwrap_err();
        assert!(matches!(err, Error::Config { key: CHUNK_SIZE_ENV, .. }));
    }
}
