pub type SpriteMixResult<T> = Result<T, SpriteMixError>;

#[derive(thiserror::Error, Debug)]
pub enum SpriteMixError {
    #[error("catalog fetch error: {0}")]
    CatalogFetch(String),

    #[error("catalog format error: {0}")]
    CatalogFormat(String),

    #[error("catalog empty: {0}")]
    CatalogEmpty(String),

    #[error("image load error: {0}")]
    ImageLoad(String),

    #[error("export encoding error: {0}")]
    ExportEncoding(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SpriteMixError {
    pub fn catalog_fetch(msg: impl Into<String>) -> Self {
        Self::CatalogFetch(msg.into())
    }

    pub fn catalog_format(msg: impl Into<String>) -> Self {
        Self::CatalogFormat(msg.into())
    }

    pub fn catalog_empty(msg: impl Into<String>) -> Self {
        Self::CatalogEmpty(msg.into())
    }

    pub fn image_load(msg: impl Into<String>) -> Self {
        Self::ImageLoad(msg.into())
    }

    pub fn export_encoding(msg: impl Into<String>) -> Self {
        Self::ExportEncoding(msg.into())
    }

    pub fn invalid_identifier(msg: impl Into<String>) -> Self {
        Self::InvalidIdentifier(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            SpriteMixError::catalog_fetch("x")
                .to_string()
                .contains("catalog fetch error:")
        );
        assert!(
            SpriteMixError::catalog_format("x")
                .to_string()
                .contains("catalog format error:")
        );
        assert!(
            SpriteMixError::image_load("x")
                .to_string()
                .contains("image load error:")
        );
        assert!(
            SpriteMixError::export_encoding("x")
                .to_string()
                .contains("export encoding error:")
        );
        assert!(
            SpriteMixError::invalid_identifier("x")
                .to_string()
                .contains("invalid identifier:")
        );
        assert!(
            SpriteMixError::validation("x")
                .to_string()
                .contains("validation error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = SpriteMixError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
