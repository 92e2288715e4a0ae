use std::fmt;
use std::path::Path;

/// Document formats understood by the input and output layers.
///
/// JSON is always available; YAML and TOML follow the cargo features of
/// the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    #[default]
    Json,
    #[cfg(feature = "yaml")]
    Yaml,
    #[cfg(feature = "toml")]
    Toml,
}

impl DocumentFormat {
    /// Every format compiled into this build, JSON first.
    pub fn available_formats() -> Vec<DocumentFormat> {
        vec![
            DocumentFormat::Json,
            #[cfg(feature = "yaml")]
            DocumentFormat::Yaml,
            #[cfg(feature = "toml")]
            DocumentFormat::Toml,
        ]
    }

    /// Format named by a file extension, if this build supports it.
    pub fn from_extension(path: &Path) -> Option<DocumentFormat> {
        let extension = path.extension()?.to_string_lossy().to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(DocumentFormat::Json),
            #[cfg(feature = "yaml")]
            "yaml" | "yml" => Some(DocumentFormat::Yaml),
            #[cfg(feature = "toml")]
            "toml" => Some(DocumentFormat::Toml),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Json => write!(f, "json"),
            #[cfg(feature = "yaml")]
            DocumentFormat::Yaml => write!(f, "yaml"),
            #[cfg(feature = "toml")]
            DocumentFormat::Toml => write!(f, "toml"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_is_the_default_and_first() {
        assert_eq!(DocumentFormat::default(), DocumentFormat::Json);
        assert_eq!(DocumentFormat::available_formats()[0], DocumentFormat::Json);
    }

    #[test]
    fn extensions_map_to_formats() {
        assert_eq!(
            DocumentFormat::from_extension(Path::new("figure.JSON")),
            Some(DocumentFormat::Json)
        );
        assert_eq!(DocumentFormat::from_extension(Path::new("figure")), None);
        assert_eq!(DocumentFormat::from_extension(Path::new("figure.txt")), None);
    }
}
