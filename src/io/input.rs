use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use super::DocumentFormat;

/// Parse a document in `format` into a plain tree.
pub fn parse_document_str(contents: &str, format: DocumentFormat) -> Result<Value> {
    match format {
        DocumentFormat::Json => {
            serde_json::from_str::<Value>(contents).context("failed to parse JSON document")
        }
        #[cfg(feature = "yaml")]
        DocumentFormat::Yaml => {
            serde_yaml::from_str::<Value>(contents).context("failed to parse YAML document")
        }
        #[cfg(feature = "toml")]
        DocumentFormat::Toml => toml::from_str::<toml::Table>(contents)
            .context("failed to parse TOML document")
            .and_then(|value| {
                serde_json::to_value(value).context("failed to convert TOML to JSON")
            }),
    }
}

/// Parse with `preferred` first, then every other available format.
///
/// Returns the tree and the format that accepted it. The error reports the
/// failure of the preferred format.
pub fn parse_document_any(
    contents: &str,
    preferred: DocumentFormat,
) -> Result<(Value, DocumentFormat)> {
    let primary = match parse_document_str(contents, preferred) {
        Ok(value) => return Ok((value, preferred)),
        Err(err) => err,
    };
    for candidate in DocumentFormat::available_formats() {
        if candidate == preferred {
            continue;
        }
        if let Ok(value) = parse_document_str(contents, candidate) {
            return Ok((value, candidate));
        }
    }
    let tried: Vec<String> = DocumentFormat::available_formats()
        .iter()
        .map(ToString::to_string)
        .collect();
    Err(anyhow!(
        "tried {} (first error: {primary:#})",
        tried.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_json_documents() {
        let parsed = parse_document_str(r#"{"layout": {"width": 600}}"#, DocumentFormat::Json)
            .unwrap();
        assert_eq!(parsed["layout"]["width"], json!(600));
    }

    #[test]
    fn json_keeps_key_order() {
        let parsed = parse_document_str(r#"{"b": 1, "a": 2}"#, DocumentFormat::Json).unwrap();
        let keys: Vec<&String> = parsed.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn reports_tried_formats() {
        let err = parse_document_any("{not json", DocumentFormat::Json).unwrap_err();
        assert!(err.to_string().contains("json"));
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn falls_back_to_yaml() {
        let (parsed, format) =
            parse_document_any("layout:\n  width: 600", DocumentFormat::Json).unwrap();
        assert_eq!(format, DocumentFormat::Yaml);
        assert_eq!(parsed["layout"]["width"], json!(600));
    }

    #[cfg(feature = "toml")]
    #[test]
    fn parse_toml_documents() {
        let raw = "[layout]\nwidth = 600";
        let parsed = parse_document_str(raw, DocumentFormat::Toml).unwrap();
        assert_eq!(parsed["layout"]["width"], json!(600));
    }
}
