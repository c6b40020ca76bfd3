use std::path::Path;

use unic_langid::LanguageIdentifier;

/// Validate file path exists and is a regular file
pub fn validate_file_path(path: &str) -> Result<(), String> {
    let path_obj = Path::new(path);

    if !path_obj.exists() {
        return Err(format!("File does not exist: {}", path));
    }

    if !path_obj.is_file() {
        return Err(format!("Path is not a file: {}", path));
    }

    Ok(())
}

/// Validate language code format using unic-langid.
///
/// OSM language suffixes are not always BCP 47, so callers treat a failure
/// as a warning.
pub fn validate_language_code(lang: &str) -> Result<(), String> {
    if lang.is_empty() {
        return Err("Language code cannot be empty".to_string());
    }
    if lang.contains(':') || lang.chars().any(char::is_whitespace) {
        return Err(format!(
            "Invalid language code: {}. It becomes part of a tag key and cannot contain ':' or spaces",
            lang
        ));
    }

    match lang.parse::<LanguageIdentifier>() {
        Ok(_) => Ok(()),
        Err(_) => Err(format!(
            "Invalid language code format: {}. Expected valid BCP 47 language identifier",
            lang
        )),
    }
}
