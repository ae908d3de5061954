use crate::Error;
use crate::Result;

/// Validate a node path.
///
/// A valid path is absolute, has no trailing slash (except the root), no
/// empty, `.` or `..` segments, and no null or control characters.
pub fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::invalid_argument("path must not be empty"));
    }
    if !path.starts_with('/') {
        return Err(Error::invalid_argument(format!("path must start with / character: {path}")));
    }
    if path.len() == 1 {
        return Ok(());
    }
    if path.ends_with('/') {
        return Err(Error::invalid_argument(format!("path must not end with / character: {path}")));
    }

    for segment in path[1..].split('/') {
        match segment {
            "" => return Err(Error::invalid_argument(format!("empty node name specified in {path}"))),
            "." | ".." => {
                return Err(Error::invalid_argument(format!(
                    "relative paths not allowed in {path}"
                )))
            }
            _ => {}
        }
    }

    if let Some(c) = path.chars().find(|c| is_forbidden(*c)) {
        return Err(Error::invalid_argument(format!(
            "invalid character {:?} in {path}",
            c
        )));
    }
    Ok(())
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\u{0000}'..='\u{001f}'
        | '\u{007f}'..='\u{009f}'
        | '\u{e000}'..='\u{f8ff}'
        | '\u{fff0}'..='\u{ffff}')
}
