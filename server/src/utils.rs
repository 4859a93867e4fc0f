/// Validate a latitude, returning the validation message on failure
pub fn validate_latitude(lat: f64) -> Result<(), String> {
    if lat < -90.0 {
        return Err("Ensure this value is greater than or equal to -90.".to_string());
    }
    if lat > 90.0 {
        return Err("Ensure this value is less than or equal to 90.".to_string());
    }
    Ok(())
}

/// Validate a longitude, returning the validation message on failure
pub fn validate_longitude(lon: f64) -> Result<(), String> {
    if lon < -180.0 {
        return Err("Ensure this value is greater than or equal to -180.".to_string());
    }
    if lon > 180.0 {
        return Err("Ensure this value is less than or equal to 180.".to_string());
    }
    Ok(())
}

/// Parse a finite float from a raw query value
pub fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

#[derive(Clone, Copy, PartialEq)]
enum GlobToken {
    Star,
    Any,
    Literal(char),
}

fn tokenize_glob(pattern: &str) -> Vec<GlobToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '*' => GlobToken::Star,
            '?' => GlobToken::Any,
            // a trailing backslash matches itself
            '\\' => GlobToken::Literal(chars.next().unwrap_or('\\')),
            other => GlobToken::Literal(other),
        });
    }
    tokens
}

/// Glob match with the Redis `MATCH` wildcards `*` and `?`, plus `\` escapes.
pub fn pattern_matches(pattern: &str, key: &str) -> bool {
    let pattern = tokenize_glob(pattern);
    let key: Vec<char> = key.chars().collect();

    let (mut p, mut k) = (0, 0);
    let mut star: Option<usize> = None;
    let mut star_k = 0;

    while k < key.len() {
        let token = pattern.get(p).copied();
        match token {
            Some(GlobToken::Any) => {
                p += 1;
                k += 1;
            }
            Some(GlobToken::Literal(c)) if c == key[k] => {
                p += 1;
                k += 1;
            }
            Some(GlobToken::Star) => {
                star = Some(p);
                star_k = k;
                p += 1;
            }
            _ => match star {
                // backtrack: let the last star swallow one more char
                Some(star_p) => {
                    p = star_p + 1;
                    star_k += 1;
                    k = star_k;
                }
                None => return false,
            },
        }
    }

    while pattern.get(p) == Some(&GlobToken::Star) {
        p += 1;
    }

    p == pattern.len()
}

/// Escape Redis glob metacharacters so `value` matches only itself.
pub fn escape_glob(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_latitude(0.0).is_ok());
        assert!(validate_latitude(90.0).is_ok());
        assert!(validate_latitude(-90.0).is_ok());
        assert!(validate_latitude(100.0).is_err());
        assert!(validate_longitude(180.0).is_ok());
        assert!(validate_longitude(-180.0).is_ok());
        assert_eq!(
            validate_longitude(200.0).unwrap_err(),
            "Ensure this value is less than or equal to 180."
        );
    }

    #[test]
    fn test_parse_finite() {
        assert_eq!(parse_finite(" 33.44 "), Some(33.44));
        assert_eq!(parse_finite("-94"), Some(-94.0));
        assert_eq!(parse_finite("NaN"), None);
        assert_eq!(parse_finite("inf"), None);
        assert_eq!(parse_finite("north"), None);
    }

    #[test]
    fn test_pattern_matches() {
        assert!(pattern_matches("*", "anything"));
        assert!(pattern_matches("*test5*", "test5"));
        assert!(pattern_matches("*test5*", "test55"));
        assert!(pattern_matches("*test5*", "some_test51_text"));
        assert!(!pattern_matches("*test5*", "test25"));
        assert!(pattern_matches("q_?exarkana", "q_Texarkana"));
        assert!(pattern_matches("a*b*c", "aXXbYYc"));
        assert!(!pattern_matches("a*b*c", "aXXbYY"));
        assert!(!pattern_matches("exact", "exactly"));
    }

    #[test]
    fn test_escaped_wildcards_match_literally() {
        assert!(pattern_matches("*q_a\\*b*", "lang_en_q_a*b_units_metric"));
        assert!(!pattern_matches("*q_a\\*b*", "lang_en_q_aXb_units_metric"));
        assert!(pattern_matches("q_\\?", "q_?"));
        assert!(!pattern_matches("q_\\?", "q_x"));
    }

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("Berlin,DE"), "Berlin,DE");
        assert_eq!(escape_glob("a*b?[c]\\"), "a\\*b\\?\\[c\\]\\\\");

        let raw = "we?rd*[name]";
        assert!(pattern_matches(&escape_glob(raw), raw));
        assert!(!pattern_matches(&escape_glob(raw), "weird*[name]"));
    }
}
