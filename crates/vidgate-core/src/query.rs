//! Convenience builder for device URL query strings.
//!
//! Vendor URL grammars are a fixed leading parameter followed by optional
//! `&key=value` pairs. Values are written verbatim: the devices expect
//! tokens such as `704x480` or `MJPEG` without percent-encoding.

use std::fmt::{self, Display};

/// Builder for assembling query parameter pairs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(&'static str, String)>,
}

impl QueryParams {
    /// Create a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Append a required key/value pair.
    pub fn push<T>(&mut self, key: &'static str, value: T)
    where
        T: Display,
    {
        self.pairs.push((key, value.to_string()));
    }

    /// Append a key/value pair when the value is present.
    pub fn push_opt<T>(&mut self, key: &'static str, value: Option<T>)
    where
        T: Display,
    {
        if let Some(value) = value {
            self.push(key, value);
        }
    }

    /// Append using a mapping function when the value is present and not blank.
    pub fn push_opt_with<F>(&mut self, key: &'static str, value: Option<&str>, map: F)
    where
        F: FnOnce(&str) -> String,
    {
        if let Some(value) = non_blank(value) {
            self.pairs.push((key, map(value)));
        }
    }

    /// Append a key/value pair when the value is present and not blank.
    pub fn push_non_blank(&mut self, key: &'static str, value: Option<&str>) {
        self.push_opt(key, non_blank(value));
    }

    /// Return the collected key/value pairs.
    #[must_use]
    pub fn into_pairs(self) -> Vec<(&'static str, String)> {
        self.pairs
    }

    /// Returns true if no parameters have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (key, value)) in self.pairs.iter().enumerate() {
            if index > 0 {
                f.write_str("&")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// Treat blank strings as absent.
#[must_use]
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_opt_skips_none() {
        let mut params = QueryParams::new();
        params.push_opt("fps", Option::<u32>::None);
        assert!(params.is_empty());
    }

    #[test]
    fn push_non_blank_skips_blank() {
        let mut params = QueryParams::new();
        params.push_non_blank("videocodec", Some("   "));
        params.push_non_blank("squarepixel", None);
        assert!(params.is_empty());
    }

    #[test]
    fn push_opt_with_applies_mapper() {
        let mut params = QueryParams::new();
        params.push_opt_with("resolution", Some("704x480"), |_| "4CIF".to_string());
        assert_eq!(
            params.into_pairs(),
            vec![("resolution", "4CIF".to_string())]
        );
    }

    #[test]
    fn renders_pairs_in_order() {
        let mut params = QueryParams::new();
        params.push("camera", 3);
        params.push_non_blank("fps", Some("15"));
        params.push_non_blank("videocodec", Some("h264"));
        assert_eq!(params.to_string(), "camera=3&fps=15&videocodec=h264");
    }
}
