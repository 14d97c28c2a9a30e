//! URI patterns: literal paths and regular expressions with parameter capture.
//!
//! Every pattern is pure: matching the same URI always gives the same result
//! and never mutates the pattern. A successful match returns the captured
//! parameters directly instead of caching them for a later getter, so one
//! pattern can be shared by any number of concurrent requests.

use std::fmt;

use regex::Regex;

use crate::params::UriParams;

/// Errors raised while building a pattern.
///
/// These are configuration errors: they surface when the route table is
/// constructed and are never retried at request time.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("invalid regular expression `{pattern}`: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("pattern `{pattern}` has {captures} capture groups but {names} parameter names")]
    CaptureArityMismatch {
        pattern: String,
        captures: usize,
        names: usize,
    },
}

/// Discriminant of a [`Pattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Literal,
    RegExp,
    NamedRegExp,
}

#[derive(Debug, Clone)]
enum Inner {
    Literal(String),
    RegExp {
        source: String,
        regex: Regex,
        names: Vec<String>,
    },
    NamedRegExp {
        source: String,
        regex: Regex,
    },
}

/// A URI pattern.
///
/// - **Literal**: exact, case-sensitive string equality; yields no parameters.
/// - **RegExp**: anchored full-string match; the nth capture group is bound
///   to the nth caller-supplied name.
/// - **NamedRegExp**: anchored full-string match; each named group
///   (`(?P<name>...)`) becomes a parameter.
///
/// Capture groups that do not participate in a match produce no key at all
/// rather than an empty string.
///
/// ```
/// use switchyard_core::Pattern;
///
/// let pattern = Pattern::named_regex(r"/users/(?P<id>\d+)").unwrap();
/// let params = pattern.match_uri("/users/42").unwrap();
/// assert_eq!(params.get("id"), Some("42"));
/// assert!(pattern.match_uri("/users/42/edit").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Pattern(Inner);

impl Pattern {
    /// A pattern matching exactly `uri`.
    #[must_use]
    pub fn literal(uri: impl Into<String>) -> Self {
        Self(Inner::Literal(uri.into()))
    }

    /// A regular expression whose positional captures bind to `names`.
    ///
    /// # Errors
    ///
    /// Returns `PatternError::InvalidRegex` when `source` does not compile and
    /// `PatternError::CaptureArityMismatch` when the number of capture groups
    /// differs from the number of names.
    pub fn regex<I, S>(source: &str, names: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let regex = compile_anchored(source)?;

        // captures_len() counts the implicit whole-match group 0.
        let captures = regex.captures_len() - 1;
        if captures != names.len() {
            return Err(PatternError::CaptureArityMismatch {
                pattern: source.to_string(),
                captures,
                names: names.len(),
            });
        }

        Ok(Self(Inner::RegExp {
            source: source.to_string(),
            regex,
            names,
        }))
    }

    /// A regular expression whose named groups become parameters.
    ///
    /// # Errors
    ///
    /// Returns `PatternError::InvalidRegex` when `source` does not compile.
    pub fn named_regex(source: &str) -> Result<Self, PatternError> {
        let regex = compile_anchored(source)?;
        Ok(Self(Inner::NamedRegExp {
            source: source.to_string(),
            regex,
        }))
    }

    #[must_use]
    pub fn kind(&self) -> PatternKind {
        match &self.0 {
            Inner::Literal(_) => PatternKind::Literal,
            Inner::RegExp { .. } => PatternKind::RegExp,
            Inner::NamedRegExp { .. } => PatternKind::NamedRegExp,
        }
    }

    /// The pattern as written by the caller (without the added anchors).
    #[must_use]
    pub fn source(&self) -> &str {
        match &self.0 {
            Inner::Literal(uri) => uri,
            Inner::RegExp { source, .. } | Inner::NamedRegExp { source, .. } => source,
        }
    }

    /// Tests `uri` and returns the captured parameters on success.
    #[must_use]
    pub fn match_uri(&self, uri: &str) -> Option<UriParams> {
        match &self.0 {
            Inner::Literal(literal) => (literal == uri).then(UriParams::new),
            Inner::RegExp { regex, names, .. } => {
                let captures = regex.captures(uri)?;
                Some(
                    names
                        .iter()
                        .enumerate()
                        .filter_map(|(idx, name)| {
                            captures
                                .get(idx + 1)
                                .map(|m| (name.as_str(), m.as_str()))
                        })
                        .collect(),
                )
            }
            Inner::NamedRegExp { regex, .. } => {
                let captures = regex.captures(uri)?;
                Some(
                    regex
                        .capture_names()
                        .flatten()
                        .filter_map(|name| captures.name(name).map(|m| (name, m.as_str())))
                        .collect(),
                )
            }
        }
    }

    #[must_use]
    pub fn matches(&self, uri: &str) -> bool {
        match &self.0 {
            Inner::Literal(literal) => literal == uri,
            Inner::RegExp { regex, .. } | Inner::NamedRegExp { regex, .. } => {
                regex.is_match(uri)
            }
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source())
    }
}

/// Validates `source` as written, then compiles it wrapped in `^(?:...)$`.
///
/// Validating first keeps sources such as `a)|(b` from becoming valid only
/// because of the wrapper.
fn compile_anchored(source: &str) -> Result<Regex, PatternError> {
    let invalid = |source_err| PatternError::InvalidRegex {
        pattern: source.to_string(),
        source: source_err,
    };
    Regex::new(source).map_err(invalid)?;
    Regex::new(&format!("^(?:{source})$")).map_err(invalid)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn literal_matches_exactly() {
        let pattern = Pattern::literal("/domain/test");
        assert_eq!(pattern.match_uri("/domain/test"), Some(UriParams::new()));
        assert!(pattern.match_uri("/domain/test/").is_none());
        assert!(pattern.match_uri("/Domain/test").is_none());
        assert!(pattern.match_uri("/domain").is_none());
        assert_eq!(pattern.kind(), PatternKind::Literal);
    }

    #[test]
    fn regex_binds_captures_to_names_in_order() {
        let pattern =
            Pattern::regex(r"/domain/(\w+)/(\d+)", ["entity", "id"]).unwrap();
        let params = pattern.match_uri("/domain/user/17").unwrap();
        assert_eq!(params.get("entity"), Some("user"));
        assert_eq!(params.get("id"), Some("17"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn regex_is_anchored() {
        let pattern = Pattern::regex(r"/a/(\d+)", ["id"]).unwrap();
        assert!(pattern.matches("/a/1"));
        assert!(!pattern.matches("/x/a/1"));
        assert!(!pattern.matches("/a/1/b"));
    }

    #[test]
    fn already_anchored_regex_still_matches() {
        let pattern = Pattern::regex(r"^/domain/test_request_param/unit/(tested)$", ["unit"])
            .unwrap();
        let params = pattern.match_uri("/domain/test_request_param/unit/tested").unwrap();
        assert_eq!(params.get("unit"), Some("tested"));
    }

    #[test]
    fn regex_arity_mismatch_is_a_configuration_error() {
        let err = Pattern::regex(r"/a/(\d+)/(\d+)", ["id"]).unwrap_err();
        assert!(matches!(
            err,
            PatternError::CaptureArityMismatch { captures: 2, names: 1, .. }
        ));

        let err = Pattern::regex(r"/a", ["id"]).unwrap_err();
        assert!(matches!(
            err,
            PatternError::CaptureArityMismatch { captures: 0, names: 1, .. }
        ));
    }

    #[test]
    fn malformed_regex_is_rejected() {
        assert!(matches!(
            Pattern::named_regex(r"/a/(?P<id>\d+"),
            Err(PatternError::InvalidRegex { .. })
        ));
        assert!(matches!(
            Pattern::regex("a)|(b", Vec::<String>::new()),
            Err(PatternError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn regex_optional_group_absent_when_unmatched() {
        let pattern = Pattern::regex(r"/files(/(\w+))?", ["slash", "name"]).unwrap();
        let params = pattern.match_uri("/files").unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn named_regex_captures_named_groups_only() {
        let pattern =
            Pattern::named_regex(r"/(?P<domain>\w+)/(\w+)/(?P<id>\d+)").unwrap();
        let params = pattern.match_uri("/shop/orders/5").unwrap();
        assert_eq!(params.get("domain"), Some("shop"));
        assert_eq!(params.get("id"), Some("5"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn named_regex_optional_group_yields_absent_key() {
        let pattern = Pattern::named_regex(r"/items(?:/(?P<id>\d+))?").unwrap();

        let params = pattern.match_uri("/items").unwrap();
        assert!(!params.contains_key("id"));

        let params = pattern.match_uri("/items/3").unwrap();
        assert_eq!(params.get("id"), Some("3"));
    }

    #[test]
    fn matching_does_not_leak_between_calls() {
        let pattern = Pattern::named_regex(r"/items/(?P<id>\d+)").unwrap();
        assert!(pattern.match_uri("/items/1").is_some());
        assert!(pattern.match_uri("/other").is_none());
        assert_eq!(
            pattern.match_uri("/items/2").unwrap().get("id"),
            Some("2")
        );
    }

    #[test]
    fn display_shows_source_without_anchors() {
        let pattern = Pattern::named_regex(r"/x/(?P<id>\d+)").unwrap();
        assert_eq!(pattern.to_string(), r"/x/(?P<id>\d+)");
        assert_eq!(pattern.kind(), PatternKind::NamedRegExp);
    }

    proptest! {
        #[test]
        fn literal_matches_iff_equal(literal in "[ -~]{0,12}", uri in "[ -~]{0,12}") {
            let pattern = Pattern::literal(literal.clone());
            let result = pattern.match_uri(&uri);
            prop_assert_eq!(result.is_some(), literal == uri);
            if let Some(params) = result {
                prop_assert!(params.is_empty());
            }
            prop_assert!(pattern.match_uri(&literal).is_some());
        }
    }
}
