//! Stream URI type with a validated scheme and a cleaned target.

use crate::UriError;

/// Separator between scheme and target.
pub const SCHEME_SEPARATOR: &str = "://";

/// Characters trimmed from both ends of a target.
const TRIMMED: &[char] = &['/', '\\'];

/// Returns the scheme of a stream URI.
///
/// Splits on the first `://`. Returns `None` for plain paths. An input such
/// as `"://foo"` yields `Some("")`; an empty scheme is never valid, but it
/// is still a URI rather than a path.
///
/// ```rust
/// assert_eq!(streamfs_uri::scheme("local://example.txt"), Some("local"));
/// assert_eq!(streamfs_uri::scheme("/var/www/example.txt"), None);
/// ```
pub fn scheme(uri: &str) -> Option<&str> {
    uri.split_once(SCHEME_SEPARATOR).map(|(scheme, _)| scheme)
}

/// Returns the target of a stream URI with leading and trailing separators
/// trimmed.
///
/// `"scheme://"` has the empty target, which denotes the wrapper root.
///
/// ```rust
/// assert_eq!(
///     streamfs_uri::target("local://foobar/example.txt/"),
///     Some("foobar/example.txt")
/// );
/// assert_eq!(streamfs_uri::target("local://"), Some(""));
/// assert_eq!(streamfs_uri::target("foobar/example.txt"), None);
/// ```
pub fn target(uri: &str) -> Option<&str> {
    uri.split_once(SCHEME_SEPARATOR)
        .map(|(_, target)| target.trim_matches(TRIMMED))
}

/// Collapses runs of separators (`/` or `\`) into a single `/` and strips
/// separators at both ends.
pub fn clean_target(target: &str) -> String {
    target
        .split(TRIMMED)
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Assembles `scheme://target`.
pub fn join(scheme: &str, target: &str) -> String {
    format!("{}{}{}", scheme, SCHEME_SEPARATOR, target)
}

/// Parent of a target. `""` when the target has no parent component.
pub fn parent_target(target: &str) -> &str {
    let target = target.trim_matches(TRIMMED);
    match target.rsplit_once('/') {
        Some((parent, _)) => parent.trim_end_matches('/'),
        None => "",
    }
}

/// Last component of a target.
pub fn file_name(target: &str) -> &str {
    let target = target.trim_matches(TRIMMED);
    match target.rsplit_once('/') {
        Some((_, name)) => name,
        None => target,
    }
}

/// Returns `scheme://parent-target` for a stream URI, or `None` for a plain
/// path.
///
/// ```rust
/// assert_eq!(streamfs_uri::dirname("test://a/b/c.txt").as_deref(), Some("test://a/b"));
/// assert_eq!(streamfs_uri::dirname("test://c.txt").as_deref(), Some("test://"));
/// ```
pub fn dirname(uri: &str) -> Option<String> {
    let scheme = scheme(uri)?;
    let target = target(uri)?;
    Some(join(scheme, parent_target(target)))
}

/// Checks scheme syntax: non-empty, ASCII alphanumerics plus `+`, `-`, `.`.
pub fn validate_scheme(scheme: &str) -> Result<(), UriError> {
    if scheme.is_empty() {
        return Err(UriError::EmptyScheme {
            input: join(scheme, ""),
        });
    }

    if let Some(character) = scheme
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')))
    {
        return Err(UriError::InvalidScheme {
            scheme: scheme.to_string(),
            character,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_splits_on_first_separator() {
        assert_eq!(
            scheme("test://example/path1/path2/hello_world.txt"),
            Some("test")
        );
        assert_eq!(scheme("a://b://c"), Some("a"));
        assert_eq!(scheme("://target"), Some(""));
        assert_eq!(scheme("plain/path"), None);
        assert_eq!(scheme("c:\\windows"), None);
    }

    #[test]
    fn target_trims_separators() {
        assert_eq!(
            target("test://example/path1/path2/hello_world.txt"),
            Some("example/path1/path2/hello_world.txt")
        );
        assert_eq!(target("test:///a/b/"), Some("a/b"));
        assert_eq!(target("test://\\a\\"), Some("a"));
        assert_eq!(target("a://b://c"), Some("b://c"));
    }

    #[test]
    fn empty_target_is_not_a_missing_target() {
        assert_eq!(target("test://"), Some(""));
        assert_eq!(target("test:////"), Some(""));
        assert_eq!(target("test"), None);
    }

    #[test]
    fn clean_target_collapses_runs() {
        assert_eq!(clean_target("//a///b//c//"), "a/b/c");
        assert_eq!(clean_target(""), "");
        assert_eq!(clean_target("///"), "");
        assert_eq!(clean_target(&clean_target("a//b")), clean_target("a//b"));
    }

    #[test]
    fn clean_target_treats_backslash_as_separator() {
        assert_eq!(clean_target("a\\\\b//c"), "a/b/c");
        assert_eq!(clean_target("\\a\\/b\\"), "a/b");
        let once = clean_target("x\\//y");
        assert_eq!(clean_target(&once), once);
    }

    #[test]
    fn scheme_and_target_reassemble() {
        for input in ["test://a/b", "test:///a//b/", "x+y.z-1://", "s://\\w"] {
            let rebuilt = join(scheme(input).unwrap(), target(input).unwrap());
            let clean = |uri: &str| {
                join(
                    scheme(uri).unwrap(),
                    &clean_target(target(uri).unwrap()),
                )
            };
            assert_eq!(scheme(&rebuilt), scheme(input));
            assert_eq!(clean(&rebuilt), clean(input));
        }
    }

    #[test]
    fn parent_target_never_returns_dot() {
        assert_eq!(parent_target("a/b/c.txt"), "a/b");
        assert_eq!(parent_target("a//c.txt"), "a");
        assert_eq!(parent_target("c.txt"), "");
        assert_eq!(parent_target(""), "");
    }

    #[test]
    fn dirname_keeps_scheme() {
        assert_eq!(dirname("test://a/b/c.txt").as_deref(), Some("test://a/b"));
        assert_eq!(dirname("test://c.txt").as_deref(), Some("test://"));
        assert_eq!(dirname("test://").as_deref(), Some("test://"));
        assert_eq!(dirname("/tmp/c.txt"), None);
    }

    #[test]
    fn file_name_is_last_component() {
        assert_eq!(file_name("a/b/c.txt"), "c.txt");
        assert_eq!(file_name("c.txt/"), "c.txt");
        assert_eq!(file_name(""), "");
    }

    #[test]
    fn validate_scheme_rejects_bad_syntax() {
        assert!(validate_scheme("test").is_ok());
        assert!(validate_scheme("svn+ssh").is_ok());
        assert!(matches!(
            validate_scheme(""),
            Err(UriError::EmptyScheme { .. })
        ));
        assert!(matches!(
            validate_scheme("te st"),
            Err(UriError::InvalidScheme { character: ' ', .. })
        ));
        assert!(matches!(
            validate_scheme("a/b"),
            Err(UriError::InvalidScheme { character: '/', .. })
        ));
    }
}
