//! Helpers for folding instruction arguments into a [`hold_store::RuntimeConfig`].

/// Parses a command-form argument into its final argv.
///
/// Recognizes the JSON-array exec form (`["a", "b"]`) with a small
/// hand-rolled splitter (no escaping beyond matching quotes — sufficient
/// for the recipe inputs this engine accepts); anything else is treated as
/// shell form and wrapped as `/bin/sh -c <argument>`.
pub fn parse_command(argument: &str) -> Vec<String> {
    let trimmed = argument.trim();
    if let Some(inner) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        return inner
            .split(',')
            .map(|tok| tok.trim().trim_matches('"').to_owned())
            .filter(|tok| !tok.is_empty())
            .collect();
    }
    vec!["/bin/sh".to_owned(), "-c".to_owned(), trimmed.to_owned()]
}

/// Splits a `KEY=VALUE` or `KEY VALUE` argument into its parts. `LABEL`
/// and `ENV` both accept either form; this engine only emits the first.
pub fn parse_key_value(argument: &str) -> Option<(String, String)> {
    if let Some((k, v)) = argument.split_once('=') {
        return Some((k.trim().to_owned(), v.trim().trim_matches('"').to_owned()));
    }
    argument
        .split_once(char::is_whitespace)
        .map(|(k, v)| (k.trim().to_owned(), v.trim().trim_matches('"').to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exec_form_command() {
        assert_eq!(
            parse_command(r#"["/bin/sh", "-c", "true"]"#),
            vec!["/bin/sh".to_owned(), "-c".to_owned(), "true".to_owned()]
        );
    }

    #[test]
    fn parses_shell_form_command() {
        assert_eq!(
            parse_command("echo hi"),
            vec!["/bin/sh".to_owned(), "-c".to_owned(), "echo hi".to_owned()]
        );
    }

    #[test]
    fn parses_key_value_with_equals() {
        assert_eq!(
            parse_key_value("A=1"),
            Some(("A".to_owned(), "1".to_owned()))
        );
    }
}
