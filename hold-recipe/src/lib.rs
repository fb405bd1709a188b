//! Parser for line-oriented build recipes (Dockerfile-like syntax).
//!
//! Produces an ordered [`Instruction`] list plus a [`Recipe`] aggregate of
//! structured fields (`FROM`, `WORKDIR`, `USER`, `SHELL`, `ENTRYPOINT`,
//! `CMD`) and multi-valued lists (`ENV`, `EXPOSE`, `VOLUME`, `LABEL`).

mod error;
mod instruction;

pub use error::{Error, Result};
pub use instruction::{CopySpec, Instruction, Keyword};

/// A parsed build recipe: the ordered instruction list plus the structured
/// fields accumulated while scanning it.
#[derive(Debug, Clone, Default)]
pub struct Recipe {
    /// Every instruction in source order, including ones that only affect
    /// the structured fields below.
    pub instructions: Vec<Instruction>,
    /// Non-fatal warnings collected during parsing (unknown keywords,
    /// `ENTRYPOINT`+`CMD` coexistence).
    pub warnings: Vec<String>,
    /// Base image reference from `FROM`.
    pub from: Option<String>,
    /// Default working directory from `WORKDIR`.
    pub workdir: Option<String>,
    /// Default user from `USER`.
    pub user: Option<String>,
    /// Shell used to interpret string-form `RUN`/`CMD`/`ENTRYPOINT`.
    pub shell: Option<String>,
    /// Default entrypoint from `ENTRYPOINT`.
    pub entrypoint: Option<String>,
    /// Default command from `CMD`.
    pub cmd: Option<String>,
    /// Accumulated `ENV` entries as raw `KEY=VALUE` strings.
    pub env: Vec<String>,
    /// Accumulated `EXPOSE` entries.
    pub expose: Vec<String>,
    /// Accumulated `VOLUME` entries.
    pub volume: Vec<String>,
    /// Accumulated `LABEL` entries as raw `KEY=VALUE` strings.
    pub label: Vec<String>,
}

/// Parses a recipe from its raw text content.
pub fn parse(text: &str) -> Result<Recipe> {
    let lines: Vec<&str> = text.lines().collect();
    let mut recipe = Recipe::default();
    let mut i = 0usize;

    while i < lines.len() {
        let start_line = i + 1;
        let mut raw = lines[i].trim().to_owned();
        i += 1;

        if raw.is_empty() || raw.starts_with('#') {
            continue;
        }

        // Join continuation lines: a trailing single backslash after trim.
        while raw.ends_with('\\') && !raw.ends_with("\\\\") {
            raw.pop();
            let raw_trimmed = raw.trim_end().to_owned();
            raw = raw_trimmed;
            let Some(next) = next_non_empty(&lines, &mut i) else {
                break;
            };
            raw.push(' ');
            raw.push_str(next.trim());
        }

        let (token, rest) = split_first_token(&raw);
        let Some(keyword) = Keyword::parse(token) else {
            recipe
                .warnings
                .push(format!("unknown instruction {token:?} at line {start_line}, skipped"));
            continue;
        };

        let argument = rest.trim().to_owned();
        let copy = matches!(keyword, Keyword::Add | Keyword::Copy)
            .then(|| parse_copy_spec(&argument))
            .flatten();

        apply_structured(&mut recipe, keyword, &argument);

        recipe.instructions.push(Instruction {
            keyword,
            argument,
            line: start_line,
            copy,
        });
    }

    validate(&recipe)?;
    Ok(recipe)
}

/// Advances `i` past blank lines, returning the next non-empty line if any.
fn next_non_empty<'a>(lines: &[&'a str], i: &mut usize) -> Option<&'a str> {
    while *i < lines.len() {
        let line = lines[*i];
        *i += 1;
        if !line.trim().is_empty() {
            return Some(line);
        }
    }
    None
}

/// Splits `"KEYWORD rest of line"` into `("KEYWORD", "rest of line")`.
fn split_first_token(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((head, tail)) => (head, tail),
        None => (line, ""),
    }
}

/// Parses an `ADD`/`COPY` argument into source(s) and destination.
/// The last whitespace-separated token is the destination.
fn parse_copy_spec(argument: &str) -> Option<CopySpec> {
    let tokens: Vec<&str> = argument.split_whitespace().collect();
    if tokens.len() < 2 {
        return None;
    }
    let (dest, src) = tokens.split_last()?;
    Some(CopySpec {
        src: src.iter().map(|s| (*s).to_owned()).collect(),
        dest: (*dest).to_owned(),
    })
}

/// Folds one instruction's argument into the recipe's structured fields.
fn apply_structured(recipe: &mut Recipe, keyword: Keyword, argument: &str) {
    match keyword {
        Keyword::From => recipe.from = Some(argument.to_owned()),
        Keyword::Workdir => recipe.workdir = Some(argument.to_owned()),
        Keyword::User => recipe.user = Some(argument.to_owned()),
        Keyword::Shell => recipe.shell = Some(argument.to_owned()),
        Keyword::Entrypoint => recipe.entrypoint = Some(argument.to_owned()),
        Keyword::Cmd => recipe.cmd = Some(argument.to_owned()),
        Keyword::Env => recipe.env.push(argument.to_owned()),
        Keyword::Expose => recipe.expose.push(argument.to_owned()),
        Keyword::Volume => recipe.volume.push(argument.to_owned()),
        Keyword::Label => recipe.label.push(argument.to_owned()),
        Keyword::Run
        | Keyword::Add
        | Keyword::Copy
        | Keyword::Arg
        | Keyword::Onbuild
        | Keyword::Stopsignal
        | Keyword::Healthcheck => {}
    }
}

/// Enforces the non-negotiable invariants: non-empty, starts with `FROM`.
fn validate(recipe: &mut Recipe) -> Result<()> {
    let Some(first) = recipe.instructions.first() else {
        return Err(Error::Empty);
    };
    if first.keyword != Keyword::From {
        return Err(Error::MissingFrom(first.keyword.to_string(), first.line));
    }
    if recipe.entrypoint.is_some() && recipe.cmd.is_some() {
        recipe
            .warnings
            .push("both ENTRYPOINT and CMD are set; CMD supplies default arguments".to_owned());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_scratch_recipe() {
        let recipe = parse("FROM scratch\n").unwrap();
        assert_eq!(recipe.instructions.len(), 1);
        assert_eq!(recipe.from.as_deref(), Some("scratch"));
    }

    #[test]
    fn rejects_empty_recipe() {
        assert!(matches!(parse("# just a comment\n"), Err(Error::Empty)));
    }

    #[test]
    fn rejects_recipe_not_starting_with_from() {
        let err = parse("RUN echo hi\nFROM scratch\n").unwrap_err();
        assert!(matches!(err, Error::MissingFrom(_, 1)));
    }

    #[test]
    fn unknown_keyword_is_a_warning_not_a_failure() {
        let recipe = parse("FROM scratch\nNOPE arg\n").unwrap();
        assert_eq!(recipe.instructions.len(), 1);
        assert_eq!(recipe.warnings.len(), 1);
    }

    #[test]
    fn line_continuation_joins_with_single_space() {
        let recipe = parse("FROM scratch\nRUN echo a \\\n    && echo b\n").unwrap();
        let run = &recipe.instructions[1];
        assert_eq!(run.argument, "echo a && echo b");
    }

    #[test]
    fn multi_valued_keywords_accumulate() {
        let recipe = parse("FROM scratch\nENV A=1\nENV B=2\n").unwrap();
        assert_eq!(recipe.env, vec!["A=1".to_owned(), "B=2".to_owned()]);
    }

    #[test]
    fn entrypoint_and_cmd_coexistence_warns() {
        let recipe = parse("FROM scratch\nENTRYPOINT [\"/bin/sh\"]\nCMD [\"-c\", \"true\"]\n").unwrap();
        assert!(recipe.warnings.iter().any(|w| w.contains("ENTRYPOINT")));
    }

    #[test]
    fn copy_parses_source_and_destination() {
        let recipe = parse("FROM scratch\nCOPY src/app.bin /bin/app\n").unwrap();
        let copy = recipe.instructions[1].copy.as_ref().unwrap();
        assert_eq!(copy.src, vec!["src/app.bin".to_owned()]);
        assert_eq!(copy.dest, "/bin/app");
    }

    #[test]
    fn parsing_is_deterministic() {
        let text = "FROM scratch\nRUN echo a \\\n    && echo b\nENV X=1\n";
        let first = parse(text).unwrap();
        let second = parse(text).unwrap();
        assert_eq!(
            first.instructions.iter().map(|i| i.line).collect::<Vec<_>>(),
            second.instructions.iter().map(|i| i.line).collect::<Vec<_>>()
        );
        assert_eq!(
            first.instructions.iter().map(|i| i.argument.clone()).collect::<Vec<_>>(),
            second.instructions.iter().map(|i| i.argument.clone()).collect::<Vec<_>>()
        );
    }
}
