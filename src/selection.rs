//! Selection expressions over a fetched repository list.
//!
//! Grammar (case-insensitive, comma separated, positions are 1-based):
//!
//! ```text
//! none            nothing; only when it is the entire expression
//! all             every repository
//! public          public and not a fork
//! private         private repositories
//! forks           forks
//! N               the repository at position N
//! A-B             positions A through min(B, len)
//! ```
//!
//! Tokens are unioned in expression order without deduplication. A token that
//! does not parse, or points outside the list, selects nothing.

use crate::model::Repository;

/// One parsed token of a selection expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    All,
    Public,
    Private,
    Forks,
    Position(usize),
    Range(usize, usize),
    /// Unparseable token, or `none` mixed with other tokens.
    Nothing,
}

impl Selector {
    /// Parse a single token. Never fails.
    pub fn parse(token: &str) -> Self {
        let token = token.trim().to_ascii_lowercase();
        match token.as_str() {
            "all" => Selector::All,
            "public" => Selector::Public,
            "private" => Selector::Private,
            "forks" => Selector::Forks,
            _ => match token.split_once('-') {
                Some((start, end)) => match (start.trim().parse(), end.trim().parse()) {
                    (Ok(start), Ok(end)) => Selector::Range(start, end),
                    _ => Selector::Nothing,
                },
                None => token
                    .parse()
                    .map(Selector::Position)
                    .unwrap_or(Selector::Nothing),
            },
        }
    }

    fn apply<'a>(&self, repos: &'a [Repository], out: &mut Vec<&'a Repository>) {
        match *self {
            Selector::All => out.extend(repos.iter()),
            Selector::Public => out.extend(repos.iter().filter(|r| r.is_public_source())),
            Selector::Private => out.extend(repos.iter().filter(|r| r.is_private())),
            Selector::Forks => out.extend(repos.iter().filter(|r| r.is_fork)),
            Selector::Position(n) => {
                if let Some(repo) = n.checked_sub(1).and_then(|i| repos.get(i)) {
                    out.push(repo);
                }
            }
            Selector::Range(start, end) => {
                let first = start.max(1);
                let last = end.min(repos.len());
                if first <= last {
                    out.extend(&repos[first - 1..last]);
                }
            }
            Selector::Nothing => {}
        }
    }
}

/// Parse a whole expression into its tokens.
pub fn parse(expression: &str) -> Vec<Selector> {
    if expression.trim().eq_ignore_ascii_case("none") {
        return Vec::new();
    }
    expression.split(',').map(Selector::parse).collect()
}

/// Resolve `expression` against `repos`, in token order.
pub fn select<'a>(repos: &'a [Repository], expression: &str) -> Vec<&'a Repository> {
    let mut selected = Vec::new();
    for selector in parse(expression) {
        selector.apply(repos, &mut selected);
    }
    log::debug!(
        "Selection '{}' matched {} of {} repositories",
        expression.trim(),
        selected.len(),
        repos.len()
    );
    selected
}
