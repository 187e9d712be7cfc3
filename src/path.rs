//! Route pattern compilation and matching.
//!
//! A pattern is a `/`-separated list of tokens:
//!
//! | Token | Matches |
//! |---|---|
//! | `users` | exactly that segment (ASCII case-insensitive unless configured) |
//! | `:id` | one non-empty segment, bound as `id` |
//! | `:id?` | one segment if present, otherwise nothing |
//! | `:rest*` | everything after the previous `/`, slashes included |
//! | `*` | like `:rest*`, bound under `"0"`, `"1"`, … |
//!
//! Greedy tokens must come last. Options are fixed when the pattern is
//! compiled, never per request.

use crate::error::{Error, Result};

/// Compile-time matching options.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MatchOptions {
    /// Compare literal segments case-sensitively. Default `false`.
    pub case_sensitive: bool,
    /// Treat trailing slashes as significant. Default `false`.
    pub strict: bool,
    /// Anchor at the end of the path (routes) rather than at a segment
    /// boundary (middleware prefixes). Default `true`.
    pub end: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self { case_sensitive: false, strict: false, end: true }
    }
}

impl MatchOptions {
    /// Same options, anchored at a segment boundary instead of the end.
    pub fn prefix(self) -> Self {
        Self { end: false, ..self }
    }
}

/// Ordered path parameters, in the order the pattern declares them.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Inserts or overwrites `name`, keeping the original position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    /// `self` overlaid with `other`; `other` wins on conflicts.
    pub(crate) fn merged(&self, other: &Params) -> Params {
        let mut out = self.clone();
        for (k, v) in other.iter() {
            out.insert(k, v);
        }
        out
    }
}

/// The result of a successful match.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathMatch {
    pub params: Params,
    /// The consumed prefix. For `end` patterns this is the whole path.
    pub matched: String,
    /// What is left after `matched`; empty for `end` patterns.
    pub remainder: String,
}

#[derive(Clone, Debug)]
enum Token {
    Literal(String),
    Param { name: String, optional: bool },
    Greedy(String),
}

/// A compiled route pattern.
#[derive(Clone, Debug)]
pub struct PathPattern {
    source: String,
    tokens: Vec<Token>,
    trailing_slash: bool,
    options: MatchOptions,
}

impl PathPattern {
    /// Compiles `pattern`. Fails on empty parameter names and on tokens after
    /// a greedy one.
    pub fn compile(pattern: &str, options: MatchOptions) -> Result<Self> {
        let invalid = |reason| Error::Pattern { pattern: pattern.to_owned(), reason };

        let body = pattern.trim_start_matches('/');
        let trailing_slash = body.is_empty() || body.ends_with('/');
        let body = body.strip_suffix('/').unwrap_or(body);

        let mut tokens: Vec<Token> = Vec::new();
        let mut wildcards = 0usize;
        if !body.is_empty() {
            for segment in body.split('/') {
                if matches!(tokens.last(), Some(Token::Greedy(_))) {
                    return Err(invalid("greedy token must be the last segment"));
                }
                let token = if segment == "*" {
                    let name = wildcards.to_string();
                    wildcards += 1;
                    Token::Greedy(name)
                } else if let Some(param) = segment.strip_prefix(':') {
                    let (name, modifier) = match param.as_bytes().last() {
                        Some(b'?') | Some(b'*') => param.split_at(param.len() - 1),
                        _ => (param, ""),
                    };
                    if name.is_empty() {
                        return Err(invalid("parameter without a name"));
                    }
                    match modifier {
                        "*" => Token::Greedy(name.to_owned()),
                        "?" => Token::Param { name: name.to_owned(), optional: true },
                        _ => Token::Param { name: name.to_owned(), optional: false },
                    }
                } else {
                    Token::Literal(segment.to_owned())
                };
                tokens.push(token);
            }
        }

        Ok(Self { source: pattern.to_owned(), tokens, trailing_slash, options })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn options(&self) -> MatchOptions {
        self.options
    }

    /// `true` for the bare `/` pattern, which as a prefix matches everything.
    pub fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tests `path`. `Ok(None)` is a plain miss; `Err` means the path matched
    /// but a captured parameter is not valid percent-encoded UTF-8 (400).
    pub fn matches(&self, path: &str) -> Result<Option<PathMatch>> {
        let mut raw = Vec::new();
        let Some(end) = self.walk(path, 0, 0, &mut raw) else {
            return Ok(None);
        };

        let mut params = Params::new();
        for (name, value) in raw {
            let decoded = urlencoding::decode(value).map_err(|_| {
                Error::http(
                    http::StatusCode::BAD_REQUEST,
                    format!("failed to decode param '{value}'"),
                )
            })?;
            params.insert(name, decoded.into_owned());
        }

        Ok(Some(PathMatch {
            params,
            matched: path[..end].to_owned(),
            remainder: path[end..].to_owned(),
        }))
    }

    fn walk<'p>(
        &'p self,
        path: &'p str,
        index: usize,
        pos: usize,
        params: &mut Vec<(&'p str, &'p str)>,
    ) -> Option<usize> {
        let Some(token) = self.tokens.get(index) else {
            return self.finish(path, pos);
        };

        match token {
            Token::Literal(literal) => {
                let (segment, next) = segment_at(path, pos)?;
                let equal = if self.options.case_sensitive {
                    segment == literal.as_str()
                } else {
                    segment.eq_ignore_ascii_case(literal)
                };
                if !equal {
                    return None;
                }
                self.walk(path, index + 1, next, params)
            }
            Token::Param { name, optional } => {
                if let Some((segment, next)) = segment_at(path, pos) {
                    if !segment.is_empty() {
                        params.push((name.as_str(), segment));
                        if let Some(end) = self.walk(path, index + 1, next, params) {
                            return Some(end);
                        }
                        params.pop();
                    }
                }
                if *optional { self.walk(path, index + 1, pos, params) } else { None }
            }
            Token::Greedy(name) => {
                if path.as_bytes().get(pos) != Some(&b'/') {
                    return None;
                }
                params.push((name.as_str(), &path[pos + 1..]));
                Some(path.len())
            }
        }
    }

    /// Decides whether what is left after the last token is acceptable.
    fn finish(&self, path: &str, pos: usize) -> Option<usize> {
        let rest = &path[pos..];
        let MatchOptions { strict, end, .. } = self.options;

        if end {
            let ok = match (strict, self.trailing_slash) {
                (false, _) => rest.is_empty() || rest == "/",
                (true, true) => rest == "/" || (self.is_root() && rest.is_empty()),
                (true, false) => rest.is_empty(),
            };
            return ok.then_some(path.len());
        }

        if strict && self.trailing_slash && !self.is_root() {
            return rest.starts_with('/').then_some(pos);
        }
        (rest.is_empty() || rest.starts_with('/')).then_some(pos)
    }
}

/// The segment starting at `pos` (which must sit on a `/`) and the position
/// right after it.
fn segment_at(path: &str, pos: usize) -> Option<(&str, usize)> {
    if path.as_bytes().get(pos) != Some(&b'/') {
        return None;
    }
    let start = pos + 1;
    let end = path[start..].find('/').map_or(path.len(), |i| start + i);
    Some((&path[start..end], end))
}
