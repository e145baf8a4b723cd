//! Template lexer (tokenizer).
//!
//! Converts Mustache source text into a stream of [`Token`]s. Scanning
//! follows the active delimiters, which `{{=<% %>=}}` tags may change midway
//! through a template. A second pass removes the surrounding whitespace and
//! line ending of "standalone" tags: sections, inverted sections, section
//! closes, partials, comments and set-delimiter tags that sit alone on their
//! line.

use webplus_core::error::WebplusError;

/// The open and close markers of a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    /// The opening marker, `{{` by default.
    pub open: String,
    /// The closing marker, `}}` by default.
    pub close: String,
}

impl Delimiters {
    /// Creates a delimiter pair.
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new("{{", "}}")
    }
}

/// A token produced by the template lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A literal text segment.
    Text(String),
    /// `{{name}}` (escaped) or `{{{name}}}` / `{{&name}}` (unescaped).
    Variable {
        /// The dotted name to resolve.
        name: String,
        /// Whether the output is HTML-escaped.
        escaped: bool,
    },
    /// `{{#name}}` or, when `inverted`, `{{^name}}`.
    SectionOpen {
        /// The section name.
        name: String,
        /// `true` for `{{^name}}`.
        inverted: bool,
        /// Byte offset in the source where the section body begins.
        content_start: usize,
        /// The delimiters active at the opening tag.
        delimiters: Delimiters,
    },
    /// `{{/name}}`.
    SectionClose {
        /// The section name.
        name: String,
        /// Byte offset in the source where the section body ends.
        content_end: usize,
    },
    /// `{{>name}}`, with the whitespace that preceded it on a standalone line.
    Partial {
        /// The partial template name.
        name: String,
        /// Indentation applied to every line of the partial.
        indent: String,
    },
    /// `{{! comment }}`.
    Comment(String),
    /// `{{=<% %>=}}`.
    Delimiters(Delimiters),
}

impl Token {
    const fn may_stand_alone(&self) -> bool {
        matches!(
            self,
            Self::SectionOpen { .. }
                | Self::SectionClose { .. }
                | Self::Partial { .. }
                | Self::Comment(_)
                | Self::Delimiters(_)
        )
    }
}

/// A scanned segment of the source, with its byte range.
enum Piece {
    Text { start: usize, end: usize },
    Tag { token: Token, start: usize, end: usize },
}

/// Tokenizes a Mustache source string using the default `{{ }}` delimiters.
///
/// # Errors
///
/// Returns a `TemplateSyntaxError` if a tag is never closed, a tag name is
/// empty, or a set-delimiter tag is malformed.
pub fn tokenize(source: &str) -> Result<Vec<Token>, WebplusError> {
    tokenize_with_delimiters(source, &Delimiters::default())
}

/// Tokenizes a Mustache source string starting from the given delimiters.
///
/// Lambda results are tokenized this way so they inherit the delimiters in
/// effect where the lambda's section was opened.
///
/// # Errors
///
/// See [`tokenize`].
pub fn tokenize_with_delimiters(
    source: &str,
    delimiters: &Delimiters,
) -> Result<Vec<Token>, WebplusError> {
    let mut pieces = scan(source, delimiters.clone())?;
    strip_standalone(source, &mut pieces);
    Ok(into_tokens(source, pieces))
}

fn scan(source: &str, mut delimiters: Delimiters) -> Result<Vec<Piece>, WebplusError> {
    let mut pieces = Vec::new();
    let mut pos = 0;

    while pos < source.len() {
        let Some(offset) = source[pos..].find(delimiters.open.as_str()) else {
            pieces.push(Piece::Text {
                start: pos,
                end: source.len(),
            });
            break;
        };

        let tag_start = pos + offset;
        if offset > 0 {
            pieces.push(Piece::Text {
                start: pos,
                end: tag_start,
            });
        }

        let inner_start = tag_start + delimiters.open.len();
        let sigil = source[inner_start..].chars().next();
        let (body_start, terminator) = match sigil {
            Some('{') => {
                let mut terminator = String::from("}");
                terminator.push_str(&delimiters.close);
                (inner_start + 1, terminator)
            }
            Some('=') => {
                let mut terminator = String::from("=");
                terminator.push_str(&delimiters.close);
                (inner_start + 1, terminator)
            }
            Some('#' | '^' | '/' | '>' | '!' | '&') => (inner_start + 1, delimiters.close.clone()),
            _ => (inner_start, delimiters.close.clone()),
        };

        let Some(body_len) = source[body_start..].find(terminator.as_str()) else {
            return Err(WebplusError::TemplateSyntaxError(format!(
                "Unclosed tag at byte {tag_start}: expected '{terminator}'"
            )));
        };
        let body = &source[body_start..body_start + body_len];
        let tag_end = body_start + body_len + terminator.len();

        let token = match sigil {
            Some('!') => Token::Comment(body.trim().to_string()),
            Some('=') => {
                let parts: Vec<&str> = body.split_whitespace().collect();
                let [open, close] = parts.as_slice() else {
                    return Err(WebplusError::TemplateSyntaxError(format!(
                        "Invalid set-delimiter tag: '{}'",
                        body.trim()
                    )));
                };
                delimiters = Delimiters::new(*open, *close);
                Token::Delimiters(delimiters.clone())
            }
            _ => {
                let name = body.trim();
                if name.is_empty() {
                    return Err(WebplusError::TemplateSyntaxError(format!(
                        "Empty tag name at byte {tag_start}"
                    )));
                }
                let name = name.to_string();
                match sigil {
                    Some('#') => Token::SectionOpen {
                        name,
                        inverted: false,
                        content_start: tag_end,
                        delimiters: delimiters.clone(),
                    },
                    Some('^') => Token::SectionOpen {
                        name,
                        inverted: true,
                        content_start: tag_end,
                        delimiters: delimiters.clone(),
                    },
                    Some('/') => Token::SectionClose {
                        name,
                        content_end: tag_start,
                    },
                    Some('>') => Token::Partial {
                        name,
                        indent: String::new(),
                    },
                    Some('&' | '{') => Token::Variable {
                        name,
                        escaped: false,
                    },
                    _ => Token::Variable {
                        name,
                        escaped: true,
                    },
                }
            }
        };

        pieces.push(Piece::Tag {
            token,
            start: tag_start,
            end: tag_end,
        });
        pos = tag_end;
    }

    Ok(pieces)
}

fn is_blank(s: &str) -> bool {
    s.chars().all(|c| matches!(c, ' ' | '\t' | '\r'))
}

fn text_range(pieces: &[Piece], index: usize) -> Option<(usize, usize)> {
    match pieces.get(index)? {
        Piece::Text { start, end } => Some((*start, *end)),
        Piece::Tag { .. } => None,
    }
}

/// Whether the tag at `index` is the only non-whitespace content on its line.
fn is_standalone(source: &str, pieces: &[Piece], index: usize) -> bool {
    let Some(Piece::Tag { token, .. }) = pieces.get(index) else {
        return false;
    };
    if !token.may_stand_alone() {
        return false;
    }

    let left_ok = index == 0
        || text_range(pieces, index - 1).is_some_and(|(start, end)| {
            let text = &source[start..end];
            text.rfind('\n').map_or_else(
                || index == 1 && is_blank(text),
                |nl| is_blank(&text[nl + 1..]),
            )
        });

    let right_ok = index + 1 == pieces.len()
        || text_range(pieces, index + 1).is_some_and(|(start, end)| {
            let text = &source[start..end];
            text.find('\n').map_or_else(
                || index + 2 == pieces.len() && is_blank(text),
                |nl| is_blank(&text[..nl]),
            )
        });

    left_ok && right_ok
}

/// Removes the line around every standalone tag. Decisions are made on the
/// scanned pieces first so one trim cannot affect another's eligibility.
fn strip_standalone(source: &str, pieces: &mut [Piece]) {
    let standalone: Vec<bool> = (0..pieces.len())
        .map(|i| is_standalone(source, pieces, i))
        .collect();
    let original: Vec<Option<(usize, usize)>> =
        (0..pieces.len()).map(|i| text_range(pieces, i)).collect();

    for (index, _) in standalone.iter().enumerate().filter(|(_, s)| **s) {
        let (line_start, indent) = match index.checked_sub(1).and_then(|i| original[i]) {
            Some((start, end)) => {
                let line_start = source[start..end].rfind('\n').map_or(start, |nl| start + nl + 1);
                (line_start, &source[line_start..end])
            }
            None => (pieces_start(pieces, index), ""),
        };
        let line_end = match original.get(index + 1).copied().flatten() {
            Some((start, end)) => source[start..end].find('\n').map_or(end, |nl| start + nl + 1),
            None => pieces_end(pieces, index),
        };

        if index > 0 {
            if let Piece::Text { start, end } = &mut pieces[index - 1] {
                *end = line_start.max(*start);
            }
        }
        if let Some(Piece::Text { start, end }) = pieces.get_mut(index + 1) {
            *start = line_end.min(*end);
        }
        if let Piece::Tag { token, start, end } = &mut pieces[index] {
            *start = line_start;
            *end = line_end;
            if let Token::Partial { indent: partial_indent, .. } = token {
                *partial_indent = indent.to_string();
            }
        }
    }
}

fn pieces_start(pieces: &[Piece], index: usize) -> usize {
    match &pieces[index] {
        Piece::Text { start, .. } | Piece::Tag { start, .. } => *start,
    }
}

fn pieces_end(pieces: &[Piece], index: usize) -> usize {
    match &pieces[index] {
        Piece::Text { end, .. } | Piece::Tag { end, .. } => *end,
    }
}

fn into_tokens(source: &str, pieces: Vec<Piece>) -> Vec<Token> {
    pieces
        .into_iter()
        .filter_map(|piece| match piece {
            Piece::Text { start, end } => {
                (start < end).then(|| Token::Text(source[start..end].to_string()))
            }
            Piece::Tag { token, start, end } => Some(match token {
                Token::SectionOpen {
                    name,
                    inverted,
                    delimiters,
                    ..
                } => Token::SectionOpen {
                    name,
                    inverted,
                    content_start: end,
                    delimiters,
                },
                Token::SectionClose { name, .. } => Token::SectionClose {
                    name,
                    content_end: start,
                },
                other => other,
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Token {
        Token::Text(s.to_string())
    }

    fn var(name: &str, escaped: bool) -> Token {
        Token::Variable {
            name: name.to_string(),
            escaped,
        }
    }

    #[test]
    fn test_plain_text() {
        let tokens = tokenize("Hello, world!").unwrap();
        assert_eq!(tokens, vec![text("Hello, world!")]);
    }

    #[test]
    fn test_empty_source() {
        assert!(tokenize("").unwrap().is_empty());
    }

    #[test]
    fn test_variables() {
        let tokens = tokenize("Hi {{ name }}, {{{raw}}} and {{& other }}").unwrap();
        assert_eq!(
            tokens,
            vec![
                text("Hi "),
                var("name", true),
                text(", "),
                var("raw", false),
                text(" and "),
                var("other", false),
            ]
        );
    }

    #[test]
    fn test_inline_section() {
        let tokens = tokenize("{{#show}}yes{{/show}}").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::SectionOpen {
                    name: "show".to_string(),
                    inverted: false,
                    content_start: 9,
                    delimiters: Delimiters::default(),
                },
                text("yes"),
                Token::SectionClose {
                    name: "show".to_string(),
                    content_end: 12,
                },
            ]
        );
    }

    #[test]
    fn test_standalone_section_lines_removed() {
        let source = "<ul>\n  {{#items}}\n  <li>{{.}}</li>\n  {{/items}}\n</ul>\n";
        let tokens = tokenize(source).unwrap();
        let texts: Vec<&str> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::Text(s) => Some(s.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["<ul>\n", "  <li>", "</li>\n", "</ul>\n"]);
    }

    #[test]
    fn test_section_content_offsets_skip_standalone_lines() {
        let source = "{{#a}}\nbody\n{{/a}}\n";
        let tokens = tokenize(source).unwrap();
        let Token::SectionOpen { content_start, .. } = &tokens[0] else {
            panic!("expected section open");
        };
        let Token::SectionClose { content_end, .. } = &tokens[2] else {
            panic!("expected section close");
        };
        assert_eq!(&source[*content_start..*content_end], "body\n");
    }

    #[test]
    fn test_tag_sharing_line_is_not_standalone() {
        let tokens = tokenize("a {{#x}}\nb").unwrap();
        assert_eq!(tokens[0], text("a "));
        assert_eq!(tokens[2], text("\nb"));
    }

    #[test]
    fn test_variable_is_never_standalone() {
        let tokens = tokenize("  {{name}}\n").unwrap();
        assert_eq!(tokens, vec![text("  "), var("name", true), text("\n")]);
    }

    #[test]
    fn test_standalone_comment_at_eof() {
        let tokens = tokenize("line\n  {{! note }}").unwrap();
        assert_eq!(
            tokens,
            vec![text("line\n"), Token::Comment("note".to_string())]
        );
    }

    #[test]
    fn test_standalone_partial_indent() {
        let tokens = tokenize("begin\n    {{> footer}}\nend").unwrap();
        assert_eq!(
            tokens,
            vec![
                text("begin\n"),
                Token::Partial {
                    name: "footer".to_string(),
                    indent: "    ".to_string(),
                },
                text("end"),
            ]
        );
    }

    #[test]
    fn test_inline_partial_has_no_indent() {
        let tokens = tokenize("x {{>footer}} y").unwrap();
        assert_eq!(
            tokens[1],
            Token::Partial {
                name: "footer".to_string(),
                indent: String::new(),
            }
        );
    }

    #[test]
    fn test_set_delimiters() {
        let tokens = tokenize("{{=<% %>=}}<% name %> {{literal}}").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Delimiters(Delimiters::new("<%", "%>")),
                var("name", true),
                text(" {{literal}}"),
            ]
        );
    }

    #[test]
    fn test_section_records_active_delimiters() {
        let tokens = tokenize("{{=| |=}}|#s|x|/s|").unwrap();
        assert!(matches!(
            &tokens[1],
            Token::SectionOpen { delimiters, .. } if *delimiters == Delimiters::new("|", "|")
        ));
    }

    #[test]
    fn test_tokenize_with_custom_delimiters() {
        let tokens = tokenize_with_delimiters("<%x%>", &Delimiters::new("<%", "%>")).unwrap();
        assert_eq!(tokens, vec![var("x", true)]);
    }

    #[test]
    fn test_unclosed_tag_error() {
        let result = tokenize("Hello {{ name");
        assert!(matches!(result, Err(WebplusError::TemplateSyntaxError(_))));
    }

    #[test]
    fn test_unclosed_triple_error() {
        assert!(tokenize("{{{ name }}").is_err());
    }

    #[test]
    fn test_empty_tag_error() {
        assert!(tokenize("{{}}").is_err());
        assert!(tokenize("{{# }}").is_err());
    }

    #[test]
    fn test_bad_delimiter_tag_error() {
        assert!(tokenize("{{=<%=}}").is_err());
    }

    #[test]
    fn test_single_brace_is_text() {
        let tokens = tokenize("a { b } c").unwrap();
        assert_eq!(tokens, vec![text("a { b } c")]);
    }
}
