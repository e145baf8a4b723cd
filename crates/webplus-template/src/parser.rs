//! Template parser and renderer.
//!
//! Converts a stream of lexer [`Token`]s into a tree of [`Node`]s and renders
//! that tree against a [`Context`]. Partials are looked up through a
//! [`TemplateStore`], so rendering never touches the filesystem.

use std::sync::Arc;

use webplus_core::error::WebplusError;

use crate::context::{escape_html, Context, ContextValue, Stack};
use crate::lexer::{tokenize_with_delimiters, Delimiters, Token};

/// Partials nested deeper than this abort the render.
pub const MAX_PARTIAL_DEPTH: usize = 64;

/// A node in the parsed template tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Literal text, output as-is.
    Text(String),
    /// `{{name}}`, `{{{name}}}` or `{{&name}}`.
    Variable {
        /// The dotted name to resolve.
        name: String,
        /// Whether the output is HTML-escaped.
        escaped: bool,
    },
    /// `{{#name}}...{{/name}}` or `{{^name}}...{{/name}}`.
    Section {
        /// The section name.
        name: String,
        /// `true` for `{{^name}}`.
        inverted: bool,
        /// The parsed body.
        children: Vec<Node>,
        /// The unparsed body, handed to section lambdas.
        raw: String,
        /// The delimiters active at the opening tag.
        delimiters: Delimiters,
    },
    /// `{{>name}}`.
    Partial {
        /// The partial template name.
        name: String,
        /// Indentation applied to every line of the partial.
        indent: String,
    },
}

/// A compiled template: its name, source, and parsed node tree.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    /// The template name (base name, without extension).
    pub name: String,
    /// The source text.
    pub source: String,
    /// The parsed node tree.
    pub nodes: Vec<Node>,
}

impl CompiledTemplate {
    /// Returns the names of every partial this template references, in order
    /// of first appearance.
    pub fn partial_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_partials(&self.nodes, &mut names);
        names
    }
}

fn collect_partials(nodes: &[Node], names: &mut Vec<String>) {
    for node in nodes {
        match node {
            Node::Partial { name, .. } => {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
            Node::Section { children, .. } => collect_partials(children, names),
            Node::Text(_) | Node::Variable { .. } => {}
        }
    }
}

/// Source of already-compiled partials.
pub trait TemplateStore {
    /// Returns the compiled partial with the given name, if known.
    fn partial(&self, name: &str) -> Option<Arc<CompiledTemplate>>;
}

/// Compiles template source into a [`CompiledTemplate`].
///
/// # Errors
///
/// Returns `TemplateSyntaxError`, naming the template, for malformed tags or
/// unbalanced sections.
pub fn compile(name: &str, source: &str) -> Result<CompiledTemplate, WebplusError> {
    let nodes = compile_nodes(source, &Delimiters::default()).map_err(|e| match e {
        WebplusError::TemplateSyntaxError(msg) => {
            WebplusError::TemplateSyntaxError(format!("{msg} (in template '{name}')"))
        }
        other => other,
    })?;
    Ok(CompiledTemplate {
        name: name.to_string(),
        source: source.to_string(),
        nodes,
    })
}

fn compile_nodes(source: &str, delimiters: &Delimiters) -> Result<Vec<Node>, WebplusError> {
    let tokens = tokenize_with_delimiters(source, delimiters)?;
    parse(source, &tokens)
}

/// Parses a list of tokens, scanned from `source`, into a node tree.
///
/// # Errors
///
/// Returns `TemplateSyntaxError` for a close tag without a matching open tag
/// or a section left open at the end of the source.
pub fn parse(source: &str, tokens: &[Token]) -> Result<Vec<Node>, WebplusError> {
    let mut parser = ParserState {
        source,
        tokens,
        pos: 0,
    };
    let (nodes, _) = parser.parse_nodes(None)?;
    Ok(nodes)
}

struct ParserState<'a> {
    source: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl ParserState<'_> {
    /// Parses until the close tag of `enclosing` (or the end of input at top
    /// level). Returns the nodes and, inside a section, the body end offset.
    fn parse_nodes(
        &mut self,
        enclosing: Option<&str>,
    ) -> Result<(Vec<Node>, usize), WebplusError> {
        let tokens = self.tokens;
        let mut nodes = Vec::new();

        while let Some(token) = tokens.get(self.pos) {
            self.pos += 1;
            match token {
                Token::Text(text) => nodes.push(Node::Text(text.clone())),
                Token::Comment(_) | Token::Delimiters(_) => {}
                Token::Variable { name, escaped } => nodes.push(Node::Variable {
                    name: name.clone(),
                    escaped: *escaped,
                }),
                Token::Partial { name, indent } => nodes.push(Node::Partial {
                    name: name.clone(),
                    indent: indent.clone(),
                }),
                Token::SectionOpen {
                    name,
                    inverted,
                    content_start,
                    delimiters,
                } => {
                    let (children, content_end) = self.parse_nodes(Some(name.as_str()))?;
                    let raw = self
                        .source
                        .get(*content_start..content_end)
                        .unwrap_or_default()
                        .to_string();
                    nodes.push(Node::Section {
                        name: name.clone(),
                        inverted: *inverted,
                        children,
                        raw,
                        delimiters: delimiters.clone(),
                    });
                }
                Token::SectionClose { name, content_end } => {
                    return match enclosing {
                        Some(open) if open == name.as_str() => Ok((nodes, *content_end)),
                        Some(open) => Err(WebplusError::TemplateSyntaxError(format!(
                            "Mismatched section: '{{{{/{name}}}}}' closes '{{{{#{open}}}}}'"
                        ))),
                        None => Err(WebplusError::TemplateSyntaxError(format!(
                            "Unexpected closing tag '{{{{/{name}}}}}'"
                        ))),
                    };
                }
            }
        }

        match enclosing {
            Some(open) => Err(WebplusError::TemplateSyntaxError(format!(
                "Unclosed section '{open}'"
            ))),
            None => Ok((nodes, self.source.len())),
        }
    }
}

/// Renders a compiled template against a context.
///
/// # Errors
///
/// Returns `TemplateSyntaxError` if a lambda returns malformed template text
/// or partials nest deeper than [`MAX_PARTIAL_DEPTH`].
pub fn render(
    template: &CompiledTemplate,
    context: &Context,
    store: &dyn TemplateStore,
) -> Result<String, WebplusError> {
    let mut stack = Stack::new(context);
    let mut output = String::new();
    render_nodes(&template.nodes, &mut stack, store, 0, &mut output)?;
    Ok(output)
}

fn render_nodes<'a>(
    nodes: &[Node],
    stack: &mut Stack<'a>,
    store: &dyn TemplateStore,
    depth: usize,
    output: &mut String,
) -> Result<(), WebplusError> {
    for node in nodes {
        render_node(node, stack, store, depth, output)?;
    }
    Ok(())
}

fn render_node<'a>(
    node: &Node,
    stack: &mut Stack<'a>,
    store: &dyn TemplateStore,
    depth: usize,
    output: &mut String,
) -> Result<(), WebplusError> {
    match node {
        Node::Text(text) => output.push_str(text),
        Node::Variable { name, escaped } => {
            let rendered = match stack.lookup(name) {
                None => return Ok(()),
                Some(ContextValue::Lambda(f)) => {
                    let nodes = compile_nodes(&f(""), &Delimiters::default())?;
                    let mut buf = String::new();
                    render_nodes(&nodes, stack, store, depth, &mut buf)?;
                    buf
                }
                Some(value) if value.is_safe() => {
                    output.push_str(&value.to_display_string());
                    return Ok(());
                }
                Some(value) => value.to_display_string(),
            };
            if *escaped {
                output.push_str(&escape_html(&rendered));
            } else {
                output.push_str(&rendered);
            }
        }
        Node::Section {
            name,
            inverted,
            children,
            raw,
            delimiters,
        } => {
            let value = stack.lookup(name);
            if *inverted {
                if !value.is_some_and(ContextValue::is_truthy) {
                    render_nodes(children, stack, store, depth, output)?;
                }
                return Ok(());
            }
            match value {
                None => {}
                Some(value) if !value.is_truthy() => {}
                Some(ContextValue::List(items)) => {
                    for item in items {
                        stack.push(item);
                        let result = render_nodes(children, stack, store, depth, output);
                        stack.pop();
                        result?;
                    }
                }
                Some(ContextValue::Lambda(f)) => {
                    let nodes = compile_nodes(&f(raw.as_str()), delimiters)?;
                    render_nodes(&nodes, stack, store, depth, output)?;
                }
                Some(value) => {
                    stack.push(value);
                    let result = render_nodes(children, stack, store, depth, output);
                    stack.pop();
                    result?;
                }
            }
        }
        Node::Partial { name, indent } => {
            if depth >= MAX_PARTIAL_DEPTH {
                return Err(WebplusError::TemplateSyntaxError(format!(
                    "Partial '{name}' nested more than {MAX_PARTIAL_DEPTH} levels deep"
                )));
            }
            let Some(partial) = store.partial(name) else {
                tracing::debug!(partial = %name, "Partial not found, rendering empty");
                return Ok(());
            };
            if indent.is_empty() {
                render_nodes(&partial.nodes, stack, store, depth + 1, output)?;
            } else {
                let indented = indent_lines(&partial.source, indent);
                let nodes = compile_nodes(&indented, &Delimiters::default())?;
                render_nodes(&nodes, stack, store, depth + 1, output)?;
            }
        }
    }
    Ok(())
}

/// Prefixes every line of `source` with `indent`.
fn indent_lines(source: &str, indent: &str) -> String {
    let mut result = String::with_capacity(source.len());
    for line in source.split_inclusive('\n') {
        result.push_str(indent);
        result.push_str(line);
    }
    result
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct MapStore(HashMap<String, Arc<CompiledTemplate>>);

    impl MapStore {
        fn new(partials: &[(&str, &str)]) -> Self {
            Self(
                partials
                    .iter()
                    .map(|(name, src)| ((*name).to_string(), Arc::new(compile(name, src).unwrap())))
                    .collect(),
            )
        }
    }

    impl TemplateStore for MapStore {
        fn partial(&self, name: &str) -> Option<Arc<CompiledTemplate>> {
            self.0.get(name).cloned()
        }
    }

    fn render_str(source: &str, context: &Context) -> String {
        let template = compile("test", source).unwrap();
        render(&template, context, &MapStore::new(&[])).unwrap()
    }

    fn ctx(pairs: Vec<(&str, ContextValue)>) -> Context {
        let mut context = Context::new();
        for (k, v) in pairs {
            context.set(k, v);
        }
        context
    }

    #[test]
    fn test_literal_text_round_trips() {
        let source = "<html>\n  <p>No tags here & none needed.</p>\n</html>\n";
        assert_eq!(render_str(source, &Context::new()), source);
    }

    #[test]
    fn test_variable_escaping() {
        let context = ctx(vec![("v", ContextValue::from("<a href=\"x\">&'</a>"))]);
        assert_eq!(
            render_str("{{v}}", &context),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;&lt;/a&gt;"
        );
        assert_eq!(render_str("{{{v}}}", &context), "<a href=\"x\">&'</a>");
        assert_eq!(render_str("{{&v}}", &context), "<a href=\"x\">&'</a>");
    }

    #[test]
    fn test_safe_string_not_escaped() {
        let context = ctx(vec![("v", ContextValue::from("<b>").mark_safe())]);
        assert_eq!(render_str("{{v}}", &context), "<b>");
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        assert_eq!(render_str("[{{missing}}]", &Context::new()), "[]");
    }

    #[test]
    fn test_value_coercion() {
        let context = ctx(vec![
            ("n", ContextValue::None),
            ("t", ContextValue::Bool(true)),
            ("i", ContextValue::Integer(7)),
            ("f", ContextValue::Float(3.0)),
        ]);
        assert_eq!(render_str("{{n}}|{{t}}|{{i}}|{{f}}", &context), "|True|7|3.0");
    }

    #[test]
    fn test_dotted_names() {
        let mut envs = HashMap::new();
        envs.insert("appName".to_string(), ContextValue::from("demo"));
        let context = ctx(vec![("envs", ContextValue::Dict(envs))]);
        assert_eq!(render_str("{{envs.appName}}", &context), "demo");
        assert_eq!(render_str("{{#envs}}{{appName}}{{/envs}}", &context), "demo");
    }

    #[test]
    fn test_sections() {
        let context = ctx(vec![
            ("yes", ContextValue::Bool(true)),
            ("no", ContextValue::Bool(false)),
            ("empty", ContextValue::List(vec![])),
        ]);
        assert_eq!(render_str("{{#yes}}Y{{/yes}}{{#no}}N{{/no}}", &context), "Y");
        assert_eq!(render_str("{{^no}}not{{/no}}{{^yes}}X{{/yes}}", &context), "not");
        assert_eq!(render_str("{{^empty}}none{{/empty}}", &context), "none");
        assert_eq!(render_str("{{^absent}}absent{{/absent}}", &context), "absent");
    }

    #[test]
    fn test_list_section_with_implicit_iterator() {
        let context = ctx(vec![("items", ContextValue::from(vec!["a", "b", "c"]))]);
        let source = "<ul>\n{{#items}}\n  <li>{{.}}</li>\n{{/items}}\n</ul>\n";
        assert_eq!(
            render_str(source, &context),
            "<ul>\n  <li>a</li>\n  <li>b</li>\n  <li>c</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_section_lambda_receives_raw_text() {
        let context = ctx(vec![
            (
                "wrap",
                ContextValue::lambda(|text| format!("<b>{text}</b>")),
            ),
            ("name", ContextValue::from("Ann")),
        ]);
        assert_eq!(
            render_str("{{#wrap}}Hi {{name}}{{/wrap}}", &context),
            "<b>Hi Ann</b>"
        );
    }

    #[test]
    fn test_lambda_result_uses_section_delimiters() {
        let context = ctx(vec![
            ("echo", ContextValue::lambda(|text| text.to_string())),
            ("x", ContextValue::from("1")),
        ]);
        assert_eq!(render_str("{{=<% %>=}}<%#echo%><%x%><%/echo%>", &context), "1");
    }

    #[test]
    fn test_interpolated_lambda() {
        let context = ctx(vec![("now", ContextValue::lambda(|_| "<tick>".to_string()))]);
        assert_eq!(render_str("{{now}}", &context), "&lt;tick&gt;");
    }

    #[test]
    fn test_comments_removed() {
        assert_eq!(render_str("a{{! hidden }}b", &Context::new()), "ab");
        assert_eq!(render_str("a\n{{! hidden }}\nb", &Context::new()), "a\nb");
    }

    #[test]
    fn test_partials() {
        let store = MapStore::new(&[("footer", "<footer>{{site}}</footer>\n")]);
        let template = compile("page", "<main>\n  {{> footer}}\n</main>\n").unwrap();
        let context = ctx(vec![("site", ContextValue::from("demo"))]);
        assert_eq!(
            render(&template, &context, &store).unwrap(),
            "<main>\n  <footer>demo</footer>\n</main>\n"
        );
    }

    #[test]
    fn test_missing_partial_renders_empty() {
        assert_eq!(render_str("a{{>nope}}b", &Context::new()), "ab");
    }

    #[test]
    fn test_recursive_partial_is_bounded() {
        let store = MapStore::new(&[("loop", "{{>loop}}")]);
        let template = compile("page", "{{>loop}}").unwrap();
        assert!(render(&template, &Context::new(), &store).is_err());
    }

    #[test]
    fn test_partial_names() {
        let template = compile("page", "{{>a}}{{#s}}{{>b}}{{>a}}{{/s}}").unwrap();
        assert_eq!(template.partial_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_unbalanced_sections() {
        assert!(matches!(
            compile("t", "{{#a}}x"),
            Err(WebplusError::TemplateSyntaxError(msg)) if msg.contains("Unclosed") && msg.contains("'t'")
        ));
        assert!(compile("t", "{{#a}}x{{/b}}").is_err());
        assert!(compile("t", "x{{/b}}").is_err());
    }

    #[test]
    fn test_indent_lines() {
        assert_eq!(indent_lines("a\nb\n", "  "), "  a\n  b\n");
        assert_eq!(indent_lines("a", "  "), "  a");
        assert_eq!(indent_lines("", "  "), "");
    }
}
