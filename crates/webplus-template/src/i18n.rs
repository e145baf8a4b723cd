//! The `i18n` translation hook.
//!
//! Templates translate through a section lambda:
//!
//! ```text
//! {{#i18n}}welcome{{/i18n}}
//! {{#i18n}}welcome [{{siteId}}]{{/i18n}}
//! ```
//!
//! The section text is split on whitespace. The first word is the message
//! key; any further words are positional arguments, stripped of surrounding
//! `[` and `]`, substituted into the message's `{}` / `{0}` placeholders.
//! Missing keys translate to [`MISSING_TRANSLATION`].

use std::sync::Arc;

use crate::context::ContextValue;
use crate::locale::{LocaleTable, MessageMap};

/// The context key the translation lambda is bound to.
pub const I18N_KEY: &str = "i18n";

/// Returned for a key absent from the active language.
pub const MISSING_TRANSLATION: &str = "default";

/// Translates message codes for one language.
///
/// If the table has no entry for the language, the fallback language's
/// messages are used instead. The choice is made once, at construction.
#[derive(Debug, Clone)]
pub struct Translator {
    table: Arc<LocaleTable>,
    language: String,
    messages_language: String,
}

impl Translator {
    /// Creates a translator for `language` over `table`.
    pub fn new(
        table: Arc<LocaleTable>,
        language: impl Into<String>,
        fallback_language: impl Into<String>,
    ) -> Self {
        let language = language.into();
        let messages_language = if table.get(&language).is_some() {
            language.clone()
        } else {
            let fallback = fallback_language.into();
            tracing::debug!(
                language = %language,
                fallback = %fallback,
                "No locale for language, using fallback"
            );
            fallback
        };
        Self {
            table,
            language,
            messages_language,
        }
    }

    /// Returns the active language.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Returns the language whose messages are looked up: the active
    /// language, or the fallback if the table has no entry for it.
    pub fn messages_language(&self) -> &str {
        &self.messages_language
    }

    fn messages(&self) -> Option<&MessageMap> {
        self.table.get(&self.messages_language)
    }

    /// Translates a code of the form `key [arg0] [arg1] ...`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use webplus_template::i18n::Translator;
    /// use webplus_template::locale::{LocaleTable, MessageMap};
    ///
    /// let mut en = MessageMap::new();
    /// en.insert("greet".into(), "Hello {0}!".into());
    /// let mut table = LocaleTable::new();
    /// table.insert("en", en);
    ///
    /// let t = Translator::new(Arc::new(table), "en", "en");
    /// assert_eq!(t.translate("greet [World]"), "Hello World!");
    /// assert_eq!(t.translate("missing"), "default");
    /// ```
    pub fn translate(&self, code: &str) -> String {
        let mut words = code.split_whitespace();
        let Some(key) = words.next() else {
            return MISSING_TRANSLATION.to_string();
        };
        let message = self
            .messages()
            .and_then(|messages| messages.get(key))
            .map_or(MISSING_TRANSLATION, String::as_str);

        let args: Vec<&str> = words.map(strip_brackets).collect();
        if args.is_empty() {
            message.to_string()
        } else {
            format_positional(message, &args)
        }
    }

    /// Wraps this translator as the section lambda bound to [`I18N_KEY`].
    pub fn into_lambda(self) -> ContextValue {
        ContextValue::lambda(move |text| self.translate(text))
    }
}

/// Strips any run of `[` and `]` characters from both ends of `arg`.
pub fn strip_brackets(arg: &str) -> &str {
    arg.trim_matches(|c| c == '[' || c == ']')
}

/// Substitutes `args` into `{}` and `{N}` placeholders.
///
/// `{{` and `}}` produce literal braces. A placeholder with no matching
/// argument, or with a non-numeric name, is copied through unchanged.
pub fn format_positional(template: &str, args: &[&str]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut next_auto = 0;
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        output.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            output.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            output.push('}');
            rest = &tail[2..];
        } else if tail.starts_with('}') {
            output.push('}');
            rest = &tail[1..];
        } else if let Some(close) = tail.find('}') {
            let field = &tail[1..close];
            let index = if field.is_empty() {
                let index = next_auto;
                next_auto += 1;
                Some(index)
            } else {
                field.parse::<usize>().ok()
            };
            match index.and_then(|i| args.get(i)) {
                Some(arg) => output.push_str(arg),
                None => output.push_str(&tail[..=close]),
            }
            rest = &tail[close + 1..];
        } else {
            output.push_str(tail);
            rest = "";
        }
    }

    output.push_str(rest);
    output
}
