//! Localized validation messages.
//!
//! A [`MessageTemplates`] set maps each [`ErrorKind`] to a template closure
//! per language. Lookup tries the current language, then the default
//! language, then falls back to a generic `incorrect "<label>"` message.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::error::{FieldError, FieldResult};
use crate::validation::ErrorKind;

/// Renders a message for one failure kind.
pub type Template = Arc<dyn Fn(&ErrorContext) -> String + Send + Sync>;

/// Returns the language messages should currently be rendered in.
pub type LangSelector = Arc<dyn Fn() -> String + Send + Sync>;

/// Everything a template may mention about the failing field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    pub label_or_name: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub same_label_or_name: Option<String>,
    pub expected_type: Option<String>,
    pub current_type: Option<String>,
    pub pattern: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub fn new(label_or_name: impl Into<String>) -> Self {
        Self {
            label_or_name: label_or_name.into(),
            ..Self::default()
        }
    }
}

/// Per-language validation message templates.
#[derive(Clone)]
pub struct MessageTemplates {
    langs: HashMap<String, HashMap<ErrorKind, Template>>,
    current_lang: LangSelector,
    default_lang: String,
}

impl MessageTemplates {
    /// Creates an empty set whose current language is always `default_lang`.
    #[must_use]
    pub fn new(default_lang: impl Into<String>) -> Self {
        let default_lang = default_lang.into();
        let fixed = default_lang.clone();
        Self {
            langs: HashMap::new(),
            current_lang: Arc::new(move || fixed.clone()),
            default_lang,
        }
    }

    /// The built-in English set.
    #[must_use]
    pub fn english() -> Self {
        let mut templates: HashMap<ErrorKind, Template> = HashMap::new();
        templates.insert(
            ErrorKind::Required,
            Arc::new(|ctx| format!("Field \"{}\" is required", ctx.label_or_name)),
        );
        templates.insert(
            ErrorKind::Length,
            Arc::new(|ctx| {
                format!(
                    "Length of field \"{}\" must be{} characters",
                    ctx.label_or_name,
                    bounds(ctx)
                )
            }),
        );
        templates.insert(
            ErrorKind::Range,
            Arc::new(|ctx| {
                format!(
                    "Value of field \"{}\" must be in range{}",
                    ctx.label_or_name,
                    bounds(ctx)
                )
            }),
        );
        templates.insert(
            ErrorKind::Pattern,
            Arc::new(|ctx| format!("Check the format of field \"{}\"", ctx.label_or_name)),
        );
        templates.insert(
            ErrorKind::Options,
            Arc::new(|ctx| {
                format!(
                    "Value of field \"{}\" does not match the available options",
                    ctx.label_or_name
                )
            }),
        );
        templates.insert(
            ErrorKind::Same,
            Arc::new(|ctx| {
                format!(
                    "Fields \"{}\" and \"{}\" must match",
                    ctx.label_or_name,
                    ctx.same_label_or_name.as_deref().unwrap_or_default()
                )
            }),
        );
        templates.insert(
            ErrorKind::Type,
            Arc::new(|ctx| {
                format!(
                    "Invalid type of field \"{}\", expected \"{}\", got \"{}\"",
                    ctx.label_or_name,
                    ctx.expected_type.as_deref().unwrap_or_default(),
                    ctx.current_type.as_deref().unwrap_or_default()
                )
            }),
        );
        templates.insert(
            ErrorKind::OneOf,
            Arc::new(|ctx| {
                format!(
                    "Value of field \"{}\" must match exactly one variant",
                    ctx.label_or_name
                )
            }),
        );

        let mut set = Self::new("en");
        set.langs.insert("en".to_string(), templates);
        set
    }

    /// Registers (or replaces) the templates of one language.
    pub fn with_lang(
        mut self,
        lang: impl Into<String>,
        templates: HashMap<ErrorKind, Template>,
    ) -> FieldResult<Self> {
        let lang = lang.into();
        if templates.is_empty() {
            return Err(FieldError::EmptyLangTemplates(lang));
        }
        self.langs.insert(lang, templates);
        Ok(self)
    }

    /// Registers a single template.
    #[must_use]
    pub fn with_template(
        mut self,
        lang: impl Into<String>,
        kind: ErrorKind,
        template: impl Fn(&ErrorContext) -> String + Send + Sync + 'static,
    ) -> Self {
        self.langs
            .entry(lang.into())
            .or_default()
            .insert(kind, Arc::new(template));
        self
    }

    /// Installs the current-language selector.
    #[must_use]
    pub fn with_current_lang(mut self, selector: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.current_lang = Arc::new(selector);
        self
    }

    /// Pins the current language.
    #[must_use]
    pub fn with_fixed_lang(self, lang: impl Into<String>) -> Self {
        let lang = lang.into();
        self.with_current_lang(move || lang.clone())
    }

    #[must_use]
    pub fn with_default_lang(mut self, lang: impl Into<String>) -> Self {
        self.default_lang = lang.into();
        self
    }

    /// Fails when no language has been registered.
    pub fn ensure_not_empty(&self) -> FieldResult<()> {
        if self.langs.is_empty() {
            return Err(FieldError::EmptyTemplates);
        }
        Ok(())
    }

    #[must_use]
    pub fn current_lang(&self) -> String {
        (self.current_lang)()
    }

    #[must_use]
    pub fn default_lang(&self) -> &str {
        &self.default_lang
    }

    /// Registered languages, sorted.
    #[must_use]
    pub fn languages(&self) -> Vec<&str> {
        let mut langs: Vec<&str> = self.langs.keys().map(String::as_str).collect();
        langs.sort_unstable();
        langs
    }

    /// Renders the message for `kind`.
    #[must_use]
    pub fn message(&self, kind: ErrorKind, ctx: &ErrorContext) -> String {
        let current = self.current_lang();
        let template = self
            .lookup(&current, kind)
            .or_else(|| self.lookup(&self.default_lang, kind));
        match template {
            Some(render) => render(ctx),
            None => {
                warn!(
                    kind = %kind,
                    lang = %current,
                    default_lang = %self.default_lang,
                    "no validation message template"
                );
                format!("incorrect \"{}\"", ctx.label_or_name)
            }
        }
    }

    fn lookup(&self, lang: &str, kind: ErrorKind) -> Option<&Template> {
        self.langs.get(lang)?.get(&kind)
    }
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self::english()
    }
}

impl fmt::Debug for MessageTemplates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageTemplates")
            .field("langs", &self.languages())
            .field("default_lang", &self.default_lang)
            .finish_non_exhaustive()
    }
}

fn bounds(ctx: &ErrorContext) -> String {
    let mut out = String::new();
    if let Some(min) = ctx.min {
        out.push_str(&format!(" from {min}"));
    }
    if let Some(max) = ctx.max {
        out.push_str(&format!(" to {max}"));
    }
    out
}
