use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use recordkit_field::{
    BuildEnv, ErrorContext, ErrorKind, FieldBuilder, FieldError, Fieldable, MessageTemplates,
    Template,
};
use serde_json::{Map, json};

fn german() -> HashMap<ErrorKind, Template> {
    let mut t: HashMap<ErrorKind, Template> = HashMap::new();
    t.insert(
        ErrorKind::Required,
        Arc::new(|ctx: &ErrorContext| format!("Feld \"{}\" ist erforderlich", ctx.label_or_name)),
    );
    t
}

// ── Lookup order ─────────────────────────────────────────────────

#[test]
fn english_is_the_default_set() {
    let t = MessageTemplates::default();
    assert_eq!(t.default_lang(), "en");
    assert_eq!(t.current_lang(), "en");
    assert_eq!(t.languages(), vec!["en"]);
    for kind in ErrorKind::ALL {
        assert!(!t.message(kind, &ErrorContext::new("x")).starts_with("incorrect"));
    }
}

#[test]
fn current_language_wins() {
    let t = MessageTemplates::english()
        .with_lang("de", german())
        .unwrap()
        .with_fixed_lang("de");
    assert_eq!(
        t.message(ErrorKind::Required, &ErrorContext::new("Name")),
        "Feld \"Name\" ist erforderlich"
    );
}

#[test]
fn falls_back_to_default_language() {
    let t = MessageTemplates::english()
        .with_lang("de", german())
        .unwrap()
        .with_fixed_lang("de");
    assert_eq!(
        t.message(ErrorKind::Pattern, &ErrorContext::new("Name")),
        "Check the format of field \"Name\""
    );
}

#[test]
fn falls_back_to_generic_message() {
    let t = MessageTemplates::new("xx").with_template("xx", ErrorKind::Required, |_| "r".into());
    assert_eq!(t.message(ErrorKind::Range, &ErrorContext::new("Age")), "incorrect \"Age\"");
}

#[test]
fn language_selector_is_consulted_per_message() {
    let lang = Arc::new(RwLock::new("en".to_string()));
    let selected = lang.clone();
    let t = MessageTemplates::english()
        .with_lang("de", german())
        .unwrap()
        .with_current_lang(move || selected.read().unwrap().clone());

    let ctx = ErrorContext::new("Name");
    assert_eq!(t.message(ErrorKind::Required, &ctx), "Field \"Name\" is required");
    *lang.write().unwrap() = "de".into();
    assert_eq!(t.message(ErrorKind::Required, &ctx), "Feld \"Name\" ist erforderlich");
}

// ── Registration errors ──────────────────────────────────────────

#[test]
fn empty_language_is_rejected() {
    let err = MessageTemplates::english()
        .with_lang("de", HashMap::new())
        .unwrap_err();
    assert!(matches!(err, FieldError::EmptyLangTemplates(ref l) if l == "de"));
}

#[test]
fn empty_set_is_reported() {
    assert!(matches!(
        MessageTemplates::new("en").ensure_not_empty(),
        Err(FieldError::EmptyTemplates)
    ));
    assert!(MessageTemplates::english().ensure_not_empty().is_ok());
}

// ── Fields use bound templates ───────────────────────────────────

#[test]
fn fields_render_with_bound_templates() {
    let env = BuildEnv {
        templates: Arc::new(
            MessageTemplates::english()
                .with_lang("de", german())
                .unwrap()
                .with_fixed_lang("de"),
        ),
        ..BuildEnv::default()
    };
    let field = FieldBuilder::string().label("Titel").build("title", &env).unwrap();
    let err = field.validate(&json!(null), &Map::new()).error.unwrap();
    assert_eq!(err.message, "Feld \"Titel\" ist erforderlich");
}

#[test]
fn range_message_omits_missing_bound() {
    let t = MessageTemplates::english();
    let ctx = ErrorContext {
        max: Some(10.0),
        ..ErrorContext::new("Qty")
    };
    assert_eq!(
        t.message(ErrorKind::Range, &ctx),
        "Value of field \"Qty\" must be in range to 10"
    );
}
