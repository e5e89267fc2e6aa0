//! Canonical validation rule set and the rule engine that evaluates it.
//!
//! The same rule records drive both sides of the trust boundary: the server
//! evaluates them directly, and `GET /api/validation-rules` exports them so
//! the browser script evaluates the identical schema. There is exactly one
//! place where a length limit or a pattern can live.

use std::collections::BTreeMap;

use regex::Regex;
use serde::Serialize;

use crate::types::{
    ContactForm, ContactMethod, FormType, HistoryInquiryForm, ProductInquiryForm, ProductType,
    RawSubmission, ValidForm,
};

// ==================== Patterns ====================

/// Cyrillic or Latin letters plus spaces.
const NAME_PATTERN: &str = r"^[а-яА-Яa-zA-Z\s]+$";

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// Russian phone formats: optional +7/8 prefix, optional parentheses around
/// the 3-digit code, optional space/dash separators in the 3-2-2 groups.
const PHONE_PATTERN: &str = r"^(\+7|8)?\s?\(?\d{3}\)?\s?\d{3}[-\s]?\d{2}[-\s]?\d{2}$";

const DEFAULT_REQUIRED_MESSAGE: &str = "Поле обязательно для заполнения";
const DEFAULT_INVALID_MESSAGE: &str = "Недопустимое значение";

// ==================== Rule Records ====================

/// Regular expression carried by a rule: the source string is exported to
/// the client, the compiled form is used server-side.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: &'static str,
    regex: Regex,
}

impl Pattern {
    fn new(source: &'static str) -> Self {
        // Patterns are compile-time literals; construction runs once at startup.
        let regex = Regex::new(source).expect("invalid field pattern");
        Self { source, regex }
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl Serialize for Pattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.source)
    }
}

/// Error messages per check, surfaced verbatim to the caller.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleMessages {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub too_short: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub too_long: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<&'static str>,
}

/// One field's validation contract.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRule {
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Pattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<&'static [&'static str]>,
    /// Normalize the accepted value to lower case (used for email).
    pub lowercase: bool,
    pub messages: RuleMessages,
}

impl FieldRule {
    fn new(required: bool) -> Self {
        Self {
            required,
            min_length: None,
            max_length: None,
            pattern: None,
            allowed_values: None,
            lowercase: false,
            messages: RuleMessages::default(),
        }
    }
}

/// A rule attached to its field name, in evaluation order.
#[derive(Debug, Clone, Serialize)]
pub struct NamedRule {
    pub field: &'static str,
    #[serde(flatten)]
    pub rule: FieldRule,
}

/// Rules for one form type, on top of the universal fields.
#[derive(Debug, Clone, Serialize)]
pub struct FormRules {
    pub form_type: FormType,
    pub fields: Vec<NamedRule>,
}

/// The whole canonical schema: fields validated for every form type plus
/// the per-form additions.
#[derive(Debug, Clone, Serialize)]
pub struct RuleSet {
    pub universal: Vec<NamedRule>,
    pub forms: Vec<FormRules>,
}

impl RuleSet {
    /// The fixed rule set for the three landing-page forms.
    pub fn standard() -> Self {
        let name = NamedRule {
            field: "name",
            rule: FieldRule {
                min_length: Some(2),
                max_length: Some(50),
                pattern: Some(Pattern::new(NAME_PATTERN)),
                messages: RuleMessages {
                    required: Some("Имя обязательно для заполнения"),
                    too_short: Some("Имя должно содержать от 2 символов"),
                    too_long: Some("Имя не должно превышать 50 символов"),
                    pattern: Some("Имя должно содержать только буквы и пробелы"),
                    ..RuleMessages::default()
                },
                ..FieldRule::new(true)
            },
        };

        let email = NamedRule {
            field: "email",
            rule: FieldRule {
                pattern: Some(Pattern::new(EMAIL_PATTERN)),
                lowercase: true,
                messages: RuleMessages {
                    required: Some("Email обязателен для заполнения"),
                    pattern: Some("Неверный формат email адреса"),
                    ..RuleMessages::default()
                },
                ..FieldRule::new(true)
            },
        };

        let phone = NamedRule {
            field: "phone",
            rule: FieldRule {
                pattern: Some(Pattern::new(PHONE_PATTERN)),
                messages: RuleMessages {
                    required: Some("Телефон обязателен для заполнения"),
                    pattern: Some("Неверный формат российского номера телефона"),
                    ..RuleMessages::default()
                },
                ..FieldRule::new(false)
            },
        };

        let message = |required| NamedRule {
            field: "message",
            rule: FieldRule {
                max_length: Some(500),
                messages: RuleMessages {
                    required: Some("Сообщение обязательно для заполнения"),
                    too_long: Some("Сообщение не должно превышать 500 символов"),
                    ..RuleMessages::default()
                },
                ..FieldRule::new(required)
            },
        };

        let address = |required| NamedRule {
            field: "address",
            rule: FieldRule {
                max_length: Some(200),
                messages: RuleMessages {
                    required: Some("Адрес обязателен для заполнения"),
                    too_long: Some("Адрес не должен превышать 200 символов"),
                    ..RuleMessages::default()
                },
                ..FieldRule::new(required)
            },
        };

        let preferred_contact = NamedRule {
            field: "preferred_contact",
            rule: FieldRule {
                allowed_values: Some(&ContactMethod::ALLOWED),
                messages: RuleMessages {
                    required: Some("Некорректный способ связи"),
                    allowed: Some("Некорректный способ связи"),
                    ..RuleMessages::default()
                },
                ..FieldRule::new(true)
            },
        };

        let product_type = NamedRule {
            field: "product_type",
            rule: FieldRule {
                allowed_values: Some(&ProductType::ALLOWED),
                messages: RuleMessages {
                    required: Some("Выберите тип ретрознака"),
                    allowed: Some("Некорректный тип ретрознака"),
                    ..RuleMessages::default()
                },
                ..FieldRule::new(true)
            },
        };

        Self {
            universal: vec![name, email],
            forms: vec![
                FormRules {
                    form_type: FormType::Contact,
                    fields: vec![phone, message(false), preferred_contact],
                },
                FormRules {
                    form_type: FormType::ProductInquiry,
                    fields: vec![product_type, address(false)],
                },
                FormRules {
                    form_type: FormType::HistoryInquiry,
                    fields: vec![address(true), message(false)],
                },
            ],
        }
    }

    fn form_rules(&self, form_type: FormType) -> Option<&FormRules> {
        self.forms.iter().find(|f| f.form_type == form_type)
    }
}

// ==================== Rule Engine ====================

/// Evaluate one field. First failure wins: required, then character length,
/// then pattern, then allowed values. An optional empty value passes with
/// an empty normalized value and no further checks.
pub fn evaluate(rule: &FieldRule, raw: &str) -> Result<String, String> {
    let value = raw.trim();

    if value.is_empty() {
        if rule.required {
            return Err(rule
                .messages
                .required
                .unwrap_or(DEFAULT_REQUIRED_MESSAGE)
                .to_string());
        }
        return Ok(String::new());
    }

    // Character count, not byte count: Cyrillic input is multi-byte UTF-8.
    let length = value.chars().count();
    if let Some(min) = rule.min_length {
        if length < min {
            return Err(rule
                .messages
                .too_short
                .unwrap_or(DEFAULT_INVALID_MESSAGE)
                .to_string());
        }
    }
    if let Some(max) = rule.max_length {
        if length > max {
            return Err(rule
                .messages
                .too_long
                .unwrap_or(DEFAULT_INVALID_MESSAGE)
                .to_string());
        }
    }

    if let Some(pattern) = &rule.pattern {
        if !pattern.is_match(value) {
            return Err(rule
                .messages
                .pattern
                .unwrap_or(DEFAULT_INVALID_MESSAGE)
                .to_string());
        }
    }

    if let Some(allowed) = rule.allowed_values {
        if !allowed.contains(&value) {
            return Err(rule
                .messages
                .allowed
                .unwrap_or(DEFAULT_INVALID_MESSAGE)
                .to_string());
        }
    }

    let mut normalized = value.to_string();
    if rule.lowercase {
        normalized = normalized.to_lowercase();
    }
    Ok(normalized)
}

// ==================== Dispatcher ====================

/// Validate a raw submission against the rule set and build the typed form.
///
/// All failing fields are collected before returning, so the caller gets
/// every error at once. A missing `form_type` defaults to `contact`; an
/// unrecognized one fails on `form_type` itself and skips the form-specific
/// fields, though the universal fields are still reported.
pub fn validate_submission(
    rules: &RuleSet,
    raw: &RawSubmission,
) -> Result<ValidForm, BTreeMap<String, String>> {
    let mut errors = BTreeMap::new();
    let mut values: BTreeMap<&'static str, String> = BTreeMap::new();

    let form_type_raw = raw.field("form_type").unwrap_or("contact").trim();
    let form_type = FormType::parse(form_type_raw);
    if form_type.is_none() {
        errors.insert("form_type".to_string(), "Некорректный тип формы".to_string());
    }

    let run = |named: &NamedRule, errors: &mut BTreeMap<String, String>,
                   values: &mut BTreeMap<&'static str, String>| {
        match evaluate(&named.rule, raw.field(named.field).unwrap_or("")) {
            Ok(value) => {
                values.insert(named.field, value);
            }
            Err(message) => {
                errors.insert(named.field.to_string(), message);
            }
        }
    };

    for named in &rules.universal {
        run(named, &mut errors, &mut values);
    }

    if let Some(form_type) = form_type {
        if let Some(form_rules) = rules.form_rules(form_type) {
            for named in &form_rules.fields {
                run(named, &mut errors, &mut values);
            }
        }
    }

    let Some(form_type) = form_type else {
        return Err(errors);
    };
    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(build_form(form_type, &values, raw))
}

fn build_form(
    form_type: FormType,
    values: &BTreeMap<&'static str, String>,
    raw: &RawSubmission,
) -> ValidForm {
    let required = |field: &str| values.get(field).cloned().unwrap_or_default();
    let optional = |field: &str| values.get(field).filter(|v| !v.is_empty()).cloned();

    match form_type {
        FormType::Contact => {
            // The enum check already passed, so parse cannot fail here; the
            // fallback only keeps this path panic-free.
            let preferred_contact = ContactMethod::parse(&required("preferred_contact"))
                .unwrap_or(ContactMethod::Email);
            ValidForm::Contact(ContactForm {
                name: required("name"),
                email: required("email"),
                phone: optional("phone"),
                message: optional("message"),
                preferred_contact,
            })
        }
        FormType::ProductInquiry => {
            let product_type =
                ProductType::parse(&required("product_type")).unwrap_or(ProductType::Obychny);
            let budget_range = raw
                .field("budget_range")
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string);
            ValidForm::ProductInquiry(ProductInquiryForm {
                name: required("name"),
                email: required("email"),
                product_type,
                address: optional("address"),
                budget_range,
                additional_options: raw.additional_options().to_vec(),
            })
        }
        FormType::HistoryInquiry => ValidForm::HistoryInquiry(HistoryInquiryForm {
            name: required("name"),
            email: required("email"),
            address: required("address"),
            message: optional("message"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> RuleSet {
        RuleSet::standard()
    }

    fn submission(pairs: &[(&str, &str)]) -> RawSubmission {
        let mut raw = RawSubmission::default();
        for (name, value) in pairs {
            raw.insert(name, value.to_string());
        }
        raw
    }

    fn name_rule(rules: &RuleSet) -> FieldRule {
        rules.universal[0].rule.clone()
    }

    #[test]
    fn name_of_one_character_fails_length() {
        let err = evaluate(&name_rule(&rules()), "A").unwrap_err();
        assert_eq!(err, "Имя должно содержать от 2 символов");
    }

    #[test]
    fn latin_name_with_space_passes() {
        assert_eq!(
            evaluate(&name_rule(&rules()), "Anna Ivanova").unwrap(),
            "Anna Ivanova"
        );
    }

    #[test]
    fn cyrillic_name_passes_and_counts_characters_not_bytes() {
        // Two Cyrillic characters are four bytes; min_length is 2 characters.
        assert_eq!(evaluate(&name_rule(&rules()), "Ия").unwrap(), "Ия");
    }

    #[test]
    fn name_with_digits_fails_pattern() {
        let err = evaluate(&name_rule(&rules()), "Anna123").unwrap_err();
        assert_eq!(err, "Имя должно содержать только буквы и пробелы");
    }

    #[test]
    fn name_at_max_length_passes_and_one_over_fails() {
        let rule = name_rule(&rules());
        assert!(evaluate(&rule, &"а".repeat(50)).is_ok());
        let err = evaluate(&rule, &"а".repeat(51)).unwrap_err();
        assert_eq!(err, "Имя не должно превышать 50 символов");
    }

    #[test]
    fn email_is_trimmed_and_lowercased() {
        let rule = rules().universal[1].rule.clone();
        assert_eq!(
            evaluate(&rule, "  User@Example.COM ").unwrap(),
            "user@example.com"
        );
    }

    #[test]
    fn malformed_email_fails() {
        let rule = rules().universal[1].rule.clone();
        assert_eq!(
            evaluate(&rule, "not-an-email").unwrap_err(),
            "Неверный формат email адреса"
        );
    }

    #[test]
    fn phone_accepts_common_russian_formats() {
        let rules = rules();
        let contact = rules.form_rules(FormType::Contact).unwrap();
        let phone = contact.fields.iter().find(|f| f.field == "phone").unwrap();
        assert!(evaluate(&phone.rule, "+7 912 345-67-89").is_ok());
        assert!(evaluate(&phone.rule, "8(912)3456789").is_ok());
        assert!(evaluate(&phone.rule, "12345").is_err());
    }

    #[test]
    fn empty_optional_phone_passes_with_empty_value() {
        let rules = rules();
        let contact = rules.form_rules(FormType::Contact).unwrap();
        let phone = contact.fields.iter().find(|f| f.field == "phone").unwrap();
        assert_eq!(evaluate(&phone.rule, "   ").unwrap(), "");
    }

    #[test]
    fn message_length_boundary_is_inclusive() {
        let rules = rules();
        let contact = rules.form_rules(FormType::Contact).unwrap();
        let message = contact.fields.iter().find(|f| f.field == "message").unwrap();
        assert!(evaluate(&message.rule, &"ж".repeat(500)).is_ok());
        assert_eq!(
            evaluate(&message.rule, &"ж".repeat(501)).unwrap_err(),
            "Сообщение не должно превышать 500 символов"
        );
    }

    #[test]
    fn valid_contact_submission_builds_typed_form() {
        let raw = submission(&[
            ("form_type", "contact"),
            ("name", "Анна Иванова"),
            ("email", "Anna@Example.com"),
            ("phone", "+7 912 345-67-89"),
            ("preferred_contact", "telegram"),
        ]);
        let form = validate_submission(&rules(), &raw).unwrap();
        match form {
            ValidForm::Contact(contact) => {
                assert_eq!(contact.email, "anna@example.com");
                assert_eq!(contact.phone.as_deref(), Some("+7 912 345-67-89"));
                assert_eq!(contact.message, None);
                assert_eq!(contact.preferred_contact, ContactMethod::Telegram);
            }
            other => panic!("expected contact form, got {other:?}"),
        }
    }

    #[test]
    fn product_inquiry_without_product_type_fails_on_that_field() {
        let raw = submission(&[
            ("form_type", "product_inquiry"),
            ("name", "Анна"),
            ("email", "anna@example.com"),
        ]);
        let errors = validate_submission(&rules(), &raw).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["product_type"], "Выберите тип ретрознака");
    }

    #[test]
    fn unknown_form_type_fails_without_form_specific_dispatch() {
        let raw = submission(&[
            ("form_type", "bogus"),
            ("name", "Анна"),
            ("email", "bad-email"),
            ("product_type", "also-bogus"),
        ]);
        let errors = validate_submission(&rules(), &raw).unwrap_err();
        assert_eq!(errors["form_type"], "Некорректный тип формы");
        // Universal fields are still reported, form-specific ones are not.
        assert!(errors.contains_key("email"));
        assert!(!errors.contains_key("product_type"));
    }

    #[test]
    fn missing_form_type_defaults_to_contact() {
        let raw = submission(&[
            ("name", "Анна"),
            ("email", "anna@example.com"),
            ("preferred_contact", "email"),
        ]);
        let form = validate_submission(&rules(), &raw).unwrap();
        assert_eq!(form.form_type(), FormType::Contact);
    }

    #[test]
    fn contact_without_preferred_contact_fails() {
        let raw = submission(&[
            ("form_type", "contact"),
            ("name", "Анна"),
            ("email", "anna@example.com"),
        ]);
        let errors = validate_submission(&rules(), &raw).unwrap_err();
        assert_eq!(errors["preferred_contact"], "Некорректный способ связи");
    }

    #[test]
    fn history_inquiry_requires_address() {
        let raw = submission(&[
            ("form_type", "history_inquiry"),
            ("name", "Анна"),
            ("email", "anna@example.com"),
        ]);
        let errors = validate_submission(&rules(), &raw).unwrap_err();
        assert_eq!(errors["address"], "Адрес обязателен для заполнения");
    }

    #[test]
    fn address_at_limit_passes_and_over_limit_fails() {
        let mut ok = submission(&[
            ("form_type", "history_inquiry"),
            ("name", "Анна"),
            ("email", "anna@example.com"),
        ]);
        ok.insert("address", "у".repeat(200));
        assert!(validate_submission(&rules(), &ok).is_ok());

        let mut too_long = submission(&[
            ("form_type", "history_inquiry"),
            ("name", "Анна"),
            ("email", "anna@example.com"),
        ]);
        too_long.insert("address", "у".repeat(201));
        let errors = validate_submission(&rules(), &too_long).unwrap_err();
        assert_eq!(errors["address"], "Адрес не должен превышать 200 символов");
    }

    #[test]
    fn all_errors_are_collected_at_once() {
        let raw = submission(&[
            ("form_type", "product_inquiry"),
            ("name", "A"),
            ("email", "broken"),
        ]);
        let errors = validate_submission(&rules(), &raw).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains_key("name"));
        assert!(errors.contains_key("email"));
        assert!(errors.contains_key("product_type"));
    }

    #[test]
    fn additional_options_are_carried_through() {
        let mut raw = submission(&[
            ("form_type", "product_inquiry"),
            ("name", "Анна"),
            ("email", "anna@example.com"),
            ("product_type", "leningradsky"),
            ("budget_range", " 10000_plus "),
        ]);
        raw.insert("additional_options[]", "led_lighting".to_string());
        raw.insert("additional_options[]", "street_plate".to_string());
        let form = validate_submission(&rules(), &raw).unwrap();
        match form {
            ValidForm::ProductInquiry(inquiry) => {
                assert_eq!(inquiry.product_type, ProductType::Leningradsky);
                assert_eq!(inquiry.budget_range.as_deref(), Some("10000_plus"));
                assert_eq!(inquiry.additional_options, ["led_lighting", "street_plate"]);
            }
            other => panic!("expected product inquiry, got {other:?}"),
        }
    }

    #[test]
    fn rule_set_serializes_pattern_sources_for_the_client() {
        let json = serde_json::to_value(rules()).unwrap();
        let name = &json["universal"][0];
        assert_eq!(name["field"], "name");
        assert_eq!(name["minLength"], 2);
        assert_eq!(name["pattern"], NAME_PATTERN);
        assert_eq!(json["forms"][1]["form_type"], "product_inquiry");
    }
}
