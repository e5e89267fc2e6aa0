//! Type definitions for the Retroznak form API

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ==================== Form Types ====================

/// Which landing-page form produced the submission.
///
/// Each variant selects its own set of applicable fields, so a validated
/// submission can never carry fields that do not belong to its form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormType {
    Contact,
    ProductInquiry,
    HistoryInquiry,
}

impl FormType {
    pub const ALL: [FormType; 3] = [
        FormType::Contact,
        FormType::ProductInquiry,
        FormType::HistoryInquiry,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "contact" => Some(FormType::Contact),
            "product_inquiry" => Some(FormType::ProductInquiry),
            "history_inquiry" => Some(FormType::HistoryInquiry),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FormType::Contact => "contact",
            FormType::ProductInquiry => "product_inquiry",
            FormType::HistoryInquiry => "history_inquiry",
        }
    }

    /// Display name used in email subjects and titles.
    pub fn title(&self) -> &'static str {
        match self {
            FormType::Contact => "Обратная связь",
            FormType::ProductInquiry => "Запрос продукта",
            FormType::HistoryInquiry => "Запрос истории дома",
        }
    }
}

/// Retroznak model requested in a product inquiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductType {
    Obychny,
    Petrogradsky,
    Leningradsky,
}

impl ProductType {
    pub const ALLOWED: [&'static str; 3] = ["obychny", "petrogradsky", "leningradsky"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "obychny" => Some(ProductType::Obychny),
            "petrogradsky" => Some(ProductType::Petrogradsky),
            "leningradsky" => Some(ProductType::Leningradsky),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ProductType::Obychny => "Обычный",
            ProductType::Petrogradsky => "Петроградский",
            ProductType::Leningradsky => "Ленинградский",
        }
    }
}

/// How the visitor prefers to be contacted back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactMethod {
    Whatsapp,
    Telegram,
    Email,
}

impl ContactMethod {
    pub const ALLOWED: [&'static str; 3] = ["whatsapp", "telegram", "email"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "whatsapp" => Some(ContactMethod::Whatsapp),
            "telegram" => Some(ContactMethod::Telegram),
            "email" => Some(ContactMethod::Email),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ContactMethod::Whatsapp => "WhatsApp",
            ContactMethod::Telegram => "Telegram",
            ContactMethod::Email => "Email",
        }
    }
}

// ==================== Submissions ====================

/// Raw field map decoded from the request body before any validation.
///
/// Repeated `additional_options[]` values are collected into a list; every
/// other field keeps the last value seen.
#[derive(Debug, Default)]
pub struct RawSubmission {
    fields: HashMap<String, String>,
    additional_options: Vec<String>,
}

impl RawSubmission {
    pub fn insert(&mut self, name: &str, value: String) {
        if name == "additional_options[]" || name == "additional_options" {
            let value = value.trim();
            if !value.is_empty() {
                self.additional_options.push(value.to_string());
            }
        } else {
            self.fields.insert(name.to_string(), value);
        }
    }

    /// Raw value of a scalar field, if the client sent it at all.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn additional_options(&self) -> &[String] {
        &self.additional_options
    }
}

/// A submission that passed server-side validation.
///
/// One variant per form type, each carrying only the fields that form
/// collects. Optional fields that were left blank are `None`.
#[derive(Debug, Clone)]
pub enum ValidForm {
    Contact(ContactForm),
    ProductInquiry(ProductInquiryForm),
    HistoryInquiry(HistoryInquiryForm),
}

#[derive(Debug, Clone)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub preferred_contact: ContactMethod,
}

#[derive(Debug, Clone)]
pub struct ProductInquiryForm {
    pub name: String,
    pub email: String,
    pub product_type: ProductType,
    pub address: Option<String>,
    pub budget_range: Option<String>,
    pub additional_options: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct HistoryInquiryForm {
    pub name: String,
    pub email: String,
    pub address: String,
    pub message: Option<String>,
}

impl ValidForm {
    pub fn form_type(&self) -> FormType {
        match self {
            ValidForm::Contact(_) => FormType::Contact,
            ValidForm::ProductInquiry(_) => FormType::ProductInquiry,
            ValidForm::HistoryInquiry(_) => FormType::HistoryInquiry,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ValidForm::Contact(f) => &f.name,
            ValidForm::ProductInquiry(f) => &f.name,
            ValidForm::HistoryInquiry(f) => &f.name,
        }
    }

    /// Normalized (trimmed, lower-cased) submitter email.
    pub fn email(&self) -> &str {
        match self {
            ValidForm::Contact(f) => &f.email,
            ValidForm::ProductInquiry(f) => &f.email,
            ValidForm::HistoryInquiry(f) => &f.email,
        }
    }
}

// ==================== API Responses ====================

/// JSON body returned for every request, success or failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    /// ISO 8601 timestamp of when the response was produced.
    pub timestamp: String,
    /// Per-field validation errors, present only on validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<std::collections::BTreeMap<String, String>>,
}

impl ApiResponse {
    pub fn success(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            details: None,
        }
    }

    pub fn failure(
        message: &str,
        details: Option<std::collections::BTreeMap<String, String>>,
    ) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            details,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
