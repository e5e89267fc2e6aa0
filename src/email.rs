//! HTML email rendering for validated submissions.
//!
//! Pure transformation: a validated form plus request metadata becomes a
//! subject, an HTML body and a header set. No I/O happens here.

use std::net::IpAddr;

use axum::http::header::{HOST, REFERER};
use axum::http::HeaderMap;
use chrono::{DateTime, FixedOffset, Utc};

use crate::config::Config;
use crate::net::resolve_client_ip;
use crate::types::ValidForm;

const MAILER_MARKER: &str = "RetroZnak-Form/2.0";

/// Moscow is UTC+3 year-round.
fn moscow_offset() -> FixedOffset {
    FixedOffset::east_opt(3 * 3600).expect("valid UTC offset")
}

// ==================== Request Metadata ====================

/// Metadata captured from the incoming request before the body is consumed.
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub timestamp: DateTime<FixedOffset>,
    pub client_ip: IpAddr,
    pub referer: Option<String>,
    pub host: Option<String>,
}

impl SystemInfo {
    pub fn from_request(headers: &HeaderMap, peer: IpAddr) -> Self {
        let header_str = |name: axum::http::HeaderName| {
            headers.get(name).and_then(|v| v.to_str().ok())
        };
        Self {
            timestamp: Utc::now().with_timezone(&moscow_offset()),
            client_ip: resolve_client_ip(headers, peer),
            referer: header_str(REFERER).map(str::to_string),
            host: header_str(HOST).map(str::to_string),
        }
    }

    fn date_line(&self) -> String {
        format!("{} (МСК)", self.timestamp.format("%d.%m.%Y %H:%M:%S"))
    }
}

// ==================== Payload ====================

/// Composed email, ready to hand to the mail transport.
#[derive(Debug, Clone)]
pub struct EmailPayload {
    pub subject: String,
    pub html_body: String,
    pub headers: Vec<(String, String)>,
}

/// Render the notification email for one validated submission.
pub fn render(form: &ValidForm, info: &SystemInfo, config: &Config) -> EmailPayload {
    let title = form.form_type().title();
    let domain = info.host.as_deref().unwrap_or(&config.site_domain);
    let from_email = format!("noreply@{domain}");

    EmailPayload {
        subject: format!("{title} с сайта Ретрознак - {}", form.name()),
        html_body: build_html(form, info, title),
        headers: vec![
            ("MIME-Version".to_string(), "1.0".to_string()),
            (
                "Content-Type".to_string(),
                "text/html; charset=UTF-8".to_string(),
            ),
            (
                "From".to_string(),
                format!("{} <{from_email}>", config.site_name),
            ),
            ("Reply-To".to_string(), form.email().to_string()),
            ("X-Mailer".to_string(), MAILER_MARKER.to_string()),
            ("X-Priority".to_string(), "3".to_string()),
            ("Return-Path".to_string(), from_email),
        ],
    }
}

// ==================== HTML ====================

fn build_html(form: &ValidForm, info: &SystemInfo, title: &str) -> String {
    format!(
        r#"<html>
<head><meta charset="UTF-8"></head>
<body style="font-family: Georgia, Arial, sans-serif; color: #333; line-height: 1.6;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2 style="color: #f97316; border-bottom: 2px solid #f97316; padding-bottom: 10px;">
      {title} с сайта Ретрознак
    </h2>
    <table style="border-collapse: collapse; width: 100%; margin-bottom: 20px; background: #f9fafb; border-radius: 8px;">
{form_rows}    </table>
    <h3 style="color: #374151; margin-top: 30px;">Техническая информация</h3>
    <table style="border-collapse: collapse; width: 100%; background: #f3f4f6; border-radius: 8px;">
{system_rows}    </table>
    <div style="margin-top: 30px; padding: 15px; background: #111827; color: #f9fafb; border-radius: 8px; text-align: center;">
      <p style="margin: 0; font-style: italic;">
        🏠 Домовые знаки советской эпохи - Превратите адрес в часть семейной истории
      </p>
    </div>
  </div>
</body>
</html>"#,
        title = escape_html(title),
        form_rows = build_form_rows(form),
        system_rows = build_system_rows(info),
    )
}

/// One table row per non-empty field; empty optionals are omitted entirely.
fn build_form_rows(form: &ValidForm) -> String {
    let mut rows = String::new();
    rows.push_str(&table_row("Имя", &escape_html(form.name())));
    rows.push_str(&table_row("Email", &escape_html(form.email())));

    match form {
        ValidForm::Contact(contact) => {
            if let Some(phone) = &contact.phone {
                rows.push_str(&table_row("Телефон", &escape_html(phone)));
            }
            rows.push_str(&table_row(
                "Предпочтительный способ связи",
                contact.preferred_contact.title(),
            ));
            if let Some(message) = &contact.message {
                rows.push_str(&table_row("Сообщение", &nl2br(message)));
            }
        }
        ValidForm::ProductInquiry(inquiry) => {
            rows.push_str(&table_row("Тип ретрознака", inquiry.product_type.title()));
            if let Some(budget) = &inquiry.budget_range {
                rows.push_str(&table_row("Бюджет", &escape_html(budget)));
            }
            if !inquiry.additional_options.is_empty() {
                let options = inquiry.additional_options.join(", ");
                rows.push_str(&table_row("Дополнительные опции", &escape_html(&options)));
            }
            if let Some(address) = &inquiry.address {
                rows.push_str(&table_row("Адрес", &escape_html(address)));
            }
        }
        ValidForm::HistoryInquiry(inquiry) => {
            rows.push_str(&table_row("Адрес", &escape_html(&inquiry.address)));
            if let Some(message) = &inquiry.message {
                rows.push_str(&table_row("Сообщение", &nl2br(message)));
            }
        }
    }

    rows
}

fn build_system_rows(info: &SystemInfo) -> String {
    let referer = info.referer.as_deref().unwrap_or("Прямой переход");
    let mut rows = String::new();
    rows.push_str(&table_row("Дата и время", &escape_html(&info.date_line())));
    rows.push_str(&table_row("IP адрес", &escape_html(&info.client_ip.to_string())));
    rows.push_str(&table_row("Источник перехода", &escape_html(referer)));
    rows
}

/// `value_html` is already escaped (or deliberately pre-formatted HTML).
fn table_row(label: &str, value_html: &str) -> String {
    format!(
        "      <tr>\n        <td style=\"padding: 12px; border-bottom: 1px solid #e5e7eb; font-weight: bold; vertical-align: top; width: 30%;\">{label}:</td>\n        <td style=\"padding: 12px; border-bottom: 1px solid #e5e7eb; vertical-align: top;\">{value_html}</td>\n      </tr>\n"
    )
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escape first, then turn line breaks into `<br>`.
fn nl2br(value: &str) -> String {
    escape_html(value).replace("\r\n", "\n").replace('\n', "<br>")
}
