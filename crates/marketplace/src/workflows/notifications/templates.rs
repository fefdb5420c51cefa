use std::fmt::Write as _;

use rust_decimal::Decimal;

use super::domain::EmailMessage;

/// Structured email content rendered into matching HTML and plain-text bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailBody {
    pub greeting: String,
    pub heading: String,
    pub paragraphs: Vec<String>,
    pub details: Vec<(String, String)>,
    pub action: Option<EmailAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAction {
    pub label: String,
    pub url: String,
}

impl EmailBody {
    pub fn new(recipient_name: &str, heading: impl Into<String>) -> Self {
        let name = recipient_name.trim();
        let greeting = if name.is_empty() {
            "Hello,".to_string()
        } else {
            format!("Hello {name},")
        };

        Self {
            greeting,
            heading: heading.into(),
            ..Self::default()
        }
    }

    pub fn paragraph(mut self, text: impl Into<String>) -> Self {
        self.paragraphs.push(text.into());
        self
    }

    pub fn detail(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((label.into(), value.into()));
        self
    }

    pub fn action(mut self, label: impl Into<String>, url: impl Into<String>) -> Self {
        self.action = Some(EmailAction {
            label: label.into(),
            url: url.into(),
        });
        self
    }

    pub fn render(&self, to: &str, subject: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            html: self.render_html(),
            text: self.render_text(),
        }
    }

    fn render_html(&self) -> String {
        let mut html = String::new();
        writeln!(html, "<h1>{}</h1>", escape_html(&self.heading)).expect("write heading");
        writeln!(html, "<p>{}</p>", escape_html(&self.greeting)).expect("write greeting");

        for paragraph in &self.paragraphs {
            writeln!(html, "<p>{}</p>", escape_html(paragraph)).expect("write paragraph");
        }

        if !self.details.is_empty() {
            html.push_str("<table>");
            for (label, value) in &self.details {
                writeln!(
                    html,
                    "<tr><th align=\"left\">{}</th><td>{}</td></tr>",
                    escape_html(label),
                    escape_html(value)
                )
                .expect("write detail row");
            }
            html.push_str("</table>\n");
        }

        if let Some(action) = &self.action {
            writeln!(
                html,
                "<p><a href=\"{}\">{}</a></p>",
                escape_html(&action.url),
                escape_html(&action.label)
            )
            .expect("write action link");
        }

        html
    }

    fn render_text(&self) -> String {
        let mut text = String::new();
        writeln!(text, "{}", self.heading).expect("write heading");
        writeln!(text).expect("write spacer");
        writeln!(text, "{}", self.greeting).expect("write greeting");

        for paragraph in &self.paragraphs {
            writeln!(text).expect("write spacer");
            writeln!(text, "{paragraph}").expect("write paragraph");
        }

        if !self.details.is_empty() {
            writeln!(text).expect("write spacer");
            for (label, value) in &self.details {
                writeln!(text, "{label}: {value}").expect("write detail");
            }
        }

        if let Some(action) = &self.action {
            writeln!(text).expect("write spacer");
            writeln!(text, "{}: {}", action.label, action.url).expect("write action");
        }

        text
    }
}

/// Formats an amount as naira with thousands separators, e.g. `₦680,400` or `₦1,250.50`.
pub fn format_naira(amount: Decimal) -> String {
    let rounded = amount.round_dp(2).normalize();
    let negative = rounded.is_sign_negative();
    let raw = rounded.abs().to_string();
    let (whole, fraction) = match raw.split_once('.') {
        Some((whole, fraction)) => (whole.to_string(), Some(fraction.to_string())),
        None => (raw, None),
    };

    let mut grouped = String::new();
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if negative { "-" } else { "" };
    match fraction {
        Some(fraction) => format!("{sign}₦{grouped}.{fraction:0<2}"),
        None => format!("{sign}₦{grouped}"),
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
