//! Email digests of search results.
//!
//! A [`DigestRequest`] arrives from the front-end carrying the recipients and
//! the result lists it previously received from `/search`. Validation runs
//! in a fixed order so the first problem is the one reported. The body is
//! built as Markdown and rendered to HTML with `pulldown_cmark`.

use crate::error::{AppError, Result};
use crate::mail::OutgoingMessage;
use chrono::DateTime;
use codequest_search::{Answered, NormalizedResult, Source};
use serde::Deserialize;
use serde_json::Value;
use std::fmt::Write as _;

/// Placeholder for a missing query or sort option in the digest body.
const NOT_AVAILABLE: &str = "N/A";

/// Digest request as posted by the front-end.
///
/// Recipients and results are kept as raw JSON values so non-string
/// recipients can be reported back verbatim and malformed results are only
/// looked at once the recipients have passed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DigestRequest {
    #[serde(default)]
    pub recipients: Vec<Value>,
    #[serde(default)]
    pub stackoverflow: Vec<Value>,
    #[serde(default)]
    pub reddit: Vec<Value>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub sort_option: Option<String>,
}

/// A digest that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedDigest {
    pub recipients: Vec<String>,
    pub stackoverflow: Vec<NormalizedResult>,
    pub reddit: Vec<NormalizedResult>,
    pub query: Option<String>,
    pub sort_option: Option<String>,
}

impl DigestRequest {
    /// Read a posted body. `null`, `{}` and anything other than an object
    /// count as no data.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::BadRequest`] with `No data provided` for an empty
    /// body, or describing the first field of the wrong type.
    pub fn from_json(body: Value) -> Result<Self> {
        match &body {
            Value::Object(fields) if !fields.is_empty() => {}
            _ => return Err(AppError::BadRequest("No data provided".into())),
        }
        serde_json::from_value(body)
            .map_err(|e| AppError::BadRequest(format!("Invalid email request: {e}")))
    }

    /// Check recipients and content.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::BadRequest`] when there are no recipients, a
    /// recipient is not a string containing `@`, both result lists are
    /// empty, or a result is malformed, in that order.
    pub fn validate(self) -> Result<ValidatedDigest> {
        if self.recipients.is_empty() {
            return Err(AppError::BadRequest("No recipient emails provided".into()));
        }

        let mut recipients = Vec::with_capacity(self.recipients.len());
        for value in &self.recipients {
            match value.as_str() {
                Some(addr) if addr.contains('@') => recipients.push(addr.trim().to_owned()),
                Some(addr) => {
                    return Err(AppError::BadRequest(format!(
                        "Invalid email address: {addr}"
                    )));
                }
                None => {
                    return Err(AppError::BadRequest(format!(
                        "Invalid email address: {value}"
                    )));
                }
            }
        }

        if self.stackoverflow.is_empty() && self.reddit.is_empty() {
            return Err(AppError::BadRequest(
                "No search results to include in the email.".into(),
            ));
        }

        Ok(ValidatedDigest {
            recipients,
            stackoverflow: parse_results(Source::StackOverflow, self.stackoverflow)?,
            reddit: parse_results(Source::Reddit, self.reddit)?,
            query: self.query,
            sort_option: self.sort_option,
        })
    }
}

impl ValidatedDigest {
    /// Subject line: `<prefix> "<query>"`.
    pub fn subject(&self, prefix: &str) -> String {
        format!("{prefix} \"{}\"", self.query.as_deref().unwrap_or_default())
    }

    /// Markdown source of the digest body.
    pub fn to_markdown(&self) -> String {
        let mut md = String::from("# Code Quest search results\n\n");
        let _ = writeln!(
            md,
            "**Query:** {} | **Sort:** {}\n",
            escape_markdown(self.query.as_deref().unwrap_or(NOT_AVAILABLE)),
            escape_markdown(self.sort_option.as_deref().unwrap_or(NOT_AVAILABLE)),
        );
        push_section(&mut md, Source::StackOverflow, &self.stackoverflow);
        push_section(&mut md, Source::Reddit, &self.reddit);
        md
    }

    /// The digest body as a standalone HTML document.
    pub fn render_html(&self) -> String {
        use pulldown_cmark::{Options, Parser};

        let markdown = self.to_markdown();
        let parser = Parser::new_ext(&markdown, Options::ENABLE_STRIKETHROUGH);
        let mut body = String::new();
        pulldown_cmark::html::push_html(&mut body, parser);

        format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"></head>\n<body>\n{body}</body>\n</html>\n"
        )
    }

    /// Compose the outgoing message.
    pub fn into_message(self, from: String, subject_prefix: &str) -> OutgoingMessage {
        OutgoingMessage {
            subject: self.subject(subject_prefix),
            html_body: self.render_html(),
            from,
            to: self.recipients,
        }
    }
}

fn parse_results(section: Source, values: Vec<Value>) -> Result<Vec<NormalizedResult>> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            serde_json::from_value(value).map_err(|e| {
                AppError::BadRequest(format!("Invalid {section} result #{}: {e}", i + 1))
            })
        })
        .collect()
}

fn push_section(md: &mut String, source: Source, results: &[NormalizedResult]) {
    let _ = writeln!(md, "## {source}\n");
    if results.is_empty() {
        md.push_str("_No results._\n\n");
        return;
    }
    for (i, result) in results.iter().enumerate() {
        let _ = writeln!(
            md,
            "{}. [{}](<{}>)  \n   {}\n",
            i + 1,
            escape_markdown(&result.title),
            escape_link(&result.link),
            describe(source, result),
        );
    }
}

fn describe(source: Source, result: &NormalizedResult) -> String {
    let posted = format_timestamp(result.created_at);
    match (source, result.is_answered) {
        (Source::StackOverflow, answered) => {
            let answered = match answered {
                Answered::Known(true) => "yes",
                Answered::Known(false) => "no",
                Answered::NotApplicable => NOT_AVAILABLE,
            };
            format!(
                "Score: {} | Answered: {answered} | Answers: {} | Asked: {posted}",
                result.score, result.secondary_count
            )
        }
        (Source::Reddit, _) => format!(
            "Score: {} | Comments: {} | Posted: {posted}",
            result.score, result.secondary_count
        ),
    }
}

/// Format a Unix timestamp as `YYYY-MM-DD HH:MM` UTC.
pub fn format_timestamp(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_owned())
}

/// Backslash-escape every ASCII punctuation character so upstream titles
/// render as literal text, including `<` and `&`.
fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_ascii_punctuation() {
            out.push('\\');
        }
        if ch == '\n' || ch == '\r' {
            out.push(' ');
        } else {
            out.push(ch);
        }
    }
    out
}

/// Make a URL safe inside an angle-bracket link destination.
fn escape_link(link: &str) -> String {
    link.replace('<', "%3C")
        .replace('>', "%3E")
        .replace(['\n', '\r'], "")
}
