use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One summarized article as it appears in a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportEntry {
    pub title: String,
    /// HTML fragment produced by the summarizer, embedded as-is.
    pub summary: String,
    pub url: Option<String>,
    /// Submitter name, embedded as-is. Callers must pass the HTML-escaped
    /// form that submission validation stores, never a raw name.
    pub submitted_by: String,
}

impl ReportEntry {
    pub fn new(title: impl Into<String>, summary: impl Into<String>, url: Option<String>, submitted_by: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            url,
            submitted_by: submitted_by.into(),
        }
    }
}

/// Escape the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

const STYLE: &str = r#"
        body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 800px; margin: 0 auto; padding: 20px; background-color: #f4f4f4; }
        .container { background-color: white; padding: 30px; border-radius: 8px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }
        .header { text-align: center; border-bottom: 3px solid #007bff; padding-bottom: 20px; margin-bottom: 30px; }
        .header h1 { color: #007bff; margin: 0; font-size: 2.2em; }
        .date { color: #666; font-size: 1.1em; margin-top: 10px; }
        .summary-section { margin-bottom: 40px; padding: 20px; border-left: 4px solid #007bff; background-color: #f8f9fa; }
        .summary-title { font-size: 1.3em; font-weight: bold; color: #007bff; margin-bottom: 10px; }
        .summary-content { font-size: 1em; line-height: 1.7; }
        .source-info { margin-top: 15px; padding-top: 10px; border-top: 1px solid #ddd; font-size: 0.9em; color: #666; }
        .source-url { word-break: break-all; color: #007bff; }
        .footer { text-align: center; margin-top: 40px; padding-top: 20px; border-top: 1px solid #ddd; color: #666; font-size: 0.9em; }
        .no-content { text-align: center; color: #666; font-style: italic; padding: 40px; }
"#;

pub fn render_report(report_type: &str, entries: &[ReportEntry]) -> String {
    render_report_at(report_type, entries, Utc::now())
}

pub fn render_report_at(report_type: &str, entries: &[ReportEntry], generated_at: DateTime<Utc>) -> String {
    let report_type = escape_html(report_type);
    let mut html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{report_type}</title>
    <style>{STYLE}    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>{report_type}</h1>
            <div class="date">Generated on {date}</div>
        </div>

        <div class="content">
"#,
        date = generated_at.format("%B %d, %Y at %H:%M"),
    );

    if entries.is_empty() {
        html.push_str(
            r#"            <div class="no-content">
                <p>No articles were processed for this report.</p>
            </div>
"#,
        );
    }

    for entry in entries {
        html.push_str(&format!(
            r#"            <div class="summary-section">
                <div class="summary-title">{}</div>
                <div class="summary-content">{}</div>
                <div class="source-info">
                    <strong>Submitted by:</strong> {}<br>
"#,
            escape_html(&entry.title),
            entry.summary,
            entry.submitted_by,
        ));
        if let Some(url) = entry.url.as_deref().filter(|u| !u.is_empty()) {
            let url = escape_html(url);
            html.push_str(&format!(
                "                    <strong>Source:</strong> <a href=\"{url}\" class=\"source-url\">{url}</a>\n"
            ));
        }
        html.push_str("                </div>\n            </div>\n");
    }

    let plural = if entries.len() == 1 { "" } else { "s" };
    html.push_str(&format!(
        r#"        </div>

        <div class="footer">
            <p>This report was automatically generated by the Media Monitoring Agent.</p>
            <p>Report contains {} article{}.</p>
        </div>
    </div>
</body>
</html>
"#,
        entries.len(),
        plural,
    ));
    html
}
