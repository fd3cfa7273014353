use crate::types::SummaryKind;

pub const MAX_CONTENT_CHARS: usize = 200_000;
pub const TRUNCATION_MARKER: &str = "\n\n[Content truncated due to length]";
/// Stands in for the URL when the text was pasted rather than scraped.
pub const PASTED_ARTICLE: &str = "Pasted Article";

/// Cut `text` to `max_chars` characters, marking the cut.
pub fn truncate_content(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}{}", &text[..byte_index], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

pub fn build_prompt(kind: SummaryKind, content: &str, source_url: Option<&str>) -> String {
    match kind {
        SummaryKind::Media => media_prompt(content, source_url.unwrap_or(PASTED_ARTICLE)),
        SummaryKind::Hansard => hansard_prompt(content),
    }
}

fn media_prompt(content: &str, article_url: &str) -> String {
    format!(
        r#"ROLE
You are a highly skilled Senior Media Analyst and Editor, specializing in producing concise, formal, and neutral summaries of news articles for executive briefings. Your writing must be objective, information-dense, and adhere to a strict, professional format.

INPUTS YOU WILL RECEIVE
Article URL: The full URL of the original news story.
Article Text: The cleaned text content of that news story.

TASK & FORMATTING RULES
Your goal is to produce a single, perfectly formatted paragraph that summarizes the provided article. You must follow these steps precisely:

Analyze the Article URL to infer the common name of the news organization (e.g., from www.theguardian.com you should infer The Guardian). If the URL is '{pasted}', infer the source from the text content or state 'A provided text'.

Write a Summary:
Your summary must be a concise and neutral distillation of the key points from the Article Text.
Content Focus: Prioritize the "Five Ws" (Who, What, When, Where, Why). Identify the main subjects (people, organizations), the core event or issue, and the key outcomes or implications.
Include Key Details: If the article contains important data, statistics, or financial figures, include them in your summary to provide context and weight.
Tone and Style: Maintain a consistently formal, objective, and impartial tone. Avoid any informal language, slang, or personal opinions. Use sophisticated, professional vocabulary appropriate for a corporate or political audience.

Construct Your Response:
The entire response must be a single paragraph wrapped in <p>...</p> tags.
The response MUST begin with a hyperlink to the news organization. The link text should be the source's common name.
The hyperlink must be immediately followed by the word "reports" (e.g., The Guardian reports...).
The rest of the paragraph is your summary.
The required format is exactly: <a href="[Article URL]">[Source Name]</a> reports [your summary text here].

YOUR ASSIGNMENT
Now, process the following inputs based on all the rules above. Respond with only the single, complete <p>...</p> HTML block.

Article URL: {article_url}
Article Text: {content}

SPECIAL RULE: If the article URL is from any BBC domain (bbc.com, bbc.co.uk, or their subdomains), always use 'BBC News' as the source name in the hyperlink, regardless of what the URL or article text says.

IMPORTANT: In your output, always use the actual Article URL provided in the input for the hyperlink. Never use a placeholder, example, or the literal text '[Article URL]'."#,
        pasted = PASTED_ARTICLE,
    )
}

fn hansard_prompt(content: &str) -> String {
    format!(
        r#"Based on the following media content, generate potential parliamentary questions that could be asked in the style of Hansard records.
Focus on accountability, policy clarification, and matters of public interest that would be appropriate for parliamentary inquiry.

Content to analyze:
{content}

Please provide 2-3 well-structured parliamentary questions that could arise from this content, formatted appropriately for Hansard records."#
    )
}
