//! Render dispatcher replies as Telegram HTML.
//!
//! Replies mark CLI output with ``` fences; Telegram shows those literally,
//! so fenced segments become `<pre>` blocks and everything else is escaped.

/// Telegram rejects messages longer than 4096 visible characters.
const MAX_REPLY_CHARS: usize = 4000;

const TRUNCATED_NOTE: &str = "\n[Response truncated]";

pub fn render_html(reply: &str) -> String {
    render_with_limit(reply, MAX_REPLY_CHARS)
}

/// Truncation happens before markup is added, so a `<pre>` is always closed.
fn render_with_limit(reply: &str, limit: usize) -> String {
    let mut budget = limit;
    let mut out = String::new();
    let mut truncated = false;

    for (i, segment) in reply.split("```").enumerate() {
        let is_code = i % 2 == 1;
        let text = if is_code {
            segment.trim_matches('\n')
        } else {
            segment
        };

        let kept: String = text.chars().take(budget).collect();
        let kept_chars = kept.chars().count();
        truncated = kept_chars < text.chars().count();
        budget -= kept_chars;

        if is_code {
            if kept.is_empty() {
                out.push_str("<i>(no output)</i>");
            } else {
                out.push_str("<pre>");
                out.push_str(&escape_html(&kept));
                out.push_str("</pre>");
            }
        } else {
            out.push_str(&escape_html(&kept));
        }

        if truncated {
            out.push_str(TRUNCATED_NOTE);
            break;
        }
    }

    out
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}
