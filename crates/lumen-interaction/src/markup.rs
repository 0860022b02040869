//! Reply markup conversion.
//!
//! Gemini answers in Markdown. Web front ends get HTML through
//! `pulldown_cmark`; terminal front ends keep the Markdown source.

use lumen_core::config::MarkupFormat;
use pulldown_cmark::{Options, Parser, html};

/// Converts a reply into the markup the transcript displays.
pub fn render_reply(markdown: &str, format: MarkupFormat) -> String {
    match format {
        MarkupFormat::Html => markdown_to_html(markdown),
        MarkupFormat::Markdown => markdown.to_string(),
    }
}

fn markdown_to_html(markdown: &str) -> String {
    let options =
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let parser = Parser::new_ext(markdown, options);

    let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut html_output, parser);
    html_output
}
