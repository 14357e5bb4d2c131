//! Markdown rendering
//!
//! Article and newsletter bodies are written in Markdown and shown as HTML.
//! Raw HTML in the source is never passed through: it is emitted as
//! escaped text.
//!
//! # Example
//!
//! ```
//! use newsroom::services::markdown::render_markdown;
//!
//! let html = render_markdown("# Hello\n\nThis is **bold** <b>text</b>.");
//! assert!(html.contains("<h1>Hello</h1>"));
//! assert!(html.contains("&lt;b&gt;"));
//! ```

use pulldown_cmark::{html, Event, Options, Parser};

/// Render Markdown to HTML with raw HTML escaped.
///
/// Tables, strikethrough, task lists and smart punctuation are enabled.
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);

    let events = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, events);
    output
}
