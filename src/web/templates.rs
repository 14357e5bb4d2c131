//! Page templates
//!
//! Templates are compiled into the binary from `templates/` and loaded into
//! a single [`Tera`] instance at startup. A `markdown` filter renders
//! article bodies.

use anyhow::{anyhow, Context as _, Result};
use rust_embed::RustEmbed;
use std::collections::HashMap;
use std::error::Error as _;
use tera::{Context, Tera, Value};

use crate::services::render_markdown;

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct PageTemplates;

/// Build the template engine from the embedded files
pub fn load() -> Result<Tera> {
    let mut templates: Vec<(String, String)> = Vec::new();
    for name in PageTemplates::iter() {
        let file = PageTemplates::get(&name)
            .ok_or_else(|| anyhow!("Embedded template {} disappeared", name))?;
        let source = std::str::from_utf8(&file.data)
            .with_context(|| format!("Template {} is not valid UTF-8", name))?
            .to_string();
        templates.push((name.to_string(), source));
    }

    let mut tera = Tera::default();
    tera.register_filter("markdown", markdown_filter);
    tera.add_raw_templates(templates)
        .map_err(|e| anyhow!("Failed to load templates: {}", describe(&e)))?;

    tracing::debug!("Loaded {} page templates", tera.get_template_names().count());
    Ok(tera)
}

/// Render `template`, flattening the tera error chain into one message
pub fn render(tera: &Tera, template: &str, context: &Context) -> Result<String> {
    tera.render(template, context)
        .map_err(|e| anyhow!("Failed to render '{}': {}", template, describe(&e)))
}

fn describe(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

fn markdown_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let source = tera::try_get_value!("markdown", "value", String, value);
    Ok(Value::String(render_markdown(&source)))
}
