//! Handlebars-based init prompt rendering.
//!
//! Each configured agent carries an `init_prompt_template` that receives the
//! ticket context when the agent first spawns.

use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::Serialize;

/// Fields available to init prompt templates.
#[derive(Debug, Clone, Serialize)]
pub struct PromptContext {
    pub title: String,
    pub description: String,
    pub branch_name: String,
    pub base_branch: String,
}

/// Render an agent's init prompt template with the ticket context.
pub fn render_init_prompt(template: &str, context: &PromptContext) -> Result<String> {
    let mut handlebars = Handlebars::new();
    // Prompts are plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(false);
    handlebars
        .render_template(template, context)
        .context("Failed to render init prompt template")
}
