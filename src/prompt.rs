//! Tera-backed prompt assembly for companion replies.

use crate::companion::CompanionProfile;
use crate::reply::{CONTEXT_WINDOW, Message};
use tera::{Context, Tera};

/// Tera-backed template engine for building structured prompts.
pub struct TeraEngine {
    tera: Tera,
}

impl TeraEngine {
    /// Create with inline templates (no filesystem).
    pub fn new() -> anyhow::Result<Self> {
        let tera = Tera::default();
        Ok(Self { tera })
    }

    /// Register a template from a string.
    pub fn add_template(&mut self, name: &str, content: &str) -> anyhow::Result<()> {
        self.tera.add_raw_template(name, content)?;
        Ok(())
    }

    /// Render a named template with the given context.
    pub fn render(&self, template_name: &str, context: &Context) -> anyhow::Result<String> {
        let rendered = self.tera.render(template_name, context)?;
        Ok(rendered)
    }
}

const COMPANION_PROMPT_TEMPLATE: &str = "\
You are {{ name }}, a human-like AI companion.
Archetype: {{ archetype }}
Tone: {{ tone }}
Bio: {{ bio }}
Boundaries: {{ boundaries }}

Behavior rules:
- Keep responses emotionally warm, practical, and concise.
- Never provide sexual content.
- If user asks for unsafe content, decline briefly and redirect helpfully.
- Reply in plain text.

Conversation:
{{ history }}

Now reply as {{ name }}.";

const COMPANION_PROMPT_NAME: &str = "companion_prompt";

/// Builds the system/style prompt sent to the generation provider.
///
/// Registers its template once at construction; rendering is shared-reference
/// only, so the builder can live inside request-handling state.
pub struct CompanionPromptBuilder {
    engine: TeraEngine,
}

impl CompanionPromptBuilder {
    pub fn new() -> anyhow::Result<Self> {
        let mut engine = TeraEngine::new()?;
        engine.add_template(COMPANION_PROMPT_NAME, COMPANION_PROMPT_TEMPLATE)?;
        Ok(Self { engine })
    }

    /// Render the full generation prompt for a companion and message window.
    pub fn render(
        &self,
        companion: &CompanionProfile,
        messages: &[Message],
    ) -> anyhow::Result<String> {
        let mut ctx = Context::new();
        ctx.insert("name", &companion.name);
        ctx.insert("archetype", &companion.archetype);
        ctx.insert("tone", &companion.tone.to_string());
        ctx.insert("bio", &companion.bio);
        ctx.insert("boundaries", &companion.boundaries.join("; "));
        ctx.insert("history", &format_history(messages));

        self.engine.render(COMPANION_PROMPT_NAME, &ctx)
    }
}

/// Format the conversation block: the most recent `CONTEXT_WINDOW` non-system
/// messages, chronological, one `ROLE: content` line each.
pub fn format_history(messages: &[Message]) -> String {
    let non_system: Vec<&Message> = messages.iter().filter(|m| !m.role.is_system()).collect();
    let skip = non_system.len().saturating_sub(CONTEXT_WINDOW);

    non_system[skip..]
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str().to_uppercase(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}
