//! Prompt Formatter: the static registry of drafting prompts and the single
//! function that turns a prompt name plus inputs into a user prompt.
//!
//! Each entry declares its slots. A two-slot entry called without secondary
//! text fails with `MissingContext`, which is how "generate the title before
//! the subtitle" is enforced at the data level.
//!
//! Rendering is a single pass over the template: substituted text (document
//! content, titles) is never re-scanned for placeholders.

pub mod templates;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PromptError {
    #[error("Unknown prompt: '{0}'")]
    UnknownPrompt(String),

    #[error("Prompt '{prompt}' requires {needs}; generate or select it first")]
    MissingContext { prompt: String, needs: &'static str },

    #[error("Error formatting prompt '{prompt}': {cause}")]
    Format { prompt: String, cause: String },
}

/// Content slots a template consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slots {
    /// Fixed text; the main content is ignored.
    None,
    /// `{content}` only.
    Content,
    /// `{content}` and `{context}`. `needs` names the secondary input for errors.
    ContentAndContext { needs: &'static str },
}

#[derive(Debug, Clone, Copy)]
pub struct PromptSpec {
    pub name: &'static str,
    pub template: &'static str,
    pub slots: Slots,
    /// Worked examples bound to `{example_1}`, `{example_2}`, ...
    pub examples: &'static [&'static str],
}

pub const REDUCE_WORDCOUNT: &str = "reduce_wordcount";

pub static REGISTRY: &[PromptSpec] = &[
    PromptSpec {
        name: "title",
        template: templates::TITLE,
        slots: Slots::Content,
        examples: &[],
    },
    PromptSpec {
        name: "subtitle",
        template: templates::SUBTITLE,
        slots: Slots::ContentAndContext { needs: "a title" },
        examples: &[],
    },
    PromptSpec {
        name: "science",
        template: templates::SCIENCE,
        slots: Slots::Content,
        examples: &[],
    },
    PromptSpec {
        name: "impact",
        template: templates::IMPACT,
        slots: Slots::Content,
        examples: &[],
    },
    PromptSpec {
        name: "summary",
        template: templates::SUMMARY,
        slots: Slots::Content,
        examples: &[],
    },
    PromptSpec {
        name: "citation",
        template: templates::CITATION,
        slots: Slots::Content,
        examples: &[],
    },
    PromptSpec {
        name: "funding",
        template: templates::FUNDING,
        slots: Slots::Content,
        examples: &[],
    },
    PromptSpec {
        name: "figure_caption",
        template: templates::FIGURE_CAPTION,
        slots: Slots::Content,
        examples: &[],
    },
    PromptSpec {
        name: "objective",
        template: templates::OBJECTIVE,
        slots: Slots::Content,
        examples: &[
            templates::OBJECTIVE_EXAMPLE_ONE,
            templates::OBJECTIVE_EXAMPLE_TWO,
        ],
    },
    PromptSpec {
        name: "approach",
        template: templates::APPROACH,
        slots: Slots::ContentAndContext {
            needs: "an objective",
        },
        examples: &[
            templates::APPROACH_EXAMPLE_ONE,
            templates::APPROACH_EXAMPLE_TWO,
        ],
    },
    PromptSpec {
        name: "impact_points",
        template: templates::IMPACT_POINTS,
        slots: Slots::Content,
        examples: &[],
    },
    PromptSpec {
        name: "figure_list",
        template: templates::FIGURE_LIST,
        slots: Slots::Content,
        examples: &[],
    },
    PromptSpec {
        name: "selected_figure_caption",
        template: templates::SELECTED_FIGURE_CAPTION,
        slots: Slots::ContentAndContext {
            needs: "a selected figure identifier",
        },
        examples: &[],
    },
    PromptSpec {
        name: REDUCE_WORDCOUNT,
        template: templates::REDUCE_WORDCOUNT,
        slots: Slots::Content,
        examples: &[],
    },
];

pub fn lookup(prompt_name: &str) -> Result<&'static PromptSpec, PromptError> {
    REGISTRY
        .iter()
        .find(|spec| spec.name == prompt_name)
        .ok_or_else(|| PromptError::UnknownPrompt(prompt_name.to_string()))
}

/// Formats the user prompt for `prompt_name`.
pub fn format_prompt(
    prompt_name: &str,
    main_text: &str,
    secondary_text: Option<&str>,
) -> Result<String, PromptError> {
    format_with(lookup(prompt_name)?, main_text, secondary_text, &[])
}

/// Formats the corrective "reduce to between min and max words" prompt.
pub fn format_word_reduction(
    text: &str,
    min_words: usize,
    max_words: usize,
) -> Result<String, PromptError> {
    let min = min_words.to_string();
    let max = max_words.to_string();
    format_with(
        lookup(REDUCE_WORDCOUNT)?,
        text,
        None,
        &[("min_words", min.as_str()), ("max_words", max.as_str())],
    )
}

/// Binds a spec's declared slots plus `extra` named values and renders it.
pub fn format_with(
    spec: &PromptSpec,
    main_text: &str,
    secondary_text: Option<&str>,
    extra: &[(&str, &str)],
) -> Result<String, PromptError> {
    let example_keys: Vec<String> = (1..=spec.examples.len())
        .map(|i| format!("example_{i}"))
        .collect();

    let mut bindings: Vec<(&str, &str)> = Vec::with_capacity(4 + extra.len());
    match spec.slots {
        Slots::None => {}
        Slots::Content => bindings.push(("content", main_text)),
        Slots::ContentAndContext { needs } => {
            let context = secondary_text.ok_or_else(|| PromptError::MissingContext {
                prompt: spec.name.to_string(),
                needs,
            })?;
            bindings.push(("content", main_text));
            bindings.push(("context", context));
        }
    }
    for (key, example) in example_keys.iter().zip(spec.examples) {
        bindings.push((key.as_str(), *example));
    }
    bindings.extend_from_slice(extra);

    render(spec.template, &bindings).map_err(|cause| PromptError::Format {
        prompt: spec.name.to_string(),
        cause,
    })
}

/// Single-pass `{name}` substitution. Every placeholder must be bound and every
/// binding must be used, otherwise the template and its declared slots disagree.
fn render(template: &str, bindings: &[(&str, &str)]) -> Result<String, String> {
    let mut out = String::with_capacity(
        template.len() + bindings.iter().map(|(_, v)| v.len()).sum::<usize>(),
    );
    let mut used = vec![false; bindings.len()];
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| "unterminated placeholder".to_string())?;
        let key = &after[..close];
        let idx = bindings
            .iter()
            .position(|(k, _)| *k == key)
            .ok_or_else(|| format!("placeholder '{{{key}}}' has no value"))?;
        out.push_str(bindings[idx].1);
        used[idx] = true;
        rest = &after[close + 1..];
    }
    out.push_str(rest);

    if let Some(idx) = used.iter().position(|u| !u) {
        return Err(format!(
            "template has no placeholder for '{}'",
            bindings[idx].0
        ));
    }
    Ok(out)
}
