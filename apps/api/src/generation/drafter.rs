//! Drafts one fragment from the document text, dispatching on its kind.

use serde::Serialize;
use tracing::{info, warn};

use crate::generation::fragments::{FragmentKind, FragmentSpec};
use crate::generation::heuristics::{parse_figure_listing, FigureIndex};
use crate::generation::structured::{generate_structured, Points};
use crate::generation::text::{generate_text, GeneratedText};
use crate::generation::DraftError;
use crate::llm_client::LlmClient;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DraftOutput {
    Text(GeneratedText),
    Points { points: Points },
    Figures { figures: FigureIndex },
}

/// Clamps a requested temperature into the range both backends accept.
pub fn effective_temperature(spec: &FragmentSpec, requested: Option<f32>) -> f32 {
    requested
        .filter(|t| t.is_finite())
        .unwrap_or(spec.temperature)
        .clamp(0.0, 1.0)
}

pub async fn draft_fragment(
    llm: &LlmClient,
    spec: &FragmentSpec,
    document_text: &str,
    context: Option<&str>,
    temperature: Option<f32>,
) -> Result<DraftOutput, DraftError> {
    let temperature = effective_temperature(spec, temperature);
    info!(
        "Drafting fragment '{}' (prompt '{}', temperature {})",
        spec.id, spec.prompt, temperature
    );

    match spec.kind {
        FragmentKind::Text {
            window,
            strip_quotes,
        } => {
            let mut generated = generate_text(
                llm,
                spec.prompt,
                document_text,
                context,
                spec.max_output_tokens,
                temperature,
                window,
            )
            .await?;
            if strip_quotes {
                generated.text = generated.text.replace('"', "");
            }
            Ok(DraftOutput::Text(generated))
        }
        FragmentKind::Points(schema) => {
            let points = generate_structured(
                llm,
                spec.prompt,
                document_text,
                context,
                schema,
                spec.max_output_tokens,
                temperature,
            )
            .await?;
            Ok(DraftOutput::Points { points })
        }
        FragmentKind::Figures => {
            let listing = generate_text(
                llm,
                spec.prompt,
                document_text,
                context,
                spec.max_output_tokens,
                temperature,
                None,
            )
            .await?;
            let figures = parse_figure_listing(&listing.text);
            if figures.is_empty() {
                warn!("Figure listing contained no usable 'identifier :: description' lines");
            }
            Ok(DraftOutput::Figures { figures })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::fragments::FragmentId;
    use crate::generation::text::Reduction;
    use crate::llm_client::testing::ScriptedBackend;
    use crate::llm_client::ClientSettings;
    use crate::prompts::PromptError;
    use std::sync::Arc;

    const DOC: &str = "We map irrigation withdrawals across the basin. Figure 1 shows the study area.";

    fn spec(id: FragmentId) -> FragmentSpec {
        id.draft_spec().unwrap()
    }

    fn client(backend: Arc<ScriptedBackend>) -> LlmClient {
        LlmClient::new(backend, ClientSettings::default())
    }

    #[test]
    fn test_effective_temperature() {
        let title = spec(FragmentId::Title);
        assert_eq!(effective_temperature(&title, None), 0.2);
        assert_eq!(effective_temperature(&title, Some(0.7)), 0.7);
        assert_eq!(effective_temperature(&title, Some(3.0)), 1.0);
        assert_eq!(effective_temperature(&title, Some(-1.0)), 0.0);
        assert_eq!(effective_temperature(&title, Some(f32::NAN)), 0.2);
    }

    #[tokio::test]
    async fn test_title_uses_catalogue_settings() {
        let backend = Arc::new(ScriptedBackend::replying(&["Mapping Thirsty Fields"]));
        let llm = client(backend.clone());

        let output = draft_fragment(&llm, &spec(FragmentId::Title), DOC, None, None)
            .await
            .unwrap();
        match output {
            DraftOutput::Text(text) => {
                assert_eq!(text.text, "Mapping Thirsty Fields");
                assert_eq!(text.reduction, Reduction::NotNeeded);
            }
            other => panic!("expected text, got {other:?}"),
        }
        let calls = backend.calls();
        assert_eq!(calls[0].max_output_tokens, 50);
        assert_eq!(calls[0].temperature, 0.2);
    }

    #[tokio::test]
    async fn test_funding_strips_double_quotes() {
        let backend = Arc::new(ScriptedBackend::replying(&[
            "\"This research was supported by the Office of Science.\"",
        ]));
        let llm = client(backend);

        let output = draft_fragment(&llm, &spec(FragmentId::Funding), DOC, None, None)
            .await
            .unwrap();
        let DraftOutput::Text(text) = output else {
            panic!("funding is a text fragment");
        };
        assert_eq!(text.text, "This research was supported by the Office of Science.");
    }

    #[tokio::test]
    async fn test_figure_list_is_parsed_into_index() {
        let backend = Arc::new(ScriptedBackend::replying(&[
            "Figure 1 :: Study area\nTable 1 :: Parameters\nFigure 2 :: Withdrawals over time",
        ]));
        let llm = client(backend);

        let output = draft_fragment(&llm, &spec(FragmentId::FigureList), DOC, None, None)
            .await
            .unwrap();
        let DraftOutput::Figures { figures } = output else {
            panic!("figure_list yields a figure index");
        };
        assert_eq!(figures.len(), 2);
        assert_eq!(figures.get("Figure 2"), Some("Withdrawals over time"));
    }

    #[tokio::test]
    async fn test_approach_without_objective_is_missing_context() {
        let backend = Arc::new(ScriptedBackend::replying(&["unused"]));
        let llm = client(backend.clone());

        let err = draft_fragment(&llm, &spec(FragmentId::Approach), DOC, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DraftError::Prompt(PromptError::MissingContext { .. })));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_impact_points_are_structured() {
        let backend = Arc::new(ScriptedBackend::replying(&[
            r#"{"points": ["Withdrawals exceed recharge.", "Losses concentrate downstream.", "Policy can slow decline."]}"#,
        ]));
        let llm = client(backend);

        let output = draft_fragment(&llm, &spec(FragmentId::ImpactPoints), DOC, None, Some(0.4))
            .await
            .unwrap();
        let DraftOutput::Points { points } = output else {
            panic!("impact_points is a list fragment");
        };
        assert_eq!(points.len(), 3);
    }
}
