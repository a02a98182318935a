//! Fragment catalogue: every named slot of a highlight and how it is drafted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generation::structured::BulletSchema;
use crate::generation::text::WordWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentId {
    Title,
    Subtitle,
    Science,
    Impact,
    Summary,
    Citation,
    Funding,
    ImageCaption,
    Objective,
    Approach,
    ImpactPoints,
    FigureList,
    FigureCaption,
    // Entered by hand only.
    RelatedLinks,
    PointOfContact,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown fragment: '{0}'")]
pub struct UnknownFragment(pub String);

impl FragmentId {
    pub const ALL: [FragmentId; 15] = [
        FragmentId::Title,
        FragmentId::Subtitle,
        FragmentId::Science,
        FragmentId::Impact,
        FragmentId::Summary,
        FragmentId::Citation,
        FragmentId::Funding,
        FragmentId::ImageCaption,
        FragmentId::Objective,
        FragmentId::Approach,
        FragmentId::ImpactPoints,
        FragmentId::FigureList,
        FragmentId::FigureCaption,
        FragmentId::RelatedLinks,
        FragmentId::PointOfContact,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FragmentId::Title => "title",
            FragmentId::Subtitle => "subtitle",
            FragmentId::Science => "science",
            FragmentId::Impact => "impact",
            FragmentId::Summary => "summary",
            FragmentId::Citation => "citation",
            FragmentId::Funding => "funding",
            FragmentId::ImageCaption => "image_caption",
            FragmentId::Objective => "objective",
            FragmentId::Approach => "approach",
            FragmentId::ImpactPoints => "impact_points",
            FragmentId::FigureList => "figure_list",
            FragmentId::FigureCaption => "figure_caption",
            FragmentId::RelatedLinks => "related_links",
            FragmentId::PointOfContact => "point_of_contact",
        }
    }

    /// How the fragment is drafted. `None` for manual-only slots.
    pub fn draft_spec(self) -> Option<FragmentSpec> {
        let (prompt, kind, context, temperature, max_output_tokens) = match self {
            FragmentId::Title => ("title", FragmentKind::text(None), ContextSource::None, 0.2, 50),
            FragmentId::Subtitle => (
                "subtitle",
                FragmentKind::text(Some(WordWindow::new(75, 100))),
                ContextSource::Fragment(FragmentId::Title),
                0.5,
                100,
            ),
            FragmentId::Science => (
                "science",
                FragmentKind::text(Some(WordWindow::new(75, 100))),
                ContextSource::None,
                0.3,
                200,
            ),
            FragmentId::Impact => (
                "impact",
                FragmentKind::text(Some(WordWindow::new(75, 100))),
                ContextSource::None,
                0.0,
                700,
            ),
            FragmentId::Summary => (
                "summary",
                FragmentKind::text(Some(WordWindow::new(100, 200))),
                ContextSource::None,
                0.0,
                700,
            ),
            FragmentId::Citation => ("citation", FragmentKind::text(None), ContextSource::None, 0.0, 300),
            FragmentId::Funding => (
                "funding",
                FragmentKind::Text {
                    window: None,
                    strip_quotes: true,
                },
                ContextSource::None,
                0.0,
                300,
            ),
            FragmentId::ImageCaption => (
                "figure_caption",
                FragmentKind::text(Some(WordWindow::new(10, 30))),
                ContextSource::None,
                0.3,
                100,
            ),
            FragmentId::Objective => ("objective", FragmentKind::text(None), ContextSource::None, 0.3, 300),
            FragmentId::Approach => (
                "approach",
                FragmentKind::Points(BulletSchema::between(2, 3)),
                ContextSource::Fragment(FragmentId::Objective),
                0.1,
                300,
            ),
            FragmentId::ImpactPoints => (
                "impact_points",
                FragmentKind::Points(BulletSchema::exactly(3)),
                ContextSource::None,
                0.1,
                300,
            ),
            FragmentId::FigureList => ("figure_list", FragmentKind::Figures, ContextSource::None, 0.1, 1000),
            FragmentId::FigureCaption => (
                "selected_figure_caption",
                FragmentKind::text(None),
                ContextSource::SelectedFigure,
                0.2,
                150,
            ),
            FragmentId::RelatedLinks | FragmentId::PointOfContact => return None,
        };
        Some(FragmentSpec {
            id: self,
            prompt,
            kind,
            context,
            temperature,
            max_output_tokens,
        })
    }

    pub fn is_manual(self) -> bool {
        self.draft_spec().is_none()
    }

    /// True for fragments stored as a list of points.
    pub fn is_points(self) -> bool {
        matches!(
            self.draft_spec().map(|s| s.kind),
            Some(FragmentKind::Points(_))
        )
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FragmentId {
    type Err = UnknownFragment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FragmentId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownFragment(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FragmentKind {
    Text {
        window: Option<WordWindow>,
        strip_quotes: bool,
    },
    Points(BulletSchema),
    /// Figure listing parsed into a `FigureIndex`.
    Figures,
}

impl FragmentKind {
    const fn text(window: Option<WordWindow>) -> Self {
        FragmentKind::Text {
            window,
            strip_quotes: false,
        }
    }
}

/// Where a fragment's secondary prompt input comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    None,
    Fragment(FragmentId),
    SelectedFigure,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FragmentSpec {
    pub id: FragmentId,
    pub prompt: &'static str,
    pub kind: FragmentKind,
    pub context: ContextSource,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::{lookup, Slots};

    #[test]
    fn test_every_drafted_fragment_names_a_registered_prompt() {
        for id in FragmentId::ALL {
            if let Some(spec) = id.draft_spec() {
                assert!(lookup(spec.prompt).is_ok(), "{id} -> {}", spec.prompt);
            }
        }
    }

    #[test]
    fn test_context_sources_match_prompt_slots() {
        for id in FragmentId::ALL {
            let Some(spec) = id.draft_spec() else { continue };
            let slots = lookup(spec.prompt).unwrap().slots;
            let needs_context = matches!(slots, Slots::ContentAndContext { .. });
            assert_eq!(
                needs_context,
                spec.context != ContextSource::None,
                "{id} context wiring disagrees with prompt '{}'",
                spec.prompt
            );
        }
    }

    #[test]
    fn test_fragment_names_round_trip() {
        for id in FragmentId::ALL {
            assert_eq!(id.as_str().parse::<FragmentId>().unwrap(), id);
            assert_eq!(serde_json::to_value(id).unwrap(), id.as_str());
        }
        assert!("abstract".parse::<FragmentId>().is_err());
    }

    #[test]
    fn test_manual_and_list_fragments() {
        assert!(FragmentId::RelatedLinks.is_manual());
        assert!(FragmentId::PointOfContact.is_manual());
        assert!(!FragmentId::Title.is_manual());
        assert!(FragmentId::Approach.is_points());
        assert!(FragmentId::ImpactPoints.is_points());
        assert!(!FragmentId::Impact.is_points());
    }

    #[test]
    fn test_point_arity() {
        let Some(FragmentKind::Points(approach)) = FragmentId::Approach.draft_spec().map(|s| s.kind) else {
            panic!("approach is a list fragment");
        };
        assert_eq!((approach.min_items, approach.max_items), (2, 3));
        let Some(FragmentKind::Points(impact)) = FragmentId::ImpactPoints.draft_spec().map(|s| s.kind) else {
            panic!("impact_points is a list fragment");
        };
        assert_eq!((impact.min_items, impact.max_items), (3, 3));
    }
}
