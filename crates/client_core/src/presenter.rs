//! Pure mapping from a triage reply to ordered renderable sections.
//!
//! No network or timer access, and no UiState mutation: the controller has
//! already applied metrics by the time a reply reaches this module.

use shared::protocol::TriageReply;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedResponse {
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Header {
        confidence: ConfidenceBadge,
        urgency: LevelBadge,
        risk: LevelBadge,
    },
    Body {
        paragraphs: Vec<Paragraph>,
    },
    SymptomAnalysis {
        conditions: Vec<ConditionView>,
    },
    Recommendation {
        text: String,
    },
    Disclaimers {
        lines: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceBadge {
    pub percent: i64,
    pub label: String,
    /// Width of the proportional indicator, clamped to [0, 100].
    pub bar_width: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelBadge {
    /// Display label: first character capitalized, remainder unchanged.
    pub label: String,
    /// Raw enumerant for styling lookups; never case-normalized.
    pub style_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionView {
    pub name: String,
    pub percent: i64,
    pub bar_width: u8,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub runs: Vec<Run>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Run {
    Text(String),
    Bold(String),
}

/// Fixed section order: header, body, symptom analysis?, recommendation?,
/// disclaimers?. Optional sections are omitted when their source field is
/// absent or empty.
pub fn present(reply: &TriageReply) -> RenderedResponse {
    let mut sections = Vec::with_capacity(5);

    sections.push(Section::Header {
        confidence: confidence_badge(reply.confidence),
        urgency: LevelBadge {
            label: capitalize_first(reply.urgency.style_key()),
            style_key: reply.urgency.style_key().to_string(),
        },
        risk: LevelBadge {
            label: format!("{} Risk", capitalize_first(reply.risk_level.style_key())),
            style_key: reply.risk_level.style_key().to_string(),
        },
    });

    sections.push(Section::Body {
        paragraphs: format_message_text(&reply.response),
    });

    if let Some(analysis) = &reply.symptom_analysis {
        if !analysis.possible_conditions.is_empty() {
            // Service order is preserved; no re-sorting.
            let conditions = analysis
                .possible_conditions
                .iter()
                .map(|condition| ConditionView {
                    name: condition.condition.clone(),
                    percent: confidence_percent(condition.confidence),
                    bar_width: bar_width(condition.confidence),
                    reasoning: condition.reasoning.clone(),
                })
                .collect();
            sections.push(Section::SymptomAnalysis { conditions });
        }
    }

    if let Some(recommendations) = &reply.recommendations {
        if !recommendations.trim().is_empty() {
            sections.push(Section::Recommendation {
                text: recommendations.clone(),
            });
        }
    }

    if let Some(disclaimers) = &reply.disclaimers {
        if !disclaimers.is_empty() {
            sections.push(Section::Disclaimers {
                lines: disclaimers.clone(),
            });
        }
    }

    RenderedResponse { sections }
}

pub fn confidence_percent(confidence: f64) -> i64 {
    (confidence * 100.0).round() as i64
}

fn bar_width(confidence: f64) -> u8 {
    confidence_percent(confidence).clamp(0, 100) as u8
}

fn confidence_badge(confidence: f64) -> ConfidenceBadge {
    let percent = confidence_percent(confidence);
    ConfidenceBadge {
        percent,
        label: format!("{percent}% Confidence"),
        bar_width: bar_width(confidence),
    }
}

/// Display convention only: the underlying enumerant is untouched.
pub fn capitalize_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Expand emphasis markup: `**text**` spans become bold runs, line breaks
/// become paragraph breaks, and an unmatched `**` stays literal.
pub fn format_message_text(text: &str) -> Vec<Paragraph> {
    text.split('\n')
        .map(|line| Paragraph {
            runs: parse_emphasis(line),
        })
        .collect()
}

fn parse_emphasis(line: &str) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut rest = line;
    loop {
        match rest.find("**") {
            None => {
                if !rest.is_empty() {
                    runs.push(Run::Text(rest.to_string()));
                }
                break;
            }
            Some(open) => {
                let after_open = &rest[open + 2..];
                match after_open.find("**") {
                    None => {
                        // No closing marker; the rest is literal.
                        if !rest.is_empty() {
                            runs.push(Run::Text(rest.to_string()));
                        }
                        break;
                    }
                    Some(close) => {
                        if open > 0 {
                            runs.push(Run::Text(rest[..open].to_string()));
                        }
                        runs.push(Run::Bold(after_open[..close].to_string()));
                        rest = &after_open[close + 2..];
                    }
                }
            }
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use shared::protocol::{ConditionMatch, SymptomAnalysis};

    use super::*;

    fn routine_reply() -> TriageReply {
        TriageReply {
            response: "Rest and monitor your symptoms.".to_string(),
            emergency: false,
            urgency: "routine".into(),
            risk_level: "low".into(),
            confidence: 0.6,
            response_time: Some(1.2),
            symptom_analysis: None,
            recommendations: None,
            disclaimers: None,
            reasoning: None,
            status: None,
        }
    }

    #[test]
    fn minimal_reply_renders_header_then_body_only() {
        let rendered = present(&routine_reply());
        assert_eq!(rendered.sections.len(), 2);
        match &rendered.sections[0] {
            Section::Header {
                confidence,
                urgency,
                risk,
            } => {
                assert_eq!(confidence.label, "60% Confidence");
                assert_eq!(urgency.label, "Routine");
                assert_eq!(urgency.style_key, "routine");
                assert_eq!(risk.label, "Low Risk");
                assert_eq!(risk.style_key, "low");
            }
            other => panic!("expected header first, got {other:?}"),
        }
        assert!(matches!(rendered.sections[1], Section::Body { .. }));
    }

    #[test]
    fn full_reply_renders_sections_in_fixed_order() {
        let mut reply = routine_reply();
        reply.symptom_analysis = Some(SymptomAnalysis {
            possible_conditions: vec![
                ConditionMatch {
                    condition: "Tension headache".to_string(),
                    confidence: 0.55,
                    reasoning: "band-like pressure".to_string(),
                },
                ConditionMatch {
                    condition: "Migraine".to_string(),
                    confidence: 0.30,
                    reasoning: "light sensitivity".to_string(),
                },
            ],
        });
        reply.recommendations = Some("Stay hydrated.".to_string());
        reply.disclaimers = Some(vec!["Not medical advice.".to_string()]);

        let rendered = present(&reply);
        let kinds: Vec<&'static str> = rendered
            .sections
            .iter()
            .map(|section| match section {
                Section::Header { .. } => "header",
                Section::Body { .. } => "body",
                Section::SymptomAnalysis { .. } => "analysis",
                Section::Recommendation { .. } => "recommendation",
                Section::Disclaimers { .. } => "disclaimers",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["header", "body", "analysis", "recommendation", "disclaimers"]
        );

        match &rendered.sections[2] {
            Section::SymptomAnalysis { conditions } => {
                // Supplied order, no re-sorting by confidence.
                assert_eq!(conditions[0].name, "Tension headache");
                assert_eq!(conditions[0].percent, 55);
                assert_eq!(conditions[1].name, "Migraine");
                assert_eq!(conditions[1].percent, 30);
            }
            other => panic!("expected analysis section, got {other:?}"),
        }
    }

    #[test]
    fn empty_condition_list_omits_analysis_section() {
        let mut reply = routine_reply();
        reply.symptom_analysis = Some(SymptomAnalysis {
            possible_conditions: Vec::new(),
        });
        let rendered = present(&reply);
        assert!(!rendered
            .sections
            .iter()
            .any(|section| matches!(section, Section::SymptomAnalysis { .. })));
    }

    #[test]
    fn blank_recommendation_and_empty_disclaimers_are_omitted() {
        let mut reply = routine_reply();
        reply.recommendations = Some("   ".to_string());
        reply.disclaimers = Some(Vec::new());
        let rendered = present(&reply);
        assert_eq!(rendered.sections.len(), 2);
    }

    #[test]
    fn confidence_rounds_to_whole_percent() {
        assert_eq!(confidence_percent(0.873), 87);
        assert_eq!(confidence_percent(0.0), 0);
        assert_eq!(confidence_percent(1.0), 100);

        let badge = confidence_badge(0.873);
        assert_eq!(badge.label, "87% Confidence");
        assert_eq!(badge.bar_width, 87);
    }

    #[test]
    fn bar_width_is_clamped_for_out_of_domain_confidence() {
        let badge = confidence_badge(1.2);
        assert_eq!(badge.percent, 120);
        assert_eq!(badge.bar_width, 100);
        let badge = confidence_badge(-0.1);
        assert_eq!(badge.bar_width, 0);
    }

    #[test]
    fn capitalization_is_display_only() {
        assert_eq!(capitalize_first("high"), "High");
        assert_eq!(capitalize_first("see-specialist"), "See-specialist");
        assert_eq!(capitalize_first(""), "");

        let mut reply = routine_reply();
        reply.risk_level = "high".into();
        let rendered = present(&reply);
        match &rendered.sections[0] {
            Section::Header { risk, .. } => {
                assert_eq!(risk.label, "High Risk");
                assert_eq!(risk.style_key, "high");
            }
            other => panic!("expected header, got {other:?}"),
        }
    }

    #[test]
    fn emphasis_markup_becomes_bold_runs_and_paragraphs() {
        let paragraphs = format_message_text("Take **rest** today.\nDrink water.");
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(
            paragraphs[0].runs,
            vec![
                Run::Text("Take ".to_string()),
                Run::Bold("rest".to_string()),
                Run::Text(" today.".to_string()),
            ]
        );
        assert_eq!(
            paragraphs[1].runs,
            vec![Run::Text("Drink water.".to_string())]
        );
    }

    #[test]
    fn unmatched_emphasis_marker_stays_literal() {
        let paragraphs = format_message_text("a ** b");
        assert_eq!(paragraphs[0].runs, vec![Run::Text("a ** b".to_string())]);

        let paragraphs = format_message_text("**first** then **open");
        assert_eq!(
            paragraphs[0].runs,
            vec![
                Run::Bold("first".to_string()),
                Run::Text(" then **open".to_string()),
            ]
        );
    }
}
