use std::collections::BTreeMap;

use ham_core::model::{LicenseClass, OptionKey, Question, QuestionId};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// One record as it appears in a bank file. Both shapes normalise into
/// [`Question`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawQuestion {
    /// `answers: [..]` with a 0-based `correct` index.
    Indexed {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        question: String,
        answers: Vec<String>,
        #[serde(default)]
        correct: usize,
        #[serde(default)]
        image: Option<String>,
        #[serde(default)]
        refs: Option<String>,
        #[serde(default)]
        category: Option<RawCategory>,
    },
    /// `options: {A: .., B: ..}` with a letter `correct_answer`.
    Lettered {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        question: String,
        #[serde(default)]
        options: BTreeMap<String, String>,
        #[serde(default)]
        correct_answer: Option<String>,
        #[serde(default)]
        image: Option<String>,
        #[serde(default)]
        refs: Option<String>,
        #[serde(default)]
        category: Option<RawCategory>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCategory {
    One(String),
    Many(Vec<String>),
}

impl RawCategory {
    fn classes(self) -> Vec<LicenseClass> {
        let names = match self {
            RawCategory::One(name) => vec![name],
            RawCategory::Many(names) => names,
        };
        names
            .iter()
            .filter_map(|name| name.parse::<LicenseClass>().ok())
            .collect()
    }
}

impl RawQuestion {
    /// Canonical form, or `None` for a record without a usable id.
    #[must_use]
    pub fn normalize(self) -> Option<Question> {
        let (id, question, options, correct, image, refs, category) = match self {
            RawQuestion::Indexed {
                id,
                question,
                answers,
                correct,
                image,
                refs,
                category,
            } => {
                let options: BTreeMap<OptionKey, String> = answers
                    .into_iter()
                    .enumerate()
                    .filter_map(|(i, text)| OptionKey::from_index(i).map(|key| (key, text)))
                    .collect();
                let correct = OptionKey::from_index(correct).unwrap_or(OptionKey::A);
                (id, question, options, correct, image, refs, category)
            }
            RawQuestion::Lettered {
                id,
                question,
                options,
                correct_answer,
                image,
                refs,
                category,
            } => {
                let options: BTreeMap<OptionKey, String> = options
                    .into_iter()
                    .filter_map(|(key, text)| key.parse::<OptionKey>().ok().map(|key| (key, text)))
                    .collect();
                let correct = correct_answer
                    .and_then(|key| key.parse::<OptionKey>().ok())
                    .unwrap_or(OptionKey::A);
                (id, question, options, correct, image, refs, category)
            }
        };

        let id = QuestionId::new(id.unwrap_or_default()).ok()?;
        let categories = category.map(RawCategory::classes).unwrap_or_default();
        Some(
            Question::new(id, question, options, correct)
                .with_image(image)
                .with_refs(refs)
                .with_categories(categories),
        )
    }
}

/// Parse one bank file: a JSON array of records in either shape.
///
/// Records that do not decode or lack an id are skipped with a warning.
///
/// # Errors
///
/// Returns `serde_json::Error` if the text is not a JSON array.
pub fn parse_bank(text: &str) -> Result<Vec<Question>, serde_json::Error> {
    let records: Vec<Value> = serde_json::from_str(text)?;
    let mut questions = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<RawQuestion>(record) {
            Ok(raw) => match raw.normalize() {
                Some(question) => questions.push(question),
                None => warn!(index, "skipping question record without an id"),
            },
            Err(err) => warn!(index, "skipping malformed question record: {err}"),
        }
    }
    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexed_shape_maps_answers_to_letters() {
        let text = r#"[{
            "id": "T1A01",
            "question": "Which agency regulates amateur radio?",
            "answers": ["FEMA", "FCC", "ITU", "NTIA"],
            "correct": 1,
            "refs": "[97.1]"
        }]"#;
        let questions = parse_bank(text).unwrap();
        assert_eq!(questions.len(), 1);
        let q = &questions[0];
        assert_eq!(q.options()[&OptionKey::B], "FCC");
        assert_eq!(q.correct_answer(), OptionKey::B);
        assert_eq!(q.refs(), Some("[97.1]"));
        assert_eq!(q.categories(), &[LicenseClass::Technician]);
        assert_eq!(q.image(), None);
    }

    #[test]
    fn lettered_shape_keeps_keys_and_category_list() {
        let text = r#"[{
            "id": "G2B03",
            "question": "?",
            "options": {"A": "one", "B": "two", "C": "three", "D": "four"},
            "correct_answer": "C",
            "image": "",
            "category": ["General", "Extra"]
        }]"#;
        let questions = parse_bank(text).unwrap();
        let q = &questions[0];
        assert_eq!(q.correct_answer(), OptionKey::C);
        assert_eq!(q.options().len(), 4);
        assert_eq!(q.image(), None);
        assert!(q.belongs_to(LicenseClass::Extra));
        assert!(q.belongs_to(LicenseClass::General));
    }

    #[test]
    fn records_without_id_are_skipped_and_odd_shapes_degrade() {
        let text = r#"[
            {"question": "no id", "answers": ["a", "b"], "correct": 0},
            {"id": "  ", "options": {"A": "x"}},
            {"id": "E1A01", "answers": "not a list"},
            {"id": "E1A02", "options": {"A": "x", "B": "y"}, "correct_answer": "B"}
        ]"#;
        let questions = parse_bank(text).unwrap();
        let ids: Vec<&str> = questions.iter().map(|q| q.id().as_str()).collect();
        assert_eq!(ids, vec!["E1A01", "E1A02"]);
        assert!(questions[0].options().is_empty());
    }

    #[test]
    fn non_array_document_is_an_error() {
        assert!(parse_bank(r#"{"id": "T1A01"}"#).is_err());
    }
}
