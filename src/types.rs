use std::fmt::Display;

use serde::{Deserialize, Serialize};

// Defines a new type that wraps a String for use as a label.
macro_rules! labeltype {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

labeltype!(AnswerLabel);

/// The center of one answer bubble, in source image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
    pub x: i32,
    pub y: i32,
}

impl Choice {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An ordered group of bubbles making up one gradeable item.
pub type Question = Vec<Choice>;

/// Where every bubble on the form is, question by question. Read once per run
/// and shared read-only between images.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinateTable {
    questions: Vec<Question>,
}

impl CoordinateTable {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Finds the first question (1-based) with more choices than `limit`.
    pub fn find_question_exceeding(&self, limit: usize) -> Option<(usize, usize)> {
        self.questions
            .iter()
            .enumerate()
            .find(|(_, question)| question.len() > limit)
            .map(|(index, question)| (index + 1, question.len()))
    }
}

/// The fill state of one bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellClassification {
    Blank,
    Crossed,
    Shaded,
}

impl Display for CellClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellClassification::Blank => write!(f, "blank"),
            CellClassification::Crossed => write!(f, "crossed"),
            CellClassification::Shaded => write!(f, "shaded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_question_exceeding() {
        let table = CoordinateTable::new(vec![
            vec![Choice::new(1, 1), Choice::new(2, 1)],
            vec![Choice::new(1, 2), Choice::new(2, 2), Choice::new(3, 2)],
        ]);

        assert_eq!(table.find_question_exceeding(3), None);
        assert_eq!(table.find_question_exceeding(2), Some((2, 3)));
        assert_eq!(table.find_question_exceeding(1), Some((1, 2)));
    }

    #[test]
    fn test_answer_label_deserializes_from_plain_string() {
        let labels: Vec<AnswerLabel> = serde_json::from_str(r#"["SA", "A"]"#).unwrap();
        assert_eq!(labels, vec![AnswerLabel::from("SA"), AnswerLabel::from("A")]);
        assert_eq!(labels[0].to_string(), "SA");
    }
}
