use std::collections::BTreeMap;

use image::{imageops::grayscale, RgbImage};
use log::{debug, trace};
use logging_timer::time;

use crate::classify::{classify_cell, CellScore};
use crate::debug::ImageDebugWriter;
use crate::image_utils::binarize;
use crate::options::{MultipleMarkPolicy, ProcessingOptions};
use crate::types::{AnswerLabel, CellClassification, CoordinateTable};

/// Number of shaded bubbles per answer label, in label order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTally {
    counts: Vec<(AnswerLabel, u32)>,
}

impl PageTally {
    pub fn new(labels: &[AnswerLabel]) -> Self {
        Self {
            counts: labels.iter().map(|label| (label.clone(), 0)).collect(),
        }
    }

    fn increment(&mut self, index: usize) {
        self.counts[index].1 += 1;
    }

    #[allow(dead_code)]
    pub fn get(&self, label: &AnswerLabel) -> Option<u32> {
        self.counts
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, count)| *count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AnswerLabel, u32)> {
        self.counts.iter().map(|(label, count)| (label, *count))
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().map(|(_, count)| count).sum()
    }
}

/// Which label was shaded for each question, keyed by 1-based question number.
/// Questions with no recorded answer are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageBreakdown {
    answers: BTreeMap<usize, AnswerLabel>,
}

impl PageBreakdown {
    pub fn get(&self, question: usize) -> Option<&AnswerLabel> {
        self.answers.get(&question)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

/// The result of scoring one form image.
#[derive(Debug, Clone)]
pub struct InterpretedPage {
    /// The source image with every sampled bubble outlined.
    pub annotated: RgbImage,
    pub tally: PageTally,
    pub breakdown: PageBreakdown,
    /// Scores per question, per choice, in coordinate table order.
    pub scores: Vec<Vec<CellScore>>,
}

impl InterpretedPage {
    pub fn question_count(&self) -> usize {
        self.scores.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("question {question} has {choices} choices but only {labels} answer labels are configured")]
    TooManyChoices {
        question: usize,
        choices: usize,
        labels: usize,
    },
}

/// Fails if any question has more choices than there are labels to name them.
pub fn check_labels_cover_table(
    table: &CoordinateTable,
    labels: &[AnswerLabel],
) -> Result<(), PageError> {
    match table.find_question_exceeding(labels.len()) {
        Some((question, choices)) => Err(PageError::TooManyChoices {
            question,
            choices,
            labels: labels.len(),
        }),
        None => Ok(()),
    }
}

#[time]
/// Scores every bubble of `table` on one form image.
///
/// A question with several shaded choices adds each of them to the tally; the
/// breakdown follows `options.multiple_marks`.
pub fn interpret_page(
    image: RgbImage,
    table: &CoordinateTable,
    options: &ProcessingOptions,
    debug: &ImageDebugWriter,
) -> Result<InterpretedPage, PageError> {
    check_labels_cover_table(table, &options.labels)?;

    let binary = binarize(&grayscale(&image));
    debug.write("binary", &binary);

    let mut annotated = image;
    let mut tally = PageTally::new(&options.labels);
    let mut breakdown = PageBreakdown::default();
    let mut scores = Vec::with_capacity(table.len());

    for (question_index, question) in table.questions().iter().enumerate() {
        let question_number = question_index + 1;
        let mut shaded_count = 0;
        let mut question_scores = Vec::with_capacity(question.len());

        for (choice_index, choice) in question.iter().enumerate() {
            let score = classify_cell(&binary, &mut annotated, *choice, options);
            let label = &options.labels[choice_index];
            trace!(
                "question {} choice {} ({}) at ({}, {}): {} [{:.1}]",
                question_number,
                choice_index + 1,
                label,
                choice.x,
                choice.y,
                score.classification,
                score.statistic
            );

            if score.classification == CellClassification::Shaded {
                shaded_count += 1;
                tally.increment(choice_index);
                breakdown.answers.insert(question_number, label.clone());
            }

            question_scores.push(score);
        }

        if shaded_count > 1 {
            debug!(
                "question {} has {} shaded choices",
                question_number, shaded_count
            );
            if options.multiple_marks == MultipleMarkPolicy::Undetermined {
                breakdown.answers.remove(&question_number);
            }
        }

        scores.push(question_scores);
    }

    Ok(InterpretedPage {
        annotated,
        tally,
        breakdown,
        scores,
    })
}
