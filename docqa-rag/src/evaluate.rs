//! Answer quality scoring collaborator and its result envelope.

use async_trait::async_trait;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::document::Chunk;
use crate::error::Result;

/// Quality scores produced by a single evaluation call, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityScores {
    /// How grounded the answer is in the retrieved context.
    pub faithfulness: f64,
    /// How relevant the answer is to the question.
    pub answer_relevancy: f64,
}

/// A collaborator that scores a generated answer against its question and
/// retrieved context.
///
/// Evaluation runs under an independent timeout owned by the query pipeline;
/// a failing or slow evaluator never invalidates the answer.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Score the (question, answer, context) triple.
    async fn evaluate(
        &self,
        question: &str,
        answer: &str,
        context: &[Chunk],
    ) -> Result<QualityScores>;
}

/// The outcome of one evaluation attempt: scores or an error, never both.
///
/// Mutual exclusion is enforced by construction. The JSON shape is flat —
/// `{faithfulness, answer_relevancy, evaluation_time_ms, error}` — with the
/// arm that does not apply serialized as `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// The evaluator returned scores within the timeout.
    Scored {
        /// Faithfulness score in `[0, 1]`.
        faithfulness: f64,
        /// Answer relevancy score in `[0, 1]`.
        answer_relevancy: f64,
        /// Wall-clock duration of the evaluation call.
        evaluation_time_ms: f64,
    },
    /// The evaluator failed or timed out; the answer is still valid.
    Failed {
        /// A description of the failure.
        error: String,
        /// Wall-clock duration until the failure was observed.
        evaluation_time_ms: f64,
    },
}

impl Evaluation {
    /// The error message, if this evaluation failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            Evaluation::Scored { .. } => None,
            Evaluation::Failed { error, .. } => Some(error),
        }
    }
}

impl Serialize for Evaluation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Evaluation", 4)?;
        match self {
            Evaluation::Scored { faithfulness, answer_relevancy, evaluation_time_ms } => {
                state.serialize_field("faithfulness", &Some(*faithfulness))?;
                state.serialize_field("answer_relevancy", &Some(*answer_relevancy))?;
                state.serialize_field("evaluation_time_ms", evaluation_time_ms)?;
                state.serialize_field("error", &None::<String>)?;
            }
            Evaluation::Failed { error, evaluation_time_ms } => {
                state.serialize_field("faithfulness", &None::<f64>)?;
                state.serialize_field("answer_relevancy", &None::<f64>)?;
                state.serialize_field("evaluation_time_ms", evaluation_time_ms)?;
                state.serialize_field("error", &Some(error.as_str()))?;
            }
        }
        state.end()
    }
}
