use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Destination handle handed to the dispatcher, e.g. a chat id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub i64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One bank record, in the on-disk field naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub correct_option: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl Question {
    pub fn correct_text(&self) -> &str {
        &self.options[self.correct_option]
    }
}

/// A question as it is presented once: options in delivery order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionPoll {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTestRequest {
    pub user_id: UserId,
    pub channel: ChannelId,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEvent {
    pub user_id: UserId,
    pub selected_option: usize,
}

/// Transport input after boundary decoding; nothing else reaches the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Welcome { channel: ChannelId },
    ListSubjects { channel: ChannelId },
    Start(StartTestRequest),
    Answer(AnswerEvent),
    Unrecognized,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub issue: String,
}

pub fn validate_questions(questions: &[Question]) -> Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    if questions.is_empty() {
        issues.push(ValidationIssue {
            field: "questions".into(),
            issue: "must contain at least one question".into(),
        });
    }

    for (i, q) in questions.iter().enumerate() {
        if q.question.trim().is_empty() {
            issues.push(ValidationIssue {
                field: format!("[{i}].question"),
                issue: "must not be empty".into(),
            });
        }
        if q.options.len() < 2 {
            issues.push(ValidationIssue {
                field: format!("[{i}].options"),
                issue: "must contain at least 2 options".into(),
            });
        }
        for (j, opt) in q.options.iter().enumerate() {
            if opt.trim().is_empty() {
                issues.push(ValidationIssue {
                    field: format!("[{i}].options[{j}]"),
                    issue: "must not be empty".into(),
                });
            }
        }
        if q.correct_option >= q.options.len() {
            issues.push(ValidationIssue {
                field: format!("[{i}].correct_option"),
                issue: format!("must reference one of {} options", q.options.len()),
            });
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Question> {
        vec![
            Question {
                question: "Unit of stress".into(),
                options: vec!["N/m²".into(), "N·m".into(), "kg".into()],
                correct_option: 0,
                explanation: Some("Force per area".into()),
                subject: None,
            },
            Question {
                question: "Slump test measures".into(),
                options: vec!["Strength".into(), "Workability".into()],
                correct_option: 1,
                explanation: None,
                subject: Some("concrete".into()),
            },
        ]
    }

    #[test]
    fn validate_questions_ok() {
        assert!(validate_questions(&sample()).is_ok());
    }

    #[test]
    fn validate_questions_reports_every_issue() {
        let mut qs = sample();
        qs[0].correct_option = 3;
        qs[1].options = vec!["Only".into()];
        qs[1].correct_option = 0;
        qs[1].question = "  ".into();
        let issues = validate_questions(&qs).unwrap_err();
        assert!(issues.iter().any(|i| i.field == "[0].correct_option"));
        assert!(issues.iter().any(|i| i.field == "[1].options"));
        assert!(issues.iter().any(|i| i.field == "[1].question"));
    }

    #[test]
    fn empty_bank_is_rejected() {
        let issues = validate_questions(&[]).unwrap_err();
        assert_eq!(issues[0].field, "questions");
    }

    #[test]
    fn answer_event_uses_camel_case() {
        let ev: AnswerEvent =
            serde_json::from_str(r#"{"userId": 7, "selectedOption": 2}"#).unwrap();
        assert_eq!(ev.user_id, UserId(7));
        assert_eq!(ev.selected_option, 2);
    }
}
