use crate::error::QuizError;
use crate::models::{validate_questions, Question, ValidationIssue};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

static BANK_SCHEMA: Lazy<Result<serde_json::Value, String>> = Lazy::new(|| {
    serde_json::from_str(include_str!("../contracts/question_bank.schema.json"))
        .map_err(|e| e.to_string())
});

/// Static `(key, displayName, count)` entry of the subject table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectSpec {
    pub key: String,
    pub name: String,
    pub count: usize,
}

impl SubjectSpec {
    pub fn new(key: impl Into<String>, name: impl Into<String>, count: usize) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub key: String,
    pub name: String,
    pub start: usize,
    pub end: usize,
}

impl Partition {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectTable {
    partitions: Vec<Partition>,
}

impl SubjectTable {
    /// Lays the entries out back to back; offsets are running sums of the counts.
    pub fn from_specs(specs: &[SubjectSpec], bank_len: usize) -> Result<Self, QuizError> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();
        let mut partitions = Vec::with_capacity(specs.len());
        let mut offset = 0usize;
        for (i, spec) in specs.iter().enumerate() {
            if spec.key.trim().is_empty() {
                issues.push(ValidationIssue {
                    field: format!("subjects[{i}].key"),
                    issue: "must not be empty".into(),
                });
            } else if !seen.insert(spec.key.to_lowercase()) {
                issues.push(ValidationIssue {
                    field: format!("subjects[{i}].key"),
                    issue: "must be unique".into(),
                });
            }
            partitions.push(Partition {
                key: spec.key.clone(),
                name: spec.name.clone(),
                start: offset,
                end: offset + spec.count,
            });
            offset += spec.count;
        }
        if offset > bank_len {
            issues.push(ValidationIssue {
                field: "subjects".into(),
                issue: format!("cover {offset} questions but the bank holds {bank_len}"),
            });
        }
        if !issues.is_empty() {
            return Err(QuizError::malformed("invalid subject table", issues));
        }
        Ok(Self { partitions })
    }

    /// Keys match case-insensitively.
    pub fn get(&self, key: &str) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.key.eq_ignore_ascii_case(key))
    }

    pub fn keys(&self) -> Vec<String> {
        self.partitions.iter().map(|p| p.key.clone()).collect()
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

/// Questions eligible for one draw: the whole bank or one subject range.
#[derive(Debug, Clone, Copy)]
pub struct Pool<'a> {
    pub subject: Option<&'a Partition>,
    pub questions: &'a [Question],
}

#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Arc<[Question]>,
    subjects: SubjectTable,
}

impl QuestionBank {
    pub fn new(questions: Vec<Question>, specs: &[SubjectSpec]) -> Result<Self, QuizError> {
        if let Err(issues) = validate_questions(&questions) {
            return Err(QuizError::malformed("question records failed validation", issues));
        }
        let subjects = SubjectTable::from_specs(specs, questions.len())?;
        Ok(Self {
            questions: questions.into(),
            subjects,
        })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn subjects(&self) -> &SubjectTable {
        &self.subjects
    }

    pub fn pool(&self) -> Pool<'_> {
        Pool {
            subject: None,
            questions: &self.questions,
        }
    }

    /// `None` when `key` is not in the subject table.
    pub fn slice(&self, key: &str) -> Option<Pool<'_>> {
        let partition = self.subjects.get(key)?;
        Some(Pool {
            subject: Some(partition),
            questions: &self.questions[partition.range()],
        })
    }

    pub fn pool_for(&self, subject: Option<&str>) -> Result<Pool<'_>, QuizError> {
        match subject {
            None => Ok(self.pool()),
            Some(key) => self.slice(key).ok_or_else(|| QuizError::UnknownSubject {
                key: key.to_string(),
                valid: self.subjects.keys(),
            }),
        }
    }
}

pub fn load_bank(raw: &str, specs: &[SubjectSpec]) -> Result<QuestionBank, QuizError> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| QuizError::malformed(format!("question source is not valid json: {e}"), Vec::new()))?;

    let schema = BANK_SCHEMA
        .as_ref()
        .map_err(|e| QuizError::malformed(format!("bundled schema is invalid: {e}"), Vec::new()))?;
    let compiled = jsonschema::draft202012::new(schema)
        .map_err(|e| QuizError::malformed(format!("schema build failed: {e}"), Vec::new()))?;
    if compiled.validate(&value).is_err() {
        let issues = compiled
            .iter_errors(&value)
            .map(|e| ValidationIssue {
                field: e.instance_path.to_string(),
                issue: e.to_string(),
            })
            .collect();
        return Err(QuizError::malformed("question source does not match schema", issues));
    }

    let questions: Vec<Question> = serde_json::from_value(value)
        .map_err(|e| QuizError::malformed(format!("cannot decode questions: {e}"), Vec::new()))?;
    QuestionBank::new(questions, specs)
}

pub fn load_subject_specs(raw: &str) -> Result<Vec<SubjectSpec>, QuizError> {
    serde_json::from_str(raw)
        .map_err(|e| QuizError::malformed(format!("cannot decode subject table: {e}"), Vec::new()))
}

/// Where the bank is read from at startup and on every reload.
#[derive(Debug, Clone)]
pub struct BankSource {
    pub questions_path: PathBuf,
    pub subjects_path: Option<PathBuf>,
}

impl BankSource {
    pub async fn load(&self) -> anyhow::Result<QuestionBank> {
        let specs = match &self.subjects_path {
            Some(path) => load_subject_specs(&read_source(path).await?)?,
            None => Vec::new(),
        };
        let raw = read_source(&self.questions_path).await?;
        Ok(load_bank(&raw, &specs)?)
    }
}

async fn read_source(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))
}

/// Shared reference to the live bank. Sessions copy their questions out at
/// start and never look at the handle again.
#[derive(Debug, Clone)]
pub struct BankHandle {
    inner: Arc<RwLock<Arc<QuestionBank>>>,
}

impl BankHandle {
    pub fn new(bank: QuestionBank) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(bank))),
        }
    }

    pub async fn current(&self) -> Arc<QuestionBank> {
        self.inner.read().await.clone()
    }

    pub async fn replace(&self, bank: QuestionBank) {
        *self.inner.write().await = Arc::new(bank);
    }

    pub async fn reload_from(&self, source: &BankSource) -> anyhow::Result<usize> {
        let bank = source.load().await?;
        let len = bank.len();
        self.replace(bank).await;
        Ok(len)
    }
}

pub fn spawn_reload_task(handle: BankHandle, source: BankSource, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // first tick fires immediately; the bank was just loaded
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match handle.reload_from(&source).await {
                Ok(len) => info!(questions = len, "question bank reloaded"),
                Err(err) => warn!("question bank reload failed, keeping previous bank: {:#}", err),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions(len: usize) -> Vec<Question> {
        (0..len)
            .map(|n| Question {
                question: format!("Q{n}"),
                options: vec!["yes".into(), "no".into()],
                correct_option: n % 2,
                explanation: Some(format!("E{n}")),
                subject: None,
            })
            .collect()
    }

    #[test]
    fn partitions_are_running_sums() {
        let specs = vec![
            SubjectSpec::new("soil", "Soil Mechanics", 3),
            SubjectSpec::new("rcc", "RCC Design", 4),
            SubjectSpec::new("survey", "Surveying", 2),
        ];
        let table = SubjectTable::from_specs(&specs, 9).unwrap();
        let ranges: Vec<_> = table.partitions().iter().map(|p| (p.start, p.end)).collect();
        assert_eq!(ranges, vec![(0, 3), (3, 7), (7, 9)]);
    }

    #[test]
    fn slice_returns_subject_range() {
        let specs = vec![SubjectSpec::new("a", "A", 5), SubjectSpec::new("b", "B", 5)];
        let bank = QuestionBank::new(questions(10), &specs).unwrap();
        let pool = bank.slice("b").unwrap();
        let prompts: Vec<_> = pool.questions.iter().map(|q| q.question.as_str()).collect();
        assert_eq!(prompts, vec!["Q5", "Q6", "Q7", "Q8", "Q9"]);
        assert_eq!(pool.subject.map(|p| p.name.as_str()), Some("B"));
        assert_eq!(bank.slice("B").unwrap().questions.len(), 5);
        assert!(bank.slice("c").is_none());
    }

    #[test]
    fn unknown_subject_error_lists_keys() {
        let specs = vec![SubjectSpec::new("a", "A", 5), SubjectSpec::new("b", "B", 5)];
        let bank = QuestionBank::new(questions(10), &specs).unwrap();
        let err = bank.pool_for(Some("c")).unwrap_err();
        assert_eq!(
            err,
            QuizError::UnknownSubject {
                key: "c".into(),
                valid: vec!["a".into(), "b".into()]
            }
        );
        assert_eq!(bank.pool_for(None).unwrap().questions.len(), 10);
    }

    #[test]
    fn subject_table_cannot_exceed_bank() {
        let specs = vec![SubjectSpec::new("a", "A", 6), SubjectSpec::new("b", "B", 5)];
        let err = QuestionBank::new(questions(10), &specs).unwrap_err();
        assert!(matches!(err, QuizError::MalformedBank { .. }));
    }

    #[test]
    fn duplicate_subject_keys_rejected() {
        let specs = vec![SubjectSpec::new("a", "A", 1), SubjectSpec::new("A", "Again", 1)];
        assert!(SubjectTable::from_specs(&specs, 10).is_err());
    }

    #[test]
    fn load_bank_accepts_source_format() {
        let raw = r#"[
            {"question": "Q1", "options": ["a", "b", "c"], "correct_option": 2, "explanation": "c it is"},
            {"question": "Q2", "options": ["x", "y"], "correct_option": 0, "explanation": "", "subject": "misc"}
        ]"#;
        let bank = load_bank(raw, &[]).unwrap();
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.questions()[1].subject.as_deref(), Some("misc"));
    }

    #[test]
    fn load_bank_rejects_missing_fields() {
        let raw = r#"[{"question": "Q1", "correct_option": 0, "explanation": "no options"}]"#;
        match load_bank(raw, &[]).unwrap_err() {
            QuizError::MalformedBank { issues, .. } => assert!(!issues.is_empty()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn load_bank_rejects_out_of_range_index() {
        let raw = r#"[{"question": "Q1", "options": ["a", "b"], "correct_option": 2, "explanation": ""}]"#;
        match load_bank(raw, &[]).unwrap_err() {
            QuizError::MalformedBank { issues, .. } => {
                assert_eq!(issues[0].field, "[0].correct_option");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn load_bank_rejects_invalid_json() {
        assert!(matches!(load_bank("{not json", &[]), Err(QuizError::MalformedBank { .. })));
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_bank() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questions.json");
        std::fs::write(&path, serde_json::to_string(&questions(4)).unwrap()).unwrap();
        let source = BankSource {
            questions_path: path.clone(),
            subjects_path: None,
        };
        let handle = BankHandle::new(source.load().await.unwrap());
        let before = handle.current().await;

        std::fs::write(&path, "[]").unwrap();
        assert!(handle.reload_from(&source).await.is_err());
        assert_eq!(handle.current().await.len(), 4);

        std::fs::write(&path, serde_json::to_string(&questions(6)).unwrap()).unwrap();
        assert_eq!(handle.reload_from(&source).await.unwrap(), 6);
        assert_eq!(handle.current().await.len(), 6);
        assert_eq!(before.len(), 4);
    }
}
