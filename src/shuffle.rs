use crate::error::QuizError;
use crate::models::{Question, QuestionPoll};
use rand::seq::SliceRandom;
use rand::Rng;

/// Draws `count` distinct questions from `pool` in uniformly random order.
pub fn select_subset<R: Rng + ?Sized>(
    pool: &[Question],
    count: usize,
    rng: &mut R,
) -> Result<Vec<Question>, QuizError> {
    if pool.len() < count {
        return Err(QuizError::InsufficientQuestions {
            requested: count,
            available: pool.len(),
        });
    }
    let mut order: Vec<usize> = (0..pool.len()).collect();
    order.shuffle(rng);
    Ok(order
        .into_iter()
        .take(count)
        .map(|idx| pool[idx].clone())
        .collect())
}

/// Fisher-Yates over a copy of the options, tracking where the correct one lands.
pub fn shuffle_options<R: Rng + ?Sized>(question: &Question, rng: &mut R) -> (Vec<String>, usize) {
    let mut options = question.options.clone();
    let mut correct = question.correct_option;
    for i in (1..options.len()).rev() {
        let j = rng.gen_range(0..=i);
        options.swap(i, j);
        if correct == i {
            correct = j;
        } else if correct == j {
            correct = i;
        }
    }
    (options, correct)
}

pub fn build_poll<R: Rng + ?Sized>(question: &Question, rng: &mut R) -> QuestionPoll {
    let (options, correct_index) = shuffle_options(question, rng);
    QuestionPoll {
        prompt: question.question.clone(),
        options,
        correct_index,
        explanation: question.explanation.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn question(n: usize, options: usize, correct: usize) -> Question {
        Question {
            question: format!("Q{n}"),
            options: (0..options).map(|o| format!("Q{n} option {o}")).collect(),
            correct_option: correct,
            explanation: None,
            subject: None,
        }
    }

    fn pool(len: usize) -> Vec<Question> {
        (0..len).map(|n| question(n, 4, n % 4)).collect()
    }

    #[test]
    fn shuffled_options_keep_correct_text() {
        let mut rng = StdRng::seed_from_u64(7);
        for options in 2..8 {
            for correct in 0..options {
                let q = question(0, options, correct);
                for _ in 0..50 {
                    let (shuffled, idx) = shuffle_options(&q, &mut rng);
                    assert_eq!(shuffled[idx], q.correct_text());
                    assert_eq!(shuffled.len(), q.options.len());
                    let a: HashSet<_> = shuffled.iter().collect();
                    let b: HashSet<_> = q.options.iter().collect();
                    assert_eq!(a, b);
                }
            }
        }
    }

    #[test]
    fn correct_position_is_spread_across_slots() {
        let mut rng = StdRng::seed_from_u64(42);
        let q = question(0, 4, 0);
        let mut hits = [0usize; 4];
        for _ in 0..4000 {
            let (_, idx) = shuffle_options(&q, &mut rng);
            hits[idx] += 1;
        }
        for count in hits {
            assert!((800..1200).contains(&count), "skewed distribution: {hits:?}");
        }
    }

    #[test]
    fn subset_fails_only_when_pool_too_small() {
        let mut rng = StdRng::seed_from_u64(1);
        let p = pool(10);
        assert!(select_subset(&p, 10, &mut rng).is_ok());
        assert!(select_subset(&p, 0, &mut rng).unwrap().is_empty());
        assert_eq!(
            select_subset(&p, 11, &mut rng).unwrap_err(),
            QuizError::InsufficientQuestions { requested: 11, available: 10 }
        );
    }

    #[test]
    fn subset_has_no_repeats() {
        let mut rng = StdRng::seed_from_u64(3);
        let p = pool(25);
        for _ in 0..20 {
            let picked = select_subset(&p, 20, &mut rng).unwrap();
            assert_eq!(picked.len(), 20);
            let prompts: HashSet<_> = picked.iter().map(|q| q.question.clone()).collect();
            assert_eq!(prompts.len(), 20);
            assert!(picked.iter().all(|q| p.contains(q)));
        }
    }

    #[test]
    fn poll_carries_prompt_and_explanation() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut q = question(5, 3, 2);
        q.explanation = Some("because".into());
        let poll = build_poll(&q, &mut rng);
        assert_eq!(poll.prompt, "Q5");
        assert_eq!(poll.explanation.as_deref(), Some("because"));
        assert_eq!(poll.options[poll.correct_index], "Q5 option 2");
    }
}
