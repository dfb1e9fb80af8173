use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::feedback::{FeedbackRecord, Subject};

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SubjectAverage {
    pub subject: Subject,
    pub average_rating: f64,
    pub responses: usize,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct OverallSummary {
    pub total_responses: usize,
    pub average_rating: Option<f64>,
}

// Chart data structures
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ChartData {
    pub fn from_averages(averages: &[SubjectAverage]) -> Self {
        ChartData {
            labels: averages.iter().map(|a| a.subject.to_string()).collect(),
            values: averages.iter().map(|a| a.average_rating).collect(),
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct WordWeight {
    pub word: String,
    pub count: usize,
    /// `count` relative to the most frequent word, in (0, 1].
    pub weight: f64,
}

/// Mean rating per subject, best-rated subject first.
pub fn average_by_subject(records: &[FeedbackRecord]) -> Vec<SubjectAverage> {
    let mut totals: BTreeMap<Subject, (u64, usize)> = BTreeMap::new();
    for record in records {
        let entry = totals.entry(record.subject).or_insert((0, 0));
        entry.0 += u64::from(record.rating.value());
        entry.1 += 1;
    }

    let mut averages: Vec<SubjectAverage> = totals
        .into_iter()
        .map(|(subject, (sum, count))| SubjectAverage {
            subject,
            average_rating: sum as f64 / count as f64,
            responses: count,
        })
        .collect();

    // Stable sort keeps enumeration order among equal averages.
    averages.sort_by(|a, b| b.average_rating.total_cmp(&a.average_rating));
    averages
}

pub fn overall_summary(records: &[FeedbackRecord]) -> OverallSummary {
    let total_responses = records.len();
    let average_rating = (total_responses > 0).then(|| {
        let sum: u64 = records.iter().map(|r| u64::from(r.rating.value())).sum();
        sum as f64 / total_responses as f64
    });

    OverallSummary {
        total_responses,
        average_rating,
    }
}

/// Distinct subjects in order of first appearance.
pub fn subjects_present(records: &[FeedbackRecord]) -> Vec<Subject> {
    let mut subjects = Vec::new();
    for record in records {
        if !subjects.contains(&record.subject) {
            subjects.push(record.subject);
        }
    }
    subjects
}

/// Non-blank comments left for `subject`.
pub fn comments_for_subject(records: &[FeedbackRecord], subject: Subject) -> Vec<String> {
    records
        .iter()
        .filter(|r| r.subject == subject && !r.comments.trim().is_empty())
        .map(|r| r.comments.clone())
        .collect()
}

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w[\w']+").expect("word pattern is valid"));

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "else",
    "ever", "few", "for", "from", "further", "get", "had", "has", "have", "having", "he", "her",
    "here", "hers", "herself", "him", "himself", "his", "how", "however", "i", "i'm", "if", "in",
    "into", "is", "it", "it's", "its", "itself", "just", "me", "more", "most", "my", "myself",
    "no", "nor", "not", "of", "off", "on", "once", "only", "or", "other", "otherwise", "ought",
    "our", "ours", "ourselves", "out", "over", "own", "same", "shall", "she", "should", "so",
    "some", "such", "than", "that", "the", "their", "theirs", "them", "themselves", "then",
    "there", "these", "they", "this", "those", "through", "to", "too", "under", "until", "up",
    "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom", "why",
    "with", "would", "you", "your", "yours", "yourself", "yourselves",
];

/// Word counts for a word cloud over all `comments`, most frequent first.
pub fn word_frequencies(comments: &[String], max_words: usize) -> Vec<WordWeight> {
    let text = comments.join(" ").to_lowercase();

    let mut counts: HashMap<String, usize> = HashMap::new();
    for token in WORD.find_iter(&text).map(|m| m.as_str()) {
        let word = token.strip_suffix("'s").unwrap_or(token).trim_end_matches('\'');
        if word.chars().count() < 2
            || STOP_WORDS.contains(&word)
            || word.chars().all(|c| c.is_ascii_digit())
        {
            continue;
        }
        *counts.entry(word.to_string()).or_insert(0) += 1;
    }

    let mut words: Vec<(String, usize)> = counts.into_iter().collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.truncate(max_words);

    let max_count = words.first().map(|(_, count)| *count).unwrap_or(1) as f64;
    words
        .into_iter()
        .map(|(word, count)| WordWeight {
            word,
            count,
            weight: count as f64 / max_count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{NewFeedback, Rating};

    fn record(id: i64, subject: Subject, rating: u8, comments: &str) -> FeedbackRecord {
        NewFeedback {
            student_name: String::new(),
            subject,
            rating: Rating::new(rating).unwrap(),
            comments: comments.to_string(),
        }
        .into_record(id, None)
    }

    #[test]
    fn mean_of_five_three_four_is_four() {
        let records = vec![
            record(1, Subject::Physics, 5, ""),
            record(2, Subject::Physics, 3, ""),
            record(3, Subject::Physics, 4, ""),
        ];

        let averages = average_by_subject(&records);
        assert_eq!(averages.len(), 1);
        assert_eq!(averages[0].subject, Subject::Physics);
        assert_eq!(averages[0].average_rating, 4.0);
        assert_eq!(averages[0].responses, 3);
    }

    #[test]
    fn averages_sorted_descending() {
        let records = vec![
            record(1, Subject::English, 2, ""),
            record(2, Subject::Chemistry, 5, ""),
            record(3, Subject::Mathematics, 3, ""),
            record(4, Subject::Physics, 3, ""),
        ];

        let order: Vec<Subject> = average_by_subject(&records).into_iter().map(|a| a.subject).collect();
        assert_eq!(
            order,
            vec![Subject::Chemistry, Subject::Physics, Subject::Mathematics, Subject::English]
        );
    }

    #[test]
    fn overall_summary_handles_empty_store() {
        assert_eq!(
            overall_summary(&[]),
            OverallSummary {
                total_responses: 0,
                average_rating: None
            }
        );

        let records = vec![record(1, Subject::Physics, 5, ""), record(2, Subject::English, 2, "")];
        let summary = overall_summary(&records);
        assert_eq!(summary.total_responses, 2);
        assert_eq!(summary.average_rating, Some(3.5));
    }

    #[test]
    fn subjects_in_first_seen_order() {
        let records = vec![
            record(1, Subject::English, 2, ""),
            record(2, Subject::Physics, 5, ""),
            record(3, Subject::English, 3, ""),
        ];
        assert_eq!(subjects_present(&records), vec![Subject::English, Subject::Physics]);
    }

    #[test]
    fn blank_comments_are_skipped() {
        let records = vec![
            record(1, Subject::Physics, 5, "Loved the labs"),
            record(2, Subject::Physics, 3, "   "),
            record(3, Subject::English, 4, "Nice essays"),
            record(4, Subject::Physics, 2, "Too much homework"),
        ];

        assert_eq!(
            comments_for_subject(&records, Subject::Physics),
            vec!["Loved the labs".to_string(), "Too much homework".to_string()]
        );
        assert!(comments_for_subject(&records, Subject::Chemistry).is_empty());
    }

    #[test]
    fn chart_data_follows_average_order() {
        let averages = vec![
            SubjectAverage {
                subject: Subject::ComputerScience,
                average_rating: 4.5,
                responses: 2,
            },
            SubjectAverage {
                subject: Subject::English,
                average_rating: 3.0,
                responses: 1,
            },
        ];

        let chart = ChartData::from_averages(&averages);
        assert_eq!(chart.labels, vec!["Computer Science", "English"]);
        assert_eq!(chart.values, vec![4.5, 3.0]);
    }

    #[test]
    fn word_frequencies_drop_stop_words_and_numbers() {
        let comments = vec![
            "The lab was great and the lecturer's notes were great".to_string(),
            "Great lab, 2024 was a good year".to_string(),
        ];

        let words = word_frequencies(&comments, 10);
        assert_eq!(words[0].word, "great");
        assert_eq!(words[0].count, 3);
        assert_eq!(words[0].weight, 1.0);
        assert_eq!(words[1].word, "lab");
        assert_eq!(words[1].count, 2);

        let all: Vec<&str> = words.iter().map(|w| w.word.as_str()).collect();
        assert!(all.contains(&"lecturer"));
        assert!(!all.contains(&"the"));
        assert!(!all.contains(&"2024"));
    }

    #[test]
    fn word_frequencies_respect_limit_and_empty_input() {
        assert!(word_frequencies(&[], 10).is_empty());
        assert!(word_frequencies(&["  ".to_string()], 10).is_empty());

        let comments = vec!["alpha beta gamma delta".to_string()];
        assert_eq!(word_frequencies(&comments, 2).len(), 2);
    }
}
