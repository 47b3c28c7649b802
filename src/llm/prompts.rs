//! Prompt text sent to conversational providers.
//!
//! Conversational providers (OpenRouter, DeepSeek) receive two messages:
//!
//! - A **system message** that frames the assistant as the Site Tracker
//!   helper for Philippines Region 2.
//! - A **user message**: the question, optionally followed by a short
//!   preview of the loaded dataset.
//!
//! Other providers get the bare question as a single user message.

use serde_json::{Map, Value};

use super::ChatMessage;
use crate::dataset::Dataset;

/// Upper bound on preview rows regardless of configuration.
pub const MAX_SAMPLE_RECORDS: usize = 5;

pub const SYSTEM_INSTRUCTION: &str = "You are an AI assistant for the Philippines Region 2 \
Site Tracker dashboard. Help analyze telecommunications site data, provide geographic \
insights, identify issues, and suggest optimizations for the region.";

/// Options controlling what goes into the user message.
#[derive(Debug, Clone, Copy)]
pub struct ContextOptions {
    pub include_data_context: bool,
    pub sample_records: usize,
}

/// Build the message list for one question.
pub fn build_messages(
    message: &str,
    dataset: Option<&Dataset>,
    conversational: bool,
    options: ContextOptions,
) -> Vec<ChatMessage> {
    if !conversational {
        return vec![ChatMessage::user(message)];
    }

    let user = match dataset {
        Some(ds) if options.include_data_context && !ds.is_empty() => {
            format!("{message}\n\n{}", data_context(ds, options.sample_records))
        }
        _ => message.to_string(),
    };

    vec![ChatMessage::system(SYSTEM_INSTRUCTION), ChatMessage::user(user)]
}

/// Dataset preview: record count, field list, first few records.
pub fn data_context(dataset: &Dataset, sample_records: usize) -> String {
    if dataset.is_empty() {
        return "No data currently loaded.".to_string();
    }

    let sample_size = sample_records.min(MAX_SAMPLE_RECORDS).min(dataset.len());
    let sample: Vec<Value> = dataset.records()[..sample_size]
        .iter()
        .map(|r| {
            let map: Map<String, Value> =
                r.entries().map(|(k, v)| (k.to_string(), v.clone())).collect();
            Value::Object(map)
        })
        .collect();
    let sample_json = serde_json::to_string_pretty(&sample).unwrap_or_default();

    format!(
        "Dataset Summary:\n- Total Records: {}\n- Data Fields: {}\n- Sample Data (first {} records): {}",
        dataset.len(),
        dataset.headers().join(", "),
        sample_size,
        sample_json
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Record;

    fn options() -> ContextOptions {
        ContextOptions {
            include_data_context: true,
            sample_records: 5,
        }
    }

    fn sites(n: usize) -> Dataset {
        (0..n)
            .map(|i| {
                Record::new()
                    .with("_originalIndex", i as u64)
                    .with("Site", format!("S{i}"))
                    .with("Province", "Cagayan")
            })
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn non_conversational_gets_bare_question() {
        let msgs = build_messages("hello", Some(&sites(3)), false, options());
        assert_eq!(msgs, vec![ChatMessage::user("hello")]);
    }

    #[test]
    fn conversational_gets_system_and_preview() {
        let msgs = build_messages("hello", Some(&sites(8)), true, options());
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, "system");
        assert_eq!(msgs[0].content, SYSTEM_INSTRUCTION);
        let user = &msgs[1].content;
        assert!(user.starts_with("hello\n\nDataset Summary:"));
        assert!(user.contains("- Total Records: 8"));
        assert!(user.contains("- Data Fields: Site, Province"));
        assert!(user.contains("(first 5 records)"));
        assert!(user.contains("\"S4\""));
        assert!(!user.contains("\"S5\""));
        assert!(!user.contains("_originalIndex"));
    }

    #[test]
    fn empty_dataset_adds_no_preview() {
        let msgs = build_messages("hello", Some(&Dataset::empty()), true, options());
        assert_eq!(msgs[1].content, "hello");
    }

    #[test]
    fn preview_can_be_disabled() {
        let opts = ContextOptions {
            include_data_context: false,
            sample_records: 5,
        };
        let msgs = build_messages("hello", Some(&sites(2)), true, opts);
        assert_eq!(msgs[1].content, "hello");
    }
}
