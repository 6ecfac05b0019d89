// src/analyze/mod.rs
//! LLM-backed sentiment classification.

pub mod ai_adapter;

pub use ai_adapter::{
    build_classifier, parse_classification, BudgetedClassifier, ChatCompletionsClassifier,
    DynClassifier, GeminiClassifier, SentimentClassifier,
};
