//! Text severity adapter (BERT sequence classification via Candle).

pub mod bert_model;
pub mod bert_severity;

pub use bert_model::BertSequenceClassifier;
pub use bert_severity::{
    BertSeverityClassifier, argmax, load_tokenizer,
    tier_for_class,
};
