//! Wiring & DI. Entry point: load models, inject into the diagnosis service, serve HTTP.
//! No business logic here.

use anyhow::Context;
use derm_triage::adapters::http::{AppState, build_app, serve};
use derm_triage::adapters::llm::{
    GeminiAdapter, MockNarrativeAdapter, OpenAiAdapter, gemini_adapter, openai_adapter,
};
use derm_triage::adapters::severity::load_or_fallback;
use derm_triage::adapters::text::BertSeverityClassifier;
use derm_triage::adapters::unavailable::UnavailableModel;
use derm_triage::adapters::vision::VitClassifier;
use derm_triage::ports::{
    DiagnosisUseCase, ImageClassifierPort, NarrativePort, SeverityResolver, TextSeverityPort,
};
use derm_triage::shared::config::{AppConfig, LlmProvider, SeverityStrategy};
use derm_triage::shared::logging::init_tracing;
use derm_triage::usecases::{DiagnosisService, TableLookupResolver, TextModelResolver};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_loaded = dotenv::dotenv();
    init_tracing();
    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!("no .env found (check CWD)"),
    }

    let cfg = AppConfig::load().context("load configuration (TRIAGE_* env / TRIAGE_CONFIG)")?;
    let strategy = cfg
        .severity_strategy()
        .map_err(anyhow::Error::msg)
        .context("TRIAGE_SEVERITY_STRATEGY")?;

    // --- Severity table (always loaded; falls back to the built-in mapping) ---
    let table = Arc::new(load_or_fallback(cfg.severity_csv_path().as_deref()));
    let severity_entries = table.len();

    // --- Image classifier ---
    let model_dir = cfg.vit_model_dir_or_default();
    let labels_dir = cfg.vit_labels_dir();
    let classifier: Arc<dyn ImageClassifierPort> =
        match VitClassifier::load(&model_dir, labels_dir.as_deref()) {
            Ok(vit) => Arc::new(vit),
            Err(e) => {
                error!(path = %model_dir.display(), error = %e, "ViT classifier unavailable");
                Arc::new(UnavailableModel::new("image classifier", e.to_string()))
            }
        };

    // --- Severity resolver ---
    let resolver: Arc<dyn SeverityResolver> = match strategy {
        SeverityStrategy::Table => Arc::new(TableLookupResolver::new(table)),
        SeverityStrategy::TextModel => Arc::new(TextModelResolver::new(load_text_model(&cfg)?)),
    };
    info!(strategy = %strategy, severity_entries, "severity resolver ready");

    // --- Narrative generator ---
    let narrator = build_narrator(&cfg)?;

    let diagnosis: Arc<dyn DiagnosisUseCase> =
        Arc::new(DiagnosisService::new(classifier, resolver, narrator));
    let state = Arc::new(AppState {
        diagnosis,
        severity_entries,
    });

    let app = build_app(state, cfg.max_body_bytes_or_default(), cfg.cors_origins());
    serve(&cfg.bind_addr(), app)
        .await
        .with_context(|| format!("serve on {}", cfg.bind_addr()))?;
    Ok(())
}

fn load_text_model(cfg: &AppConfig) -> anyhow::Result<Arc<dyn TextSeverityPort>> {
    let label_map = cfg
        .bert_label_map()
        .map_err(anyhow::Error::msg)
        .context("TRIAGE_BERT_LABEL_MAP")?;
    let model_dir = cfg.bert_model_dir_or_default();
    let port: Arc<dyn TextSeverityPort> =
        match BertSeverityClassifier::load(&model_dir, label_map, cfg.bert_max_length_or_default())
        {
            Ok(bert) => Arc::new(bert),
            Err(e) => {
                error!(path = %model_dir.display(), error = %e, "BERT severity classifier unavailable");
                Arc::new(UnavailableModel::new("text severity classifier", e.to_string()))
            }
        };
    Ok(port)
}

fn build_narrator(cfg: &AppConfig) -> anyhow::Result<Arc<dyn NarrativePort>> {
    let provider = cfg
        .llm_provider()
        .map_err(anyhow::Error::msg)
        .context("TRIAGE_LLM_PROVIDER")?;
    let api_key = cfg.llm_api_key().unwrap_or_default();

    let narrator: Arc<dyn NarrativePort> = match provider {
        LlmProvider::Gemini => {
            let model = cfg
                .llm_model()
                .unwrap_or_else(|| gemini_adapter::DEFAULT_GEMINI_MODEL.to_string());
            info!(model = %model, "narrative generator: gemini");
            Arc::new(GeminiAdapter::new(
                cfg.llm_api_url()
                    .unwrap_or_else(|| gemini_adapter::DEFAULT_GEMINI_BASE_URL.to_string()),
                api_key,
                model,
            ))
        }
        LlmProvider::OpenAi => {
            let model = cfg
                .llm_model()
                .unwrap_or_else(|| openai_adapter::DEFAULT_OPENAI_MODEL.to_string());
            info!(model = %model, "narrative generator: openai-compatible");
            Arc::new(OpenAiAdapter::new(
                cfg.llm_api_url()
                    .unwrap_or_else(|| openai_adapter::DEFAULT_OPENAI_URL.to_string()),
                api_key,
                model,
            ))
        }
        LlmProvider::Mock => {
            if !cfg.is_llm_configured() {
                warn!("TRIAGE_LLM_API_KEY not set, using mock narrative adapter");
            }
            Arc::new(MockNarrativeAdapter::new())
        }
    };
    Ok(narrator)
}
