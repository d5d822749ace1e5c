// Extraction Service: resume source (+ optional JD) -> AnalysisResult.
// All LLM calls go through llm_client; no direct Gemini calls here.

pub mod extractor;
pub mod handlers;
pub mod prompts;
