use thiserror::Error;

/// Failures that reach the caller of a pipeline run.
///
/// Per-item problems in the search and recommendation stages are absorbed
/// inside those stages and never surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("question is empty")]
    EmptyQuestion,

    #[error("{stage} failed: {source:#}")]
    StageFailed {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("{stage} failed: search results are misaligned with checklist items ({detail})")]
    Misaligned { stage: &'static str, detail: String },

    #[error("{0} environment variable not set")]
    MissingCredential(&'static str),
}

impl PipelineError {
    pub fn stage(stage: &'static str, source: anyhow::Error) -> Self {
        PipelineError::StageFailed { stage, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_failure_names_the_stage() {
        let err = PipelineError::stage("ChecklistExtractor", anyhow::anyhow!("connection refused"));
        let message = err.to_string();
        assert!(message.starts_with("ChecklistExtractor failed"));
        assert!(message.contains("connection refused"));
    }

    #[test]
    fn test_misalignment_names_the_stage() {
        let err = PipelineError::Misaligned {
            stage: "Recommender",
            detail: "2 items, 1 result groups".to_string(),
        };
        assert!(err.to_string().starts_with("Recommender failed: search results are misaligned"));
    }

    #[test]
    fn test_missing_credential_message() {
        let err = PipelineError::MissingCredential("NAVER_CLIENT_ID");
        assert_eq!(err.to_string(), "NAVER_CLIENT_ID environment variable not set");
    }
}
