//! End-to-end analysis of one screenshot pair
//!
//! context (scene + skills + glossary) -> analysis -> verification ->
//! reconciliation. Each stage only sees the previous stage's output plus
//! read-only request context, so any number of pipelines can run side by side.

use crate::config::Config;
use crate::error::{LqaError, LqaResult};
use crate::llm::{
    analysis_prompts, analyze, load_pair, verification_prompts, verify, AnalysisSettings,
    GenerationBackend, ModelChain, PromptContext, RetryPolicy,
};
use crate::reconcile::reconcile;
use crate::report::{AnalysisRequest, Report};
use crate::skills::{self, DEFAULT_MAX_SCENE_SKILLS};
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, info, info_span, Instrument};

pub struct Pipeline<B> {
    backend: B,
    config: Config,
    retry: RetryPolicy,
}

impl<B: GenerationBackend> Pipeline<B> {
    pub fn new(backend: B, config: Config) -> Self {
        Self {
            backend,
            config,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the per-model retry budget and backoff.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Produce the final report for one request.
    pub async fn run(&self, request: &AnalysisRequest) -> LqaResult<Report> {
        let span = info_span!("analysis", request_id = %request.request_id);
        self.run_inner(request).instrument(span).await
    }

    /// `run` with a caller-level deadline.
    pub async fn run_with_timeout(
        &self,
        request: &AnalysisRequest,
        timeout: Duration,
    ) -> LqaResult<Report> {
        tokio::time::timeout(timeout, self.run(request))
            .await
            .map_err(|_| {
                LqaError::transport(format!("analysis timed out after {}s", timeout.as_secs()))
            })?
    }

    async fn run_inner(&self, request: &AnalysisRequest) -> LqaResult<Report> {
        let glossary = request.glossary();
        let skill_set = skills::retrieve(&request.scene_hint, &request.target_language);
        let skill_block = skills::format(&skill_set, DEFAULT_MAX_SCENE_SKILLS);
        info!(
            scene = %skill_set.scene_type,
            general_skills = skill_set.general_skills.len(),
            scene_skills = skill_set.scene_skills.len(),
            "context assembled"
        );

        let ctx = PromptContext {
            target_language: &request.target_language,
            report_language: &request.report_language,
            skill_block: &skill_block,
            glossary_text: glossary,
        };
        let prompts = analysis_prompts(&ctx, &request.request_id);
        debug!(
            system_chars = prompts.system.len(),
            user_chars = prompts.user.len(),
            "analysis prompts built"
        );

        let (source, target) = load_pair(
            self.backend.http_client(),
            &request.source_image,
            &request.target_image,
            &self.retry,
        )
        .await?;
        let images = [source, target];

        let settings = AnalysisSettings {
            chain: ModelChain::analysis(&self.config, self.retry),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        let draft = analyze(
            &self.backend,
            &settings,
            &request.request_id,
            &prompts,
            &images,
        )
        .await?;

        let verified = if self.config.verify && !draft.issues.is_empty() {
            let verify_prompts = verification_prompts(&ctx, &draft.issues);
            verify(
                &self.backend,
                &ModelChain::verification(&self.config),
                self.config.temperature,
                self.config.max_tokens,
                draft,
                &verify_prompts,
                &images,
            )
            .await
        } else {
            draft
        };

        let report = reconcile(verified, glossary);
        info!(
            quality = report.overall.quality_level.as_str(),
            issues = report.issues.len(),
            "report finalized"
        );
        Ok(report)
    }
}

/// Outcome of one request in a batch
#[derive(Debug)]
pub struct BatchItem {
    pub request_id: String,
    pub result: LqaResult<Report>,
}

/// Run independent requests with at most `concurrency` in flight.
///
/// Results come back in input order.
pub async fn run_batch<B: GenerationBackend>(
    pipeline: &Pipeline<B>,
    requests: &[AnalysisRequest],
    concurrency: usize,
    timeout: Option<Duration>,
) -> Vec<BatchItem> {
    futures::stream::iter(requests)
        .map(|request| async move {
            let result = match timeout {
                Some(limit) => pipeline.run_with_timeout(request, limit).await,
                None => pipeline.run(request).await,
            };
            BatchItem {
                request_id: request.request_id.clone(),
                result,
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}
