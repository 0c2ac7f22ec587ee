use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use futures::StreamExt;
use tracing::{info, instrument, warn};

use genai::client::{GenerationRequest, TextGenerator};
use genai::parser;
use gh_client::model::PullRequest;

use crate::metrics;
use crate::model::{
    Assessment, CategoryAssignment, CategoryMapping, Cluster, Question, QuestionSet, RawCluster,
    RawMapping, RawQuestion, Relevance,
};
use crate::prompts;
use crate::rubric::{self, Level};
use crate::store::AssessmentStore;

/// Structured-extraction stages run cool; question writing gets more room.
pub const EXTRACTION_TEMPERATURE: f32 = 0.3;
pub const QUESTION_TEMPERATURE: f32 = 0.5;

/// One streamed chunk of pipeline progress. Callbacks run inline with
/// stream consumption and must return quickly.
#[derive(Debug, Clone)]
pub struct StageEvent {
    pub step: u8,
    pub label: String,
    pub detail: String,
}

/// Three-stage analysis over an engineer's merged pull requests: cluster
/// into projects, map onto the rubric, generate reflection questions per
/// project. Stages are strictly sequential; stage N+1 consumes stage N's
/// fully parsed output.
pub struct AnalysisPipeline {
    generator: Arc<dyn TextGenerator>,
    store: AssessmentStore,
}

impl AnalysisPipeline {
    pub fn new(generator: Arc<dyn TextGenerator>, store: AssessmentStore) -> Self {
        Self { generator, store }
    }

    #[instrument(skip_all, fields(prs = prs.len(), level = level.as_str(), user = %user_email))]
    pub async fn run(
        &self,
        prs: Vec<PullRequest>,
        level: Level,
        user_email: &str,
        mut on_stage: impl FnMut(StageEvent),
    ) -> Result<Assessment> {
        metrics::PIPELINE_RUNS_TOTAL.inc();

        let clusters = self.cluster(&prs, &mut on_stage).await?;
        info!(clusters = clusters.len(), "clustering stage complete");

        let mappings = self.map_categories(&clusters, level, &mut on_stage).await?;
        info!(mappings = mappings.len(), "category mapping stage complete");

        let questions = self
            .generate_questions(&clusters, &mappings, &mut on_stage)
            .await?;
        info!(question_sets = questions.len(), "question stage complete");

        let assessment = Assessment {
            user_email: user_email.to_string(),
            clusters,
            mappings,
            questions,
            narrative: None,
            generated_at: Utc::now(),
        };

        if let Err(err) = self.store.upsert(&assessment).await {
            warn!(
                user = %assessment.user_email,
                error = %err,
                "assessment persistence failed; returning the in-memory result"
            );
        }

        Ok(assessment)
    }

    async fn cluster(
        &self,
        prs: &[PullRequest],
        on_stage: &mut impl FnMut(StageEvent),
    ) -> Result<Vec<Cluster>> {
        if prs.is_empty() {
            return Ok(Vec::new());
        }
        let text = self
            .collect_stage(
                "cluster",
                1,
                "Grouping pull requests into projects",
                prompts::clustering_prompt(prs),
                EXTRACTION_TEMPERATURE,
                on_stage,
            )
            .await?;
        let raw: Vec<RawCluster> = parser::parse_array(&text);
        Ok(resolve_clusters(raw, prs))
    }

    async fn map_categories(
        &self,
        clusters: &[Cluster],
        level: Level,
        on_stage: &mut impl FnMut(StageEvent),
    ) -> Result<Vec<CategoryMapping>> {
        if clusters.is_empty() {
            return Ok(Vec::new());
        }
        let text = self
            .collect_stage(
                "map",
                2,
                "Mapping projects to rubric categories",
                prompts::mapping_prompt(clusters, level),
                EXTRACTION_TEMPERATURE,
                on_stage,
            )
            .await?;
        let raw: Vec<RawMapping> = parser::parse_array(&text);
        Ok(resolve_mappings(raw, clusters, level))
    }

    async fn generate_questions(
        &self,
        clusters: &[Cluster],
        mappings: &[CategoryMapping],
        on_stage: &mut impl FnMut(StageEvent),
    ) -> Result<Vec<QuestionSet>> {
        let total = clusters.len();
        let mut sets = Vec::with_capacity(total);
        for (i, cluster) in clusters.iter().enumerate() {
            let mapping = mappings.iter().find(|m| m.cluster_id == cluster.id);
            let label = format!("Generating reflection questions ({}/{})", i + 1, total);
            let text = self
                .collect_stage(
                    "questions",
                    3,
                    &label,
                    prompts::question_prompt(cluster, mapping),
                    QUESTION_TEMPERATURE,
                    on_stage,
                )
                .await?;
            let raw: Vec<RawQuestion> = parser::parse_array(&text);
            sets.push(build_question_set(&cluster.id, raw));
        }
        Ok(sets)
    }

    /// Run one generation call, forwarding every delta to the callback and
    /// returning the accumulated text.
    async fn collect_stage(
        &self,
        stage: &'static str,
        step: u8,
        label: &str,
        prompt: String,
        temperature: f32,
        on_stage: &mut impl FnMut(StageEvent),
    ) -> Result<String> {
        let timer = metrics::STAGE_DURATION
            .with_label_values(&[stage])
            .start_timer();
        let mut stream = self
            .generator
            .stream_completion(GenerationRequest {
                prompt,
                temperature,
            })
            .await?;

        let mut text = String::new();
        while let Some(delta) = stream.next().await {
            let delta = delta?;
            on_stage(StageEvent {
                step,
                label: label.to_string(),
                detail: delta.clone(),
            });
            text.push_str(&delta);
        }
        timer.observe_duration();
        Ok(text)
    }
}

/// Resolve model-returned indices back into PR records. Out-of-range and
/// repeated indices are dropped, clusters left with no members vanish, and
/// indices the model never assigned are gathered into a catch-all cluster
/// so no input PR silently disappears.
pub fn resolve_clusters(raw: Vec<RawCluster>, prs: &[PullRequest]) -> Vec<Cluster> {
    let mut assigned = vec![false; prs.len()];
    let mut clusters = Vec::new();

    for (n, item) in raw.into_iter().enumerate() {
        let mut members = Vec::new();
        for index in item.pr_indices {
            let Ok(index) = usize::try_from(index) else {
                continue;
            };
            if index >= prs.len() || assigned[index] {
                continue;
            }
            assigned[index] = true;
            members.push(prs[index].clone());
        }
        if members.is_empty() {
            continue;
        }
        let id = if item.id.trim().is_empty() {
            format!("cluster-{}", n + 1)
        } else {
            item.id
        };
        clusters.push(Cluster {
            id,
            name: item.name,
            summary: item.summary,
            prs: members,
        });
    }

    let unassigned: Vec<PullRequest> = prs
        .iter()
        .zip(&assigned)
        .filter(|(_, taken)| !**taken)
        .map(|(pr, _)| pr.clone())
        .collect();
    if !unassigned.is_empty() {
        warn!(
            count = unassigned.len(),
            "clustering left pull requests unassigned; adding a catch-all cluster"
        );
        clusters.push(Cluster {
            id: "unclustered".into(),
            name: "Other work".into(),
            summary: "Merged pull requests that did not fit an identified project.".into(),
            prs: unassigned,
        });
    }

    clusters
}

/// Validate model-returned mappings: unknown cluster ids and category ids
/// outside the level's rubric are dropped, relevance tiers are coerced, and
/// at most one mapping per cluster survives.
pub fn resolve_mappings(
    raw: Vec<RawMapping>,
    clusters: &[Cluster],
    level: Level,
) -> Vec<CategoryMapping> {
    let known: HashSet<&str> = clusters.iter().map(|c| c.id.as_str()).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut mappings = Vec::new();

    for mapping in raw {
        if !known.contains(mapping.cluster_id.as_str()) {
            warn!(cluster_id = %mapping.cluster_id, "mapping references an unknown cluster; dropping");
            continue;
        }
        if !seen.insert(mapping.cluster_id.clone()) {
            continue;
        }
        let categories = mapping
            .categories
            .into_iter()
            .filter_map(|assignment| {
                if !rubric::is_valid_category(level, &assignment.category_id) {
                    warn!(
                        category_id = %assignment.category_id,
                        level = level.as_str(),
                        "category id not in the rubric; dropping"
                    );
                    return None;
                }
                Some(CategoryAssignment {
                    category_id: assignment.category_id,
                    relevance: Relevance::from_untrusted(&assignment.relevance),
                    evidence: assignment.evidence,
                })
            })
            .collect();
        mappings.push(CategoryMapping {
            cluster_id: mapping.cluster_id,
            categories,
        });
    }

    mappings
}

/// Question ids are derived from the cluster id; whatever id the model
/// proposed is discarded.
pub fn build_question_set(cluster_id: &str, raw: Vec<RawQuestion>) -> QuestionSet {
    let questions = raw
        .into_iter()
        .enumerate()
        .map(|(n, q)| Question {
            id: format!("{cluster_id}-q{}", n + 1),
            text: q.text,
            context: q.context,
        })
        .collect();
    QuestionSet {
        cluster_id: cluster_id.to_string(),
        questions,
    }
}
