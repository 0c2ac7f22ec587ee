use std::collections::BTreeSet;
use std::fmt::Write as _;

use common::text::truncate;
use gh_client::model::PullRequest;

use crate::model::{CategoryMapping, Cluster};
use crate::rubric::{self, Level};

/// PR bodies are cut to this many characters in the clustering prompt.
const BODY_PREVIEW_CHARS: usize = 200;
/// Titles listed per cluster in the category-mapping prompt.
const MAPPING_TITLE_LIMIT: usize = 10;
/// Titles listed in a question-generation prompt.
const QUESTION_TITLE_LIMIT: usize = 8;

pub fn clustering_prompt(prs: &[PullRequest]) -> String {
    let mut prompt = String::from(
        "You are helping an engineer prepare a performance-review self-assessment. \
         Group their merged pull requests into coherent projects.\n\nPull requests:\n",
    );
    for (idx, pr) in prs.iter().enumerate() {
        let merged = pr
            .merged_at
            .map(|ts| ts.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let _ = writeln!(
            prompt,
            "{idx}. [{}] {} (merged {merged}, +{}/-{})",
            pr.repo, pr.title, pr.additions, pr.deletions
        );
        if !pr.body.is_empty() {
            let _ = writeln!(prompt, "   {}", truncate(&pr.body, BODY_PREVIEW_CHARS));
        }
    }
    prompt.push_str(
        "\nPartition ALL of the indices above into 3-8 named clusters. Group by \
         repository, title-pattern similarity, time proximity, or a cross-cutting \
         topic. Use a \"Miscellaneous\" cluster for anything that fits nowhere else. \
         Every index must appear in exactly one cluster.\n\n\
         Respond with a JSON array only, no prose. Each element: \
         {\"id\": \"kebab-case-id\", \"name\": \"short label\", \
         \"summary\": \"one or two sentences\", \"prIndices\": [0, 1]}\n",
    );
    prompt
}

pub fn mapping_prompt(clusters: &[Cluster], level: Level) -> String {
    let mut prompt = String::from(
        "Map each project below onto the expectation categories of an engineering \
         rubric for a performance self-assessment.\n\n",
    );
    prompt.push_str(&rubric::rubric_text(level));
    let _ = writeln!(
        prompt,
        "\nValid category ids: {}\n\nProjects:",
        rubric::category_ids(level).join(", ")
    );

    for cluster in clusters {
        let repos: BTreeSet<&str> = cluster.prs.iter().map(|pr| pr.repo.as_str()).collect();
        let _ = writeln!(
            prompt,
            "\nid: {}\nname: {}\nsummary: {}\npull requests: {} across {}",
            cluster.id,
            cluster.name,
            cluster.summary,
            cluster.prs.len(),
            repos.into_iter().collect::<Vec<_>>().join(", ")
        );
        for pr in cluster.prs.iter().take(MAPPING_TITLE_LIMIT) {
            let _ = writeln!(prompt, "- {}", pr.title);
        }
    }

    prompt.push_str(
        "\nFor every project assign 2-4 category ids drawn ONLY from the valid id \
         list, each with a relevance tier (high, medium, or low) and one sentence of \
         evidence grounded in the listed work.\n\n\
         Respond with a JSON array only, no prose. Each element: \
         {\"clusterId\": \"...\", \"categories\": [{\"categoryId\": \"...\", \
         \"relevance\": \"high\", \"evidence\": \"...\"}]}\n",
    );
    prompt
}

pub fn question_prompt(cluster: &Cluster, mapping: Option<&CategoryMapping>) -> String {
    let mut prompt = format!(
        "Write reflection questions for a performance self-assessment about the \
         following project.\n\nProject: {}\nSummary: {}\n\nRepresentative pull requests:\n",
        cluster.name, cluster.summary
    );
    for pr in cluster.prs.iter().take(QUESTION_TITLE_LIMIT) {
        let _ = writeln!(prompt, "- [{}] {}", pr.repo, pr.title);
    }

    if let Some(mapping) = mapping.filter(|m| !m.categories.is_empty()) {
        prompt.push_str("\nRubric categories this project speaks to:\n");
        for assignment in &mapping.categories {
            let _ = writeln!(prompt, "- {}: {}", assignment.category_id, assignment.evidence);
        }
    }

    prompt.push_str(
        "\nWrite 2-4 open-ended questions that reference the concrete work above and \
         prompt the engineer to reflect on business impact, collaboration, and \
         challenges overcome.\n\n\
         Respond with a JSON array only, no prose. Each element: \
         {\"text\": \"the question\", \"context\": \"why this question, one sentence\"}\n",
    );
    prompt
}
