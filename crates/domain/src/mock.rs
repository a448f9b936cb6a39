//! Deterministic mock data returned when a credential is missing or a
//! search/crawl call fails. Everything produced here is tagged as mock by the
//! caller (`isMockData`).

use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

use crate::model::{
    ResearchActivity, ResearchData, ResearchJob, ResearchOptions, ResearchSource, ResearchStatus,
    SearchResult,
};

/// Prefix of job ids that were never sent to the crawl service
pub const MOCK_JOB_PREFIX: &str = "mock-job-id-";

/// Mock jobs advance one depth level per this many seconds
pub const MOCK_SECONDS_PER_DEPTH: i64 = 2;

/// Depth at which a mock job completes
pub const MOCK_MAX_DEPTH: u32 = 5;

const BRAVE_SOURCE: &str = "Brave Search";
const FIRECRAWL_SOURCE: &str = "Firecrawl Search";

fn rfc3339(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_default()
}

fn compact(query: &str) -> String {
    query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("")
}

/// Ten plausible Brave-style results for `query`
pub fn brave_results(query: &str) -> Vec<SearchResult> {
    let q = urlencoding::encode(query);
    let rows: [(String, String, String, f64); 10] = [
        (
            format!("{query} - Official Site | Latest News"),
            format!("https://www.{}.com", compact(query)),
            format!("The official {query} site with product information, support and contact options."),
            0.95,
        ),
        (
            format!("What is {query}? Complete guide to features and usage"),
            format!("https://guide.example.com/{q}"),
            format!("Everything about {query}, from the basics to advanced use."),
            0.92,
        ),
        (
            format!("{query} review - how the pros choose"),
            format!("https://reviews.example.com/products/{q}"),
            format!("An expert review of {query} covering its strengths and weaknesses."),
            0.89,
        ),
        (
            format!("{query} vs the competition - which one to buy?"),
            format!("https://compare.example.com/{q}-comparison"),
            format!("{query} compared with its main competitors from several angles."),
            0.87,
        ),
        (
            format!("{query} prices - lowest price comparison"),
            format!("https://kakaku.example.com/items/{q}"),
            format!("Current {query} prices across retailers."),
            0.91,
        ),
        (
            format!("{query} - Wikipedia"),
            format!("https://ja.wikipedia.org/wiki/{q}"),
            format!("Background, history and main characteristics of {query}."),
            0.94,
        ),
        (
            format!("{query} troubleshooting - common problems and fixes"),
            format!("https://support.example.com/troubleshooting/{q}"),
            format!("Frequent issues with {query} and how to solve them."),
            0.85,
        ),
        (
            format!("{query} latest updates - new features"),
            format!("https://updates.example.com/{q}"),
            format!("Recent {query} updates and improvements."),
            0.88,
        ),
        (
            format!("Getting started with {query}"),
            format!("https://beginners.example.com/start-with-{q}"),
            format!("A step by step introduction to {query} for first-time users."),
            0.9,
        ),
        (
            format!("{query} pro tips - advanced techniques"),
            format!("https://pro-tips.example.com/{q}-advanced"),
            format!("Techniques for getting more out of {query}."),
            0.86,
        ),
    ];

    rows.into_iter()
        .map(|(title, url, description, confidence)| {
            SearchResult::new(title, url, BRAVE_SOURCE)
                .with_description(description)
                .with_confidence(confidence)
        })
        .collect()
}

/// Five plausible Firecrawl-style results for `query`
pub fn firecrawl_results(query: &str) -> Vec<SearchResult> {
    let q = urlencoding::encode(query);
    let rows: [(String, String, String, f64); 5] = [
        (
            format!("{query} - details and reviews"),
            format!("https://example.com/products/{q}"),
            format!("Detailed information, specifications and user reviews for {query}."),
            0.92,
        ),
        (
            format!("{query} official site"),
            format!("https://{}.com", compact(query)),
            format!("The official {query} website with product, support and purchase options."),
            0.95,
        ),
        (
            format!("{query} vs competitors"),
            format!("https://compare.tech/products/{q}"),
            format!("A detailed comparison of {query} with its main competitors."),
            0.88,
        ),
        (
            format!("{query} technical specifications"),
            format!("https://specs.tech/products/{q}"),
            format!("Technical specifications and performance data for {query}."),
            0.9,
        ),
        (
            format!("{query} user manual"),
            format!("https://manuals.tech/{q}"),
            format!("The official {query} user manual and guides."),
            0.87,
        ),
    ];

    rows.into_iter()
        .map(|(title, url, description, confidence)| {
            SearchResult::new(title, url, FIRECRAWL_SOURCE)
                .with_description(description)
                .with_confidence(confidence)
        })
        .collect()
}

/// Job id for a research job that only exists locally
pub fn mock_job_id(now: OffsetDateTime) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    format!("{}{}", MOCK_JOB_PREFIX, millis)
}

pub fn is_mock_job_id(job_id: &str) -> bool {
    job_id.starts_with(MOCK_JOB_PREFIX)
}

fn mock_job_created_at(job_id: &str) -> Option<OffsetDateTime> {
    let millis: i128 = job_id.strip_prefix(MOCK_JOB_PREFIX)?.parse().ok()?;
    OffsetDateTime::from_unix_timestamp_nanos(millis * 1_000_000).ok()
}

const LAUNCH_STEPS: [(&str, &str); 8] = [
    ("query-analysis", "Identified the main research areas for \"{q}\""),
    ("initial-search", "Collected baseline information about {q}"),
    ("source-discovery", "Found {n} relevant sources about {q}"),
    ("source-analysis", "Extracted information from multiple sources"),
    ("synthesis", "Merged data from multiple sources"),
    ("conflict-resolution", "Resolved contradictions between sources"),
    ("insights", "Generated key insights about {q}"),
    ("final-analysis", "Wrote the comprehensive analysis report"),
];

/// A completed research job returned when a deep research launch could not
/// reach the crawl service
pub fn research_launch(
    job_id: &str,
    query: &str,
    options: &ResearchOptions,
    now: OffsetDateTime,
) -> ResearchJob {
    let total_steps = options.max_depth.clamp(1, LAUNCH_STEPS.len() as u32);

    let activities = LAUNCH_STEPS
        .iter()
        .take(total_steps as usize)
        .enumerate()
        .map(|(i, (kind, template))| {
            let step = i as u32 + 1;
            let at = now - Duration::seconds(i64::from(total_steps - step) * 5);
            ResearchActivity {
                depth: step,
                kind: kind.to_string(),
                message: template
                    .replace("{q}", query)
                    .replace("{n}", &options.max_urls.to_string()),
                timestamp: rfc3339(at),
                status: Some("completed".to_string()),
            }
        })
        .collect();

    let q = urlencoding::encode(query);
    let mut sources: Vec<ResearchSource> = firecrawl_results(query)
        .into_iter()
        .map(|r| ResearchSource {
            url: r.url,
            title: r.title,
            relevance: r.confidence,
            description: r.description,
        })
        .collect();
    sources.extend(
        [
            ("market trend analysis", "https://market-trends.com/analysis", 0.89),
            ("expert opinions", "https://expert-reviews.com/opinions", 0.85),
            ("history and evolution", "https://tech-history.org/evolution", 0.78),
            ("future outlook", "https://future-tech.net/outlook", 0.82),
        ]
        .into_iter()
        .map(|(topic, base, relevance)| ResearchSource {
            url: format!("{}/{}", base, q),
            title: format!("{} {}", query, topic),
            relevance: Some(relevance),
            description: None,
        }),
    );

    let mut job = ResearchJob {
        job_id: job_id.to_string(),
        status: ResearchStatus::Completed,
        current_depth: options.max_depth,
        max_depth: options.max_depth,
        progress_percentage: 0,
        data: ResearchData {
            activities,
            sources,
            final_analysis: Some(final_analysis(query)),
        },
        expires_at: Some(rfc3339(now + Duration::hours(24))),
    };
    job.refresh_progress();
    job
}

fn final_analysis(query: &str) -> String {
    format!(
        "{query} holds a notable position in its market. Information collected from several \
         sources indicates strong features and performance with generally positive user \
         feedback, while some technical limitations and room for improvement were also noted."
    )
}

/// Deterministic status snapshot for a mock job: one depth level per
/// [`MOCK_SECONDS_PER_DEPTH`] seconds since the id's timestamp, completing at
/// [`MOCK_MAX_DEPTH`]. Ids without a parseable timestamp are reported complete.
pub fn research_status(job_id: &str, now: OffsetDateTime) -> ResearchJob {
    let elapsed = mock_job_created_at(job_id)
        .map(|created| (now - created).whole_seconds().max(0))
        .unwrap_or(i64::MAX);
    let current_depth = (elapsed / MOCK_SECONDS_PER_DEPTH).min(i64::from(MOCK_MAX_DEPTH)) as u32;
    let completed = current_depth == MOCK_MAX_DEPTH;

    let mut activities: Vec<ResearchActivity> = (1..=current_depth)
        .map(|depth| {
            let (kind, message) = match depth {
                1 => ("search".to_string(), "Running initial search".to_string()),
                MOCK_MAX_DEPTH => (
                    "synthesize".to_string(),
                    "Synthesizing information from multiple sources".to_string(),
                ),
                d => ("analyze".to_string(), format!("Analyzing at depth {}", d)),
            };
            let at = now - Duration::minutes(i64::from(current_depth - depth + 1));
            ResearchActivity {
                depth,
                kind,
                message,
                timestamp: rfc3339(at),
                status: Some("completed".to_string()),
            }
        })
        .collect();

    if !completed {
        activities.push(ResearchActivity {
            depth: current_depth + 1,
            kind: "analyze".to_string(),
            message: format!("Analyzing at depth {}", current_depth + 1),
            timestamp: rfc3339(now),
            status: Some("in_progress".to_string()),
        });
    }

    let sources = [
        (
            "https://example.com/research/overview",
            "Overview of recent developments",
        ),
        (
            "https://example.com/research/deep-dive",
            "Detailed analysis of recent advances",
        ),
    ]
    .into_iter()
    .take(current_depth.div_ceil(2) as usize)
    .map(|(url, title)| ResearchSource {
        url: url.to_string(),
        title: title.to_string(),
        relevance: None,
        description: None,
    })
    .collect();

    let mut job = ResearchJob {
        job_id: job_id.to_string(),
        status: if completed {
            ResearchStatus::Completed
        } else {
            ResearchStatus::InProgress
        },
        current_depth,
        max_depth: MOCK_MAX_DEPTH,
        progress_percentage: 0,
        data: ResearchData {
            activities,
            sources,
            final_analysis: completed.then(|| {
                "Recent developments show significant progress across several key areas."
                    .to_string()
            }),
        },
        expires_at: Some(rfc3339(now + Duration::hours(24))),
    };
    job.refresh_progress();
    job
}
