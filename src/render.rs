use crate::api::{ApiClient, ApiError};
use crate::models::{AnalysisResult, JobMatch, to_percent};
use crate::upload::Handoff;

pub const NO_DATA_NOTICE: &str = "No analysis data available";
pub const RETRY_HINT: &str = "Run `resumatch analyze <FILE>` to upload a resume.";

const WRAP_WIDTH: usize = 76;

/// Resolves the navigation handoff: a directly transferred result is used
/// as-is, a bare identifier triggers one fetch.
pub fn resolve(handoff: Handoff, client: &ApiClient) -> Result<AnalysisResult, ApiError> {
    match handoff {
        Handoff::Data(result) => Ok(result),
        Handoff::Id(id) => client.fetch_result(&id),
    }
}

/// Display-ready projection of one job match. All derived fields are
/// computed here; the input is never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct JobMatchView {
    pub title: String,
    pub byline: Option<String>,
    pub employment_type: Option<String>,
    pub overall_pct: u8,
    pub skills_pct: u8,
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub why_fit: Vec<String>,
    pub growth_areas: Vec<String>,
    pub summary: Option<String>,
}

pub fn project(result: &AnalysisResult) -> Vec<JobMatchView> {
    result.matches.iter().map(project_match).collect()
}

fn project_match(job: &JobMatch) -> JobMatchView {
    let byline = match (&job.company, &job.location) {
        (Some(company), Some(location)) => Some(format!("{company} \u{00b7} {location}")),
        (Some(company), None) => Some(company.clone()),
        (None, Some(location)) => Some(location.clone()),
        (None, None) => None,
    };
    JobMatchView {
        title: job.title.clone().unwrap_or_else(|| "Position".to_string()),
        byline,
        employment_type: job.employment_type.clone(),
        overall_pct: to_percent(job.match_score.overall),
        skills_pct: to_percent(job.match_score.skills_match),
        matching_skills: job.matching_skills.clone(),
        missing_skills: job.missing_skills.clone(),
        why_fit: job.why_fit.clone(),
        growth_areas: job.growth_areas.clone(),
        summary: job.summary.clone(),
    }
}

/// Renders the full text report for a terminal.
pub fn render_report(views: &[JobMatchView]) -> String {
    if views.is_empty() {
        return format!("{NO_DATA_NOTICE}\n{RETRY_HINT}\n");
    }

    let mut out = String::new();
    for (i, view) in views.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("#{} {}\n", i + 1, view.title));
        match (&view.byline, &view.employment_type) {
            (Some(byline), Some(kind)) => {
                out.push_str(&format!("   {byline} \u{00b7} {kind}\n"));
            }
            (Some(byline), None) => out.push_str(&format!("   {byline}\n")),
            (None, Some(kind)) => out.push_str(&format!("   {kind}\n")),
            (None, None) => {}
        }
        out.push_str(&"-".repeat(WRAP_WIDTH));
        out.push('\n');
        out.push_str(&format!(
            "   Overall Match: {}%    Skills Match: {}%\n",
            view.overall_pct, view.skills_pct
        ));

        if !view.matching_skills.is_empty() {
            out.push_str(&format!(
                "   Matching Skills: {}\n",
                view.matching_skills.join(", ")
            ));
        }
        if !view.missing_skills.is_empty() {
            out.push_str(&format!(
                "   Missing Skills: {}\n",
                view.missing_skills.join(", ")
            ));
        }

        push_section(&mut out, "Why You Fit", &view.why_fit);
        push_section(&mut out, "Growth Areas", &view.growth_areas);

        if let Some(summary) = &view.summary {
            out.push_str("   Summary:\n");
            for line in textwrap::fill(summary, WRAP_WIDTH - 5).lines() {
                out.push_str(&format!("     {line}\n"));
            }
        }
    }
    out
}

/// Truncates a display string to at most `max` characters. Server-provided
/// titles can contain multi-byte characters, so this never cuts on a raw
/// byte index.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

fn push_section(out: &mut String, label: &str, entries: &[String]) {
    if entries.is_empty() {
        return;
    }
    out.push_str(&format!("   {label}:\n"));
    for entry in entries {
        for (j, line) in textwrap::fill(entry, WRAP_WIDTH - 7).lines().enumerate() {
            if j == 0 {
                out.push_str(&format!("     - {line}\n"));
            } else {
                out.push_str(&format!("       {line}\n"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchScore;

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            matches: vec![JobMatch {
                title: Some("Backend Engineer".to_string()),
                company: Some("Acme".to_string()),
                location: Some("Remote".to_string()),
                employment_type: Some("Full-time".to_string()),
                match_score: MatchScore {
                    overall: Some(0.82),
                    skills_match: Some(0.6),
                },
                missing_skills: vec!["Kubernetes".to_string()],
                matching_skills: vec!["Rust".to_string(), "PostgreSQL".to_string()],
                why_fit: vec!["Strong API background".to_string()],
                growth_areas: vec![],
                summary: Some("Good fit overall.".to_string()),
            }],
        }
    }

    #[test]
    fn test_project_derives_percentages() {
        let views = project(&sample_result());
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].overall_pct, 82);
        assert_eq!(views[0].skills_pct, 60);
        assert_eq!(views[0].byline.as_deref(), Some("Acme \u{00b7} Remote"));
    }

    #[test]
    fn test_project_defaults_missing_fields() {
        let result = AnalysisResult {
            matches: vec![JobMatch::default()],
        };
        let views = project(&result);
        assert_eq!(views[0].title, "Position");
        assert!(views[0].byline.is_none());
        assert_eq!(views[0].overall_pct, 0);
        assert_eq!(views[0].skills_pct, 0);
    }

    #[test]
    fn test_render_report_shows_scores_and_tags() {
        let report = render_report(&project(&sample_result()));
        assert!(report.contains("Backend Engineer"));
        assert!(report.contains("Overall Match: 82%"));
        assert!(report.contains("Skills Match: 60%"));
        assert!(report.contains("Missing Skills: Kubernetes"));
        assert!(report.contains("Rust, PostgreSQL"));
        assert!(report.contains("Good fit overall."));
    }

    #[test]
    fn test_render_report_is_idempotent() {
        let views = project(&sample_result());
        assert_eq!(render_report(&views), render_report(&views));
    }

    #[test]
    fn test_truncate_short_strings_pass_through() {
        assert_eq!(truncate("Backend Engineer", 38), "Backend Engineer");
        assert_eq!(truncate("", 10), "");
    }

    #[test]
    fn test_truncate_long_ascii() {
        assert_eq!(truncate("Senior Backend Engineer", 10), "Senior ...");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        // 40 two-byte characters; a byte-index cut would land mid-character.
        let title = "\u{e9}".repeat(40);
        let cut = truncate(&title, 38);
        assert_eq!(cut, format!("{}...", "\u{e9}".repeat(35)));

        let mixed = format!("D\u{e9}veloppeur backend s\u{e9}nior {}", "\u{2022}".repeat(20));
        assert!(truncate(&mixed, 30).ends_with("..."));
    }

    #[test]
    fn test_empty_report_is_distinct_no_data_state() {
        let report = render_report(&[]);
        assert!(report.contains(NO_DATA_NOTICE));
        assert!(!report.to_lowercase().contains("error"));
    }
}
