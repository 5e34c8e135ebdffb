use serde::{Deserialize, Deserializer, Serialize};

/// One job's scoring and narrative feedback against an uploaded resume.
///
/// The analysis backend is loose about shapes: list fields sometimes arrive
/// as a single delimited string, and scores as either fractions or already
/// scaled percentages. Everything here deserializes leniently so the rest of
/// the client only sees one canonical form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JobMatch {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub match_score: MatchScore,
    #[serde(deserialize_with = "skills_or_joined")]
    pub missing_skills: Vec<String>,
    #[serde(deserialize_with = "skills_or_joined")]
    pub matching_skills: Vec<String>,
    #[serde(deserialize_with = "reasons_or_joined")]
    pub why_fit: Vec<String>,
    #[serde(deserialize_with = "reasons_or_joined")]
    pub growth_areas: Vec<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MatchScore {
    pub overall: Option<f64>,
    pub skills_match: Option<f64>,
}

/// The server's report for one resume: a sequence of job matches.
/// A bare match object and `null` are accepted and coerced.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct AnalysisResult {
    pub matches: Vec<JobMatch>,
}

impl AnalysisResult {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

impl<'de> Deserialize<'de> for AnalysisResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            Many(Vec<JobMatch>),
            One(Box<JobMatch>),
        }

        let matches = match Option::<OneOrMany>::deserialize(deserializer)? {
            None => Vec::new(),
            Some(OneOrMany::Many(matches)) => matches,
            Some(OneOrMany::One(single)) => vec![*single],
        };
        Ok(Self { matches })
    }
}

/// Converts a raw score into a display percentage. Values at or below 1.0
/// are fractions and get scaled; anything larger is treated as an already
/// scaled percentage and capped at 100. Absent or non-finite values are 0.
pub fn to_percent(value: Option<f64>) -> u8 {
    let Some(v) = value else { return 0 };
    if !v.is_finite() {
        return 0;
    }
    let scaled = if v <= 1.0 { v * 100.0 } else { v };
    scaled.clamp(0.0, 100.0).round() as u8
}

const BULLETS: [char; 3] = ['\u{2022}', '\u{2023}', '\u{00b7}'];

/// Splits a delimiter-joined skill list ("Python, SQL, Docker") into
/// trimmed, non-empty entries. Known limitation: lossy for skill names that
/// legitimately contain commas.
pub fn split_skills(raw: &str) -> Vec<String> {
    split_on(raw, |c| c == '\n' || c == ',' || BULLETS.contains(&c))
}

/// Narrative fields (why-fit, growth areas) keep commas intact and split
/// only on line breaks and bullets.
pub fn split_reasons(raw: &str) -> Vec<String> {
    split_on(raw, |c| c == '\n' || BULLETS.contains(&c))
}

fn split_on(raw: &str, delimiter: impl Fn(char) -> bool) -> Vec<String> {
    raw.split(delimiter)
        .map(|part| part.trim().trim_start_matches(['-', '*']).trim_start())
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringsOrJoined {
    Many(Vec<String>),
    Joined(String),
}

fn skills_or_joined<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    normalize_list(deserializer, split_skills)
}

fn reasons_or_joined<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    normalize_list(deserializer, split_reasons)
}

fn normalize_list<'de, D>(
    deserializer: D,
    split: fn(&str) -> Vec<String>,
) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<StringsOrJoined>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(StringsOrJoined::Joined(joined)) => split(&joined),
        Some(StringsOrJoined::Many(items)) => items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
    })
}
