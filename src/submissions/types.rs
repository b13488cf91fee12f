use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::db::{now_stamp, parse_stamp};
use crate::error::{Error, Result};

/// Top-recommendation title stored when the recommendation list is empty.
pub const DEFAULT_TOP_MAJOR: &str = "unspecified";

/// How the student prefers to work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkPreference {
    Team,
    Solo,
    Mixed,
    #[default]
    #[serde(rename = "")]
    Unspecified,
}

impl WorkPreference {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkPreference::Team => "team",
            WorkPreference::Solo => "solo",
            WorkPreference::Mixed => "mixed",
            WorkPreference::Unspecified => "",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "team" => Ok(WorkPreference::Team),
            "solo" => Ok(WorkPreference::Solo),
            "mixed" => Ok(WorkPreference::Mixed),
            "" => Ok(WorkPreference::Unspecified),
            other => Err(Error::Decode(format!("unknown work preference {other:?}"))),
        }
    }
}

/// Where the student prefers to work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentPreference {
    Office,
    Field,
    Remote,
    Lab,
    #[default]
    #[serde(rename = "")]
    Unspecified,
}

impl EnvironmentPreference {
    pub fn as_str(self) -> &'static str {
        match self {
            EnvironmentPreference::Office => "office",
            EnvironmentPreference::Field => "field",
            EnvironmentPreference::Remote => "remote",
            EnvironmentPreference::Lab => "lab",
            EnvironmentPreference::Unspecified => "",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "office" => Ok(EnvironmentPreference::Office),
            "field" => Ok(EnvironmentPreference::Field),
            "remote" => Ok(EnvironmentPreference::Remote),
            "lab" => Ok(EnvironmentPreference::Lab),
            "" => Ok(EnvironmentPreference::Unspecified),
            other => Err(Error::Decode(format!(
                "unknown environment preference {other:?}"
            ))),
        }
    }
}

/// Everything the assessment wizard collects about one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub school_name: String,
    pub address: String,
    pub academic_strengths: Vec<String>,
    pub interests: Vec<String>,
    pub soft_skills: Vec<String>,
    pub work_preference: WorkPreference,
    pub environment_preference: EnvironmentPreference,
}

/// One recommendation record from the AI endpoint; consumed as-is, never
/// produced here. Only `title` and `match_score` influence persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MajorRecommendation {
    pub id: String,
    pub title: String,
    pub match_score: i64, // 0-100
    pub description: String,
    pub reasoning: String,
    pub career_paths: Vec<String>,
    pub required_skills: Vec<String>,
    pub curriculum_highlights: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_universities: Option<Vec<UniversityRecommendation>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversityRecommendation {
    pub name: String,
    pub location: String,
    #[serde(rename = "type")]
    pub kind: String, // public or private institution
}

/// One stored assessment with its top recommendation summary.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: String,
    pub account_id: Option<String>, // anonymous submissions allowed
    pub created_at: OffsetDateTime,
    pub profile: StudentProfile,
    pub top_major: String,
    pub match_score: i64,
}

/// Flat mirror of one `submissions` table row; also the HTTP wire format of
/// the centralized service. List fields ride as JSON-encoded text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRow {
    pub id: String,
    pub account_id: Option<String>,
    pub created_at: String,
    pub student_name: String,
    pub email: String,
    pub phone: String,
    pub school_name: String,
    pub address: String,
    pub academic_strengths: String,
    pub interests: String,
    pub soft_skills: String,
    pub work_preference: String,
    pub env_preference: String,
    pub top_major: String,
    pub match_score: i64,
}

impl SubmissionRow {
    /// Builds the row for one completed assessment: stamps id and creation
    /// time, JSON-encodes the list fields and summarizes the first
    /// recommendation (or the defaults when there is none).
    pub fn build(
        account_id: Option<String>,
        profile: &StudentProfile,
        recommendations: &[MajorRecommendation],
    ) -> Result<Self> {
        let top = recommendations.first();
        Ok(Self {
            id: next_submission_id(),
            account_id,
            created_at: now_stamp()?,
            student_name: profile.name.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            school_name: profile.school_name.clone(),
            address: profile.address.clone(),
            academic_strengths: encode_list(&profile.academic_strengths)?,
            interests: encode_list(&profile.interests)?,
            soft_skills: encode_list(&profile.soft_skills)?,
            work_preference: profile.work_preference.as_str().to_owned(),
            env_preference: profile.environment_preference.as_str().to_owned(),
            top_major: top
                .map(|r| r.title.clone())
                .unwrap_or_else(|| DEFAULT_TOP_MAJOR.to_owned()),
            match_score: top.map(|r| r.match_score).unwrap_or(0),
        })
    }

    /// Decodes the flat row into the typed record; the only place loose row
    /// data turns into domain types.
    pub fn decode(self) -> Result<Submission> {
        let profile = StudentProfile {
            name: self.student_name,
            email: self.email,
            phone: self.phone,
            school_name: self.school_name,
            address: self.address,
            academic_strengths: decode_list(&self.academic_strengths)?,
            interests: decode_list(&self.interests)?,
            soft_skills: decode_list(&self.soft_skills)?,
            work_preference: WorkPreference::parse(&self.work_preference)?,
            environment_preference: EnvironmentPreference::parse(&self.env_preference)?,
        };
        Ok(Submission {
            id: self.id,
            account_id: self.account_id,
            created_at: parse_stamp(&self.created_at)?,
            profile,
            top_major: self.top_major,
            match_score: self.match_score,
        })
    }
}

/// Serializes a list field for its TEXT column.
pub fn encode_list(items: &[String]) -> Result<String> {
    Ok(serde_json::to_string(items)?)
}

/// Inverse of `encode_list`; order and content survive unchanged.
pub fn decode_list(text: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str(text)?)
}

/// Opaque, time-derived submission id: the UTC nanosecond timestamp in
/// decimal. Nanosecond resolution keeps same-millisecond submissions from
/// colliding.
fn next_submission_id() -> String {
    OffsetDateTime::now_utc().unix_timestamp_nanos().to_string()
}

#[cfg(test)]
pub(crate) fn sample_profile() -> StudentProfile {
    StudentProfile {
        name: "Layla".into(),
        email: "layla@x.com".into(),
        phone: "0501112222".into(),
        school_name: "Al Noor High".into(),
        address: "Riyadh".into(),
        academic_strengths: vec!["math".into(), "physics".into()],
        interests: vec!["robotics".into()],
        soft_skills: vec!["communication".into(), "teamwork".into()],
        work_preference: WorkPreference::Team,
        environment_preference: EnvironmentPreference::Lab,
    }
}

#[cfg(test)]
pub(crate) fn sample_recommendation(title: &str, score: i64) -> MajorRecommendation {
    MajorRecommendation {
        id: "rec-1".into(),
        title: title.into(),
        match_score: score,
        description: "desc".into(),
        reasoning: "because".into(),
        career_paths: vec!["engineer".into()],
        required_skills: vec!["calculus".into()],
        curriculum_highlights: vec!["control theory".into()],
        top_universities: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_fields_round_trip() {
        let lists = [
            vec!["a".to_owned(), "b".to_owned(), "c".to_owned()],
            vec!["one, with comma".to_owned()],
            vec![],
        ];
        for list in lists {
            let encoded = encode_list(&list).unwrap();
            assert_eq!(decode_list(&encoded).unwrap(), list);
        }
    }

    #[test]
    fn preference_parsing_covers_all_values() {
        for p in [
            WorkPreference::Team,
            WorkPreference::Solo,
            WorkPreference::Mixed,
            WorkPreference::Unspecified,
        ] {
            assert_eq!(WorkPreference::parse(p.as_str()).unwrap(), p);
        }
        for p in [
            EnvironmentPreference::Office,
            EnvironmentPreference::Field,
            EnvironmentPreference::Remote,
            EnvironmentPreference::Lab,
            EnvironmentPreference::Unspecified,
        ] {
            assert_eq!(EnvironmentPreference::parse(p.as_str()).unwrap(), p);
        }
        assert!(WorkPreference::parse("hybrid").is_err());
        assert!(EnvironmentPreference::parse("spaceship").is_err());
    }

    #[test]
    fn build_summarizes_first_recommendation() {
        let profile = sample_profile();
        let recs = vec![
            sample_recommendation("Mechatronics", 92),
            sample_recommendation("Physics", 80),
        ];
        let row = SubmissionRow::build(Some("a1".into()), &profile, &recs).unwrap();
        assert_eq!(row.top_major, "Mechatronics");
        assert_eq!(row.match_score, 92);

        let decoded = row.decode().unwrap();
        assert_eq!(decoded.profile, profile);
        assert_eq!(decoded.account_id.as_deref(), Some("a1"));
    }

    #[test]
    fn build_defaults_without_recommendations() {
        let row = SubmissionRow::build(None, &sample_profile(), &[]).unwrap();
        assert_eq!(row.top_major, DEFAULT_TOP_MAJOR);
        assert_eq!(row.match_score, 0);
        assert!(row.account_id.is_none());
    }

    #[test]
    fn profile_json_uses_wizard_field_names() {
        let json = serde_json::to_value(sample_profile()).unwrap();
        assert!(json.get("schoolName").is_some());
        assert!(json.get("academicStrengths").is_some());
        assert_eq!(json["workPreference"], "team");
        assert_eq!(json["environmentPreference"], "lab");
    }

    #[test]
    fn university_entries_use_the_wire_type_key() {
        let uni = UniversityRecommendation {
            name: "KFUPM".into(),
            location: "Dhahran".into(),
            kind: "public".into(),
        };
        let json = serde_json::to_value(&uni).unwrap();
        assert_eq!(json["location"], "Dhahran");
        assert_eq!(json["type"], "public");

        let back: UniversityRecommendation = serde_json::from_value(json).unwrap();
        assert_eq!(back, uni);
    }

    #[test]
    fn unspecified_preferences_serialize_empty() {
        let mut profile = sample_profile();
        profile.work_preference = WorkPreference::Unspecified;
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["workPreference"], "");
    }
}
