//! # Triage
//!
//! Command-line front to the symptom matcher, for checking rankings without the gateway.
//!
//! ## Roster Sources
//! - A JSON file with the same shape as the upstream `Doctors/lookup` response
//! - The live upstream API, given its base URL and a bearer token
//!
//! ## Output
//! The message followed by one line per doctor, or the exact JSON body the gateway
//! would return with `--json`.
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, bail};
use clinic::{
    AuthToken, ClinicApi, DoctorRecord, Recommendations, Roster, SymptomMatcher,
    doctors::parse_roster,
};
use indicatif::{ProgressBar, ProgressStyle};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub enum Source {
    File(PathBuf),
    Remote { api_url: String, token: String },
}

pub async fn run(symptoms: &str, source: Source, json: bool) -> anyhow::Result<String> {
    if symptoms.trim().is_empty() {
        bail!("Symptoms are required");
    }

    let doctors = match source {
        Source::File(path) => load_roster(&path)?,
        Source::Remote { api_url, token } => fetch_roster(&api_url, &token).await?,
    };

    let result = SymptomMatcher::default().recommend(symptoms, &doctors);

    if json {
        Ok(serde_json::to_string_pretty(&result)?)
    } else {
        Ok(render(&result))
    }
}

pub fn load_roster(path: &Path) -> anyhow::Result<Vec<DoctorRecord>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    parse_roster(value).with_context(|| format!("{} is not a doctor roster", path.display()))
}

async fn fetch_roster(api_url: &str, token: &str) -> anyhow::Result<Vec<DoctorRecord>> {
    let api = ClinicApi::new(api_url, FETCH_TIMEOUT)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Fetching roster from {}", api.url(clinic::remote::DOCTORS_PATH)));
    pb.enable_steady_tick(Duration::from_millis(100));

    let roster = api.roster(&AuthToken::new(token)).await;
    pb.finish_and_clear();

    match roster? {
        Roster::Doctors(doctors) => Ok(doctors),
        Roster::Rejected(response) => bail!(
            "Failed to fetch doctors ({}): {}",
            response.status,
            response.message().unwrap_or("no message")
        ),
        Roster::Malformed(_) => bail!("Upstream returned a malformed roster"),
    }
}

pub fn render(result: &Recommendations) -> String {
    let mut out = result.message.clone();

    for (rank, doctor) in result.recommendations.iter().enumerate() {
        out.push_str(&format!(
            "\n{}. {} ({}) score {}: {}",
            rank + 1,
            doctor.full_name,
            doctor.specialization,
            doctor.match_score,
            doctor.reason
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn roster_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const ROSTER: &str = r#"[
        { "id": "1", "fullName": "Dr Heart", "specialization": "Cardiology" },
        { "id": "2", "fullName": "Dr Skin", "specialization": "Dermatology" }
    ]"#;

    #[test]
    fn test_load_roster() {
        let file = roster_file(ROSTER);
        let doctors = load_roster(file.path()).unwrap();

        assert_eq!(doctors.len(), 2);
        assert_eq!(doctors[1].full_name, "Dr Skin");
    }

    #[test]
    fn test_load_roster_rejects_other_json() {
        let file = roster_file(r#"{ "doctors": [] }"#);

        assert!(load_roster(file.path()).is_err());
        assert!(load_roster(Path::new("/definitely/not/here.json")).is_err());
    }

    #[tokio::test]
    async fn test_run_text() {
        let file = roster_file(ROSTER);
        let out = run("itchy skin rash", Source::File(file.path().to_path_buf()), false)
            .await
            .unwrap();

        assert_eq!(
            out,
            "Based on your symptoms, we recommend these doctors:\n\
             1. Dr Skin (Dermatology) score 2: Specializes in Dermatology which matches your symptoms"
        );
    }

    #[tokio::test]
    async fn test_run_json() {
        let file = roster_file(ROSTER);
        let out = run("heart", Source::File(file.path().to_path_buf()), true)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value["recommendations"][0]["matchScore"], 1);
    }

    #[tokio::test]
    async fn test_run_rejects_blank_symptoms() {
        let err = run("  ", Source::File(PathBuf::from("unused.json")), false)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Symptoms are required");
    }
}
