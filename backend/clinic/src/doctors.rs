use serde::{Deserialize, Deserializer, Serialize, de};

/// One entry of the roster returned by the upstream `Doctors/lookup` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub full_name: String,
    pub specialization: String,
}

impl DoctorRecord {
    pub fn new(
        id: impl Into<String>,
        full_name: impl Into<String>,
        specialization: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
            specialization: specialization.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: String,
    pub full_name: String,
    pub specialization: String,
    pub match_score: u32,
    pub reason: String,
}

impl Recommendation {
    pub fn for_doctor(doctor: &DoctorRecord, match_score: u32) -> Self {
        let reason = if match_score > 0 {
            format!(
                "Specializes in {} which matches your symptoms",
                doctor.specialization
            )
        } else {
            format!("General practitioner in {}", doctor.specialization)
        };

        Self {
            id: doctor.id.clone(),
            full_name: doctor.full_name.clone(),
            specialization: doctor.specialization.clone(),
            match_score,
            reason,
        }
    }
}

/// Response body of the recommend route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendations {
    pub recommendations: Vec<Recommendation>,
    pub message: String,
}

/// Parses a roster payload. Anything that is not a list of doctors is rejected.
pub fn parse_roster(value: serde_json::Value) -> Result<Vec<DoctorRecord>, serde_json::Error> {
    serde_json::from_value(value)
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    match Id::deserialize(deserializer) {
        Ok(Id::Text(text)) => Ok(text),
        Ok(Id::Number(number)) => Ok(number.to_string()),
        Err(_) => Err(de::Error::custom("doctor id must be a string or a number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_roster() {
        let roster = parse_roster(json!([
            { "id": "d-1", "fullName": "Ana Pop", "specialization": "Cardiology" },
            { "id": 7, "fullName": "Ion Rus", "specialization": "Dermatology" }
        ]))
        .unwrap();

        assert_eq!(roster[0], DoctorRecord::new("d-1", "Ana Pop", "Cardiology"));
        assert_eq!(roster[1].id, "7");
    }

    #[test]
    fn test_parse_roster_rejects_other_shapes() {
        assert!(parse_roster(json!({ "message": "nope" })).is_err());
        assert!(parse_roster(json!([{ "id": true, "fullName": "X", "specialization": "Y" }])).is_err());
        assert!(parse_roster(json!([{ "id": "1", "specialization": "Y" }])).is_err());
    }

    #[test]
    fn test_reason() {
        let doctor = DoctorRecord::new("1", "Ana Pop", "Neurology");

        assert_eq!(
            Recommendation::for_doctor(&doctor, 2).reason,
            "Specializes in Neurology which matches your symptoms"
        );
        assert_eq!(
            Recommendation::for_doctor(&doctor, 0).reason,
            "General practitioner in Neurology"
        );
    }

    #[test]
    fn test_serialized_field_names() {
        let doctor = DoctorRecord::new("1", "Ana Pop", "Neurology");
        let value = serde_json::to_value(Recommendation::for_doctor(&doctor, 1)).unwrap();

        assert_eq!(value["fullName"], "Ana Pop");
        assert_eq!(value["matchScore"], 1);
    }
}
