use crate::dto::pipeline_dto::StagePayload;
use crate::error::{Error, Result};
use crate::models::enums::StageStatus;
use crate::models::pipeline::HiringStage;

/// Stage names every pipeline must keep, compared case-insensitively.
#[derive(Debug, Clone)]
pub struct MandatoryStages {
    names: Vec<String>,
}

impl Default for MandatoryStages {
    fn default() -> Self {
        Self::new(["Application", "Screening"])
    }
}

impl MandatoryStages {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .map(Into::into)
                .map(|n: String| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        let name = name.trim();
        self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    pub fn is_mandatory(&self, name: &str, flagged: bool) -> bool {
        flagged || self.contains(name)
    }

    /// Rejects removal of a stage by name, whatever its `mandatory` flag says.
    pub fn check_removable(&self, stage: &HiringStage) -> Result<()> {
        if self.is_mandatory(&stage.name, stage.mandatory) {
            return Err(Error::Conflict(format!(
                "Mandatory stage '{}' cannot be deleted",
                stage.name
            )));
        }
        Ok(())
    }

    /// A configured stage keeps its name; renaming it would drop the stage
    /// from the pipeline as far as the guard is concerned.
    pub fn check_rename(&self, stage: &HiringStage, new_name: &str) -> Result<()> {
        if self.contains(&stage.name) && !stage.name.trim().eq_ignore_ascii_case(new_name.trim()) {
            return Err(Error::Conflict(format!(
                "Mandatory stage '{}' cannot be renamed",
                stage.name
            )));
        }
        Ok(())
    }

    /// Flags configured names as mandatory and prepends any configured stage
    /// the caller left out, keeping the configured order.
    pub fn normalize(&self, stages: Vec<StagePayload>) -> Vec<StagePayload> {
        let missing: Vec<StagePayload> = self
            .names
            .iter()
            .filter(|name| !stages.iter().any(|s| s.name.trim().eq_ignore_ascii_case(name)))
            .map(|name| StagePayload::named(name.clone(), true))
            .collect();

        missing
            .into_iter()
            .chain(stages.into_iter().map(|mut s| {
                s.mandatory = self.is_mandatory(&s.name, s.mandatory);
                s
            }))
            .collect()
    }
}

pub fn check_stage_state(name: &str, mandatory: bool, status: StageStatus) -> Result<()> {
    if mandatory && status == StageStatus::Skipped {
        return Err(Error::BadRequest(format!(
            "Mandatory stage '{}' cannot be skipped",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn stage(name: &str, mandatory: bool) -> HiringStage {
        HiringStage {
            id: Uuid::new_v4(),
            pipeline_id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            position: 0,
            mandatory,
            schedule: None,
            status: StageStatus::Upcoming,
            max_candidates_allowed: None,
            assigned_to_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn mandatory_stage_cannot_be_skipped() {
        assert!(check_stage_state("Application", true, StageStatus::Skipped).is_err());
        assert!(check_stage_state("Application", true, StageStatus::Completed).is_ok());
        assert!(check_stage_state("Take-home", false, StageStatus::Skipped).is_ok());
    }

    #[test]
    fn removal_guard_uses_name_even_when_flag_is_off() {
        let guard = MandatoryStages::default();
        assert!(guard.check_removable(&stage("screening", false)).is_err());
        assert!(guard.check_removable(&stage("Tech Interview", true)).is_err());
        assert!(guard.check_removable(&stage("Tech Interview", false)).is_ok());
    }

    #[test]
    fn configured_stage_keeps_its_name() {
        let guard = MandatoryStages::default();
        assert!(guard.check_rename(&stage("Screening", true), "screening ").is_ok());
        assert!(guard.check_rename(&stage("Screening", true), "Phone call").is_err());
        assert!(guard.check_rename(&stage("Take-home", true), "Homework").is_ok());
    }

    #[test]
    fn normalize_prepends_missing_and_flags_present() {
        let guard = MandatoryStages::default();
        let stages = vec![
            StagePayload::named("Tech Interview".into(), false),
            StagePayload::named("screening".into(), false),
        ];
        let out = guard.normalize(stages);
        let names: Vec<_> = out.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Application", "Tech Interview", "screening"]);
        assert!(out[0].mandatory);
        assert!(!out[1].mandatory);
        assert!(out[2].mandatory);
    }

    #[test]
    fn custom_configuration_is_respected() {
        let guard = MandatoryStages::new([" Intake ", ""]);
        assert_eq!(guard.names(), &["Intake".to_string()]);
        assert!(guard.contains("intake"));
        assert!(!guard.contains("Application"));
    }
}
