use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Kind of assessment being proctored. Each variant owns its endpoint shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AssessmentType {
    SkillTest,
    Contest,
    MockInterview,
    JobTest,
}

impl AssessmentType {
    /// Path segment used by the backend for this assessment type
    pub fn path_segment(&self) -> &'static str {
        match self {
            AssessmentType::SkillTest => "skill-tests",
            AssessmentType::Contest => "contests",
            AssessmentType::MockInterview => "mock-interviews",
            AssessmentType::JobTest => "job-tests",
        }
    }

    /// `/assessment/{type}/{id}/log-activity/`
    pub fn log_activity_path(&self, assessment_id: &str) -> String {
        match self {
            AssessmentType::SkillTest => {
                format!("/assessment/skill-tests/{assessment_id}/log-activity/")
            }
            AssessmentType::Contest => format!("/assessment/contests/{assessment_id}/log-activity/"),
            AssessmentType::MockInterview => {
                format!("/assessment/mock-interviews/{assessment_id}/log-activity/")
            }
            AssessmentType::JobTest => format!("/assessment/job-tests/{assessment_id}/log-activity/"),
        }
    }
}

impl FromStr for AssessmentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skill-test" | "skill-tests" => Ok(AssessmentType::SkillTest),
            "contest" | "contests" => Ok(AssessmentType::Contest),
            "mock-interview" | "mock-interviews" => Ok(AssessmentType::MockInterview),
            "job-test" | "job-tests" => Ok(AssessmentType::JobTest),
            other => Err(Error::InvalidAssessmentType(other.to_string())),
        }
    }
}

impl TryFrom<String> for AssessmentType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AssessmentType> for String {
    fn from(value: AssessmentType) -> Self {
        value.path_segment().to_string()
    }
}

impl fmt::Display for AssessmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// Identity of one proctored attempt. Immutable for the lifetime of a monitor session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionContext {
    pub assessment_id: String,
    pub assessment_type: AssessmentType,
    pub enabled: bool,
    pub question_id: Option<String>,
}

impl SessionContext {
    pub fn new(
        assessment_id: impl Into<String>,
        assessment_type: AssessmentType,
        enabled: bool,
    ) -> Self {
        Self {
            assessment_id: assessment_id.into(),
            assessment_type,
            enabled,
            question_id: None,
        }
    }

    pub fn with_question_id(mut self, question_id: impl Into<String>) -> Self {
        self.question_id = Some(question_id.into());
        self
    }

    /// Two contexts describe the same session when id, type and the enabled gate agree.
    /// `question_id` is only a tag and never forces a re-attach.
    pub fn same_session(&self, other: &SessionContext) -> bool {
        self.assessment_id == other.assessment_id
            && self.assessment_type == other.assessment_type
            && self.enabled == other.enabled
    }

    pub fn route(&self) -> ActivityRoute {
        ActivityRoute {
            assessment_type: self.assessment_type,
            assessment_id: self.assessment_id.clone(),
        }
    }
}

/// Resolved target of every outbound request for one session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityRoute {
    pub assessment_type: AssessmentType,
    pub assessment_id: String,
}

impl ActivityRoute {
    pub fn path(&self) -> String {
        self.assessment_type.log_activity_path(&self.assessment_id)
    }
}
