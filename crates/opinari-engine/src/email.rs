// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Email content for survey notifications.
//!
//! Renders the invitation email (one button per answer plus a fallback link)
//! and the survey-ended notice. Answer links carry the recipient's response
//! token so the public response page needs no login.

use chrono::{Datelike, Utc};
use uuid::Uuid;

use opinari_core::store::{SurveyAnswer, SurveyRecord};

/// Subject line of the invitation email.
pub fn invite_subject(survey_name: &str) -> String {
    format!("You're invited to participate in the survey: {survey_name}")
}

/// Subject line of the survey-ended notice.
pub fn ended_subject(survey_name: &str) -> String {
    format!("Survey '{survey_name}' has ended")
}

/// Build one answer link for a recipient.
///
/// The token rides in the query string ahead of the answer, both URL-encoded.
pub fn answer_link(
    web_origin: &str,
    survey_id: Uuid,
    response_token: &str,
    answer: SurveyAnswer,
) -> String {
    format!(
        "{}/respond/{}?token={}&answer={}",
        web_origin.trim_end_matches('/'),
        survey_id,
        urlencoding::encode(response_token),
        urlencoding::encode(answer.as_str()),
    )
}

/// Render the invitation email body.
pub fn render_invite(web_origin: &str, survey: &SurveyRecord, response_token: &str) -> String {
    let survey_name = &survey.name;
    let survey_question = &survey.question;
    let yes_link = answer_link(web_origin, survey.id, response_token, SurveyAnswer::Yes);
    let no_link = answer_link(web_origin, survey.id, response_token, SurveyAnswer::No);
    let cant_link = answer_link(web_origin, survey.id, response_token, SurveyAnswer::CantAnswer);
    let year = Utc::now().year();

    format!(
        r#"
<div style="font-family: 'Inter', sans-serif; background: #f8fafc; padding: 32px 0;">
  <div style="max-width: 480px; margin: auto; background: #fff; border-radius: 12px; box-shadow: 0 2px 8px #0001; padding: 32px;">
    <h2 style="font-size: 1.5rem; font-weight: 700; color: #2563eb; margin-bottom: 12px;">
      {survey_name}
    </h2>
    <p style="font-size: 1rem; color: #334155; margin-bottom: 16px;">
      {survey_question}
    </p>
    <div style="margin: 24px 0; display: flex; gap: 12px; justify-content: center;">
      <a href="{yes_link}" style="padding:10px 20px;background:#22c55e;color:white;text-decoration:none;border-radius:6px;font-weight:600;">Yes</a>
      <a href="{no_link}" style="padding:10px 20px;background:#ef4444;color:white;text-decoration:none;border-radius:6px;font-weight:600;">No</a>
      <a href="{cant_link}" style="padding:10px 20px;background:#64748b;color:white;text-decoration:none;border-radius:6px;font-weight:600;">Can't answer</a>
    </div>
    <p style="font-size:0.95rem; color:#64748b; margin-top: 24px;">
      If the buttons above do not work, copy and paste this link into your browser:<br>
      <a href="{yes_link}" style="color:#2563eb;">{yes_link}</a>
    </p>
  </div>
  <div style="text-align: center; color: #64748b; font-size: 0.9rem; margin-top: 24px;">
    &copy; {year} Opinari
  </div>
</div>
"#
    )
}

/// Render the survey-ended email body.
pub fn render_ended(survey_name: &str) -> String {
    let year = Utc::now().year();

    format!(
        r#"
<div style="font-family: 'Inter', sans-serif; background: #f8fafc; padding: 32px 0;">
  <div style="max-width: 480px; margin: auto; background: #fff; border-radius: 12px; box-shadow: 0 2px 8px #0001; padding: 32px;">
    <h2 style="font-size: 1.5rem; font-weight: 700; color: #2563eb; margin-bottom: 12px;">
      {survey_name}
    </h2>
    <p style="font-size: 1rem; color: #334155; margin-bottom: 24px;">
      The survey has now ended. Thank you for your participation!
    </p>
    <div style="margin-top: 24px; text-align: center;">
      <span style="display: inline-block; background: #2563eb; color: #fff; font-weight: 600; border-radius: 6px; padding: 8px 20px; font-size: 1rem;">
        Survey Closed
      </span>
    </div>
  </div>
  <div style="text-align: center; color: #64748b; font-size: 0.9rem; margin-top: 24px;">
    &copy; {year} Opinari
  </div>
</div>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_survey() -> SurveyRecord {
        let now = Utc::now();
        SurveyRecord {
            id: Uuid::new_v4(),
            name: "Team pulse".to_string(),
            question: "Are we shipping fast enough?".to_string(),
            end_date: now + Duration::days(7),
            is_anonymous: false,
            owner_id: Uuid::new_v4(),
            status: "ACTIVE".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_answer_link_layout() {
        let survey_id = Uuid::new_v4();
        let link = answer_link(
            "https://surveys.example.com",
            survey_id,
            "tok123",
            SurveyAnswer::CantAnswer,
        );
        assert_eq!(
            link,
            format!(
                "https://surveys.example.com/respond/{}?token=tok123&answer=CANT_ANSWER",
                survey_id
            )
        );
    }

    #[test]
    fn test_answer_link_trims_trailing_slash() {
        let survey_id = Uuid::new_v4();
        let link = answer_link(
            "https://surveys.example.com/",
            survey_id,
            "tok",
            SurveyAnswer::Yes,
        );
        assert!(link.starts_with(&format!(
            "https://surveys.example.com/respond/{}",
            survey_id
        )));
        assert!(!link.contains("com//respond"));
    }

    #[test]
    fn test_invite_contains_all_three_answer_links() {
        let survey = sample_survey();
        let body = render_invite("http://localhost:5173", &survey, "tok");

        assert!(body.contains(&survey.name));
        assert!(body.contains(&survey.question));
        for answer in SurveyAnswer::ALL {
            let link = answer_link("http://localhost:5173", survey.id, "tok", answer);
            assert!(body.contains(&link), "Missing link for {}", answer);
        }
        // Fallback paragraph repeats the YES link as plain text
        let yes_link = answer_link("http://localhost:5173", survey.id, "tok", SurveyAnswer::Yes);
        assert_eq!(body.matches(&yes_link).count(), 3);
        assert!(body.contains(&format!("&copy; {} Opinari", Utc::now().year())));
    }

    #[test]
    fn test_ended_notice_mentions_survey_and_closure() {
        let body = render_ended("Team pulse");
        assert!(body.contains("Team pulse"));
        assert!(body.contains("The survey has now ended"));
        assert!(body.contains("Survey Closed"));
    }

    #[test]
    fn test_subjects() {
        assert_eq!(
            invite_subject("Team pulse"),
            "You're invited to participate in the survey: Team pulse"
        );
        assert_eq!(ended_subject("Team pulse"), "Survey 'Team pulse' has ended");
    }
}
