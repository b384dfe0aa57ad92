/// Typed LMS events pushed to users after a domain write completes
///
/// Route handlers build one of these after the database mutation succeeds
/// and hand it to the notifier; the event name and JSON payload are what the
/// web client listens for.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::EventPayload;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LmsEvent {
    #[serde(rename_all = "camelCase")]
    GradePosted {
        course_id: String,
        assignment_id: String,
        score: f64,
        max_score: f64,
    },

    #[serde(rename_all = "camelCase")]
    NewMessage {
        message_id: String,
        sender_id: String,
        preview: String,
    },

    #[serde(rename_all = "camelCase")]
    NewAnnouncement {
        course_id: String,
        announcement_id: String,
        title: String,
    },

    #[serde(rename_all = "camelCase")]
    AssignmentCreated {
        course_id: String,
        assignment_id: String,
        title: String,
        #[serde(default)]
        due_date: Option<DateTime<Utc>>,
    },

    #[serde(rename_all = "camelCase")]
    DiscussionReply {
        discussion_id: String,
        reply_id: String,
        author_id: String,
    },

    #[serde(rename_all = "camelCase")]
    EnrollmentUpdated { course_id: String, status: String },

    #[serde(rename_all = "camelCase")]
    QuizPublished {
        course_id: String,
        quiz_id: String,
        title: String,
    },
}

impl LmsEvent {
    /// Longest message preview carried in a `new-message` payload
    pub const PREVIEW_LEN: usize = 120;

    pub fn name(&self) -> &'static str {
        match self {
            LmsEvent::GradePosted { .. } => "grade-posted",
            LmsEvent::NewMessage { .. } => "new-message",
            LmsEvent::NewAnnouncement { .. } => "new-announcement",
            LmsEvent::AssignmentCreated { .. } => "assignment-created",
            LmsEvent::DiscussionReply { .. } => "discussion-reply",
            LmsEvent::EnrollmentUpdated { .. } => "enrollment-updated",
            LmsEvent::QuizPublished { .. } => "quiz-published",
        }
    }

    pub fn payload(&self) -> EventPayload {
        let value = match self {
            LmsEvent::GradePosted {
                course_id,
                assignment_id,
                score,
                max_score,
            } => json!({
                "courseId": course_id,
                "assignmentId": assignment_id,
                "score": score,
                "maxScore": max_score,
            }),
            LmsEvent::NewMessage {
                message_id,
                sender_id,
                preview,
            } => json!({
                "messageId": message_id,
                "senderId": sender_id,
                "preview": preview.chars().take(Self::PREVIEW_LEN).collect::<String>(),
            }),
            LmsEvent::NewAnnouncement {
                course_id,
                announcement_id,
                title,
            } => json!({
                "courseId": course_id,
                "announcementId": announcement_id,
                "title": title,
            }),
            LmsEvent::AssignmentCreated {
                course_id,
                assignment_id,
                title,
                due_date,
            } => json!({
                "courseId": course_id,
                "assignmentId": assignment_id,
                "title": title,
                "dueDate": due_date.map(|d| d.to_rfc3339()),
            }),
            LmsEvent::DiscussionReply {
                discussion_id,
                reply_id,
                author_id,
            } => json!({
                "discussionId": discussion_id,
                "replyId": reply_id,
                "authorId": author_id,
            }),
            LmsEvent::EnrollmentUpdated { course_id, status } => json!({
                "courseId": course_id,
                "status": status,
            }),
            LmsEvent::QuizPublished {
                course_id,
                quiz_id,
                title,
            } => json!({
                "courseId": course_id,
                "quizId": quiz_id,
                "title": title,
            }),
        };

        match value {
            serde_json::Value::Object(map) => map,
            _ => EventPayload::new(),
        }
    }
}
