//! src/services/contact_service.rs
//!
//! Stores contact-form submissions and notifies the site owner by email.

use crate::{
    models::contact::{ContactMessage, ContactRequest},
    services::{
        content_service::{ContentError, ContentResult},
        mailer::Mailer,
    },
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};

const MAX_MESSAGE_LEN: usize = 5000;

#[derive(Clone)]
pub struct ContactService {
    db: Arc<SqlitePool>,
    mailer: Option<Arc<dyn Mailer>>,
    /// Where new-submission notifications go.
    inbox: Option<String>,
}

impl ContactService {
    pub fn new(db: Arc<SqlitePool>, mailer: Option<Arc<dyn Mailer>>, inbox: Option<String>) -> Self {
        Self { db, mailer, inbox }
    }

    /// Persist a submission, then send the notification.
    ///
    /// Mail failures are logged; the stored message is the result.
    pub async fn submit(&self, request: &ContactRequest) -> ContentResult<ContactMessage> {
        validate(request)?;
        let message = sqlx::query_as::<_, ContactMessage>(
            "INSERT INTO contact_messages (name, email, phone, subject, message, is_read, created_at)
             VALUES (?, ?, ?, ?, ?, 0, ?)
             RETURNING id, name, email, phone, subject, message, is_read, created_at",
        )
        .bind(request.name.trim())
        .bind(request.email.trim())
        .bind(&request.phone)
        .bind(&request.subject)
        .bind(request.message.trim())
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?;
        info!(id = message.id, "contact message received");

        if let (Some(mailer), Some(inbox)) = (&self.mailer, &self.inbox) {
            let subject = format!(
                "New inquiry from {}{}",
                message.name,
                message
                    .subject
                    .as_deref()
                    .map(|s| format!(": {}", s))
                    .unwrap_or_default()
            );
            if let Err(err) = mailer.send(inbox, &subject, &notification_body(&message)).await {
                warn!(id = message.id, error = %err, "contact notification not sent");
            }
        }
        Ok(message)
    }

    /// Newest first.
    pub async fn list(&self) -> ContentResult<Vec<ContactMessage>> {
        Ok(sqlx::query_as::<_, ContactMessage>(
            "SELECT id, name, email, phone, subject, message, is_read, created_at
             FROM contact_messages ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&*self.db)
        .await?)
    }

    pub async fn mark_read(&self, id: i64) -> ContentResult<()> {
        let result = sqlx::query("UPDATE contact_messages SET is_read = 1 WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(message_not_found(id));
        }
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> ContentResult<()> {
        let result = sqlx::query("DELETE FROM contact_messages WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(message_not_found(id));
        }
        Ok(())
    }
}

fn validate(request: &ContactRequest) -> ContentResult<()> {
    if request.name.trim().is_empty() {
        return Err(ContentError::Validation("`name` is required".into()));
    }
    if request.message.trim().is_empty() {
        return Err(ContentError::Validation("`message` is required".into()));
    }
    if request.message.len() > MAX_MESSAGE_LEN {
        return Err(ContentError::Validation(format!(
            "`message` must be at most {} characters",
            MAX_MESSAGE_LEN
        )));
    }
    if !is_plausible_email(request.email.trim()) {
        return Err(ContentError::Validation("`email` is not a valid address".into()));
    }
    Ok(())
}

/// One `@`, a non-empty local part, and a dotted domain.
pub(crate) fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

fn notification_body(message: &ContactMessage) -> String {
    format!(
        "Name: {}\nEmail: {}\nPhone: {}\nReceived: {}\n\n{}",
        message.name,
        message.email,
        message.phone.as_deref().unwrap_or("-"),
        message.created_at.to_rfc2822(),
        message.message
    )
}

fn message_not_found(id: i64) -> ContentError {
    ContentError::NotFound(format!("contact message {} not found", id))
}
