//! Multipart form parsing shared by the image upload endpoints.

use crate::{errors::AppError, models::image::UploadFile};
use axum::extract::Multipart;
use std::collections::HashMap;

/// Text fields and files from a multipart body.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadFile>,
}

impl UploadForm {
    /// Read the whole body. Parts named `file_field`, or carrying a filename,
    /// are files; everything else is a text field.
    pub async fn read(mut multipart: Multipart, file_field: &str) -> Result<Self, AppError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::bad_request(format!("malformed multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == file_field || field.file_name().is_some() {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| {
                    AppError::bad_request(format!("reading file `{}`: {}", file_name, e))
                })?;
                form.files.push(UploadFile {
                    file_name,
                    content_type,
                    bytes,
                });
            } else {
                let value = field.text().await.map_err(|e| {
                    AppError::bad_request(format!("reading field `{}`: {}", name, e))
                })?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    /// A text field, or empty when absent.
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    /// A text field, `None` when absent or blank.
    pub fn optional(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn integer(&self, name: &str) -> Result<i64, AppError> {
        match self.optional(name) {
            Some(v) => v
                .parse()
                .map_err(|_| AppError::bad_request(format!("`{}` must be an integer", name))),
            None => Ok(0),
        }
    }
}
