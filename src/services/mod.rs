pub mod auth_service;
pub mod contact_service;
pub mod content_service;
pub mod image_manager;
pub mod local_store;
pub mod locator;
pub mod mailer;
pub mod object_store;
pub mod records;
pub mod supabase_store;
