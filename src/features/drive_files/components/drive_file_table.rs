//! Read-only table of the Drive files recorded for one CRM record.
//!
//! The table keeps the last query outcome and only queries again when the
//! record it is bound to changes. That cache lives as long as the table
//! binding does; the HTML route binds a fresh table per request. Rendering is
//! server-side HTML through minijinja with autoescaping on.

use minijinja::{context, Environment};
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

use crate::core::error::AppError;
use crate::features::drive_files::dtos::DriveFileResponseDto;
use crate::features::drive_files::services::DriveFileService;

const TABLE_TEMPLATE: &str = "drive_files/table.html";

static TEMPLATE_ENV: OnceLock<Environment<'static>> = OnceLock::new();

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template '{0}' not found")]
    NotFound(String),

    #[error("Failed to render template: {0}")]
    RenderError(String),
}

impl From<TemplateError> for AppError {
    fn from(err: TemplateError) -> Self {
        AppError::Internal(err.to_string())
    }
}

fn init_environment() -> Environment<'static> {
    let mut env = Environment::new();
    // `.html` names get HTML autoescaping from the default callback
    if let Err(e) = env.add_template(
        TABLE_TEMPLATE,
        include_str!("../../../../templates/drive_files/table.html"),
    ) {
        tracing::warn!("Failed to load template {}: {}", TABLE_TEMPLATE, e);
    }
    env
}

fn get_environment() -> &'static Environment<'static> {
    TEMPLATE_ENV.get_or_init(init_environment)
}

/// Last query outcome
#[derive(Debug, Clone, PartialEq)]
pub enum TableState {
    /// Not bound to a record yet
    Empty,
    Loaded(Vec<DriveFileResponseDto>),
    Failed(String),
}

#[derive(Serialize)]
struct RowView<'a> {
    file_name: &'a str,
    drive_link: &'a str,
    uploaded_at: String,
}

pub struct DriveFileTable {
    service: Arc<DriveFileService>,
    record_id: Option<String>,
    state: TableState,
}

impl DriveFileTable {
    pub fn new(service: Arc<DriveFileService>) -> Self {
        Self {
            service,
            record_id: None,
            state: TableState::Empty,
        }
    }

    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    pub fn state(&self) -> &TableState {
        &self.state
    }

    /// Bind the table to a record, querying only if the id differs from the
    /// current one. Returns whether a query ran.
    pub async fn set_record_id(&mut self, record_id: &str) -> bool {
        if self.record_id.as_deref() == Some(record_id) {
            return false;
        }

        self.record_id = Some(record_id.to_string());
        self.state = match self.service.list_for_record(record_id).await {
            Ok(rows) => TableState::Loaded(rows),
            Err(e) => {
                tracing::warn!("Failed to load drive files for {}: {}", record_id, e);
                TableState::Failed(e.client_message())
            }
        };
        true
    }

    pub fn render(&self) -> Result<String, TemplateError> {
        let template = get_environment()
            .get_template(TABLE_TEMPLATE)
            .map_err(|_| TemplateError::NotFound(TABLE_TEMPLATE.to_string()))?;

        let ctx = match &self.state {
            TableState::Empty => context! {},
            TableState::Loaded(rows) => {
                let rows: Vec<RowView> = rows
                    .iter()
                    .map(|row| RowView {
                        file_name: &row.file_name,
                        drive_link: &row.drive_link,
                        uploaded_at: row.uploaded_at.format("%Y-%m-%d %H:%M UTC").to_string(),
                    })
                    .collect();
                context! { rows => rows }
            }
            TableState::Failed(message) => context! { error => message },
        };

        template
            .render(ctx)
            .map_err(|e| TemplateError::RenderError(e.to_string()))
    }
}
