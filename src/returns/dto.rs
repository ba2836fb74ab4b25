use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    error::AppError,
    images::UploadItem,
    returns::repo_types::ReturnRecord,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnResponse {
    pub user_id: Uuid,
    pub return_id: i64,
    pub image: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<ReturnRecord> for ReturnResponse {
    fn from(r: ReturnRecord) -> Self {
        Self {
            user_id: r.user_id,
            return_id: r.return_id,
            image: r.image.as_str().to_owned(),
            description: r.description,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub user_id: Option<Uuid>,
}

/// JSON form of a return submission.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReturnJson {
    #[serde(default)]
    pub description: String,
    pub image: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub user_id: Option<Uuid>,
}

#[derive(Debug)]
pub enum ImageInput {
    Upload(UploadItem),
    DataUri(String),
}

/// A return submission from either a multipart form or a JSON body.
#[derive(Debug, Default)]
pub struct ReturnSubmission {
    pub description: String,
    pub image: Option<ImageInput>,
    pub owner_override: Option<Uuid>,
}

impl From<CreateReturnJson> for ReturnSubmission {
    fn from(body: CreateReturnJson) -> Self {
        Self {
            description: body.description,
            image: body
                .image
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .map(ImageInput::DataUri),
            owner_override: body.user_id,
        }
    }
}

/// An empty `userId` means "not given", in query strings, JSON and form fields alike.
fn owner_from_str(raw: &str) -> Result<Option<Uuid>, uuid::Error> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    Uuid::parse_str(raw).map(Some)
}

fn blank_as_none<'de, D>(de: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(de)? {
        None => Ok(None),
        Some(raw) => owner_from_str(&raw)
            .map_err(|_| serde::de::Error::custom("userId must be a UUID")),
    }
}

fn parse_owner(raw: &str) -> Result<Option<Uuid>, AppError> {
    owner_from_str(raw).map_err(|_| AppError::validation("userId must be a UUID"))
}

#[async_trait]
impl<S> FromRequest<S> for ReturnSubmission
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("multipart/form-data"))
            .unwrap_or(false);

        if !is_multipart {
            let Json(body) = Json::<CreateReturnJson>::from_request(req, state).await?;
            return Ok(body.into());
        }

        let mut mp = Multipart::from_request(req, state).await?;
        let mut sub = ReturnSubmission::default();
        while let Some(field) = mp.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "description" => sub.description = field.text().await?,
                "userId" => sub.owner_override = parse_owner(&field.text().await?)?,
                "image" => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let file_name = field.file_name().map(str::to_string);
                    let body = field.bytes().await?;
                    if file_name.is_none() && !body.is_empty() {
                        // a plain text part named "image" carries a data URI
                        let text = String::from_utf8(body.to_vec())
                            .map_err(|_| AppError::validation("Image field is not valid text"))?;
                        sub.image = Some(ImageInput::DataUri(text.trim().to_owned()));
                    } else if !body.is_empty() {
                        sub.image = Some(ImageInput::Upload(UploadItem {
                            body,
                            content_type,
                            file_name,
                        }));
                    }
                }
                _ => {}
            }
        }
        Ok(sub)
    }
}
