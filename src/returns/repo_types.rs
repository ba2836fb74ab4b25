use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// How a return's product image is held: a stored upload or an inline data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnImage {
    Reference { url: String },
    Inline { data_uri: String },
}

impl ReturnImage {
    pub fn kind(&self) -> &'static str {
        match self {
            ReturnImage::Reference { .. } => "reference",
            ReturnImage::Inline { .. } => "inline",
        }
    }

    /// The value clients receive in `image`.
    pub fn as_str(&self) -> &str {
        match self {
            ReturnImage::Reference { url } => url,
            ReturnImage::Inline { data_uri } => data_uri,
        }
    }

    pub fn from_parts(kind: &str, value: String) -> anyhow::Result<Self> {
        match kind {
            "reference" => Ok(ReturnImage::Reference { url: value }),
            "inline" => Ok(ReturnImage::Inline { data_uri: value }),
            other => anyhow::bail!("unknown image kind {:?}", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReturnRecord {
    pub id: Uuid,
    pub return_id: i64,
    pub user_id: Uuid,
    pub description: String,
    pub image: ReturnImage,
    pub created_at: OffsetDateTime,
}

/// Raw `returns` row.
#[derive(Debug, FromRow)]
pub struct ReturnRow {
    pub id: Uuid,
    pub return_id: i64,
    pub user_id: Uuid,
    pub description: String,
    pub image_kind: String,
    pub image: String,
    pub created_at: OffsetDateTime,
}

impl TryFrom<ReturnRow> for ReturnRecord {
    type Error = anyhow::Error;

    fn try_from(r: ReturnRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            return_id: r.return_id,
            user_id: r.user_id,
            description: r.description,
            image: ReturnImage::from_parts(&r.image_kind, r.image)?,
            created_at: r.created_at,
        })
    }
}

/// Input for `ReturnRepo::insert`; `return_id` is assigned by the store.
#[derive(Debug, Clone, Copy)]
pub struct NewReturn<'a> {
    pub user_id: Uuid,
    pub description: &'a str,
    pub image: &'a ReturnImage,
}
