use anyhow::Context;
use base64ct::{Base64, Encoding};
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

/// A file received through multipart upload.
#[derive(Debug)]
pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
    pub file_name: Option<String>,
}

/// Parsed `data:image/...;base64,...` string.
#[derive(Debug, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub mime: &'a str,
    pub decoded_len: usize,
}

lazy_static! {
    static ref DATA_URI_RE: Regex =
        Regex::new(r"(?s)^data:(image/[A-Za-z0-9.+-]+)(?:;[^;,]+)*;base64,(.+)$").unwrap();
}

/// Accepts only base64 image data URIs whose payload actually decodes.
/// Media-type parameters are allowed and whitespace inside the payload is ignored.
pub fn parse_data_uri(raw: &str) -> AppResult<DataUri<'_>> {
    let invalid = || {
        AppError::validation("Image must be a data:image/<type>;base64,<payload> URI")
    };
    let caps = DATA_URI_RE.captures(raw).ok_or_else(invalid)?;
    let (Some(mime), Some(payload)) = (caps.get(1), caps.get(2)) else {
        return Err(invalid());
    };
    let payload: String = payload
        .as_str()
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let decoded = Base64::decode_vec(&payload).map_err(|_| invalid())?;
    if decoded.is_empty() {
        return Err(invalid());
    }
    Ok(DataUri {
        mime: mime.as_str(),
        decoded_len: decoded.len(),
    })
}

/// Writes an uploaded image and returns its storage key.
pub async fn store_upload(st: &AppState, user_id: Uuid, item: UploadItem) -> AppResult<String> {
    if !item.content_type.starts_with("image/") {
        return Err(AppError::validation("Only image uploads are accepted"));
    }
    if item.body.is_empty() {
        return Err(AppError::validation("Uploaded image is empty"));
    }

    let ext = ext_from_mime(&item.content_type)
        .or_else(|| item.file_name.as_deref().and_then(ext_from_file_name))
        .unwrap_or("bin");
    let key = format!("returns/{}/{}.{}", user_id, Uuid::new_v4(), ext);

    st.storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;

    tracing::info!(%user_id, key = %key, "return image uploaded");
    Ok(key)
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

fn ext_from_file_name(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("jpg"),
        "png" => Some("png"),
        "webp" => Some("webp"),
        "gif" => Some("gif"),
        "heic" => Some("heic"),
        _ => None,
    }
}

#[cfg(test)]
mod image_tests {
    use super::*;
    use crate::config::AppConfig;

    // 1x1 transparent png
    const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
        assert_eq!(ext_from_file_name("Receipt.JPEG"), Some("jpg"));
        assert_eq!(ext_from_file_name("noext"), None);
    }

    #[test]
    fn data_uri_accepts_base64_image() {
        let raw = format!("data:image/png;base64,{}", PNG_B64);
        let parsed = parse_data_uri(&raw).unwrap();
        assert_eq!(parsed.mime, "image/png");
        assert!(parsed.decoded_len > 0);
    }

    #[test]
    fn data_uri_allows_parameters_and_wrapped_payload() {
        let (head, tail) = PNG_B64.split_at(40);
        for raw in [
            format!("data:image/png;charset=utf-8;base64,{}", PNG_B64),
            format!("data:image/png;name=box.png;base64,{}\r\n{}", head, tail),
            format!("data:image/png;base64,{}\n{}\n", head, tail),
        ] {
            let parsed = parse_data_uri(&raw).unwrap();
            assert_eq!(parsed.mime, "image/png", "{:?}", raw);
        }
    }

    #[test]
    fn data_uri_rejects_other_shapes() {
        for raw in [
            "",
            "https://example.com/a.png",
            "data:text/plain;base64,aGVsbG8=",
            "data:image/png,rawbytes",
            "data:image/png;base64,",
            "data:image/png;base64,abc",
            "data:image/png;base64,  \n ",
            "data:image/png;base64,not*base64",
        ] {
            let err = parse_data_uri(raw).unwrap_err();
            assert!(matches!(err, AppError::Validation { .. }), "{:?}", raw);
        }
    }

    async fn state_with_tempdir(dir: &std::path::Path) -> AppState {
        let dir = dir.to_string_lossy().into_owned();
        let config = AppConfig::from_lookup(|k| match k {
            "JWT_SECRET" => Some("test-secret".into()),
            "UPLOAD_DIR" => Some(dir.clone()),
            _ => None,
        })
        .unwrap();
        AppState::in_memory(config).await.unwrap()
    }

    #[tokio::test]
    async fn store_upload_writes_under_user_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let st = state_with_tempdir(dir.path()).await;
        let user = Uuid::new_v4();
        let key = store_upload(
            &st,
            user,
            UploadItem {
                body: Bytes::from_static(b"\x89PNG"),
                content_type: "image/png".into(),
                file_name: Some("box.png".into()),
            },
        )
        .await
        .unwrap();

        assert!(key.starts_with(&format!("returns/{}/", user)));
        assert!(key.ends_with(".png"));
        assert!(dir.path().join(&key).exists());
        assert!(st.storage.public_url(&key).ends_with(&format!("/uploads/{}", key)));
    }

    #[tokio::test]
    async fn store_upload_rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let st = state_with_tempdir(dir.path()).await;
        let err = store_upload(
            &st,
            Uuid::new_v4(),
            UploadItem {
                body: Bytes::from_static(b"MZ"),
                content_type: "application/octet-stream".into(),
                file_name: Some("setup.exe".into()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
