use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult, FieldError},
    images::{parse_data_uri, store_upload},
    returns::{
        dto::{ImageInput, ReturnSubmission},
        repo_types::{NewReturn, ReturnImage, ReturnRecord},
    },
    state::AppState,
};

/// Whose record is being created. Only admins may file on behalf of someone else.
pub(crate) fn resolve_owner(caller: &AuthUser, requested: Option<Uuid>) -> Uuid {
    match requested {
        Some(owner) if owner != caller.id => {
            if caller.is_admin() {
                owner
            } else {
                warn!(caller = %caller.id, requested = %owner, "ignoring owner override from non-admin");
                caller.id
            }
        }
        _ => caller.id,
    }
}

pub async fn create_return(
    st: &AppState,
    caller: &AuthUser,
    sub: ReturnSubmission,
) -> AppResult<ReturnRecord> {
    let description = sub.description.trim();
    let mut errors = Vec::new();
    if description.is_empty() {
        errors.push(FieldError::new("description", "Please provide a return reason"));
    }
    let Some(input) = sub.image else {
        errors.push(FieldError::new("image", "Please provide a product image"));
        return Err(AppError::invalid_fields(errors));
    };
    if !errors.is_empty() {
        return Err(AppError::invalid_fields(errors));
    }

    let owner = resolve_owner(caller, sub.owner_override);
    if owner != caller.id && st.users.find_by_id(owner).await?.is_none() {
        return Err(AppError::invalid_fields(vec![FieldError::new(
            "userId",
            "No user exists with this id",
        )]));
    }

    let (image, uploaded_key) = match input {
        ImageInput::DataUri(raw) => {
            let parsed = parse_data_uri(&raw)?;
            tracing::debug!(mime = parsed.mime, bytes = parsed.decoded_len, "inline image accepted");
            (ReturnImage::Inline { data_uri: raw }, None)
        }
        ImageInput::Upload(item) => {
            let key = store_upload(st, owner, item).await?;
            let url = st.storage.public_url(&key);
            (ReturnImage::Reference { url }, Some(key))
        }
    };

    let inserted = st
        .returns
        .insert(NewReturn {
            user_id: owner,
            description,
            image: &image,
        })
        .await;

    match inserted {
        Ok(record) => {
            info!(return_id = record.return_id, user_id = %record.user_id, kind = image.kind(), "return created");
            Ok(record)
        }
        Err(e) => {
            if let Some(key) = uploaded_key {
                if let Err(cleanup) = st.storage.delete_object(&key).await {
                    warn!(error = %cleanup, key = %key, "failed to remove orphaned upload");
                }
            }
            Err(AppError::Internal(e))
        }
    }
}

pub async fn list_returns(
    st: &AppState,
    caller: &AuthUser,
    owner_filter: Option<Uuid>,
) -> AppResult<Vec<ReturnRecord>> {
    let owner = owner_filter.unwrap_or(caller.id);
    if owner != caller.id && !caller.is_admin() {
        warn!(caller = %caller.id, requested = %owner, "list of foreign returns refused");
        return Err(AppError::Forbidden(
            "Not authorized to view these return records".into(),
        ));
    }
    Ok(st.returns.list_by_owner(owner).await?)
}

pub async fn get_return(st: &AppState, caller: &AuthUser, return_id: i64) -> AppResult<ReturnRecord> {
    let record = st
        .returns
        .find_by_return_id(return_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Return record not found".into()))?;

    if record.user_id != caller.id && !caller.is_admin() {
        warn!(caller = %caller.id, return_id, "access to foreign return refused");
        return Err(AppError::Forbidden(
            "Not authorized to access this return record".into(),
        ));
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn caller(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn token_identity_wins_for_regular_users() {
        let user = caller(Role::User);
        assert_eq!(resolve_owner(&user, Some(Uuid::new_v4())), user.id);
        assert_eq!(resolve_owner(&user, None), user.id);
    }

    #[test]
    fn admins_may_file_for_others() {
        let admin = caller(Role::Admin);
        let other = Uuid::new_v4();
        assert_eq!(resolve_owner(&admin, Some(other)), other);
    }
}
