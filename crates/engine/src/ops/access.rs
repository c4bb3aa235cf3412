//! Identity and moderator checks.
//!
//! Every check is a live lookup against `users`; nothing about a user's role
//! is cached in the session, so a revoked moderator loses access on the next
//! request.

use sea_orm::{ActiveValue, ConnectionTrait, QueryOrder, prelude::*, sea_query::OnConflict};

use crate::{EngineError, IdentityError, ResultEngine, User, users};

use super::Engine;

pub(super) async fn find_user<C: ConnectionTrait>(
    db: &C,
    subject_id: &str,
) -> ResultEngine<Option<User>> {
    let model = users::Entity::find_by_id(subject_id.to_string())
        .one(db)
        .await?;
    Ok(model.map(User::from))
}

/// Resolve a moderator inside the caller's transaction.
///
/// Unknown subjects are reported as `Unauthenticated`, known non-moderators as
/// `Forbidden`.
pub(super) async fn require_moderator<C: ConnectionTrait>(
    db: &C,
    subject_id: &str,
) -> ResultEngine<User> {
    let user = find_user(db, subject_id)
        .await?
        .ok_or(EngineError::Unauthenticated)?;
    if !user.is_moderator {
        return Err(EngineError::Forbidden("user is not a moderator".to_string()));
    }
    Ok(user)
}

impl Engine {
    /// Verify an identity-provider credential and upsert the user it names.
    ///
    /// On conflict only email and names are refreshed; the moderator flag of
    /// an existing user is never touched.
    pub async fn login(&self, credential: &str) -> ResultEngine<User> {
        let identity = self
            .identity()?
            .verify(credential)
            .await
            .map_err(|err| match err {
                IdentityError::InvalidCredential => EngineError::Unauthenticated,
                IdentityError::Unavailable(detail) => EngineError::Upstream(detail),
            })?;

        let model = users::ActiveModel {
            subject_id: ActiveValue::Set(identity.subject_id.clone()),
            email: ActiveValue::Set(identity.email),
            first_name: ActiveValue::Set(identity.given_name),
            last_name: ActiveValue::Set(identity.family_name),
            is_moderator: ActiveValue::Set(false),
        };
        users::Entity::insert(model)
            .on_conflict(
                OnConflict::column(users::Column::SubjectId)
                    .update_columns([
                        users::Column::Email,
                        users::Column::FirstName,
                        users::Column::LastName,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.database)
            .await?;

        let user = find_user(&self.database, &identity.subject_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not found".to_string()))?;
        tracing::info!(subject_id = %user.subject_id, "user logged in");
        Ok(user)
    }

    /// Load a user by subject id.
    pub async fn user(&self, subject_id: &str) -> ResultEngine<User> {
        find_user(&self.database, subject_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not found".to_string()))
    }

    /// Confirm a session subject still names a known user.
    pub async fn authenticate(&self, subject_id: &str) -> ResultEngine<User> {
        find_user(&self.database, subject_id)
            .await?
            .ok_or(EngineError::Unauthenticated)
    }

    /// Confirm a session subject names a current moderator.
    pub async fn authorize_moderator(&self, subject_id: &str) -> ResultEngine<User> {
        require_moderator(&self.database, subject_id).await
    }

    /// Grant or revoke the moderator flag. Administrative only.
    pub async fn set_moderator(&self, subject_id: &str, is_moderator: bool) -> ResultEngine<User> {
        let model = users::Entity::find_by_id(subject_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not found".to_string()))?;

        let mut active: users::ActiveModel = model.into();
        active.is_moderator = ActiveValue::Set(is_moderator);
        let updated = active.update(&self.database).await?;
        tracing::info!(subject_id, is_moderator, "moderator flag changed");
        Ok(User::from(updated))
    }

    /// Every known user, ordered by subject id.
    pub async fn users(&self) -> ResultEngine<Vec<User>> {
        let models = users::Entity::find()
            .order_by_asc(users::Column::SubjectId)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(User::from).collect())
    }
}
