//! Cart owner resolution.
//!
//! A logged-in user owns their cart by user id. Anonymous visitors get a
//! UUID v4 stored in their session under `cart_session`, created the first
//! time they add something.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{CartOwner, CurrentUser, session_keys};

/// The visitor behind a request: session plus optional login.
pub struct Shopper {
    session: Session,
    pub user: Option<CurrentUser>,
}

impl Shopper {
    /// The cart owner, if the visitor has one yet.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the session store fails.
    pub async fn owner(&self) -> Result<Option<CartOwner>, AppError> {
        if let Some(user) = &self.user {
            return Ok(Some(CartOwner::User(user.id)));
        }
        Ok(self
            .session
            .get::<Uuid>(session_keys::CART_SESSION)
            .await?
            .map(CartOwner::Session))
    }

    /// The cart owner, minting an anonymous cart session when needed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the session store fails.
    pub async fn owner_or_create(&self) -> Result<CartOwner, AppError> {
        if let Some(owner) = self.owner().await? {
            return Ok(owner);
        }

        let id = Uuid::new_v4();
        self.session.insert(session_keys::CART_SESSION, id).await?;
        tracing::debug!(cart_session = %id, "Started anonymous cart");
        Ok(CartOwner::Session(id))
    }

    /// The anonymous cart session id, to merge into a user cart at login.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the session store fails.
    pub async fn take_cart_session(&self) -> Result<Option<Uuid>, AppError> {
        Ok(self
            .session
            .remove::<Uuid>(session_keys::CART_SESSION)
            .await?)
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }
}

impl<S> FromRequestParts<S> for Shopper
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        let user = session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await?;

        Ok(Self { session, user })
    }
}
