//! Identity component — DID-backed user profiles keyed by wallet address.

use crate::error::{CoreError, Result};
use crate::types::{
    DidDocument, DidService, Identity, ProfileEndpoint, ProfileUpdate, VerificationMethod,
};
use crate::{ensure_address, now_ms, Service};

const DID_CONTEXT: &str = "https://www.w3.org/ns/did/v1";
const KEY_TYPE: &str = "EcdsaSecp256k1VerificationKey2019";
const PROFILE_SERVICE_TYPE: &str = "ProfileService";

/// Derive the DID for a wallet address.
pub fn did_for_address(address: &str) -> String {
    format!("did:adeal:{address}")
}

impl Service {
    /// Register a new identity for `address`.
    ///
    /// The DID is derived from the address, so registering twice would
    /// mint the same DID; a second attempt fails with
    /// [`CoreError::AlreadyRegistered`].
    pub async fn register(
        &self,
        address: &str,
        username: &str,
        avatar_url: Option<&str>,
    ) -> Result<Identity> {
        ensure_address(address)?;
        let username = username.trim();
        if username.is_empty() {
            return Err(CoreError::InvalidInput("username must not be blank".into()));
        }
        let avatar_url = normalize_avatar(avatar_url);

        let lock = self.locks.for_address(address);
        let _guard = lock.lock().await;

        let now = now_ms();
        let did = did_for_address(address);
        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO identities
                (address, did, username, avatar_url, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(address)
        .bind(&did)
        .bind(username)
        .bind(&avatar_url)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(CoreError::AlreadyRegistered(address.to_string()));
        }

        Ok(Identity {
            address: address.to_string(),
            did,
            username: username.to_string(),
            avatar_url,
            created_at: now,
            updated_at: now,
        })
    }

    /// Look up the identity registered for `address`, if any.
    pub async fn identity(&self, address: &str) -> Result<Option<Identity>> {
        ensure_address(address)?;
        let row = sqlx::query_as::<_, Identity>(
            r#"
            SELECT address, did, username, avatar_url, created_at, updated_at
            FROM   identities
            WHERE  address = ?1
            "#,
        )
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Apply a partial profile update on behalf of `caller`.
    ///
    /// Only the owner may update their profile. Fields left `None` are
    /// unchanged; an empty avatar URL clears the stored one. An update
    /// with nothing to change returns the current profile untouched.
    pub async fn update_profile(
        &self,
        address: &str,
        caller: &str,
        update: ProfileUpdate,
    ) -> Result<Identity> {
        ensure_address(address)?;
        if caller != address {
            return Err(CoreError::Unauthorized(format!(
                "{caller} may not update the profile of {address}"
            )));
        }
        if let Some(username) = &update.username {
            if username.trim().is_empty() {
                return Err(CoreError::InvalidInput("username must not be blank".into()));
            }
        }

        let lock = self.locks.for_address(address);
        let _guard = lock.lock().await;

        let mut tx = self.write_tx().await?;
        let mut current = match sqlx::query_as::<_, Identity>(
            r#"
            SELECT address, did, username, avatar_url, created_at, updated_at
            FROM   identities
            WHERE  address = ?1
            "#,
        )
        .bind(address)
        .fetch_optional(&mut *tx)
        .await?
        {
            Some(identity) => identity,
            None => return Err(CoreError::NotFound(format!("identity {address}"))),
        };

        if update.username.is_none() && update.avatar_url.is_none() {
            return Ok(current);
        }

        if let Some(username) = update.username {
            current.username = username.trim().to_string();
        }
        if let Some(avatar) = update.avatar_url {
            current.avatar_url = normalize_avatar(Some(&avatar));
        }
        current.updated_at = now_ms();

        sqlx::query(
            r#"
            UPDATE identities
            SET    username = ?2, avatar_url = ?3, updated_at = ?4
            WHERE  address = ?1
            "#,
        )
        .bind(&current.address)
        .bind(&current.username)
        .bind(&current.avatar_url)
        .bind(current.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(current)
    }

    /// Render the stored identity as a W3C DID document.
    pub async fn did_document(&self, address: &str) -> Result<DidDocument> {
        let identity = match self.identity(address).await? {
            Some(identity) => identity,
            None => return Err(CoreError::NotFound(format!("identity {address}"))),
        };
        Ok(build_document(&identity))
    }
}

fn normalize_avatar(avatar: Option<&str>) -> Option<String> {
    match avatar {
        Some(url) if !url.trim().is_empty() => Some(url.trim().to_string()),
        _ => None,
    }
}

fn build_document(identity: &Identity) -> DidDocument {
    let did = &identity.did;
    DidDocument {
        context: DID_CONTEXT,
        id: did.clone(),
        controller: identity.address.clone(),
        verification_method: vec![VerificationMethod {
            id: format!("{did}#controller"),
            method_type: KEY_TYPE,
            controller: did.clone(),
            public_key_hex: identity.address.clone(),
        }],
        service: vec![DidService {
            id: format!("{did}#profile"),
            service_type: PROFILE_SERVICE_TYPE,
            service_endpoint: ProfileEndpoint {
                username: identity.username.clone(),
                avatar_url: identity.avatar_url.clone(),
                created_at: identity.created_at,
            },
        }],
    }
}
